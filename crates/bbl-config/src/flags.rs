//! Global flags
//!
//! Every flag has a `BBL_*` environment variable fallback. An explicit flag
//! always wins over the environment.

use bbl_core::Iaas;
use clap::builder::BoolishValueParser;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "bbl",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct GlobalFlags {
    /// Show help; with a subcommand, show that subcommand's help
    #[arg(short = 'h', long)]
    pub help: bool,

    /// Verbose logging
    #[arg(
        short = 'd',
        long,
        env = "BBL_DEBUG",
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,

    /// Show version and exit
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Skip interactive prompts
    #[arg(short = 'n', long)]
    pub no_confirm: bool,

    /// Path to the state directory
    #[arg(short = 's', long, env = "BBL_STATE_DIRECTORY")]
    pub state_dir: Option<PathBuf>,

    /// Bucket holding a remote `<env-name>.tgz` state archive
    #[arg(long, env = "BBL_STATE_BUCKET")]
    pub state_bucket: Option<String>,

    /// Environment name used to locate remote state
    #[arg(long, env = "BBL_ENV_NAME")]
    pub env_name: Option<String>,

    #[arg(long, env = "BBL_IAAS")]
    pub iaas: Option<Iaas>,

    // AWS
    #[arg(long, env = "BBL_AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: Option<String>,
    #[arg(long, env = "BBL_AWS_SECRET_ACCESS_KEY")]
    pub aws_secret_access_key: Option<String>,
    #[arg(long, env = "BBL_AWS_REGION")]
    pub aws_region: Option<String>,

    // GCP
    /// Path to a service account key file, or the key JSON itself
    #[arg(long, env = "BBL_GCP_SERVICE_ACCOUNT_KEY")]
    pub gcp_service_account_key: Option<String>,
    #[arg(long, env = "BBL_GCP_REGION")]
    pub gcp_region: Option<String>,
    #[arg(long, env = "BBL_GCP_ZONE")]
    pub gcp_zone: Option<String>,

    // Azure
    #[arg(long, env = "BBL_AZURE_CLIENT_ID")]
    pub azure_client_id: Option<String>,
    #[arg(long, env = "BBL_AZURE_CLIENT_SECRET")]
    pub azure_client_secret: Option<String>,
    #[arg(long, env = "BBL_AZURE_REGION")]
    pub azure_region: Option<String>,
    #[arg(long, env = "BBL_AZURE_SUBSCRIPTION_ID")]
    pub azure_subscription_id: Option<String>,
    #[arg(long, env = "BBL_AZURE_TENANT_ID")]
    pub azure_tenant_id: Option<String>,

    // vSphere
    #[arg(long, env = "BBL_VSPHERE_VCENTER_USER")]
    pub vsphere_vcenter_user: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_PASSWORD")]
    pub vsphere_vcenter_password: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_IP")]
    pub vsphere_vcenter_ip: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_DC")]
    pub vsphere_vcenter_dc: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_CLUSTER")]
    pub vsphere_vcenter_cluster: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_RP")]
    pub vsphere_vcenter_rp: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_NETWORK")]
    pub vsphere_network: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_DS")]
    pub vsphere_vcenter_ds: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_SUBNET_CIDR")]
    pub vsphere_subnet_cidr: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_DISKS")]
    pub vsphere_vcenter_disks: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_TEMPLATES")]
    pub vsphere_vcenter_templates: Option<String>,
    #[arg(long, env = "BBL_VSPHERE_VCENTER_VMS")]
    pub vsphere_vcenter_vms: Option<String>,

    // OpenStack
    #[arg(long, env = "BBL_OPENSTACK_INTERNAL_CIDR")]
    pub openstack_internal_cidr: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_EXTERNAL_IP")]
    pub openstack_external_ip: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_AUTH_URL")]
    pub openstack_auth_url: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_AZ")]
    pub openstack_az: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_DEFAULT_KEY_NAME")]
    pub openstack_default_key_name: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_DEFAULT_SECURITY_GROUP")]
    pub openstack_default_security_group: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_NETWORK_ID")]
    pub openstack_network_id: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_NETWORK_NAME")]
    pub openstack_network_name: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_PASSWORD")]
    pub openstack_password: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_USERNAME")]
    pub openstack_username: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_PROJECT")]
    pub openstack_project: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_DOMAIN")]
    pub openstack_domain: Option<String>,
    #[arg(long, env = "BBL_OPENSTACK_REGION")]
    pub openstack_region: Option<String>,
    /// Path to a private key file, or the PEM itself
    #[arg(long, env = "BBL_OPENSTACK_PRIVATE_KEY")]
    pub openstack_private_key: Option<String>,

    // CloudStack
    #[arg(long, env = "BBL_CLOUDSTACK_ENDPOINT")]
    pub cloudstack_endpoint: Option<String>,
    #[arg(long, env = "BBL_CLOUDSTACK_API_KEY")]
    pub cloudstack_api_key: Option<String>,
    #[arg(long, env = "BBL_CLOUDSTACK_SECRET_ACCESS_KEY")]
    pub cloudstack_secret_access_key: Option<String>,
    #[arg(long, env = "BBL_CLOUDSTACK_ZONE")]
    pub cloudstack_zone: Option<String>,
    #[arg(long, env = "BBL_CLOUDSTACK_NETWORK_VPC_OFFERING")]
    pub cloudstack_network_vpc_offering: Option<String>,
    #[arg(long, env = "BBL_CLOUDSTACK_COMPUTE_OFFERING")]
    pub cloudstack_compute_offering: Option<String>,
    #[arg(
        long,
        env = "BBL_CLOUDSTACK_ISO_SEGMENT",
        value_parser = BoolishValueParser::new()
    )]
    pub cloudstack_iso_segment: bool,
}

/// How a single token relates to the global flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagShape {
    /// A known global switch
    Switch,
    /// A known global option whose value is the next token
    TakesValue,
    /// A known global option carrying its value inline (`--flag=value`)
    Inline,
    /// Not a global flag; forwarded to the subcommand
    Unknown,
}

impl GlobalFlags {
    /// Classify `token`, which must start with `-`
    pub fn shape_of(token: &str) -> FlagShape {
        let command = GlobalFlags::command();

        let (name, inline) = match token.split_once('=') {
            Some((name, _)) => (name, true),
            None => (token, false),
        };

        let arg = if let Some(long) = name.strip_prefix("--") {
            command.get_arguments().find(|a| a.get_long() == Some(long))
        } else if let Some(short) = name.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => command.get_arguments().find(|a| a.get_short() == Some(c)),
                _ => None,
            }
        } else {
            None
        };

        match arg {
            None => FlagShape::Unknown,
            Some(_) if inline => FlagShape::Inline,
            Some(a) if a.get_action().takes_values() => FlagShape::TakesValue,
            Some(_) => FlagShape::Switch,
        }
    }
}
