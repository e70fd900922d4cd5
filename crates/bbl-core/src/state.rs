//! The persisted environment record
//!
//! `State` is the authoritative description of one environment between
//! invocations. Large opaque blobs produced by the external engines (vars
//! stores, manifests, create-env state, terraform state) are excluded from the
//! JSON document and persisted as separate files by the store; see [`Blob`].

use crate::iaas::Iaas;
use serde::{Deserialize, Serialize};

/// Root state document (`bbl-state.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct State {
    /// Schema version, see [`crate::migrate::CURRENT_VERSION`]
    pub version: u32,

    /// Version of the bbl binary that last wrote this state
    pub bbl_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iaas: Option<Iaas>,

    #[serde(rename = "envID")]
    pub env_id: String,

    pub aws: AwsConfig,
    pub gcp: GcpConfig,
    pub azure: AzureConfig,
    pub vsphere: VsphereConfig,
    pub openstack: OpenStackConfig,
    pub cloudstack: CloudStackConfig,

    pub key_pair: KeyPair,
    pub jumpbox: Jumpbox,

    #[serde(rename = "directorVM")]
    pub director_vm: DirectorVm,

    pub lb: Lb,

    /// Provider-native infrastructure identifier (legacy stack name)
    pub stack: Stack,

    /// Infrastructure engine state; persisted as a blob file
    #[serde(skip)]
    pub tf_state: String,

    /// Combined output of the last infrastructure engine run
    #[serde(rename = "latestTFOutput")]
    pub latest_tf_output: String,

    pub no_director: bool,
}

impl State {
    /// True when nothing but the schema stamp is set
    pub fn is_empty(&self) -> bool {
        let mut unstamped = self.clone();
        unstamped.version = 0;
        unstamped.bbl_version.clear();
        unstamped == State::default()
    }

    /// The infrastructure identifier recorded for this environment, if any
    pub fn infrastructure_id(&self) -> Option<&str> {
        if !self.stack.name.is_empty() {
            Some(self.stack.name.as_str())
        } else if !self.tf_state.is_empty() {
            Some("terraform")
        } else {
            None
        }
    }

    /// Providers whose configuration record is non-empty
    pub fn configured_providers(&self) -> Vec<Iaas> {
        let mut configured = Vec::new();
        if !self.aws.is_empty() {
            configured.push(Iaas::Aws);
        }
        if !self.gcp.is_empty() {
            configured.push(Iaas::Gcp);
        }
        if !self.azure.is_empty() {
            configured.push(Iaas::Azure);
        }
        if !self.vsphere.is_empty() {
            configured.push(Iaas::Vsphere);
        }
        if !self.openstack.is_empty() {
            configured.push(Iaas::Openstack);
        }
        if !self.cloudstack.is_empty() {
            configured.push(Iaas::Cloudstack);
        }
        configured
    }

    /// Region-equivalent for the active provider
    pub fn region(&self) -> &str {
        match self.iaas {
            Some(Iaas::Aws) => &self.aws.region,
            Some(Iaas::Gcp) => &self.gcp.region,
            Some(Iaas::Azure) => &self.azure.region,
            Some(Iaas::Vsphere) => &self.vsphere.vcenter_dc,
            Some(Iaas::Openstack) => &self.openstack.region,
            Some(Iaas::Cloudstack) => &self.cloudstack.zone,
            None => "",
        }
    }

    pub fn blob(&self, blob: Blob) -> &str {
        match blob {
            Blob::JumpboxVariables => &self.jumpbox.variables,
            Blob::JumpboxManifest => &self.jumpbox.manifest,
            Blob::JumpboxState => &self.jumpbox.state,
            Blob::DirectorVariables => &self.director_vm.variables,
            Blob::DirectorManifest => &self.director_vm.manifest,
            Blob::DirectorState => &self.director_vm.state,
            Blob::TerraformState => &self.tf_state,
        }
    }

    pub fn blob_mut(&mut self, blob: Blob) -> &mut String {
        match blob {
            Blob::JumpboxVariables => &mut self.jumpbox.variables,
            Blob::JumpboxManifest => &mut self.jumpbox.manifest,
            Blob::JumpboxState => &mut self.jumpbox.state,
            Blob::DirectorVariables => &mut self.director_vm.variables,
            Blob::DirectorManifest => &mut self.director_vm.manifest,
            Blob::DirectorState => &mut self.director_vm.state,
            Blob::TerraformState => &mut self.tf_state,
        }
    }
}

/// Opaque engine artifacts stored next to the root document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blob {
    JumpboxVariables,
    JumpboxManifest,
    JumpboxState,
    DirectorVariables,
    DirectorManifest,
    DirectorState,
    TerraformState,
}

impl Blob {
    pub const ALL: [Blob; 7] = [
        Blob::JumpboxVariables,
        Blob::JumpboxManifest,
        Blob::JumpboxState,
        Blob::DirectorVariables,
        Blob::DirectorManifest,
        Blob::DirectorState,
        Blob::TerraformState,
    ];

    /// Key used in the root document's `files` map
    pub fn key(&self) -> &'static str {
        match self {
            Blob::JumpboxVariables => "jumpboxVariables",
            Blob::JumpboxManifest => "jumpboxManifest",
            Blob::JumpboxState => "jumpboxState",
            Blob::DirectorVariables => "directorVariables",
            Blob::DirectorManifest => "directorManifest",
            Blob::DirectorState => "directorState",
            Blob::TerraformState => "tfState",
        }
    }

    /// Path relative to the state directory
    pub fn relative_path(&self) -> &'static str {
        match self {
            Blob::JumpboxVariables => "vars/jumpbox-vars-store.yml",
            Blob::JumpboxManifest => "vars/jumpbox-manifest.yml",
            Blob::JumpboxState => "vars/jumpbox-state.json",
            Blob::DirectorVariables => "vars/director-vars-store.yml",
            Blob::DirectorManifest => "vars/director-manifest.yml",
            Blob::DirectorState => "vars/bosh-state.json",
            Blob::TerraformState => "vars/terraform.tfstate",
        }
    }

    pub fn from_key(key: &str) -> Option<Blob> {
        Blob::ALL.into_iter().find(|b| b.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsConfig {
    #[serde(rename = "accessKeyID")]
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GcpConfig {
    /// Service account key JSON
    pub service_account_key: String,
    /// Materialized copy of the key consumed by the infrastructure engine
    pub service_account_key_path: String,
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub region: String,
    pub zone: String,
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureConfig {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
    pub region: String,
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VsphereConfig {
    pub vcenter_user: String,
    pub vcenter_password: String,
    #[serde(rename = "vcenterIP")]
    pub vcenter_ip: String,
    #[serde(rename = "vcenterDC")]
    pub vcenter_dc: String,
    pub vcenter_cluster: String,
    #[serde(rename = "vcenterRP")]
    pub vcenter_rp: String,
    pub network: String,
    #[serde(rename = "vcenterDS")]
    pub vcenter_ds: String,
    #[serde(rename = "subnetCIDR")]
    pub subnet_cidr: String,
    pub vcenter_disks: String,
    pub vcenter_templates: String,
    #[serde(rename = "vcenterVMs")]
    pub vcenter_vms: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenStackConfig {
    #[serde(rename = "internalCIDR")]
    pub internal_cidr: String,
    #[serde(rename = "externalIP")]
    pub external_ip: String,
    #[serde(rename = "authURL")]
    pub auth_url: String,
    pub az: String,
    pub default_key_name: String,
    pub default_security_group: String,
    #[serde(rename = "networkID")]
    pub network_id: String,
    pub network_name: String,
    pub password: String,
    pub username: String,
    pub project: String,
    pub domain: String,
    pub region: String,
    pub private_key: String,
    pub private_key_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudStackConfig {
    pub endpoint: String,
    pub api_key: String,
    pub secret_access_key: String,
    pub zone: String,
    pub network_vpc_offering: String,
    pub compute_offering: String,
    pub iso_segment: bool,
}

macro_rules! impl_is_empty {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                pub fn is_empty(&self) -> bool {
                    *self == Self::default()
                }
            }
        )*
    };
}

impl_is_empty!(
    AwsConfig,
    GcpConfig,
    AzureConfig,
    VsphereConfig,
    OpenStackConfig,
    CloudStackConfig,
    KeyPair,
    Jumpbox,
    DirectorVm,
    Stack,
);

/// SSH material used to reach the jumpbox and director
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyPair {
    pub name: String,
    pub public_key: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Jumpbox {
    pub url: String,
    #[serde(skip)]
    pub variables: String,
    #[serde(skip)]
    pub manifest: String,
    #[serde(skip)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectorVm {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: String,
    pub ca_cert: String,
    #[serde(skip)]
    pub variables: String,
    #[serde(skip)]
    pub manifest: String,
    #[serde(skip)]
    pub state: String,
}

impl DirectorVm {
    /// True once `create-env` has produced a VM; a name alone is only a plan
    pub fn is_deployed(&self) -> bool {
        !self.address.is_empty() || !self.state.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LbType {
    #[default]
    #[serde(alias = "")]
    None,
    Concourse,
    Cf,
}

impl LbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LbType::None => "none",
            LbType::Concourse => "concourse",
            LbType::Cf => "cf",
        }
    }
}

impl std::fmt::Display for LbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LbType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(LbType::None),
            "concourse" => Ok(LbType::Concourse),
            "cf" => Ok(LbType::Cf),
            other => Err(format!(
                "\"{}\" is not a valid lb type, valid lb types are: concourse, cf",
                other
            )),
        }
    }
}

/// Optional load balancer in front of the workloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lb {
    #[serde(rename = "type")]
    pub lb_type: LbType,
    pub cert: String,
    pub key: String,
    pub chain: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stack {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_empty() {
        assert!(State::default().is_empty());
    }

    #[test]
    fn test_version_stamp_does_not_make_state_non_empty() {
        let state = State {
            version: 14,
            bbl_version: "0.1.0".to_string(),
            ..Default::default()
        };
        assert!(state.is_empty());
    }

    #[test]
    fn test_blobs_count_towards_non_empty() {
        let mut state = State::default();
        *state.blob_mut(Blob::TerraformState) = "{}".to_string();
        assert!(!state.is_empty());
        assert_eq!(state.infrastructure_id(), Some("terraform"));
    }

    #[test]
    fn test_configured_providers() {
        let mut state = State::default();
        state.aws.region = "us-east-1".to_string();
        state.gcp.zone = "us-east1-b".to_string();
        assert_eq!(state.configured_providers(), vec![Iaas::Aws, Iaas::Gcp]);
    }

    #[test]
    fn test_blob_keys_round_trip() {
        for blob in Blob::ALL {
            assert_eq!(Blob::from_key(blob.key()), Some(blob));
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let mut state = State::default();
        state.iaas = Some(Iaas::Aws);
        state.env_id = "env1".to_string();
        state.aws.access_key_id = "k".to_string();
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["iaas"], "aws");
        assert_eq!(value["envID"], "env1");
        assert_eq!(value["aws"]["accessKeyID"], "k");
        assert_eq!(value["lb"]["type"], "none");
        assert!(value["directorVM"].get("variables").is_none());
    }

    #[test]
    fn test_lb_type_accepts_empty_string() {
        let lb: Lb = serde_json::from_str(r#"{"type":""}"#).unwrap();
        assert_eq!(lb.lb_type, LbType::None);
        assert_eq!("cf".parse::<LbType>().unwrap(), LbType::Cf);
        assert!("elb".parse::<LbType>().is_err());
    }
}
