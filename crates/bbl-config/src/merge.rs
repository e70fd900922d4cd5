//! Overlaying global flags onto a loaded state
//!
//! A flag only ever fills or overwrites a slot when it is non-empty. The IAAS,
//! the region and the GCP project are write-once: once recorded, a different
//! value is rejected instead of applied.

use crate::error::{ConfigError, Result};
use crate::flags::GlobalFlags;
use bbl_core::fs::{DIR_MODE, FILE_MODE, write_atomic};
use bbl_core::{Filesystem, Iaas, State};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory under the state dir holding materialized credentials
pub const CREDENTIALS_DIR: &str = ".bbl";
pub const GCP_KEY_FILE: &str = "gcp-service-account-key.json";
pub const OPENSTACK_KEY_FILE: &str = "openstack-private-key.pem";

pub struct FlagMerger {
    fs: Arc<dyn Filesystem>,
}

impl FlagMerger {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    pub fn merge(&self, flags: &GlobalFlags, mut state: State, state_dir: &Path) -> Result<State> {
        if let Some(iaas) = flags.iaas {
            match state.iaas {
                Some(current) if current != iaas => {
                    return Err(ConfigError::ImmutableField {
                        name: "iaas type",
                        current: current.to_string(),
                    });
                }
                _ => state.iaas = Some(iaas),
            }
        }

        let Some(iaas) = state.iaas else {
            return Ok(state);
        };

        match iaas {
            Iaas::Aws => merge_aws(flags, &mut state)?,
            Iaas::Gcp => self.merge_gcp(flags, &mut state, state_dir)?,
            Iaas::Azure => merge_azure(flags, &mut state)?,
            Iaas::Vsphere => merge_vsphere(flags, &mut state)?,
            Iaas::Openstack => self.merge_openstack(flags, &mut state, state_dir)?,
            Iaas::Cloudstack => merge_cloudstack(flags, &mut state)?,
        }

        Ok(state)
    }

    fn merge_gcp(&self, flags: &GlobalFlags, state: &mut State, state_dir: &Path) -> Result<()> {
        if let Some(key) = non_empty(&flags.gcp_service_account_key) {
            let contents = self.read_path_or_inline(key)?;
            let project_id = parse_project_id(&contents)?;
            set_once(&mut state.gcp.project_id, &project_id, "project ID")?;
            state.gcp.service_account_key = contents;
        }

        if let Some(region) = non_empty(&flags.gcp_region) {
            set_once(&mut state.gcp.region, region, "region")?;
        }
        if let Some(zone) = non_empty(&flags.gcp_zone) {
            state.gcp.zone = zone.to_string();
        }

        if !state.gcp.service_account_key.is_empty() {
            let path = self.materialize(
                state_dir,
                GCP_KEY_FILE,
                state.gcp.service_account_key.as_bytes(),
            )?;
            state.gcp.service_account_key_path = path.to_string_lossy().into_owned();
        }
        Ok(())
    }

    fn merge_openstack(
        &self,
        flags: &GlobalFlags,
        state: &mut State,
        state_dir: &Path,
    ) -> Result<()> {
        let c = &mut state.openstack;
        set(&mut c.internal_cidr, &flags.openstack_internal_cidr);
        set(&mut c.external_ip, &flags.openstack_external_ip);
        set(&mut c.auth_url, &flags.openstack_auth_url);
        set(&mut c.az, &flags.openstack_az);
        set(&mut c.default_key_name, &flags.openstack_default_key_name);
        set(
            &mut c.default_security_group,
            &flags.openstack_default_security_group,
        );
        set(&mut c.network_id, &flags.openstack_network_id);
        set(&mut c.network_name, &flags.openstack_network_name);
        set(&mut c.password, &flags.openstack_password);
        set(&mut c.username, &flags.openstack_username);
        set(&mut c.project, &flags.openstack_project);
        set(&mut c.domain, &flags.openstack_domain);
        set_region(&mut c.region, &flags.openstack_region)?;

        if let Some(key) = non_empty(&flags.openstack_private_key) {
            state.openstack.private_key = self.read_path_or_inline(key)?;
        }

        if !state.openstack.private_key.is_empty() {
            let path = self.materialize(
                state_dir,
                OPENSTACK_KEY_FILE,
                state.openstack.private_key.as_bytes(),
            )?;
            state.openstack.private_key_path = path.to_string_lossy().into_owned();
        }
        Ok(())
    }

    /// A value naming an existing regular file is replaced by that file's contents
    fn read_path_or_inline(&self, value: &str) -> Result<String> {
        let path = Path::new(value);
        if self.fs.is_file(path) {
            tracing::debug!("Reading credential from {}", path.display());
            self.fs
                .read_to_string(path)
                .map_err(|e| ConfigError::io(path, e))
        } else {
            Ok(value.to_string())
        }
    }

    /// Write a credential to `<state-dir>/.bbl/<name>` (0600), overwriting any previous copy
    fn materialize(&self, state_dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let dir = state_dir.join(CREDENTIALS_DIR);
        self.fs
            .create_dir_all(&dir, DIR_MODE)
            .map_err(|e| ConfigError::io(&dir, e))?;
        let path = dir.join(name);
        write_atomic(self.fs.as_ref(), &path, contents, FILE_MODE)
            .map_err(|e| ConfigError::io(&path, e))?;
        Ok(path)
    }
}

fn parse_project_id(key: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(key).map_err(|e| {
        ConfigError::InvalidCredential(format!(
            "error unmarshalling service account key (must be valid json): {}",
            e
        ))
    })?;
    match value.get("project_id").and_then(|p| p.as_str()) {
        Some(project_id) if !project_id.is_empty() => Ok(project_id.to_string()),
        _ => Err(ConfigError::MissingRequiredField(
            "project_id in service account key".to_string(),
        )),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn set(slot: &mut String, value: &Option<String>) {
    if let Some(value) = non_empty(value) {
        *slot = value.to_string();
    }
}

fn set_once(slot: &mut String, value: &str, name: &'static str) -> Result<()> {
    if !slot.is_empty() && slot != value {
        return Err(ConfigError::ImmutableField {
            name,
            current: slot.clone(),
        });
    }
    *slot = value.to_string();
    Ok(())
}

/// The provider's region field (`State::region`) is fixed once recorded
fn set_region(slot: &mut String, value: &Option<String>) -> Result<()> {
    match non_empty(value) {
        Some(value) => set_once(slot, value, "region"),
        None => Ok(()),
    }
}

fn merge_aws(flags: &GlobalFlags, state: &mut State) -> Result<()> {
    let c = &mut state.aws;
    set(&mut c.access_key_id, &flags.aws_access_key_id);
    set(&mut c.secret_access_key, &flags.aws_secret_access_key);
    if let Some(region) = non_empty(&flags.aws_region) {
        set_once(&mut c.region, region, "region")?;
    }
    Ok(())
}

fn merge_azure(flags: &GlobalFlags, state: &mut State) -> Result<()> {
    let c = &mut state.azure;
    set(&mut c.client_id, &flags.azure_client_id);
    set(&mut c.client_secret, &flags.azure_client_secret);
    set(&mut c.subscription_id, &flags.azure_subscription_id);
    set(&mut c.tenant_id, &flags.azure_tenant_id);
    if let Some(region) = non_empty(&flags.azure_region) {
        set_once(&mut c.region, region, "region")?;
    }
    Ok(())
}

fn merge_vsphere(flags: &GlobalFlags, state: &mut State) -> Result<()> {
    let c = &mut state.vsphere;
    set(&mut c.vcenter_user, &flags.vsphere_vcenter_user);
    set(&mut c.vcenter_password, &flags.vsphere_vcenter_password);
    set(&mut c.vcenter_ip, &flags.vsphere_vcenter_ip);
    set_region(&mut c.vcenter_dc, &flags.vsphere_vcenter_dc)?;
    set(&mut c.vcenter_cluster, &flags.vsphere_vcenter_cluster);
    set(&mut c.vcenter_rp, &flags.vsphere_vcenter_rp);
    set(&mut c.network, &flags.vsphere_network);
    set(&mut c.vcenter_ds, &flags.vsphere_vcenter_ds);
    set(&mut c.subnet_cidr, &flags.vsphere_subnet_cidr);
    set(&mut c.vcenter_disks, &flags.vsphere_vcenter_disks);
    set(&mut c.vcenter_templates, &flags.vsphere_vcenter_templates);
    set(&mut c.vcenter_vms, &flags.vsphere_vcenter_vms);
    Ok(())
}

fn merge_cloudstack(flags: &GlobalFlags, state: &mut State) -> Result<()> {
    let c = &mut state.cloudstack;
    set(&mut c.endpoint, &flags.cloudstack_endpoint);
    set(&mut c.api_key, &flags.cloudstack_api_key);
    set(&mut c.secret_access_key, &flags.cloudstack_secret_access_key);
    set_region(&mut c.zone, &flags.cloudstack_zone)?;
    set(
        &mut c.network_vpc_offering,
        &flags.cloudstack_network_vpc_offering,
    );
    set(&mut c.compute_offering, &flags.cloudstack_compute_offering);
    if flags.cloudstack_iso_segment {
        c.iso_segment = true;
    }
    Ok(())
}
