//! Cloud-config overlay generation
//!
//! The overlay is a list of ops applied by the director CLI to a generic
//! cloud-config base. Every stanza is written as "remove if present, then
//! append" or as an optional-path replace, so applying it does not depend on
//! what the base already contains. Concrete addresses live in the vars
//! document and are referenced from the overlay as `((zN.name))`.

use crate::error::{CloudConfigError, Result};
use crate::ops::{Op, var};
use crate::providers::{self, DISK_TYPES, VM_TYPES, ZONES};
use bbl_core::{Iaas, LbType, State};
use bbl_terraform::outputs_from_state;
use serde_json::{Value, json};

const NETWORKS: [&str; 5] = [
    "default",
    "control-plane",
    "data-plane",
    "bosh-subnet",
    "compilation",
];
const PUBLIC_NETWORK: &str = "data-plane-public";

/// Generic base the overlay is applied to
pub const BASE_CLOUD_CONFIG: &str = "azs: []\nnetworks: []\nvm_types: []\ndisk_types: []\ncompilation: {}\n";
const COMPILATION_WORKERS: u32 = 5;

#[derive(Debug, Default, Clone, Copy)]
pub struct CloudConfigOverlayGenerator;

impl CloudConfigOverlayGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Overlay ops for the state's provider, rendered as YAML
    pub fn generate(&self, state: &State) -> Result<String> {
        let ops = self.ops(state)?;
        tracing::debug!("Generated {} cloud-config ops", ops.len());
        Ok(serde_yaml::to_string(&ops)?)
    }

    /// Values for the overlay's variables, read from the recorded
    /// infrastructure outputs and rendered as YAML
    pub fn generate_vars(&self, state: &State) -> Result<String> {
        let iaas = state.iaas.ok_or(CloudConfigError::MissingIaas)?;
        let outputs = outputs_from_state(&state.tf_state)?;
        let vars = providers::vars(state, iaas, &outputs)?;
        Ok(serde_yaml::to_string(&vars)?)
    }

    pub fn ops(&self, state: &State) -> Result<Vec<Op>> {
        let iaas = state.iaas.ok_or(CloudConfigError::MissingIaas)?;
        let mut ops = Vec::new();

        for zone in ZONES {
            ops.push(Op::replace(
                format!("/azs/name={}?", zone),
                json!({
                    "name": zone,
                    "cloud_properties": providers::az_cloud_properties(state, iaas, zone),
                }),
            ));
        }

        let mut networks: Vec<&str> = NETWORKS.to_vec();
        if state.lb.lb_type != LbType::None {
            networks.push(PUBLIC_NETWORK);
        }
        for network in networks {
            ops.push(Op::remove(format!("/networks/name={}?", network)));
            ops.push(Op::append("/networks", network_stanza(iaas, network)));
        }

        for vm_type in VM_TYPES {
            ops.push(Op::replace(
                format!("/vm_types/name={}?", vm_type),
                json!({
                    "name": vm_type,
                    "cloud_properties": providers::vm_type_cloud_properties(iaas, vm_type),
                }),
            ));
        }

        for (name, size) in DISK_TYPES {
            ops.push(Op::replace(
                format!("/disk_types/name={}?", name),
                json!({
                    "name": name,
                    "disk_size": size,
                    "cloud_properties": providers::disk_type_cloud_properties(iaas),
                }),
            ));
        }

        ops.push(Op::replace(
            "/compilation",
            json!({
                "workers": COMPILATION_WORKERS,
                "az": ZONES[0],
                "reuse_compilation_vms": true,
                "vm_type": "large",
                "network": "compilation",
            }),
        ));

        Ok(ops)
    }
}

fn network_stanza(iaas: Iaas, network: &str) -> Value {
    let subnets: Vec<Value> = if providers::subnet_per_zone(iaas) {
        ZONES
            .iter()
            .map(|zone| subnet(iaas, zone, json!([zone])))
            .collect()
    } else {
        vec![subnet(iaas, ZONES[0], json!(ZONES))]
    };

    json!({
        "name": network,
        "type": "manual",
        "subnets": subnets,
    })
}

fn subnet(iaas: Iaas, zone: &str, azs: Value) -> Value {
    json!({
        "range": var(&format!("{}.cidr", zone)),
        "gateway": var(&format!("{}.gateway", zone)),
        "azs": azs,
        "reserved": [var(&format!("{}.reserved_1", zone))],
        "static": [var(&format!("{}.static", zone))],
        "cloud_properties": providers::subnet_cloud_properties(iaas, zone),
    })
}
