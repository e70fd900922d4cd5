//! Provider-native cloud properties and the outputs each provider needs

use crate::cidr::Subnet;
use crate::error::{CloudConfigError, Result};
use crate::ops::var;
use bbl_core::{Iaas, State};
use bbl_terraform::Outputs;
use serde_json::{Map, Value, json};

pub const ZONES: [&str; 3] = ["z1", "z2", "z3"];

pub const VM_TYPES: [&str; 6] = [
    "minimal",
    "small",
    "medium",
    "large",
    "small-highmem",
    "sharedcpu",
];

/// Disk type names and sizes in MiB
pub const DISK_TYPES: [(&str, u64); 7] = [
    ("1GB", 1024),
    ("5GB", 5120),
    ("10GB", 10240),
    ("50GB", 51200),
    ("100GB", 102400),
    ("500GB", 512000),
    ("1TB", 1048576),
];

/// Providers that create one subnet per zone; the rest share one subnet
/// across all zones
pub fn subnet_per_zone(iaas: Iaas) -> bool {
    iaas == Iaas::Aws
}

pub fn az_cloud_properties(state: &State, iaas: Iaas, zone: &str) -> Value {
    let az = var(&format!("{}.az", zone));
    match iaas {
        Iaas::Aws | Iaas::Openstack => json!({ "availability_zone": az }),
        Iaas::Gcp => json!({ "zone": az }),
        Iaas::Vsphere => {
            let c = &state.vsphere;
            let mut cluster = Map::new();
            cluster.insert(
                c.vcenter_cluster.clone(),
                json!({ "resource_pool": c.vcenter_rp }),
            );
            json!({
                "datacenters": [{
                    "name": c.vcenter_dc,
                    "clusters": [cluster],
                }]
            })
        }
        Iaas::Azure | Iaas::Cloudstack => json!({}),
    }
}

pub fn subnet_cloud_properties(iaas: Iaas, zone: &str) -> Value {
    match iaas {
        Iaas::Aws => json!({
            "subnet": var(&format!("{}.subnet", zone)),
            "security_groups": [var("internal_security_group")],
        }),
        Iaas::Gcp => json!({
            "network_name": var("network_name"),
            "subnetwork_name": var("subnetwork_name"),
            "ephemeral_external_ip": false,
            "tags": [var("internal_tag_name")],
        }),
        Iaas::Azure => json!({
            "virtual_network_name": var("vnet_name"),
            "subnet_name": var("subnet_name"),
            "security_group": var("security_group"),
        }),
        Iaas::Vsphere | Iaas::Cloudstack => json!({ "name": var("network_name") }),
        Iaas::Openstack => json!({
            "net_id": var("net_id"),
            "security_groups": [var("security_group")],
        }),
    }
}

pub fn vm_type_cloud_properties(iaas: Iaas, vm_type: &str) -> Value {
    let index = VM_TYPES.iter().position(|t| *t == vm_type).unwrap_or(0);
    match iaas {
        Iaas::Aws => {
            const TYPES: [&str; 6] = [
                "t3.small",
                "m5.large",
                "m5.xlarge",
                "m5.2xlarge",
                "r5.xlarge",
                "t3.medium",
            ];
            json!({
                "instance_type": TYPES[index],
                "ephemeral_disk": { "size": 10240, "type": "gp2" },
            })
        }
        Iaas::Gcp => {
            const TYPES: [&str; 6] = [
                "n1-standard-1",
                "n1-standard-2",
                "n1-standard-4",
                "n1-standard-8",
                "n1-highmem-4",
                "e2-small",
            ];
            json!({
                "machine_type": TYPES[index],
                "root_disk_size_gb": 10,
                "root_disk_type": "pd-ssd",
            })
        }
        Iaas::Azure => {
            const TYPES: [&str; 6] = [
                "Standard_F1s",
                "Standard_F2s_v2",
                "Standard_F4s_v2",
                "Standard_F8s_v2",
                "Standard_E4s_v3",
                "Standard_B1ms",
            ];
            json!({
                "instance_type": TYPES[index],
                "ephemeral_disk": { "size": 10240 },
            })
        }
        Iaas::Vsphere => {
            const SIZES: [(u32, u32); 6] = [
                (1, 2048),
                (2, 4096),
                (4, 8192),
                (8, 16384),
                (4, 32768),
                (1, 1024),
            ];
            let (cpu, ram) = SIZES[index];
            json!({ "cpu": cpu, "ram": ram, "disk": 10240 })
        }
        Iaas::Openstack => {
            const TYPES: [&str; 6] = [
                "m1.small",
                "m1.medium",
                "m1.large",
                "m1.xlarge",
                "m1.large",
                "m1.tiny",
            ];
            json!({ "instance_type": TYPES[index] })
        }
        Iaas::Cloudstack => {
            const TYPES: [&str; 6] = [
                "shared.small",
                "shared.medium",
                "dedicated.large",
                "dedicated.xlarge",
                "dedicated.highmem",
                "shared.micro",
            ];
            json!({
                "compute_offering": TYPES[index],
                "root_disk_size": 10240,
            })
        }
    }
}

pub fn disk_type_cloud_properties(iaas: Iaas) -> Value {
    match iaas {
        Iaas::Aws => json!({ "type": "gp2" }),
        Iaas::Gcp => json!({ "type": "pd-ssd" }),
        Iaas::Azure => json!({ "storage_account_type": "Standard_LRS" }),
        Iaas::Vsphere => json!({ "type": "thin" }),
        Iaas::Openstack | Iaas::Cloudstack => json!({}),
    }
}

fn required(outputs: &Outputs, name: &str) -> Result<String> {
    outputs
        .string(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CloudConfigError::MissingOutput(name.to_string()))
}

fn required_list(outputs: &Outputs, name: &str, len: usize) -> Result<Vec<String>> {
    match outputs.list(name) {
        Some(list) if list.len() >= len => Ok(list),
        _ => Err(CloudConfigError::MissingOutput(name.to_string())),
    }
}

/// Output value, falling back to a value recorded in the state
fn output_or(outputs: &Outputs, name: &str, recorded: &str) -> Result<String> {
    match outputs.string(name).filter(|v| !v.is_empty()) {
        Some(value) => Ok(value),
        None if !recorded.is_empty() => Ok(recorded.to_string()),
        None => Err(CloudConfigError::MissingOutput(name.to_string())),
    }
}

fn subnet_vars(cidr: &str) -> Result<Map<String, Value>> {
    let subnet = Subnet::parse(cidr)?;
    let mut vars = Map::new();
    vars.insert("cidr".to_string(), json!(subnet.cidr()));
    vars.insert("gateway".to_string(), json!(subnet.gateway()));
    vars.insert("reserved_1".to_string(), json!(subnet.reserved()));
    vars.insert("static".to_string(), json!(subnet.static_range()));
    Ok(vars)
}

/// Variables referenced by the overlay, keyed `z1`..`z3` per zone plus
/// provider-wide names
pub fn vars(state: &State, iaas: Iaas, outputs: &Outputs) -> Result<Map<String, Value>> {
    let mut vars = Map::new();
    let mut zones: Vec<Map<String, Value>> = vec![Map::new(), Map::new(), Map::new()];

    match iaas {
        Iaas::Aws => {
            let cidrs = required_list(outputs, "subnet_cidrs", ZONES.len())?;
            let ids = required_list(outputs, "subnet_ids", ZONES.len())?;
            let azs = required_list(outputs, "availability_zones", ZONES.len())?;
            for (i, zone) in zones.iter_mut().enumerate() {
                *zone = subnet_vars(&cidrs[i])?;
                zone.insert("subnet".to_string(), json!(ids[i]));
                zone.insert("az".to_string(), json!(azs[i]));
            }
            vars.insert(
                "internal_security_group".to_string(),
                json!(required(outputs, "internal_security_group")?),
            );
        }
        Iaas::Gcp => {
            zones[0] = subnet_vars(&required(outputs, "internal_cidr")?)?;
            let names = gcp_zones(state)?;
            for (zone, name) in zones.iter_mut().zip(names) {
                zone.insert("az".to_string(), json!(name));
            }
            for name in ["network_name", "subnetwork_name", "internal_tag_name"] {
                vars.insert(name.to_string(), json!(required(outputs, name)?));
            }
        }
        Iaas::Azure => {
            zones[0] = subnet_vars(&required(outputs, "internal_cidr")?)?;
            for name in ["vnet_name", "subnet_name", "security_group"] {
                vars.insert(name.to_string(), json!(required(outputs, name)?));
            }
        }
        Iaas::Vsphere => {
            let c = &state.vsphere;
            zones[0] = subnet_vars(&output_or(outputs, "internal_cidr", &c.subnet_cidr)?)?;
            vars.insert(
                "network_name".to_string(),
                json!(output_or(outputs, "network_name", &c.network)?),
            );
        }
        Iaas::Openstack => {
            let c = &state.openstack;
            zones[0] = subnet_vars(&output_or(outputs, "internal_cidr", &c.internal_cidr)?)?;
            for zone in zones.iter_mut() {
                zone.insert("az".to_string(), json!(c.az));
            }
            vars.insert(
                "net_id".to_string(),
                json!(output_or(outputs, "net_id", &c.network_id)?),
            );
            vars.insert(
                "security_group".to_string(),
                json!(output_or(
                    outputs,
                    "security_group",
                    &c.default_security_group
                )?),
            );
        }
        Iaas::Cloudstack => {
            zones[0] = subnet_vars(&required(outputs, "internal_cidr")?)?;
            vars.insert(
                "network_name".to_string(),
                json!(required(outputs, "network_name")?),
            );
        }
    }

    for (name, zone) in ZONES.iter().zip(zones) {
        if !zone.is_empty() {
            vars.insert(name.to_string(), Value::Object(zone));
        }
    }
    Ok(vars)
}

/// Three zone names, repeating the last recorded one when fewer exist
fn gcp_zones(state: &State) -> Result<Vec<String>> {
    let mut names = state.gcp.zones.clone();
    if names.is_empty() && !state.gcp.zone.is_empty() {
        names.push(state.gcp.zone.clone());
    }
    let last = names
        .last()
        .cloned()
        .ok_or_else(|| CloudConfigError::MissingOutput("zones".to_string()))?;
    names.resize(ZONES.len(), last);
    names.truncate(ZONES.len());
    Ok(names)
}
