use super::{Inputs, put};
use bbl_core::State;

pub(super) fn project(state: &State, inputs: &mut Inputs) {
    let c = &state.vsphere;
    put(inputs, "vcenter_user", c.vcenter_user.as_str());
    put(inputs, "vcenter_password", c.vcenter_password.as_str());
    put(inputs, "vcenter_ip", c.vcenter_ip.as_str());
    put(inputs, "vcenter_dc", c.vcenter_dc.as_str());
    put(inputs, "vcenter_cluster", c.vcenter_cluster.as_str());
    put(inputs, "vcenter_rp", c.vcenter_rp.as_str());
    put(inputs, "network", c.network.as_str());
    put(inputs, "vcenter_ds", c.vcenter_ds.as_str());
    put(inputs, "subnet_cidr", c.subnet_cidr.as_str());
    put(
        inputs,
        "vcenter_templates",
        or_default(&c.vcenter_templates, &state.env_id, "templates"),
    );
    put(
        inputs,
        "vcenter_vms",
        or_default(&c.vcenter_vms, &state.env_id, "vms"),
    );
    put(
        inputs,
        "vcenter_disks",
        or_default(&c.vcenter_disks, &state.env_id, "disks"),
    );
}

/// Folder names default to `<env-id>_<kind>`
fn or_default(value: &str, env_id: &str, kind: &str) -> String {
    if value.is_empty() {
        format!("{}_{}", env_id, kind)
    } else {
        value.to_string()
    }
}
