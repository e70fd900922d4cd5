use super::{Inputs, put};
use bbl_core::State;

pub(super) fn project(state: &State, inputs: &mut Inputs) {
    let c = &state.openstack;
    put(inputs, "internal_cidr", c.internal_cidr.as_str());
    put(inputs, "external_ip", c.external_ip.as_str());
    put(inputs, "auth_url", c.auth_url.as_str());
    put(inputs, "az", c.az.as_str());
    put(inputs, "default_key_name", c.default_key_name.as_str());
    put(
        inputs,
        "default_security_group",
        c.default_security_group.as_str(),
    );
    put(inputs, "network_id", c.network_id.as_str());
    put(inputs, "network_name", c.network_name.as_str());
    put(inputs, "password", c.password.as_str());
    put(inputs, "username", c.username.as_str());
    put(inputs, "project", c.project.as_str());
    put(inputs, "domain", c.domain.as_str());
    put(inputs, "private_key", c.private_key_path.as_str());
}
