use super::{Inputs, put};
use bbl_core::State;

pub(super) fn project(state: &State, zones: Vec<String>, inputs: &mut Inputs) {
    let c = &state.aws;
    put(inputs, "access_key", c.access_key_id.as_str());
    put(inputs, "secret_key", c.secret_access_key.as_str());
    put(inputs, "availability_zones", zones);
    put(inputs, "bosh_inbound_cidr", "0.0.0.0/0");
}
