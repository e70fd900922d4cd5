use super::{Inputs, put};
use bbl_core::State;

pub(super) fn project(state: &State, inputs: &mut Inputs) {
    let c = &state.cloudstack;
    put(inputs, "endpoint", c.endpoint.as_str());
    put(inputs, "api_key", c.api_key.as_str());
    put(inputs, "secret_access_key", c.secret_access_key.as_str());
    put(inputs, "zone", c.zone.as_str());
    put(inputs, "network_vpc_offering", c.network_vpc_offering.as_str());
    put(inputs, "compute_offering", c.compute_offering.as_str());
    put(inputs, "iso_segment", c.iso_segment);
}
