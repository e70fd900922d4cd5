use super::{Inputs, put};
use bbl_core::{State, simple_env_id};

pub(super) fn project(state: &State, inputs: &mut Inputs) {
    let c = &state.azure;
    put(inputs, "simple_env_id", simple_env_id(&state.env_id));
    put(inputs, "subscription_id", c.subscription_id.as_str());
    put(inputs, "tenant_id", c.tenant_id.as_str());
    put(inputs, "client_id", c.client_id.as_str());
    put(inputs, "client_secret", c.client_secret.as_str());
}
