use super::{Inputs, put};
use bbl_core::State;

pub(super) fn project(state: &State, zones: Vec<String>, inputs: &mut Inputs) {
    let c = &state.gcp;
    let zone = if c.zone.is_empty() {
        zones.first().cloned().unwrap_or_default()
    } else {
        c.zone.clone()
    };

    put(inputs, "project_id", c.project_id.as_str());
    put(inputs, "zone", zone);
    put(inputs, "zones", zones);
    put(inputs, "credentials", c.service_account_key_path.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::InputValue;

    #[test]
    fn test_zone_falls_back_to_first_zone() {
        let mut state = State::default();
        state.gcp.project_id = "p".to_string();
        state.gcp.service_account_key_path = "/state/.bbl/gcp-service-account-key.json".to_string();
        let zones = vec!["us-east1-b".to_string(), "us-east1-c".to_string()];

        let mut inputs = Inputs::new();
        project(&state, zones, &mut inputs);
        assert_eq!(inputs["zone"], InputValue::from("us-east1-b"));
        assert_eq!(
            inputs["credentials"],
            InputValue::from("/state/.bbl/gcp-service-account-key.json")
        );
        assert_eq!(
            inputs["zones"],
            InputValue::List(vec!["us-east1-b".to_string(), "us-east1-c".to_string()])
        );
    }
}
