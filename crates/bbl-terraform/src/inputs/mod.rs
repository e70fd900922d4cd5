//! Infrastructure engine inputs
//!
//! Every provider gets `env_id`, `short_env_id` and `region`; the provider
//! modules add their own names, and load balancer settings are layered on top
//! when the state asks for one.

mod aws;
mod azure;
mod cloudstack;
mod gcp;
mod openstack;
mod vsphere;

use crate::error::{Result, TerraformError};
use bbl_cloud::{AvailabilityZoneRetriever, DnsZoneLookup};
use bbl_core::{Iaas, LbType, State, short_env_id};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single engine input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InputValue {
    String(String),
    List(Vec<String>),
    Bool(bool),
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::String(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::String(value)
    }
}

impl From<Vec<String>> for InputValue {
    fn from(value: Vec<String>) -> Self {
        InputValue::List(value)
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Bool(value)
    }
}

/// Inputs keyed by name; ordered so the rendered variables file is stable
pub type Inputs = BTreeMap<String, InputValue>;

pub(crate) fn put(inputs: &mut Inputs, name: &str, value: impl Into<InputValue>) {
    inputs.insert(name.to_string(), value.into());
}

pub struct ProviderInputProjector {
    zones: Arc<dyn AvailabilityZoneRetriever>,
    dns: Arc<dyn DnsZoneLookup>,
}

impl ProviderInputProjector {
    pub fn new(zones: Arc<dyn AvailabilityZoneRetriever>, dns: Arc<dyn DnsZoneLookup>) -> Self {
        Self { zones, dns }
    }

    /// Record the retrieved GCP zones in `state` when none are set, so later
    /// steps such as the cloud-config overlay see the same zones
    pub async fn record_zones(&self, state: &mut State) -> Result<()> {
        if state.iaas != Some(Iaas::Gcp) || !state.gcp.zones.is_empty() {
            return Ok(());
        }
        let zones = self.zones.retrieve(state).await?;
        if state.gcp.zone.is_empty() {
            state.gcp.zone = zones.first().cloned().unwrap_or_default();
        }
        state.gcp.zones = zones;
        Ok(())
    }

    /// Project `state` into engine inputs. Collaborator calls run one after
    /// the other.
    #[tracing::instrument(skip_all, fields(iaas = ?state.iaas))]
    pub async fn generate(&self, state: &State) -> Result<Inputs> {
        let iaas = state.iaas.ok_or(TerraformError::MissingIaas)?;

        let mut inputs = Inputs::new();
        put(&mut inputs, "env_id", state.env_id.as_str());
        put(&mut inputs, "short_env_id", short_env_id(&state.env_id));
        put(&mut inputs, "region", state.region());

        match iaas {
            Iaas::Aws => {
                let zones = self.zones.retrieve(state).await?;
                aws::project(state, zones, &mut inputs);
            }
            Iaas::Gcp => {
                let zones = if state.gcp.zones.is_empty() {
                    self.zones.retrieve(state).await?
                } else {
                    state.gcp.zones.clone()
                };
                gcp::project(state, zones, &mut inputs);
            }
            Iaas::Azure => azure::project(state, &mut inputs),
            Iaas::Vsphere => vsphere::project(state, &mut inputs),
            Iaas::Openstack => openstack::project(state, &mut inputs),
            Iaas::Cloudstack => cloudstack::project(state, &mut inputs),
        }

        self.project_lb(state, &mut inputs).await?;

        tracing::debug!(count = inputs.len(), "Generated engine inputs");
        Ok(inputs)
    }

    async fn project_lb(&self, state: &State, inputs: &mut Inputs) -> Result<()> {
        let lb = &state.lb;
        if lb.lb_type == LbType::None {
            return Ok(());
        }

        put(inputs, "ssl_certificate", lb.cert.as_str());
        put(inputs, "ssl_certificate_private_key", lb.key.as_str());
        if !lb.chain.is_empty() {
            put(inputs, "ssl_certificate_chain", lb.chain.as_str());
        }
        put(
            inputs,
            "ssl_certificate_name_prefix",
            format!("{}-{}", short_env_id(&state.env_id), lb.lb_type),
        );

        if !lb.domain.is_empty() {
            put(inputs, "system_domain", lb.domain.as_str());
            let zone = self.dns.zone(state, &lb.domain).await?;
            put(inputs, "parent_zone", zone);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbl_cloud::{ConventionalZoneRetriever, DomainZoneLookup};

    fn projector() -> ProviderInputProjector {
        ProviderInputProjector::new(Arc::new(ConventionalZoneRetriever), Arc::new(DomainZoneLookup))
    }

    fn string(inputs: &Inputs, name: &str) -> String {
        match inputs.get(name) {
            Some(InputValue::String(value)) => value.clone(),
            other => panic!("{name} is not a string input: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aws_inputs() {
        let mut state = State {
            iaas: Some(Iaas::Aws),
            env_id: "env1".to_string(),
            ..Default::default()
        };
        state.aws.access_key_id = "k".to_string();
        state.aws.secret_access_key = "s".to_string();
        state.aws.region = "r".to_string();

        let inputs = projector().generate(&state).await.unwrap();
        assert_eq!(string(&inputs, "env_id"), "env1");
        assert_eq!(string(&inputs, "short_env_id"), "env1");
        assert_eq!(string(&inputs, "region"), "r");
        assert_eq!(string(&inputs, "access_key"), "k");
        assert_eq!(string(&inputs, "secret_key"), "s");
        assert_eq!(
            inputs.get("availability_zones"),
            Some(&InputValue::List(vec![
                "ra".to_string(),
                "rb".to_string(),
                "rc".to_string()
            ]))
        );
        assert!(!inputs.contains_key("ssl_certificate"));
    }

    #[tokio::test]
    async fn test_gcp_zones_are_retrieved_when_unset() {
        let mut state = State {
            iaas: Some(Iaas::Gcp),
            env_id: "env1".to_string(),
            ..Default::default()
        };
        state.gcp.region = "us-east1".to_string();
        state.gcp.project_id = "p".to_string();

        let inputs = projector().generate(&state).await.unwrap();
        assert_eq!(string(&inputs, "zone"), "us-east1-b");
        assert_eq!(
            inputs.get("zones"),
            Some(&InputValue::List(vec![
                "us-east1-b".to_string(),
                "us-east1-c".to_string(),
                "us-east1-d".to_string()
            ]))
        );
    }

    #[tokio::test]
    async fn test_record_zones_fills_gcp_state_once() {
        let mut state = State {
            iaas: Some(Iaas::Gcp),
            ..Default::default()
        };
        state.gcp.region = "us-east1".to_string();

        projector().record_zones(&mut state).await.unwrap();
        assert_eq!(state.gcp.zone, "us-east1-b");
        assert_eq!(state.gcp.zones.len(), 3);

        state.gcp.zones = vec!["us-east1-c".to_string()];
        projector().record_zones(&mut state).await.unwrap();
        assert_eq!(state.gcp.zones, vec!["us-east1-c".to_string()]);
    }

    #[tokio::test]
    async fn test_long_env_id_is_shortened() {
        let mut state = State {
            iaas: Some(Iaas::Azure),
            env_id: "some-env-id-that-is-pretty-long".to_string(),
            ..Default::default()
        };
        state.azure.region = "westus".to_string();
        let inputs = projector().generate(&state).await.unwrap();
        let short = string(&inputs, "short_env_id");
        assert!(short.len() <= 18);
        assert!(short.starts_with("some-env-i-"));
        assert_eq!(string(&inputs, "simple_env_id"), "someenvidthatisprett");
    }

    #[tokio::test]
    async fn test_cf_lb_with_domain() {
        let mut state = State {
            iaas: Some(Iaas::Gcp),
            env_id: "env1".to_string(),
            ..Default::default()
        };
        state.gcp.region = "us-east1".to_string();
        state.lb.lb_type = LbType::Cf;
        state.lb.cert = "CERT".to_string();
        state.lb.key = "KEY".to_string();
        state.lb.domain = "cf.example.com".to_string();

        let inputs = projector().generate(&state).await.unwrap();
        assert_eq!(string(&inputs, "ssl_certificate"), "CERT");
        assert_eq!(string(&inputs, "ssl_certificate_private_key"), "KEY");
        assert_eq!(string(&inputs, "ssl_certificate_name_prefix"), "env1-cf");
        assert_eq!(string(&inputs, "system_domain"), "cf.example.com");
        assert_eq!(string(&inputs, "parent_zone"), "cf-example-com");
        assert!(!inputs.contains_key("ssl_certificate_chain"));
    }

    #[tokio::test]
    async fn test_concourse_lb_without_domain() {
        let mut state = State {
            iaas: Some(Iaas::Aws),
            env_id: "env1".to_string(),
            ..Default::default()
        };
        state.aws.region = "r".to_string();
        state.lb.lb_type = LbType::Concourse;
        state.lb.cert = "CERT".to_string();
        state.lb.key = "KEY".to_string();
        state.lb.chain = "CHAIN".to_string();

        let inputs = projector().generate(&state).await.unwrap();
        assert_eq!(string(&inputs, "ssl_certificate_chain"), "CHAIN");
        assert!(!inputs.contains_key("system_domain"));
    }

    #[tokio::test]
    async fn test_missing_iaas() {
        let err = projector().generate(&State::default()).await.unwrap_err();
        assert!(matches!(err, TerraformError::MissingIaas));
    }

    #[test]
    fn test_inputs_render_as_flat_json() {
        let mut inputs = Inputs::new();
        put(&mut inputs, "env_id", "env1");
        put(&mut inputs, "zones", vec!["z1".to_string()]);
        put(&mut inputs, "iso_segment", true);
        assert_eq!(
            serde_json::to_string(&inputs).unwrap(),
            r#"{"env_id":"env1","iso_segment":true,"zones":["z1"]}"#
        );
    }
}
