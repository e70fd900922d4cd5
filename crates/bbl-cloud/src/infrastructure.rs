//! Infrastructure presence from the recorded state alone

use crate::error::Result;
use crate::provider::InfrastructureChecker;
use async_trait::async_trait;
use bbl_core::State;

/// Treats a terraform state listing at least one resource, or a recorded stack
/// name, as present infrastructure
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedInfrastructureChecker;

#[async_trait]
impl InfrastructureChecker for RecordedInfrastructureChecker {
    async fn exists(&self, state: &State) -> Result<bool> {
        if !state.stack.name.is_empty() {
            return Ok(true);
        }
        if state.tf_state.trim().is_empty() {
            return Ok(false);
        }

        let tf_state: serde_json::Value = serde_json::from_str(&state.tf_state)?;
        let resources = tf_state
            .get("resources")
            .and_then(|r| r.as_array())
            .map_or(0, |r| r.len());
        tracing::debug!(resources, "Inspected recorded terraform state");
        Ok(resources > 0)
    }
}
