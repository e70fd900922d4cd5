//! Pre-flight check that a recorded environment is still usable

use crate::error::{CloudError, Result};
use crate::provider::{DirectorClientFactory, InfrastructureChecker};
use bbl_core::State;
use std::sync::Arc;

pub struct EnvironmentValidator {
    infrastructure: Arc<dyn InfrastructureChecker>,
    directors: Arc<dyn DirectorClientFactory>,
}

impl EnvironmentValidator {
    pub fn new(
        infrastructure: Arc<dyn InfrastructureChecker>,
        directors: Arc<dyn DirectorClientFactory>,
    ) -> Self {
        Self {
            infrastructure,
            directors,
        }
    }

    #[tracing::instrument(skip_all, fields(env_id = %state.env_id))]
    pub async fn validate(&self, state: &State) -> Result<()> {
        if state.infrastructure_id().is_none() {
            return Err(CloudError::BblNotFound);
        }
        if !self.infrastructure.exists(state).await? {
            tracing::debug!("Recorded infrastructure is gone");
            return Err(CloudError::BblNotFound);
        }

        if state.no_director {
            return Ok(());
        }

        let client = self.directors.client(state)?;
        let info = client
            .info()
            .await
            .map_err(|e| CloudError::DirectorNotReachable(e.to_string()))?;
        tracing::debug!(director = %info.name, "Director reachable");
        Ok(())
    }
}
