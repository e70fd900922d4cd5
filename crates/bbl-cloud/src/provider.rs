//! Collaborator traits

use crate::director::DirectorInfo;
use crate::error::Result;
use async_trait::async_trait;
use bbl_core::State;

/// Availability zones of the state's region
#[async_trait]
pub trait AvailabilityZoneRetriever: Send + Sync {
    async fn retrieve(&self, state: &State) -> Result<Vec<String>>;
}

/// Provider-specific DNS zone identifier for a load balancer domain
#[async_trait]
pub trait DnsZoneLookup: Send + Sync {
    async fn zone(&self, state: &State, domain: &str) -> Result<String>;
}

/// Whether the infrastructure recorded in a state is still present
#[async_trait]
pub trait InfrastructureChecker: Send + Sync {
    async fn exists(&self, state: &State) -> Result<bool>;
}

#[async_trait]
pub trait DirectorClient: Send + Sync {
    /// Idempotent info call
    async fn info(&self) -> Result<DirectorInfo>;
}

/// Builds clients for the director recorded in a state, routing through the
/// jumpbox when one is configured
pub trait DirectorClientFactory: Send + Sync {
    fn client(&self, state: &State) -> Result<Box<dyn DirectorClient>>;
}
