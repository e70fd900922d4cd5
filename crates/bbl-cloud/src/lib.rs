//! bbl cloud collaborators
//!
//! The pieces of bbl that would talk to a cloud or a director are expressed
//! as async traits so the orchestration never depends on a provider SDK:
//!
//! - [`AvailabilityZoneRetriever`]: zones for a region
//! - [`DnsZoneLookup`]: provider DNS zone identifier for an LB domain
//! - [`InfrastructureChecker`]: whether the recorded infrastructure still exists
//! - [`DirectorClientFactory`]: clients for the recorded director
//!
//! [`EnvironmentValidator`] combines the last two into the pre-flight check run
//! before commands that act on an existing environment.

pub mod director;
pub mod environment;
pub mod error;
pub mod infrastructure;
pub mod provider;
pub mod zones;

pub use director::{
    DirectorInfo, HttpDirectorClient, HttpDirectorClientFactory, KeySource, Route, SshTunnel,
};
pub use environment::EnvironmentValidator;
pub use error::{CloudError, Result};
pub use infrastructure::RecordedInfrastructureChecker;
pub use provider::{
    AvailabilityZoneRetriever, DirectorClient, DirectorClientFactory, DnsZoneLookup,
    InfrastructureChecker,
};
pub use zones::{ConventionalZoneRetriever, DomainZoneLookup};
