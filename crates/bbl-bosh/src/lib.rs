//! bbl bosh
//!
//! Wraps the `bosh` CLI, the engine that creates the jumpbox and director
//! VMs and uploads the cloud-config to a running director.

pub mod cli;
pub mod error;
pub mod vars_store;

pub use cli::{
    BoshCli, Deployment, DeploymentEngine, DeploymentInput, DeploymentRun, DirectorTarget,
    deployment_dir,
};
pub use error::{BoshError, Result};
pub use vars_store::{remove_variable, variable};
