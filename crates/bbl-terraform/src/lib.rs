//! bbl infrastructure engine integration
//!
//! - [`ProviderInputProjector`] turns a merged state into the flat name→value
//!   map the engine consumes
//! - [`Outputs`] reads engine outputs, straight from a recorded state when no
//!   binary is available
//! - [`TerraformCli`] drives the `terraform` binary behind the
//!   [`InfrastructureEngine`] trait

pub mod cli;
pub mod error;
pub mod inputs;
pub mod outputs;

pub use cli::{EngineRun, InfrastructureEngine, TerraformCli, TFVARS_FILE, write_tfvars};
pub use error::{Result, TerraformError};
pub use inputs::{InputValue, Inputs, ProviderInputProjector};
pub use outputs::{Outputs, outputs_from_state};
