//! Cloud-config generation error types

use bbl_terraform::TerraformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudConfigError {
    #[error("missing infrastructure output {0:?}")]
    MissingOutput(String),

    #[error("invalid CIDR {0:?}")]
    InvalidCidr(String),

    #[error("iaas is not set")]
    MissingIaas,

    #[error(transparent)]
    Outputs(#[from] TerraformError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CloudConfigError>;
