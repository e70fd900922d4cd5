//! Infrastructure engine error types

use bbl_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerraformError {
    #[error("{binary} not found in PATH; set BBL_TERRAFORM_BINARY to its location")]
    BinaryNotFound { binary: String },

    #[error("terraform {command} failed:\n{output}")]
    CommandFailed { command: String, output: String },

    #[error("no terraform templates found in {0}")]
    MissingTemplates(String),

    #[error("iaas is not set")]
    MissingIaas,

    #[error("terraform state is not valid JSON: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TerraformError>;
