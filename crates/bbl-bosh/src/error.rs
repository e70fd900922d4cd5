//! Deployment engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoshError {
    #[error("{binary} not found in PATH; set BBL_BOSH_BINARY to its location")]
    BinaryNotFound { binary: String },

    #[error("bosh {command} failed:\n{output}")]
    CommandFailed { command: String, output: String },

    #[error("manifest not found: {0}")]
    MissingManifest(String),

    #[error("the director address is not recorded")]
    MissingDirector,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BoshError>;
