//! Configuration error types

use bbl_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "The {name} cannot be changed for an existing environment. The current {name} is {current}."
    )]
    ImmutableField { name: &'static str, current: String },

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("{0}")]
    InvalidFlags(String),

    #[error("Failed to download remote state: {0}")]
    RemoteState(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immutable_iaas_message() {
        let err = ConfigError::ImmutableField {
            name: "iaas type",
            current: "aws".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The iaas type cannot be changed for an existing environment. The current iaas type is aws."
        );
    }
}
