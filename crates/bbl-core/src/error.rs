//! Core error types

use crate::iaas::Iaas;
use crate::validate::RequiredFlag;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, saving, migrating or validating state
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Permission denied accessing state at {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("State file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("{}", io_message(path, source))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Unknown state version {found}; this bbl understands versions up to {supported}. Upgrade bbl to use this state directory."
    )]
    UnknownVersion { found: u32, supported: u32 },

    #[error(
        "--iaas [{}] must be provided or BBL_IAAS must be set",
        Iaas::ALL.iter().map(|i| i.as_str()).collect::<Vec<_>>().join(", ")
    )]
    MissingIaas,

    #[error("Missing required flags for {iaas}:\n{}", format_flags(.flags))]
    MissingFlags { iaas: Iaas, flags: Vec<RequiredFlag> },

    #[error("State integrity error: {message}\nHint: {hint}")]
    Integrity { message: String, hint: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Classify an IO failure on `path`, keeping permission problems distinct
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            CoreError::PermissionDenied { path }
        } else {
            CoreError::Io { path, source }
        }
    }
}

fn io_message(path: &std::path::Path, source: &std::io::Error) -> String {
    if path.as_os_str().is_empty() {
        source.to_string()
    } else {
        format!("IO error at {}: {}", path.display(), source)
    }
}

fn format_flags(flags: &[RequiredFlag]) -> String {
    flags
        .iter()
        .map(|f| format!("  {}", f))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, CoreError>;
