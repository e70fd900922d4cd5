//! Cloud collaborator error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error(
        "a bbl environment could not be found, please create a new environment before running this command again"
    )]
    BblNotFound,

    #[error("Could not connect to the director: {0}")]
    DirectorNotReachable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
