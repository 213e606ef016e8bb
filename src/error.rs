//! Error handling and custom error types
//!
//! Provides unified error handling across the proxy and the client using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Caller input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Non-success status from the next hop (provider or proxy).
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Anything else that went wrong while forwarding, e.g. a malformed upstream body.
    #[error("{0}")]
    Internal(String),

    #[error("A generation request is already in flight")]
    RequestInFlight,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Status code the proxy answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Upstream status code, if the error carries one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
