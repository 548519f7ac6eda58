use std::time::Duration;

use thiserror::Error;

/// Failure to reach the authorization service or to make sense of its answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },
}

/// Why a token request did not yield a token.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthFailure {
    #[error("authorization denied: {reason}")]
    Denied { reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("A demo run is already in progress")]
    RunInProgress,

    #[error("Agent '{actor}' has no {origin} token to spend")]
    MissingToken {
        actor: String,
        origin: &'static str,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Demo task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
