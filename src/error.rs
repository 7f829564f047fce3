use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wire-level failure taxonomy returned to callers in the `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    MissingImage,
    MissingCredential,
    ProviderRejected,
    EmptyResult,
    Timeout,
    NetworkFailure,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::MissingImage => "missing_image",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RedesignError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing image: {0}")]
    MissingImage(String),
    #[error("Missing credential: {0}")]
    MissingCredential(String),
    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),
    #[error("Empty result: {0}")]
    EmptyResult(String),
    #[error("Provider request timed out: {0}")]
    Timeout(String),
    #[error("Network failure: {0}")]
    NetworkFailure(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RedesignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedesignError::InvalidInput(_) => ErrorKind::InvalidInput,
            RedesignError::MissingImage(_) => ErrorKind::MissingImage,
            RedesignError::MissingCredential(_) => ErrorKind::MissingCredential,
            RedesignError::ProviderRejected(_) => ErrorKind::ProviderRejected,
            RedesignError::EmptyResult(_) => ErrorKind::EmptyResult,
            RedesignError::Timeout(_) => ErrorKind::Timeout,
            RedesignError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            RedesignError::ConfigError(_)
            | RedesignError::Io(_)
            | RedesignError::InternalError(_) => ErrorKind::Unexpected,
        }
    }

    /// Diagnostic text without the variant prefix.
    pub fn details(&self) -> String {
        match self {
            RedesignError::ConfigError(msg)
            | RedesignError::InvalidInput(msg)
            | RedesignError::MissingImage(msg)
            | RedesignError::MissingCredential(msg)
            | RedesignError::ProviderRejected(msg)
            | RedesignError::EmptyResult(msg)
            | RedesignError::Timeout(msg)
            | RedesignError::NetworkFailure(msg)
            | RedesignError::InternalError(msg) => msg.clone(),
            RedesignError::Io(e) => e.to_string(),
        }
    }
}

impl From<reqwest::Error> for RedesignError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RedesignError::Timeout(e.to_string())
        } else if e.is_builder() {
            RedesignError::InternalError(e.to_string())
        } else {
            RedesignError::NetworkFailure(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, RedesignError>;
