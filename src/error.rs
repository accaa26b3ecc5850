//! Caller-facing error taxonomy
//!
//! Every operation on the quiz pipeline and the assignment/scoring services
//! returns `Result<_, ServiceError>`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::llm_engine::provider::LlmError;

/// Error surface of the caller-facing operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServiceError {
    /// Malformed or missing input (empty segment window, bad answer letter, ...)
    Validation(String),
    /// Course, topic, quiz or question does not exist
    NotFound(String),
    /// Oracle unreachable or returned a non-success response
    RemoteService(String),
    /// Oracle output could not be extracted or parsed; keeps the raw text
    Parse { message: String, raw: String },
    /// Constraint violation or other storage failure
    Persistence(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServiceError::RemoteService(msg) => write!(f, "Remote service error: {}", msg),
            ServiceError::Parse { message, .. } => write!(f, "Parse error: {}", message),
            ServiceError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        ServiceError::Parse {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// The raw oracle text attached to a parse failure, if any
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            ServiceError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

impl From<LlmError> for ServiceError {
    fn from(err: LlmError) -> Self {
        ServiceError::RemoteService(err.to_string())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Persistence(format!("{:#}", err))
    }
}
