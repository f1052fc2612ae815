// src/error.rs
//! Error types for the synchronization engine.
//!
//! The variants mirror where a failure is detected: before dispatch
//! (configuration, validation), at the transport boundary, or after a
//! concurrent batch has finished with unresolved provider faults.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A well-formed error payload returned by a provider API.
///
/// Faults are data, not exceptions: they are retried by the executor and,
/// once retries are exhausted, either returned to the caller alongside the
/// canonical response or wrapped into [`SyncError::Aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFault {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
    /// The error content exactly as the transport reported it.
    pub raw: Value,
}

impl ProviderFault {
    /// Reads a fault from the `{Code, Message, RequestId}` object carried
    /// under the error marker. Missing members fall back to `Unknown`.
    pub fn from_marker(content: &Value) -> Self {
        let text = |key: &str| content.get(key).map(value_to_text);
        Self {
            code: text("Code").unwrap_or_else(|| "Unknown".to_string()),
            message: text("Message").unwrap_or_else(|| "Unknown".to_string()),
            request_id: text("RequestId"),
            raw: content.clone(),
        }
    }

    /// Timeouts and throttling responses are the usual transient faults.
    pub fn is_throttling(&self) -> bool {
        let code = self.code.to_ascii_lowercase();
        code.contains("throttl") || code.contains("limitexceeded") || code.contains("timeout")
    }
}

impl fmt::Display for ProviderFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(id) = &self.request_id {
            write!(f, " (request {})", id)?;
        }
        Ok(())
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Failure raised by a native transport before a provider payload exists.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP transport error for {action}: {source}")]
    Http {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Response from {action} is not JSON: {preview}")]
    UndecodableBody { action: String, preview: String },

    #[error("{0}")]
    Other(String),
}

/// Main error type of the crate.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    RequestValidation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{} leaf request(s) failed after retries: {}", faults.len(), summarize(faults))]
    Aggregate { faults: Vec<ProviderFault> },

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Failed to parse configuration {path}: {source}")]
    ConfigParse {
        path: std::path::PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::RequestValidation(message.into())
    }

    /// Returns the collected faults when this is an aggregate failure.
    pub fn faults(&self) -> &[ProviderFault] {
        match self {
            Self::Aggregate { faults } => faults,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Malformed(err.to_string())
    }
}

fn summarize(faults: &[ProviderFault]) -> String {
    faults
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for convenience
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fault_reads_marker_members() {
        let fault = ProviderFault::from_marker(&json!({
            "Code": "Throttling.User",
            "Message": "Request was denied due to user flow control.",
            "RequestId": "5E5A-11"
        }));
        assert_eq!(fault.code, "Throttling.User");
        assert_eq!(fault.request_id.as_deref(), Some("5E5A-11"));
        assert!(fault.is_throttling());
        assert_eq!(
            fault.to_string(),
            "Throttling.User: Request was denied due to user flow control. (request 5E5A-11)"
        );
    }

    #[test]
    fn fault_defaults_missing_members() {
        let fault = ProviderFault::from_marker(&json!({ "Code": 502 }));
        assert_eq!(fault.code, "502");
        assert_eq!(fault.message, "Unknown");
        assert!(fault.request_id.is_none());
    }

    #[test]
    fn aggregate_lists_every_fault() {
        let err = SyncError::Aggregate {
            faults: vec![
                ProviderFault::from_marker(&json!({"Code": "A", "Message": "first"})),
                ProviderFault::from_marker(&json!({"Code": "B", "Message": "second"})),
            ],
        };
        assert_eq!(
            err.to_string(),
            "2 leaf request(s) failed after retries: A: first, B: second"
        );
        assert_eq!(err.faults().len(), 2);
    }
}
