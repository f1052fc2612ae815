use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid {kind} identifier '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid parameter '{input}': expected KEY=VALUE")]
    InvalidParameter { input: String },

    #[error("Unknown region mode '{0}': expected single, all or massive")]
    UnknownRegionMode(String),
}
