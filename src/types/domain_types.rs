// src/types/domain_types.rs
//! Domain-specific newtypes for type safety and validation.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

/// Request parameters handed to a native transport, keyed by the provider's
/// own parameter names.
pub type Params = serde_json::Map<String, Value>;

/// Validated URL type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

// Manual Serialize/Deserialize implementation for Url
impl Serialize for ValidatedUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidatedUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ValidatedUrl::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl ValidatedUrl {
    /// Create a new validated URL
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        match Url::parse(url) {
            Ok(parsed_url) => {
                if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
                    return Err(ValidationError::InvalidUrl {
                        url: url.to_string(),
                        reason: "Only HTTP and HTTPS URLs are supported".to_string(),
                    });
                }
                Ok(Self(parsed_url))
            }
            Err(e) => Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a `KEY=VALUE` command-line parameter.
///
/// The value is read as JSON when it parses as JSON (`Limit=10`,
/// `InstanceIds=["i-1"]`), otherwise it is kept as a plain string.
pub fn parse_param(input: &str) -> Result<(String, Value), ValidationError> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| ValidationError::InvalidParameter {
            input: input.to_string(),
        })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::InvalidParameter {
            input: input.to_string(),
        });
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
