// src/transport/mod.rs
//! Native transport: the one place a provider API is actually called.
//!
//! Business logic depends on [`NativeTransport`], never on HTTP details.
//! Provider errors come back as data (a [`RawPayload`] carrying the
//! `Error` marker) so the executor can retry them; only failures that
//! leave no payload at all are [`TransportError`]s.

mod http;

pub use http::{Dialect, HttpTransport};

use crate::catalog::InterfaceConfig;
use crate::constants::ERROR_MARKER;
use crate::error::{ProviderFault, SyncError, TransportError};
use crate::types::Params;
use serde_json::{json, Value};

/// A provider payload exactly as decoded from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload(Value);

impl RawPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// A payload carrying the error marker in its normalized form.
    pub fn error(code: &str, message: &str, request_id: Option<&str>) -> Self {
        let mut content = json!({ "Code": code, "Message": message });
        if let Some(id) = request_id {
            content["RequestId"] = Value::from(id);
        }
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(ERROR_MARKER.to_string(), content);
        Self(Value::Object(wrapper))
    }

    pub fn error_marker(&self) -> Option<&Value> {
        self.0.get(ERROR_MARKER)
    }

    pub fn fault(&self) -> Option<ProviderFault> {
        self.error_marker().map(ProviderFault::from_marker)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Performs one native call for one provider.
#[async_trait::async_trait]
pub trait NativeTransport: Send + Sync {
    async fn request(
        &self,
        interface: &InterfaceConfig,
        params: &Params,
    ) -> Result<RawPayload, TransportError>;
}

/// Rejects a call whose parameters lack one of the interface's
/// `input_params`.
pub fn check_input_params(interface: &InterfaceConfig, params: &Params) -> Result<(), SyncError> {
    let missing: Vec<&str> = interface
        .input_params
        .iter()
        .filter(|name| !params.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SyncError::validation(format!(
            "{} requires parameter(s): {}",
            interface.name,
            missing.join(", ")
        )))
    }
}
