// src/cleaner/mod.rs
//! Reduction of raw provider payloads to [`CanonicalResponse`]s.
//!
//! The pipeline is the same for every provider:
//!
//! 1. a payload carrying the error marker is handed back as a fault;
//! 2. the configured start hook rewrites the payload;
//! 3. query actions extract `output.data` and clean each record through
//!    the field table, operation actions go to the provider's
//!    [`ProviderCleaner::clean_operation`];
//! 4. the configured end hook rewrites the canonical response.
//!
//! What differs per provider lives in its [`HookTable`].

mod fields;
mod hooks;
pub mod path;

pub use hooks::{
    make_unique, utc_offset_hours, EndHook, HookTable, Kwargs, ResolveScope, Resolver, StartHook,
    TimeBucket,
};

use crate::catalog::OutputConfig;
use crate::error::SyncError;
use crate::request::LowLayerRequest;
use crate::response::CanonicalResponse;
use crate::transport::RawPayload;
use crate::types::{ActionId, ActionKind};
use serde_json::Value;

/// Provider-specific part of cleaning.
pub trait ProviderCleaner: Send + Sync {
    /// Hooks and resolvers this provider's configuration may name.
    fn hooks(&self) -> &HookTable;

    /// Cleans the payload of a mutating (non-query) action.
    fn clean_operation(
        &self,
        action: &ActionId,
        payload: &Value,
    ) -> Result<CanonicalResponse, SyncError>;
}

/// Runs the cleaning pipeline for one leaf's payload.
pub fn clean(
    cleaner: &dyn ProviderCleaner,
    output: &OutputConfig,
    request: &LowLayerRequest,
    payload: RawPayload,
) -> Result<CanonicalResponse, SyncError> {
    if let Some(fault) = payload.fault() {
        return Ok(CanonicalResponse::from_fault(fault));
    }

    let action = request.action();
    let hooks = cleaner.hooks();
    let origin = payload.into_value();

    let started = match &output.hooks.start {
        Some(hook) => Some(hooks.start(hook, action)?(origin.clone(), &hook.kwargs)?),
        None => None,
    };
    let body = started.as_ref().unwrap_or(&origin);

    let response = match action.kind() {
        ActionKind::Query => {
            let params = Value::Object(request.params().clone());
            let scope = ResolveScope {
                origin: &origin,
                params: &params,
                action,
            };
            clean_query(hooks, output, body, &scope)?
        }
        ActionKind::Operation => cleaner.clean_operation(action, body)?,
    };

    match &output.hooks.end {
        Some(hook) => {
            let reported = response.reported_total();
            let hooked = hooks.end(hook, action)?(response, &hook.kwargs)?;
            Ok(hooked.with_reported_total(reported))
        }
        None => Ok(response),
    }
}

fn clean_query(
    hooks: &HookTable,
    output: &OutputConfig,
    body: &Value,
    scope: &ResolveScope<'_>,
) -> Result<CanonicalResponse, SyncError> {
    let found = match &output.data {
        Some(data_path) => path::extract(body, data_path, 0),
        None => Some(body),
    };

    let decoded;
    let records: &[Value] = match found {
        None => &[],
        Some(Value::Array(items)) => items,
        // Some providers ship the record list as a JSON document in a string.
        Some(Value::String(text)) => {
            decoded = decode_record_list(text)?;
            &decoded
        }
        Some(other) => {
            return Err(SyncError::Malformed(format!(
                "record list at '{}' is {}, not a list",
                output.data.as_deref().unwrap_or("<payload>"),
                json_kind(other)
            )))
        }
    };

    let data = records
        .iter()
        .enumerate()
        .map(|(index, record)| fields::clean_record(&output.fields, record, index, scope, hooks))
        .collect::<Result<Vec<_>, _>>()?;

    let total = path::extract(body, &output.total, 0)
        .and_then(path::as_count)
        .unwrap_or(data.len() as u64);

    Ok(CanonicalResponse::new(total, data))
}

fn decode_record_list(text: &str) -> Result<Vec<Value>, SyncError> {
    match serde_json::from_str(text)? {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(SyncError::Malformed(format!(
            "encoded record list is {}, not a list",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
