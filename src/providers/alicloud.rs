// src/providers/alicloud.rs
//! AliCloud cleaner: ECS hosts, zones and CMS monitoring data.

use super::{acknowledgement, join_strings};
use crate::cleaner::{
    utc_offset_hours, HookTable, Kwargs, ProviderCleaner, ResolveScope, TimeBucket,
};
use crate::error::SyncError;
use crate::response::CanonicalResponse;
use crate::types::ActionId;
use serde_json::Value;

pub struct AliCloudCleaner {
    hooks: HookTable,
}

impl AliCloudCleaner {
    pub fn new() -> Self {
        let hooks = HookTable::common()
            .with_default_resolver("query_zones", "state", zone_state)
            .with_default_resolver("query_hosts", "project", host_project)
            .with_default_resolver("query_hosts", "memory", host_memory)
            .with_default_resolver("query_hosts", "public_ip", host_public_ip)
            .with_start("query_monitor_data", "bucket_timestamps", bucket_datapoints);
        Self { hooks }
    }
}

impl Default for AliCloudCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderCleaner for AliCloudCleaner {
    fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    fn clean_operation(
        &self,
        _action: &ActionId,
        payload: &Value,
    ) -> Result<CanonicalResponse, SyncError> {
        Ok(acknowledgement(payload, "RequestId"))
    }
}

/// 0 when the zone can still create instances, 2 otherwise.
fn zone_state(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    let types = record
        .pointer("/AvailableResourceCreation/ResourceTypes")?
        .as_array()?;
    let can_create = types.iter().any(|t| t.as_str() == Some("Instance"));
    Some(Value::from(if can_create { 0 } else { 2 }))
}

/// Project prefix of host names such as `game-ab-web-01` (→ `game-ab`)
/// or `shop-web-01` (→ `shop`).
fn host_project(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    let name = record.get("InstanceName")?.as_str()?;
    let parts: Vec<&str> = name.split('-').collect();
    let project = if parts.len() > 3 {
        parts[..2].join("-")
    } else {
        parts[0].to_string()
    };
    Some(Value::String(project.to_lowercase()))
}

/// ECS reports memory in MiB; the inventory keeps GiB.
fn host_memory(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    let mib = record.get("Memory")?.as_f64()?;
    Some(Value::from(mib / 1024.0))
}

/// The EIP when one is bound, else the comma-joined public addresses.
fn host_public_ip(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    let eip = record
        .pointer("/EipAddress/IpAddress")
        .and_then(Value::as_str)
        .filter(|ip| !ip.is_empty());
    match eip {
        Some(ip) => Some(Value::from(ip)),
        None => join_strings(record.pointer("/PublicIpAddress/IpAddress"))
            .or_else(|| Some(Value::from(""))),
    }
}

/// CMS returns `Datapoints` as a JSON string of points stamped in
/// milliseconds; decode it and add `Day`, `Hour` and `Minute`.
fn bucket_datapoints(mut payload: Value, kwargs: &Kwargs) -> Result<Value, SyncError> {
    let offset = utc_offset_hours(kwargs);
    if payload.get("Datapoints").is_none() {
        return Ok(payload);
    }
    let raw = &mut payload["Datapoints"];
    let mut points: Vec<Value> = match raw {
        Value::Null => Vec::new(),
        Value::String(text) if text.is_empty() => Vec::new(),
        Value::String(text) => serde_json::from_str(text)?,
        Value::Array(items) => std::mem::take(items),
        _ => return Err(SyncError::Malformed("Datapoints is not a list".to_string())),
    };

    for point in points.iter_mut() {
        let Some(millis) = point.get("timestamp").and_then(Value::as_i64) else {
            continue;
        };
        let Some(bucket) = TimeBucket::from_unix_seconds(millis / 1000, offset) else {
            continue;
        };
        if let Some(fields) = point.as_object_mut() {
            bucket.write_into(fields);
        }
    }

    *raw = Value::Array(points);
    Ok(payload)
}
