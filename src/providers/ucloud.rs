// src/providers/ucloud.rs
//! UCloud cleaner.

use super::acknowledgement;
use crate::cleaner::{HookTable, ProviderCleaner, ResolveScope};
use crate::error::SyncError;
use crate::response::CanonicalResponse;
use crate::types::ActionId;
use serde_json::Value;

pub struct UCloudCleaner {
    hooks: HookTable,
}

impl UCloudCleaner {
    pub fn new() -> Self {
        let hooks = HookTable::common()
            .with_default_resolver("query_hosts", "public_ip", host_public_ip)
            .with_default_resolver("query_hosts", "private_ip", host_private_ip);
        Self { hooks }
    }
}

impl Default for UCloudCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderCleaner for UCloudCleaner {
    fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    fn clean_operation(
        &self,
        _action: &ActionId,
        payload: &Value,
    ) -> Result<CanonicalResponse, SyncError> {
        // UCloud answers carry no request id; the echoed action stands in.
        Ok(acknowledgement(payload, "Action"))
    }
}

fn host_public_ip(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    Some(ip_set(record, |kind| kind != "Private"))
}

fn host_private_ip(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    Some(ip_set(record, |kind| kind == "Private"))
}

/// Comma-joined addresses of `IPSet` entries whose `Type` matches.
fn ip_set(record: &Value, wanted: impl Fn(&str) -> bool) -> Value {
    let joined = record
        .get("IPSet")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter(|e| e.get("Type").and_then(Value::as_str).is_some_and(&wanted))
                .filter_map(|e| e.get("IP").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    Value::String(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ip_set_is_split_by_type() {
        let record = json!({"IPSet": [
            {"Type": "Private", "IP": "10.0.0.5"},
            {"Type": "BGP", "IP": "106.75.1.1"},
            {"Type": "International", "IP": "152.32.1.1"}
        ]});
        assert_eq!(ip_set(&record, |k| k == "Private"), json!("10.0.0.5"));
        assert_eq!(
            ip_set(&record, |k| k != "Private"),
            json!("106.75.1.1,152.32.1.1")
        );
        assert_eq!(ip_set(&json!({}), |_| true), json!(""));
    }

    #[test]
    fn operations_echo_the_action() {
        let response = UCloudCleaner::new()
            .clean_operation(
                &ActionId::parse("operation_stop_hosts").unwrap(),
                &json!({"Action": "StopUHostInstanceResponse", "RetCode": 0}),
            )
            .unwrap();
        assert_eq!(
            response.data()[0]["request_id"],
            json!("StopUHostInstanceResponse")
        );
    }
}
