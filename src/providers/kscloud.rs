// src/providers/kscloud.rs
//! KSCloud (Kingsoft Cloud) cleaner.

use super::acknowledgement;
use crate::cleaner::{HookTable, ProviderCleaner, ResolveScope};
use crate::error::SyncError;
use crate::response::CanonicalResponse;
use crate::types::ActionId;
use serde_json::Value;

pub struct KSCloudCleaner {
    hooks: HookTable,
}

impl KSCloudCleaner {
    pub fn new() -> Self {
        let hooks =
            HookTable::common().with_default_resolver("query_hosts", "public_ip", host_public_ip);
        Self { hooks }
    }
}

impl Default for KSCloudCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderCleaner for KSCloudCleaner {
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

/// Public addresses bound to any of the host's network interfaces.
fn host_public_ip(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    let interfaces = record.get("NetworkInterfaceSet")?.as_array()?;
    let joined = interfaces
        .iter()
        .filter_map(|i| i.get("PublicIp").and_then(Value::as_str))
        .filter(|ip| !ip.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    Some(Value::String(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn public_ip_spans_interfaces() {
        let action = ActionId::parse("query_hosts").unwrap();
        let empty = json!({});
        let scope = ResolveScope {
            origin: &empty,
            params: &empty,
            action: &action,
        };
        let record = json!({"NetworkInterfaceSet": [
            {"PublicIp": "120.92.1.1"},
            {"PrivateIpAddress": "10.1.1.1"},
            {"PublicIp": ""}
        ]});
        assert_eq!(host_public_ip(&scope, &record, 0), Some(json!("120.92.1.1")));
        assert_eq!(host_public_ip(&scope, &json!({}), 0), None);
    }
}
