// src/providers/mod.rs
//! Provider registry: which transport and which cleaner serve a provider.
//!
//! Populated once at startup, either from the built-in providers or by
//! registering custom implementations.

mod alicloud;
mod kscloud;
mod qcloud;
mod ucloud;

pub use alicloud::AliCloudCleaner;
pub use kscloud::KSCloudCleaner;
pub use qcloud::QCloudCleaner;
pub use ucloud::UCloudCleaner;

use crate::catalog::{Catalog, ProviderSettings};
use crate::cleaner::ProviderCleaner;
use crate::error::SyncError;
use crate::response::{CanonicalRecord, CanonicalResponse};
use crate::transport::{Dialect, HttpTransport, NativeTransport};
use crate::types::ProviderId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A provider this crate ships: its wire dialect and its cleaner.
struct Builtin {
    name: &'static str,
    dialect: Dialect,
    cleaner: fn() -> Arc<dyn ProviderCleaner>,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "alicloud",
        dialect: Dialect::AliCloud,
        cleaner: alicloud_cleaner,
    },
    Builtin {
        name: "qcloud",
        dialect: Dialect::QCloud,
        cleaner: qcloud_cleaner,
    },
    Builtin {
        name: "ucloud",
        dialect: Dialect::UCloud,
        cleaner: ucloud_cleaner,
    },
    Builtin {
        name: "kscloud",
        dialect: Dialect::KSCloud,
        cleaner: kscloud_cleaner,
    },
];

fn alicloud_cleaner() -> Arc<dyn ProviderCleaner> {
    Arc::new(AliCloudCleaner::new())
}

fn qcloud_cleaner() -> Arc<dyn ProviderCleaner> {
    Arc::new(QCloudCleaner::new())
}

fn ucloud_cleaner() -> Arc<dyn ProviderCleaner> {
    Arc::new(UCloudCleaner::new())
}

fn kscloud_cleaner() -> Arc<dyn ProviderCleaner> {
    Arc::new(KSCloudCleaner::new())
}

fn http_transport(
    dialect: Dialect,
    settings: &ProviderSettings,
) -> Result<Arc<dyn NativeTransport>, SyncError> {
    let transport = HttpTransport::new(
        dialect,
        settings.endpoint.clone(),
        Duration::from_secs(settings.timeout_secs),
    )?;
    Ok(Arc::new(transport))
}

/// Names of the providers this crate ships an implementation for.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

#[derive(Clone)]
struct ProviderEntry {
    transport: Arc<dyn NativeTransport>,
    cleaner: Arc<dyn ProviderCleaner>,
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    entries: HashMap<ProviderId, ProviderEntry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in implementation of every catalog provider
    /// that has one. Other providers must be registered explicitly.
    pub fn builtin(catalog: &Catalog) -> Result<Self, SyncError> {
        let mut registry = Self::new();
        for provider in catalog.providers() {
            let Some(builtin) = BUILTINS.iter().find(|b| b.name == provider.as_str()) else {
                log::warn!("No built-in implementation for provider '{}'", provider);
                continue;
            };
            let settings = &catalog.provider(provider)?.settings;
            registry.register(
                provider.clone(),
                http_transport(builtin.dialect, settings)?,
                (builtin.cleaner)(),
            );
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        provider: ProviderId,
        transport: Arc<dyn NativeTransport>,
        cleaner: Arc<dyn ProviderCleaner>,
    ) {
        self.entries
            .insert(provider, ProviderEntry { transport, cleaner });
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(
        mut self,
        provider: &str,
        transport: Arc<dyn NativeTransport>,
        cleaner: Arc<dyn ProviderCleaner>,
    ) -> Result<Self, SyncError> {
        self.register(ProviderId::parse(provider)?, transport, cleaner);
        Ok(self)
    }

    pub fn transport(&self, provider: &ProviderId) -> Result<Arc<dyn NativeTransport>, SyncError> {
        self.entry(provider).map(|e| e.transport.clone())
    }

    pub fn cleaner(&self, provider: &ProviderId) -> Result<Arc<dyn ProviderCleaner>, SyncError> {
        self.entry(provider).map(|e| e.cleaner.clone())
    }

    pub fn contains(&self, provider: &ProviderId) -> bool {
        self.entries.contains_key(provider)
    }

    fn entry(&self, provider: &ProviderId) -> Result<&ProviderEntry, SyncError> {
        self.entries.get(provider).ok_or_else(|| {
            SyncError::config(format!("No transport or cleaner registered for '{}'", provider))
        })
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Canonical form of a mutating call's answer: one record holding the
/// provider's request id and the full payload.
pub(crate) fn acknowledgement(payload: &Value, request_id_key: &str) -> CanonicalResponse {
    let mut record = CanonicalRecord::new();
    record.insert(
        "request_id".to_string(),
        payload.get(request_id_key).cloned().unwrap_or(Value::Null),
    );
    record.insert("result".to_string(), payload.clone());
    CanonicalResponse::complete(vec![record])
}

/// Joins a list of strings with commas, skipping anything else.
pub(crate) fn join_strings(value: Option<&Value>) -> Option<Value> {
    let items = value?.as_array()?;
    let joined = items
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join(",");
    Some(Value::String(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CATALOG: &str = "settings:\n  endpoint: http://127.0.0.1:9/\n";

    #[test]
    fn builtin_covers_known_providers_only() {
        let catalog = Catalog::new()
            .with_provider("qcloud", CATALOG)
            .unwrap()
            .with_provider("privatecloud", CATALOG)
            .unwrap();
        let registry = ProviderRegistry::builtin(&catalog).unwrap();
        assert!(registry.contains(&ProviderId::parse("qcloud").unwrap()));
        let err = registry
            .cleaner(&ProviderId::parse("privatecloud").unwrap())
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Configuration error: No transport or cleaner registered for 'privatecloud'"
        );
    }

    #[test]
    fn builtin_names_are_stable() {
        let names: Vec<_> = builtin_names().collect();
        assert_eq!(names, vec!["alicloud", "qcloud", "ucloud", "kscloud"]);
    }

    #[test]
    fn acknowledgement_keeps_the_payload() {
        let payload = json!({"RequestId": "r-1", "InstanceId": "i-1"});
        let response = acknowledgement(&payload, "RequestId");
        assert_eq!(response.current(), 1);
        assert_eq!(response.data()[0]["request_id"], json!("r-1"));
        assert_eq!(response.data()[0]["result"], payload);
    }

    #[test]
    fn join_skips_non_strings() {
        assert_eq!(
            join_strings(Some(&json!(["1.1.1.1", null, "2.2.2.2"]))),
            Some(json!("1.1.1.1,2.2.2.2"))
        );
        assert_eq!(join_strings(Some(&json!("x"))), None);
        assert_eq!(join_strings(None), None);
    }
}
