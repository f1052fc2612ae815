// src/cleaner/fields.rs
//! Per-field resolution of raw records into canonical records.

use super::hooks::{HookTable, ResolveScope};
use super::path;
use crate::catalog::{mapping_key, FieldSource, FieldSpec};
use crate::error::SyncError;
use crate::response::CanonicalRecord;
use indexmap::IndexMap;
use serde_json::Value;

/// Cleans one raw record. Fields come out in configuration order.
pub(crate) fn clean_record(
    fields: &IndexMap<String, FieldSpec>,
    record: &Value,
    index: usize,
    scope: &ResolveScope<'_>,
    hooks: &HookTable,
) -> Result<CanonicalRecord, SyncError> {
    let mut cleaned = CanonicalRecord::with_capacity(fields.len());
    for (name, spec) in fields {
        let raw = raw_value(name, spec, record, index, scope, hooks)?;
        cleaned.insert(name.clone(), settle(spec, raw));
    }
    Ok(cleaned)
}

fn raw_value(
    name: &str,
    spec: &FieldSpec,
    record: &Value,
    index: usize,
    scope: &ResolveScope<'_>,
    hooks: &HookTable,
) -> Result<Option<Value>, SyncError> {
    let value = match spec.src {
        Some(FieldSource::Request) => lookup(scope.params, spec.path.as_deref(), index),
        Some(FieldSource::Record) => lookup(record, spec.path.as_deref(), index),
        Some(FieldSource::Method) => {
            let resolver_name = spec.path.as_deref().ok_or_else(|| {
                SyncError::config(format!("Field '{}' uses src 'method' without a resolver", name))
            })?;
            let resolver = hooks.resolver(resolver_name)?;
            resolver(scope, record, index)
        }
        None => hooks
            .default_resolver(scope.action, name)
            .and_then(|resolver| resolver(scope, record, index)),
    };
    Ok(value)
}

/// Without a path the whole source stands in for the value.
fn lookup(root: &Value, path: Option<&str>, index: usize) -> Option<Value> {
    match path {
        Some(path) => path::extract(root, path, index).cloned(),
        None => Some(root.clone()),
    }
}

/// Null falls back to the default; a mapping miss does too.
fn settle(spec: &FieldSpec, raw: Option<Value>) -> Value {
    let Some(value) = raw.filter(|v| !v.is_null()) else {
        return spec.default.clone();
    };
    match &spec.mapping {
        Some(mapping) if !mapping.is_empty() => mapping
            .get(&mapping_key(&value))
            .cloned()
            .unwrap_or_else(|| spec.default.clone()),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(yaml: &str) -> IndexMap<String, FieldSpec> {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn clean(yaml: &str, record: Value, index: usize, hooks: &HookTable) -> Result<Value, SyncError> {
        let action = ActionId::parse("query_hosts").unwrap();
        let origin = json!({"records": [record.clone()]});
        let params = json!({"Region": "cn-beijing", "Filters": [{"Name": "zone"}]});
        let scope = ResolveScope {
            origin: &origin,
            params: &params,
            action: &action,
        };
        let cleaned = clean_record(&fields(yaml), &record, index, &scope, hooks)?;
        Ok(serde_json::to_value(cleaned).unwrap())
    }

    #[test]
    fn sources_resolve_in_order() {
        let yaml = r#"
region:
  src: request
  path: Region
filter:
  src: req
  path: Filters.0.Name
name:
  src: record
  path: Name
whole:
  src: data
"#;
        let record = json!({"Name": "web-1"});
        let cleaned = clean(yaml, record.clone(), 0, &HookTable::default()).unwrap();
        assert_eq!(
            cleaned,
            json!({"region": "cn-beijing", "filter": "zone", "name": "web-1", "whole": record})
        );
    }

    #[test]
    fn current_index_reaches_into_lists() {
        let yaml = "size:\n  src: record\n  path: records.N.size\n";
        let record = json!({"records": [{"size": 1}, {"size": 2}, {"size": 3}]});
        let cleaned = clean(yaml, record, 1, &HookTable::default()).unwrap();
        assert_eq!(cleaned, json!({"size": 2}));
    }

    #[test]
    fn missing_values_fall_back_to_default() {
        let yaml = r#"
weight:
  src: record
  path: records.N.weight
  default: 0
state:
  src: record
  path: Status
  mapping:
    Running: 0
    Stopped: 1
  default: 9
flag:
  src: record
  path: Enabled
  mapping:
    true: "on"
"#;
        let record = json!({"records": [{"size": 1}], "Status": "Pending", "Enabled": true});
        let cleaned = clean(yaml, record, 0, &HookTable::default()).unwrap();
        assert_eq!(cleaned, json!({"weight": 0, "state": 9, "flag": "on"}));
    }

    #[test]
    fn resolvers_come_from_the_hook_table() {
        fn shout(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
            record["Name"].as_str().map(|s| Value::from(s.to_uppercase()))
        }
        fn position(_: &ResolveScope<'_>, _: &Value, index: usize) -> Option<Value> {
            Some(Value::from(index))
        }
        let hooks = HookTable::default()
            .with_resolver("shout", shout)
            .with_default_resolver("query_hosts", "position", position);
        let yaml = "loud:\n  src: method\n  path: shout\nposition: {}\nunresolved:\n  default: x\n";
        let cleaned = clean(yaml, json!({"Name": "db"}), 4, &hooks).unwrap();
        assert_eq!(cleaned, json!({"loud": "DB", "position": 4, "unresolved": "x"}));
    }

    #[test]
    fn unknown_named_resolver_is_a_config_error() {
        let yaml = "loud:\n  src: method\n  path: whisper\n";
        let err = clean(yaml, json!({}), 0, &HookTable::default()).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
