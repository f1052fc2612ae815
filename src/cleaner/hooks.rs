// src/cleaner/hooks.rs
//! Explicit registry of cleaning hooks and field resolvers.
//!
//! Hooks are looked up by the names the YAML configuration uses:
//! `base: common` hooks by method name alone, `base: action` hooks by
//! `(action, method)`. Field resolvers are either named (`src: method`,
//! `path: <name>`) or defaults keyed by `(action, field)` for fields that
//! leave `src` unset.

use crate::catalog::{HookBase, HookRef};
use crate::error::SyncError;
use crate::response::CanonicalResponse;
use crate::types::ActionId;
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub type Kwargs = serde_json::Map<String, Value>;

/// Rewrites the raw payload before records are extracted.
pub type StartHook = fn(Value, &Kwargs) -> Result<Value, SyncError>;

/// Rewrites the canonical response after all records are cleaned.
pub type EndHook = fn(CanonicalResponse, &Kwargs) -> Result<CanonicalResponse, SyncError>;

/// Computes one canonical field from one raw record and its index.
pub type Resolver = fn(&ResolveScope<'_>, &Value, usize) -> Option<Value>;

/// What a resolver may look at besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct ResolveScope<'a> {
    /// The payload as the transport returned it, before any start hook.
    pub origin: &'a Value,
    /// Parameters of the native call, as a JSON object.
    pub params: &'a Value,
    pub action: &'a ActionId,
}

type ActionKey = (String, String);

#[derive(Clone, Default)]
pub struct HookTable {
    common_start: HashMap<String, StartHook>,
    common_end: HashMap<String, EndHook>,
    action_start: HashMap<ActionKey, StartHook>,
    action_end: HashMap<ActionKey, EndHook>,
    resolvers: HashMap<String, Resolver>,
    default_resolvers: HashMap<ActionKey, Resolver>,
}

impl HookTable {
    /// A table holding the hooks every provider shares.
    pub fn common() -> Self {
        Self::default().with_common_end("make_unique", make_unique)
    }

    pub fn with_common_start(mut self, method: &str, hook: StartHook) -> Self {
        self.common_start.insert(method.to_string(), hook);
        self
    }

    pub fn with_common_end(mut self, method: &str, hook: EndHook) -> Self {
        self.common_end.insert(method.to_string(), hook);
        self
    }

    pub fn with_start(mut self, action: &str, method: &str, hook: StartHook) -> Self {
        self.action_start.insert(key(action, method), hook);
        self
    }

    pub fn with_end(mut self, action: &str, method: &str, hook: EndHook) -> Self {
        self.action_end.insert(key(action, method), hook);
        self
    }

    pub fn with_resolver(mut self, name: &str, resolver: Resolver) -> Self {
        self.resolvers.insert(name.to_string(), resolver);
        self
    }

    pub fn with_default_resolver(mut self, action: &str, field: &str, resolver: Resolver) -> Self {
        self.default_resolvers.insert(key(action, field), resolver);
        self
    }

    pub fn start(&self, hook: &HookRef, action: &ActionId) -> Result<StartHook, SyncError> {
        let found = match hook.base {
            HookBase::Common => self.common_start.get(&hook.method),
            HookBase::Action => self.action_start.get(&key(action.as_str(), &hook.method)),
        };
        found
            .copied()
            .ok_or_else(|| missing_hook("start", hook, action))
    }

    pub fn end(&self, hook: &HookRef, action: &ActionId) -> Result<EndHook, SyncError> {
        let found = match hook.base {
            HookBase::Common => self.common_end.get(&hook.method),
            HookBase::Action => self.action_end.get(&key(action.as_str(), &hook.method)),
        };
        found.copied().ok_or_else(|| missing_hook("end", hook, action))
    }

    pub fn resolver(&self, name: &str) -> Result<Resolver, SyncError> {
        self.resolvers
            .get(name)
            .copied()
            .ok_or_else(|| SyncError::config(format!("No resolver named '{}' is registered", name)))
    }

    pub fn default_resolver(&self, action: &ActionId, field: &str) -> Option<Resolver> {
        self.default_resolvers
            .get(&key(action.as_str(), field))
            .copied()
    }
}

impl std::fmt::Debug for HookTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookTable")
            .field("common_start", &self.common_start.keys().collect::<Vec<_>>())
            .field("common_end", &self.common_end.keys().collect::<Vec<_>>())
            .field("action_start", &self.action_start.keys().collect::<Vec<_>>())
            .field("action_end", &self.action_end.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("default_resolvers", &self.default_resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn key(action: &str, name: &str) -> ActionKey {
    (action.to_string(), name.to_string())
}

fn missing_hook(stage: &str, hook: &HookRef, action: &ActionId) -> SyncError {
    match hook.base {
        HookBase::Common => SyncError::config(format!(
            "No common {} hook named '{}' is registered",
            stage, hook.method
        )),
        HookBase::Action => SyncError::config(format!(
            "No {} hook named '{}' is registered for action '{}'",
            stage, hook.method, action
        )),
    }
}

/// Keeps the first record of every distinct `unique_keys` combination.
///
/// `total` drops by the number of records removed.
pub fn make_unique(response: CanonicalResponse, kwargs: &Kwargs) -> Result<CanonicalResponse, SyncError> {
    let keys: Vec<&str> = kwargs
        .get("unique_keys")
        .and_then(Value::as_array)
        .ok_or_else(|| SyncError::config("make_unique needs a 'unique_keys' list"))?
        .iter()
        .filter_map(Value::as_str)
        .collect();

    let (total, data, _) = response.into_parts();
    let before = data.len();
    let mut seen = HashSet::new();
    let unique: Vec<_> = data
        .into_iter()
        .filter(|record| {
            let composite: Vec<Option<String>> = keys
                .iter()
                .map(|k| record.get(*k).map(ToString::to_string))
                .collect();
            seen.insert(composite)
        })
        .collect();

    let removed = (before - unique.len()) as u64;
    if removed > 0 {
        log::debug!("make_unique dropped {} duplicate record(s)", removed);
    }
    Ok(CanonicalResponse::new(total.saturating_sub(removed), unique))
}

/// Day / hour / minute of a timestamp in a fixed UTC offset, as used by
/// the monitoring start hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucket {
    pub day: String,
    pub hour: u32,
    pub minute: u32,
}

impl TimeBucket {
    pub fn from_unix_seconds(seconds: i64, offset_hours: i32) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_hours * 3600)?;
        let at = DateTime::<Utc>::from_timestamp(seconds, 0)?.with_timezone(&offset);
        Some(Self {
            day: at.format("%Y-%m-%d").to_string(),
            hour: at.hour(),
            minute: at.minute(),
        })
    }

    /// Writes `Day`, `Hour` and `Minute` into a record object.
    pub fn write_into(&self, record: &mut serde_json::Map<String, Value>) {
        record.insert("Day".into(), Value::from(self.day.clone()));
        record.insert("Hour".into(), Value::from(self.hour));
        record.insert("Minute".into(), Value::from(self.minute));
    }
}

/// `utc_offset_hours` kwarg of the monitoring hooks.
pub fn utc_offset_hours(kwargs: &Kwargs) -> i32 {
    kwargs
        .get("utc_offset_hours")
        .and_then(Value::as_i64)
        .and_then(|h| i32::try_from(h).ok())
        .unwrap_or(crate::constants::DEFAULT_BUCKET_UTC_OFFSET_HOURS)
}
