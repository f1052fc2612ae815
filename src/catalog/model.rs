// src/catalog/model.rs
//! Typed form of the per-provider YAML configuration.
//!
//! The layout follows `provider.settings` for pagination / rate limiting and
//! `provider.actions.<action>.{settings, interface}` for each action.

use crate::types::{ActionId, ValidatedUrl};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// Everything known about one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub settings: ProviderSettings,
    #[serde(default)]
    pub actions: HashMap<ActionId, ActionConfig>,
}

/// How offsets advance from one page to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagingBase {
    /// The offset parameter is a page number: +1 per page.
    Page,
    /// The offset parameter is a record offset: +limit per page.
    Offset,
}

/// Provider-wide request settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Concurrent calls allowed per action unless the action overrides it.
    #[serde(default = "default_req_limit")]
    pub req_limit: usize,
    /// Name of the page-size parameter, e.g. `PageSize` or `Limit`.
    #[serde(default = "default_limit_str")]
    pub limit_str: String,
    /// Largest page size the provider accepts.
    #[serde(default = "default_limit_max")]
    pub limit_max: u64,
    /// Name of the offset / page-number parameter.
    #[serde(default = "default_offset_str")]
    pub offset_str: String,
    #[serde(default)]
    pub offset_init: u64,
    #[serde(default = "default_paging_base")]
    pub paging_base: PagingBase,
    /// Name of the parameter carrying the region code.
    #[serde(default = "default_region_str")]
    pub region_str: String,
    /// Base URL used by the HTTP transport.
    #[serde(default)]
    pub endpoint: Option<ValidatedUrl>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_req_limit() -> usize {
    5
}

fn default_limit_str() -> String {
    "Limit".to_string()
}

fn default_limit_max() -> u64 {
    100
}

fn default_offset_str() -> String {
    "Offset".to_string()
}

fn default_paging_base() -> PagingBase {
    PagingBase::Offset
}

fn default_region_str() -> String {
    "Region".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Configuration of one action for one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    #[serde(default)]
    pub settings: ActionSettings,
    pub interface: InterfaceConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionSettings {
    #[serde(default)]
    pub region_required: bool,
    #[serde(default, alias = "paging")]
    pub paging_required: bool,
    /// Overrides the provider's `req_limit` for this action.
    #[serde(default)]
    pub req_limit: Option<usize>,
}

/// Describes the native API call behind an action.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig {
    /// Native API name, e.g. `DescribeInstances`.
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Parameters the native call cannot do without.
    #[serde(default)]
    pub input_params: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// How to turn a raw payload into canonical records.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Dotted path to the record list inside the payload.
    #[serde(default)]
    pub data: Option<String>,
    /// Dotted path to the authoritative record count.
    #[serde(default = "default_total_path")]
    pub total: String,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub hooks: HooksConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data: None,
            total: default_total_path(),
            fields: IndexMap::new(),
            hooks: HooksConfig::default(),
        }
    }
}

fn default_total_path() -> String {
    "TotalCount".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub start: Option<HookRef>,
    #[serde(default)]
    pub end: Option<HookRef>,
}

/// Whether a hook is shared by all actions or specific to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookBase {
    Common,
    #[default]
    Action,
}

/// A reference to a hook registered in the provider's hook table.
#[derive(Debug, Clone, Deserialize)]
pub struct HookRef {
    pub method: String,
    #[serde(default)]
    pub base: HookBase,
    #[serde(default)]
    pub kwargs: serde_json::Map<String, Value>,
}

/// Where a canonical field takes its raw value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    /// The low-layer request parameters.
    #[serde(alias = "req")]
    Request,
    /// The current raw record.
    #[serde(alias = "data")]
    Record,
    /// A named resolver from the hook table.
    Method,
}

/// Resolution rule for one canonical field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSpec {
    #[serde(default)]
    pub src: Option<FieldSource>,
    /// Dotted path, or resolver name when `src` is `method`.
    #[serde(default, alias = "key")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "deserialize_mapping")]
    pub mapping: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub default: Value,
}

/// Mapping keys are provider values; YAML happily writes them as numbers or
/// booleans, so they are normalized to their text form.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarKey {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl ScalarKey {
    fn into_text(self) -> String {
        match self {
            ScalarKey::Text(s) => s,
            ScalarKey::Integer(i) => i.to_string(),
            ScalarKey::Float(f) => f.to_string(),
            ScalarKey::Flag(b) => b.to_string(),
        }
    }
}

fn deserialize_mapping<'de, D>(deserializer: D) -> Result<Option<HashMap<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<(ScalarKey, Value)>> =
        Option::<PairList>::deserialize(deserializer)?.map(|list| list.0);
    Ok(raw.map(|pairs| {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into_text(), v))
            .collect()
    }))
}

/// Map entries in document order, keys left untyped.
struct PairList(Vec<(ScalarKey, Value)>);

impl<'de> Deserialize<'de> for PairList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PairVisitor;

        impl<'de> serde::de::Visitor<'de> for PairVisitor {
            type Value = PairList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a mapping of provider values to canonical values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<PairList, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut pairs = Vec::new();
                while let Some(entry) = access.next_entry::<ScalarKey, Value>()? {
                    pairs.push(entry);
                }
                Ok(PairList(pairs))
            }
        }

        deserializer.deserialize_map(PairVisitor)
    }
}

/// Text form of a provider value used for `mapping` lookups.
pub fn mapping_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
