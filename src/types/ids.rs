use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

static IDENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$")
        .expect("Failed to compile identifier regex - this is a bug in the code")
});

/// Names the kind of identifier in validation messages.
pub trait IdentKind {
    const KIND: &'static str;
}

/// Strong typing for configuration identifiers with phantom types
pub struct Ident<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for the different identifier kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionMarker;

impl IdentKind for ProviderMarker {
    const KIND: &'static str = "provider";
}

impl IdentKind for ActionMarker {
    const KIND: &'static str = "action";
}

impl IdentKind for RegionMarker {
    const KIND: &'static str = "region";
}

/// A cloud vendor key, e.g. `alicloud`.
pub type ProviderId = Ident<ProviderMarker>;
/// A logical operation key, e.g. `query_hosts`.
pub type ActionId = Ident<ActionMarker>;
/// A provider-native region code, e.g. `cn-hangzhou`.
pub type RegionCode = Ident<RegionMarker>;

impl<T: IdentKind> Ident<T> {
    /// Parses and validates an identifier.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField(T::KIND));
        }
        if !IDENT_REGEX.is_match(trimmed) {
            return Err(ValidationError::InvalidIdentifier {
                kind: T::KIND,
                value: input.to_string(),
                reason: "only letters, digits, '_', '-' and '.' are allowed".to_string(),
            });
        }
        Ok(Self {
            value: trimmed.to_string(),
            _phantom: PhantomData,
        })
    }
}

impl<T> Ident<T> {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// The category of an action, derived from the first `_` token of its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Read-only listing calls (`query_*`).
    Query,
    /// Mutating calls (anything else).
    Operation,
}

impl ActionId {
    pub fn kind(&self) -> ActionKind {
        match self.value.split('_').next() {
            Some("query") => ActionKind::Query,
            _ => ActionKind::Operation,
        }
    }

    pub fn is_query(&self) -> bool {
        self.kind() == ActionKind::Query
    }
}

// Manual impls: derives would put bounds on the marker type.
impl<T> Clone for Ident<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)
    }
}

impl<T> PartialEq for Ident<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Ident<T> {}

impl<T> std::hash::Hash for Ident<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state)
    }
}

impl<T> PartialOrd for Ident<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ident<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> std::borrow::Borrow<str> for Ident<T> {
    fn borrow(&self) -> &str {
        &self.value
    }
}

impl<T> Serialize for Ident<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T: IdentKind> Deserialize<'de> for Ident<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
