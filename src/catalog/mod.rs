// src/catalog/mod.rs
//! The provider configuration registry.
//!
//! One YAML document per provider (`<dir>/<provider>.yaml`) is loaded once
//! at startup into an immutable [`Catalog`], which request building and
//! execution then share by reference.

mod model;

pub use model::*;

use crate::error::SyncError;
use crate::types::{ActionId, ProviderId};
use std::collections::HashMap;
use std::path::Path;

/// Immutable lookup table of provider configurations.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    providers: HashMap<ProviderId, ProviderConfig>,
}

/// Borrowed view of one action of one provider.
#[derive(Debug, Clone, Copy)]
pub struct ActionView<'a> {
    pub provider: &'a ProviderSettings,
    pub action: &'a ActionConfig,
}

impl ActionView<'_> {
    /// Concurrency limit for the `(provider, action)` permit pool.
    pub fn permit_limit(&self) -> usize {
        self.action
            .settings
            .req_limit
            .unwrap_or(self.provider.req_limit)
            .max(1)
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.yaml` / `*.yml` file of a directory; the file stem
    /// names the provider.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, SyncError> {
        let dir = dir.as_ref();
        let mut catalog = Self::new();

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| SyncError::config(format!("Bad file name: {}", path.display())))?;
            let provider = ProviderId::parse(stem)?;
            let text = std::fs::read_to_string(&path)?;
            let config: ProviderConfig =
                serde_yaml::from_str(&text).map_err(|source| SyncError::ConfigParse {
                    path: path.clone(),
                    source,
                })?;
            log::debug!(
                "Loaded provider '{}' with {} action(s) from {}",
                provider,
                config.actions.len(),
                path.display()
            );
            catalog.insert(provider, config)?;
        }

        if catalog.providers.is_empty() {
            return Err(SyncError::config(format!(
                "No provider configuration found in {}",
                dir.display()
            )));
        }
        Ok(catalog)
    }

    /// Parses one provider document.
    pub fn parse_provider(text: &str) -> Result<ProviderConfig, SyncError> {
        serde_yaml::from_str(text).map_err(|source| SyncError::ConfigParse {
            path: "<inline>".into(),
            source,
        })
    }

    /// Adds a provider after checking its settings are usable.
    pub fn insert(&mut self, provider: ProviderId, config: ProviderConfig) -> Result<(), SyncError> {
        validate_provider(&provider, &config)?;
        self.providers.insert(provider, config);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_provider(mut self, provider: &str, text: &str) -> Result<Self, SyncError> {
        let id = ProviderId::parse(provider)?;
        let config = Self::parse_provider(text)?;
        self.insert(id, config)?;
        Ok(self)
    }

    pub fn provider(&self, provider: &ProviderId) -> Result<&ProviderConfig, SyncError> {
        self.providers
            .get(provider)
            .ok_or_else(|| SyncError::config(format!("Unknown provider '{}'", provider)))
    }

    pub fn action(
        &self,
        provider: &ProviderId,
        action: &ActionId,
    ) -> Result<ActionView<'_>, SyncError> {
        let config = self.provider(provider)?;
        let action_config = config.actions.get(action).ok_or_else(|| {
            SyncError::config(format!(
                "Action '{}' is not configured for provider '{}'",
                action, provider
            ))
        })?;
        Ok(ActionView {
            provider: &config.settings,
            action: action_config,
        })
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.keys()
    }
}

fn validate_provider(provider: &ProviderId, config: &ProviderConfig) -> Result<(), SyncError> {
    let settings = &config.settings;
    if settings.req_limit == 0 {
        return Err(SyncError::config(format!(
            "Provider '{}' has req_limit 0",
            provider
        )));
    }
    let paginated = config.actions.values().any(|a| a.settings.paging_required);
    if paginated && settings.limit_max == 0 {
        return Err(SyncError::config(format!(
            "Provider '{}' paginates but limit_max is 0",
            provider
        )));
    }
    for (action, action_config) in &config.actions {
        if action_config.settings.req_limit == Some(0) {
            return Err(SyncError::config(format!(
                "Action '{}' of provider '{}' has req_limit 0",
                action, provider
            )));
        }
        for (field, spec) in &action_config.interface.output.fields {
            if spec.src == Some(FieldSource::Method) && spec.path.is_none() {
                return Err(SyncError::config(format!(
                    "Field '{}' of {}/{} uses src 'method' without naming a resolver",
                    field, provider, action
                )));
            }
        }
    }
    Ok(())
}
