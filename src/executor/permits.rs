// src/executor/permits.rs
//! Per-(provider, action) concurrency permits.

use crate::types::{ActionId, ProviderId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

type PermitKey = (ProviderId, ActionId);

/// Lazily created semaphores, one per `(provider, action)` pair.
///
/// A pool is sized from the catalog the first time its pair is seen and
/// lives as long as the registry; every execution sharing the registry
/// shares the pool.
#[derive(Debug, Default)]
pub struct PermitRegistry {
    pools: DashMap<PermitKey, Arc<Semaphore>>,
}

impl PermitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pool for a pair, created with `limit` permits if missing.
    pub fn pool(&self, provider: &ProviderId, action: &ActionId, limit: usize) -> Arc<Semaphore> {
        self.pools
            .entry((provider.clone(), action.clone()))
            .or_insert_with(|| {
                log::debug!("Permit pool {}/{} sized {}", provider, action, limit);
                Arc::new(Semaphore::new(limit.max(1)))
            })
            .clone()
    }

    /// Permits currently free in a pool, if the pool exists.
    pub fn available(&self, provider: &ProviderId, action: &ActionId) -> Option<usize> {
        self.pools
            .get(&(provider.clone(), action.clone()))
            .map(|pool| pool.available_permits())
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
