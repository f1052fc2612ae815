// src/executor/mod.rs
//! Execution of logical requests.
//!
//! A request tree is walked top-down: regional children run concurrently
//! and are concatenated; leaves of one regional request run on a pool of
//! worker tasks sharing one queue. Each leaf is throttled by the permit
//! pool of its `(provider, action)` pair, so limits hold across every
//! execution sharing an [`ExecutionClient`].

mod leaf;
mod leaf_queue;
mod permits;

pub use permits::PermitRegistry;

use crate::constants::{MAX_LEAF_WORKERS, MIN_LEAF_WORKERS};
use crate::error::{ProviderFault, SyncError};
use crate::providers::ProviderRegistry;
use crate::request::{BuildContext, Children, LogicalRequest, LowLayerRequest};
use crate::response::{CanonicalRecord, CanonicalResponse, ResponseAggregate};
use futures::future::{join_all, BoxFuture, FutureExt};
use leaf_queue::{LeafQueue, LeafResult};
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

/// State every worker task needs.
pub(crate) struct Shared {
    pub(crate) ctx: BuildContext,
    pub(crate) registry: ProviderRegistry,
    pub(crate) permits: PermitRegistry,
}

/// Executes logical requests against registered providers.
///
/// Cheap to clone; clones share permit pools.
#[derive(Clone)]
pub struct ExecutionClient {
    shared: Arc<Shared>,
    num_workers: usize,
}

impl ExecutionClient {
    /// Worker count defaults to the number of CPUs within
    /// `[MIN_LEAF_WORKERS, MAX_LEAF_WORKERS]`.
    pub fn new(ctx: BuildContext, registry: ProviderRegistry) -> Self {
        Self::with_workers(ctx, registry, None)
    }

    pub fn with_workers(
        ctx: BuildContext,
        registry: ProviderRegistry,
        concurrency: Option<usize>,
    ) -> Self {
        let num_workers = concurrency
            .unwrap_or_else(|| num_cpus::get().clamp(MIN_LEAF_WORKERS, MAX_LEAF_WORKERS))
            .clamp(1, MAX_LEAF_WORKERS);
        Self {
            shared: Arc::new(Shared {
                ctx,
                registry,
                permits: PermitRegistry::new(),
            }),
            num_workers,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn context(&self) -> &BuildContext {
        &self.shared.ctx
    }

    pub fn permits(&self) -> &PermitRegistry {
        &self.shared.permits
    }

    /// Executes a logical request and merges everything it fetched.
    ///
    /// A request that resolves to one leaf returns its response as is, faults
    /// included. Anywhere else, leaves still failing after their retries
    /// turn the whole call into [`SyncError::Aggregate`], raised once
    /// every sibling has finished.
    pub async fn execute(&self, request: &LogicalRequest) -> Result<CanonicalResponse, SyncError> {
        let run_id = Uuid::new_v4();
        let started = tokio::time::Instant::now();
        log::info!(
            "[{}] Executing {}/{} (region mode {}, {} worker(s))",
            run_id,
            request.provider(),
            request.action(),
            request.region_mode(),
            self.num_workers
        );

        let result = self.execute_node(request).await;
        match &result {
            Ok(response) => log::info!(
                "[{}] Fetched {} of {} record(s) in {:.2?}",
                run_id,
                response.current(),
                response.total(),
                started.elapsed()
            ),
            Err(e) => log::error!("[{}] Failed after {:.2?}: {}", run_id, started.elapsed(), e),
        }
        result
    }

    fn execute_node<'a>(
        &'a self,
        request: &'a LogicalRequest,
    ) -> BoxFuture<'a, Result<CanonicalResponse, SyncError>> {
        async move {
            match request.children(&self.shared.ctx)? {
                Children::Regions(children) => self.execute_regions(children).await,
                Children::Leaves(leaves) => self.execute_leaves(request, leaves).await,
            }
        }
        .boxed()
    }

    async fn execute_regions(
        &self,
        children: &[LogicalRequest],
    ) -> Result<CanonicalResponse, SyncError> {
        let results = join_all(children.iter().map(|child| self.execute_node(child))).await;

        let mut aggregate = ResponseAggregate::regions();
        let mut faults = Vec::new();
        let mut first_error = None;
        for (child, result) in children.iter().zip(results) {
            let region = child.region().map(|r| r.as_str()).unwrap_or("-");
            match result {
                Ok(response) => {
                    log::debug!("Region {} returned {} record(s)", region, response.current());
                    aggregate.absorb(response);
                }
                Err(SyncError::Aggregate { faults: failed }) => {
                    log::warn!("Region {} had {} failed leaf request(s)", region, failed.len());
                    faults.extend(failed);
                }
                Err(e) => {
                    log::error!("Region {} failed: {}", region, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let (total, data, leftover) = aggregate.finish().into_parts();
        faults.extend(leftover);
        finish_batch(total, data, faults)
    }

    async fn execute_leaves(
        &self,
        request: &LogicalRequest,
        leaves: &[LowLayerRequest],
    ) -> Result<CanonicalResponse, SyncError> {
        let Some(first) = leaves.first() else {
            return Ok(CanonicalResponse::default());
        };

        let head = leaf::execute_leaf(&self.shared, first).await?;
        let rest: Vec<LowLayerRequest> = if first.is_paged() && !head.has_faults() {
            // The first page knows the real record count; end hooks may have
            // lowered `total` since.
            request
                .repaged(&self.shared.ctx, head.reported_total())?
                .into_iter()
                .skip(1)
                .collect()
        } else {
            leaves[1..].to_vec()
        };
        if rest.is_empty() {
            return Ok(head);
        }

        log::debug!(
            "{}/{}: {} more leaf request(s) after the first",
            request.provider(),
            request.action(),
            rest.len()
        );
        let results = self.run_batch(rest).await?;

        let mut aggregate = ResponseAggregate::pages();
        let mut first_error = None;
        for result in std::iter::once(Ok(head)).chain(results) {
            match result {
                Ok(response) => aggregate.absorb(response),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let (total, data, faults) = aggregate.finish().into_parts();
        finish_batch(total, data, faults)
    }

    /// Runs leaves on the worker pool and waits for all of them.
    async fn run_batch(&self, leaves: Vec<LowLayerRequest>) -> Result<Vec<LeafResult>, SyncError> {
        let num_workers = self.num_workers.min(leaves.len()).max(1);
        let batch = leaves.len();
        let queue = Arc::new(LeafQueue::new(leaves));

        let mut join_set = JoinSet::new();
        for _ in 0..num_workers {
            let queue = Arc::clone(&queue);
            let shared = Arc::clone(&self.shared);
            join_set.spawn(async move {
                while let Some(item) = queue.next() {
                    let result = leaf::execute_leaf(&shared, &item.leaf).await;
                    let done = queue.complete(item.position, result);
                    log::trace!("{} finished ({}/{})", item.leaf, done, batch);
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            joined.map_err(|e| SyncError::Internal {
                message: format!("Leaf worker task failed with join error: {}", e),
            })?;
        }

        Ok(queue.take_results())
    }
}

impl std::fmt::Debug for ExecutionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionClient")
            .field("registry", &self.shared.registry)
            .field("permit_pools", &self.shared.permits.len())
            .field("num_workers", &self.num_workers)
            .finish()
    }
}

/// Any fault left in a batch fails the batch.
fn finish_batch(
    total: u64,
    data: Vec<CanonicalRecord>,
    faults: Vec<ProviderFault>,
) -> Result<CanonicalResponse, SyncError> {
    if faults.is_empty() {
        Ok(CanonicalResponse::new(total, data))
    } else {
        Err(SyncError::Aggregate { faults })
    }
}
