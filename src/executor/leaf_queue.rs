// src/executor/leaf_queue.rs
//! Shared work queue for one batch of leaf requests.

use crate::error::SyncError;
use crate::request::LowLayerRequest;
use crate::response::CanonicalResponse;
use crossbeam::deque::{Injector, Steal};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) type LeafResult = Result<CanonicalResponse, SyncError>;

/// Counts finished leaves for progress logging.
#[derive(Debug, Default)]
struct WorkTracker {
    completed_work: AtomicUsize,
}

impl WorkTracker {
    fn mark_completed(&self) -> usize {
        self.completed_work.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// A leaf together with its position in the batch.
#[derive(Debug)]
pub(crate) struct QueuedLeaf {
    pub position: usize,
    pub leaf: LowLayerRequest,
}

/// Leaves of one batch, drained by any number of workers.
///
/// Nothing is enqueued once the batch is built, so a worker that finds
/// the injector empty may stop.
pub(crate) struct LeafQueue {
    injector: Injector<QueuedLeaf>,
    results: Mutex<Vec<(usize, LeafResult)>>,
    work_tracker: WorkTracker,
}

impl LeafQueue {
    pub fn new(leaves: Vec<LowLayerRequest>) -> Self {
        let injector = Injector::new();
        let count = leaves.len();
        for (position, leaf) in leaves.into_iter().enumerate() {
            injector.push(QueuedLeaf { position, leaf });
        }
        Self {
            injector,
            results: Mutex::new(Vec::with_capacity(count)),
            work_tracker: WorkTracker::default(),
        }
    }

    /// Takes the next leaf, or `None` once the batch is drained.
    pub fn next(&self) -> Option<QueuedLeaf> {
        loop {
            match self.injector.steal() {
                Steal::Success(item) => return Some(item),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    /// Records the outcome of a leaf; returns how many are done so far.
    pub fn complete(&self, position: usize, result: LeafResult) -> usize {
        self.results.lock().push((position, result));
        self.work_tracker.mark_completed()
    }

    /// Drains the recorded outcomes in batch order.
    pub fn take_results(&self) -> Vec<LeafResult> {
        let mut results = std::mem::take(&mut *self.results.lock());
        results.sort_by_key(|(position, _)| *position);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestScope;
    use crate::types::{ActionId, Params, ProviderId};
    use std::sync::Arc;

    fn leaves(count: usize) -> Vec<LowLayerRequest> {
        let scope = Arc::new(RequestScope {
            provider: ProviderId::parse("qcloud").unwrap(),
            action: ActionId::parse("query_hosts").unwrap(),
            region: None,
        });
        (0..count)
            .map(|i| {
                let mut params = Params::new();
                params.insert("Offset".into(), (i as u64 * 10).into());
                LowLayerRequest::new(scope.clone(), params, None)
            })
            .collect()
    }

    #[test]
    fn drains_every_leaf_once() {
        let queue = LeafQueue::new(leaves(3));
        let mut seen = Vec::new();
        while let Some(item) = queue.next() {
            seen.push(item.position);
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(queue.next().is_none());
    }

    #[test]
    fn results_come_back_in_batch_order() {
        let queue = LeafQueue::new(leaves(3));
        let items: Vec<_> = std::iter::from_fn(|| queue.next()).collect();

        let done: Vec<usize> = items
            .iter()
            .rev()
            .map(|item| {
                let total = item.leaf.params()["Offset"].as_u64().unwrap();
                queue.complete(item.position, Ok(CanonicalResponse::new(total, Vec::new())))
            })
            .collect();
        assert_eq!(done, vec![1, 2, 3]);

        let totals: Vec<u64> = queue
            .take_results()
            .into_iter()
            .map(|r| r.unwrap().total())
            .collect();
        assert_eq!(totals, vec![0, 10, 20]);
    }

    #[test]
    fn empty_batch_has_no_work() {
        let queue = LeafQueue::new(Vec::new());
        assert!(queue.next().is_none());
        assert!(queue.take_results().is_empty());
    }
}
