// src/executor/leaf.rs
//! Execution of a single leaf: permit, native call, cadence, retry, clean.

use super::Shared;
use crate::cleaner;
use crate::constants::{CALL_CADENCE, LEAF_MAX_ATTEMPTS};
use crate::error::SyncError;
use crate::request::LowLayerRequest;
use crate::response::CanonicalResponse;
use crate::transport::check_input_params;
use tokio::time::Instant;

/// Runs one leaf to a canonical response.
///
/// Each attempt holds a permit of the leaf's `(provider, action)` pool
/// for at least [`CALL_CADENCE`], so a pool of `K` permits never starts
/// more than `K` calls per cadence window. Payloads carrying the error
/// marker are retried up to [`LEAF_MAX_ATTEMPTS`] times; the last fault
/// then comes back inside the response. Transport errors are returned
/// at once.
pub(crate) async fn execute_leaf(
    shared: &Shared,
    leaf: &LowLayerRequest,
) -> Result<CanonicalResponse, SyncError> {
    let view = shared.ctx.catalog().action(leaf.provider(), leaf.action())?;
    let interface = &view.action.interface;
    check_input_params(interface, leaf.params())?;

    let transport = shared.registry.transport(leaf.provider())?;
    let cleaner = shared.registry.cleaner(leaf.provider())?;
    let pool = shared
        .permits
        .pool(leaf.provider(), leaf.action(), view.permit_limit());

    let mut last_fault = None;
    for attempt in 1..=LEAF_MAX_ATTEMPTS {
        let payload = {
            let _permit = pool.acquire().await.map_err(|e| SyncError::Internal {
                message: format!("Permit pool for {} closed: {}", leaf, e),
            })?;
            let started = Instant::now();
            let result = transport.request(interface, leaf.params()).await;
            let elapsed = started.elapsed();
            if elapsed < CALL_CADENCE {
                tokio::time::sleep(CALL_CADENCE - elapsed).await;
            }
            result?
        };

        match payload.fault() {
            None => {
                log::trace!("{} answered on attempt {}", leaf, attempt);
                return cleaner::clean(&*cleaner, &interface.output, leaf, payload);
            }
            Some(fault) => {
                let outcome = if fault.is_throttling() {
                    "was throttled"
                } else {
                    "failed"
                };
                log::warn!(
                    "{} {} (attempt {}/{}): {}",
                    leaf,
                    outcome,
                    attempt,
                    LEAF_MAX_ATTEMPTS,
                    fault
                );
                last_fault = Some(fault);
            }
        }
    }

    let fault = last_fault.ok_or_else(|| SyncError::Internal {
        message: format!("{} made no attempt", leaf),
    })?;
    log::error!("{} gave up after {} attempts", leaf, LEAF_MAX_ATTEMPTS);
    Ok(CanonicalResponse::from_fault(fault))
}
