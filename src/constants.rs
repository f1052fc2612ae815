// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains. Reading
//! them tells the story of how a synchronization behaves: how often it
//! retries, how fast it may call a provider, how wide it fans out.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Provider call discipline
// ---------------------------------------------------------------------------

/// Attempts per leaf request before its last error payload is given up on.
///
/// Each attempt re-acquires the `(provider, action)` permit, so a retry
/// waits its turn like any other call.
pub const LEAF_MAX_ATTEMPTS: u32 = 3;

/// Minimum time a permit is held per native call.
///
/// A call that returns faster sleeps out the remainder while still holding
/// its permit, which turns `req_limit` permits into at most `req_limit`
/// calls per second for one `(provider, action)` key.
pub const CALL_CADENCE: Duration = Duration::from_secs(1);

/// Most pages one request may expand into.
///
/// Page plans come from provider-reported counts; a count needing more
/// pages than this is treated as a malformed answer.
pub const MAX_PAGES_PER_REQUEST: u64 = 10_000;

// ---------------------------------------------------------------------------
// Worker pool boundaries
// ---------------------------------------------------------------------------

/// Lower bound on leaf workers, whatever the host parallelism reports.
pub const MIN_LEAF_WORKERS: usize = 2;

/// Upper bound on leaf workers.
///
/// Concurrency towards a provider is governed by permits, not workers;
/// beyond this many idle workers only add scheduling noise.
pub const MAX_LEAF_WORKERS: usize = 64;

// ---------------------------------------------------------------------------
// Transport boundaries
// ---------------------------------------------------------------------------

/// Characters of an undecodable response body kept in error messages.
pub const BODY_PREVIEW_CHARS: usize = 200;

/// Key under which a raw payload carries a provider error.
pub const ERROR_MARKER: &str = "Error";

// ---------------------------------------------------------------------------
// Cleaning defaults
// ---------------------------------------------------------------------------

/// Offset applied to UTC when bucketing monitoring timestamps, unless the
/// start hook is configured with a `utc_offset_hours` kwarg.
pub const DEFAULT_BUCKET_UTC_OFFSET_HOURS: i32 = 8;

/// Path segment standing for "the index of the record being cleaned".
pub const CURRENT_INDEX_MARKER: &str = "N";

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Environment variable overriding the provider configuration directory.
pub const CONFIG_DIR_ENV: &str = "CLOUDSYNC_CONFIG_DIR";

/// Directory searched for provider YAML files when nothing else is given.
pub const DEFAULT_CONFIG_DIR: &str = "config/providers";
