// src/lib.rs
//! cloudsync library: fan-out, throttled execution and normalization of
//! multi-cloud inventory requests.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `SyncError`, `ProviderFault`, `TransportError`, `ValidationError`
//! - **Configuration**: `Catalog` (provider YAML), `RunConfig` (CLI)
//! - **Requests**: `LogicalRequest`, `LowLayerRequest`, `RegionMode`, `BuildContext`
//! - **Execution**: `ExecutionClient`, `PermitRegistry`
//! - **Responses**: `CanonicalResponse`, `ResponseAggregate`
//! - **Providers**: `ProviderRegistry`, transports and cleaners

mod catalog;
mod config;
mod constants;
mod error;
mod executor;
mod regions;
mod request;
mod response;

#[cfg(feature = "bench")]
pub mod cleaner;
#[cfg(not(feature = "bench"))]
mod cleaner;

pub mod providers;
pub mod transport;

mod types;

// --- Error Handling ---
pub use crate::error::{ProviderFault, Result, SyncError, TransportError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::catalog::{
    ActionConfig, ActionSettings, ActionView, Catalog, FieldSource, FieldSpec, HookBase, HookRef,
    HooksConfig, InterfaceConfig, OutputConfig, PagingBase, ProviderConfig, ProviderSettings,
};
pub use crate::config::{CommandLineInput, RunConfig};
pub use crate::constants::{CALL_CADENCE, CONFIG_DIR_ENV, LEAF_MAX_ATTEMPTS, MAX_PAGES_PER_REQUEST};

// --- Domain Types ---
pub use crate::types::{
    parse_param, ActionId, ActionKind, Params, ProviderId, RegionCode, ValidatedUrl,
};

// --- Regions ---
pub use crate::regions::{
    RecordCountIndex, RegionCatalog, RegionRecordCount, RegionsWithData, StaticRegionCatalog,
};

// --- Requests ---
pub use crate::request::{
    BuildContext, Children, LogicalRequest, LogicalRequestBuilder, LowLayerRequest, PageWindow,
    Paging, RegionMode, RequestScope,
};

// --- Execution ---
pub use crate::executor::{ExecutionClient, PermitRegistry};

// --- Responses ---
pub use crate::response::{CanonicalRecord, CanonicalResponse, MergeMode, ResponseAggregate};

// --- Cleaning ---
pub use crate::cleaner::{
    clean, make_unique, EndHook, HookTable, Kwargs, ProviderCleaner, ResolveScope, Resolver,
    StartHook, TimeBucket,
};
