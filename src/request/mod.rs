// src/request/mod.rs
//! Logical requests and their expansion into native calls.
//!
//! A [`LogicalRequest`] says "fetch this action from this provider". On first
//! access its children are built once and cached: either one child request
//! per region (fan-out) or the [`LowLayerRequest`] leaves that are actually
//! sent, one per page for paginated actions.

mod leaf;
mod paging;

pub use leaf::{LowLayerRequest, RequestScope};
pub use paging::{PageWindow, Paging};

use crate::catalog::{ActionView, Catalog};
use crate::constants::MAX_PAGES_PER_REQUEST;
use crate::error::SyncError;
use crate::regions::{RegionCatalog, RegionsWithData};
use crate::types::{ActionId, Params, ProviderId, RegionCode, ValidationError};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How many regional sub-requests a logical request expands into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionMode {
    /// Use the parameters as given.
    #[default]
    Single,
    /// One child per region of the provider's region catalog.
    AllRegions,
    /// One child per region the [`RegionsWithData`] strategy reports.
    RegionsWithData,
}

impl FromStr for RegionMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(RegionMode::Single),
            "all" | "all_regions" => Ok(RegionMode::AllRegions),
            "massive" | "regions_with_data" => Ok(RegionMode::RegionsWithData),
            _ => Err(ValidationError::UnknownRegionMode(s.to_string())),
        }
    }
}

impl fmt::Display for RegionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegionMode::Single => "single",
            RegionMode::AllRegions => "all_regions",
            RegionMode::RegionsWithData => "regions_with_data",
        })
    }
}

/// Everything request expansion reads: the provider catalog, the region
/// catalog and, optionally, the regions-with-data strategy.
#[derive(Clone)]
pub struct BuildContext {
    catalog: Arc<Catalog>,
    regions: Arc<dyn RegionCatalog>,
    regions_with_data: Option<Arc<dyn RegionsWithData>>,
}

impl BuildContext {
    pub fn new(catalog: Arc<Catalog>, regions: Arc<dyn RegionCatalog>) -> Self {
        Self {
            catalog,
            regions,
            regions_with_data: None,
        }
    }

    pub fn with_regions_with_data(mut self, strategy: Arc<dyn RegionsWithData>) -> Self {
        self.regions_with_data = Some(strategy);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("catalog", &self.catalog)
            .field("regions_with_data", &self.regions_with_data.is_some())
            .finish_non_exhaustive()
    }
}

/// Children of a logical request. Never a mix of the two kinds.
#[derive(Debug)]
pub enum Children {
    Regions(Vec<LogicalRequest>),
    Leaves(Vec<LowLayerRequest>),
}

impl Children {
    pub fn len(&self) -> usize {
        match self {
            Children::Regions(children) => children.len(),
            Children::Leaves(leaves) => leaves.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One "fetch action X from provider Y" call.
#[derive(Debug)]
pub struct LogicalRequest {
    provider: ProviderId,
    action: ActionId,
    region_mode: RegionMode,
    record_count_hint: u64,
    params: Params,
    region: Option<RegionCode>,
    children: OnceCell<Children>,
}

/// Collects the parts of a [`LogicalRequest`] and validates them together.
#[derive(Debug, Clone)]
pub struct LogicalRequestBuilder {
    provider: ProviderId,
    action: ActionId,
    region_mode: RegionMode,
    record_count_hint: u64,
    params: Params,
}

impl LogicalRequestBuilder {
    pub fn region_mode(mut self, mode: RegionMode) -> Self {
        self.region_mode = mode;
        self
    }

    /// Known record count; lets a paginated action fan out its pages at once.
    pub fn record_count_hint(mut self, records: u64) -> Self {
        self.record_count_hint = records;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn build(self) -> Result<LogicalRequest, SyncError> {
        if self.region_mode != RegionMode::Single && !self.action.is_query() {
            return Err(SyncError::validation(format!(
                "Region mode '{}' is only allowed for query actions, not '{}'",
                self.region_mode, self.action
            )));
        }
        if self.record_count_hint != 0 && self.region_mode != RegionMode::Single {
            return Err(SyncError::validation(format!(
                "A record count hint cannot be combined with region mode '{}'",
                self.region_mode
            )));
        }
        Ok(LogicalRequest {
            provider: self.provider,
            action: self.action,
            region_mode: self.region_mode,
            record_count_hint: self.record_count_hint,
            params: self.params,
            region: None,
            children: OnceCell::new(),
        })
    }
}

impl LogicalRequest {
    pub fn builder(provider: ProviderId, action: ActionId) -> LogicalRequestBuilder {
        LogicalRequestBuilder {
            provider,
            action,
            region_mode: RegionMode::Single,
            record_count_hint: 0,
            params: Params::new(),
        }
    }

    /// A single-region request without parameters, e.g. `query_regions`.
    pub fn new(provider: &str, action: &str) -> Result<Self, SyncError> {
        Self::builder(ProviderId::parse(provider)?, ActionId::parse(action)?).build()
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    pub fn action(&self) -> &ActionId {
        &self.action
    }

    pub fn region_mode(&self) -> RegionMode {
        self.region_mode
    }

    pub fn record_count_hint(&self) -> u64 {
        self.record_count_hint
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The region this request was fanned out to, if any.
    pub fn region(&self) -> Option<&RegionCode> {
        self.region.as_ref()
    }

    /// Children, built on first access and cached afterwards.
    pub fn children(&self, ctx: &BuildContext) -> Result<&Children, SyncError> {
        self.children.get_or_try_init(|| self.build_children(ctx))
    }

    /// Leaves regenerated from an authoritative record count.
    ///
    /// Used once the first page has told how large the collection really
    /// is. Non-paginated actions always get their single leaf back.
    pub fn repaged(&self, ctx: &BuildContext, total: u64) -> Result<Vec<LowLayerRequest>, SyncError> {
        let view = ctx.catalog.action(&self.provider, &self.action)?;
        self.leaves(&view, total)
    }

    fn build_children(&self, ctx: &BuildContext) -> Result<Children, SyncError> {
        let view = ctx.catalog.action(&self.provider, &self.action)?;
        let children = match self.region_mode {
            RegionMode::Single => Children::Leaves(self.leaves(&view, self.record_count_hint)?),
            RegionMode::AllRegions => {
                let codes = ctx.regions.regions(&self.provider);
                log::debug!(
                    "Fanning {}/{} out to {} region(s)",
                    self.provider,
                    self.action,
                    codes.len()
                );
                Children::Regions(
                    codes
                        .into_iter()
                        .map(|code| self.regional_child(&view, code, 0))
                        .collect(),
                )
            }
            RegionMode::RegionsWithData => {
                let strategy = ctx.regions_with_data.as_ref().ok_or_else(|| {
                    SyncError::validation(format!(
                        "Region mode '{}' needs a regions-with-data strategy",
                        self.region_mode
                    ))
                })?;
                let counts = strategy.regions_with_data(&self.provider, &self.action);
                log::debug!(
                    "Fanning {}/{} out to {} region(s) holding records",
                    self.provider,
                    self.action,
                    counts.len()
                );
                // One page of slack per region for records added since the
                // counts were taken.
                let slack = view.provider.limit_max;
                Children::Regions(
                    counts
                        .into_iter()
                        .map(|c| {
                            self.regional_child(&view, c.region, c.records.saturating_add(slack))
                        })
                        .collect(),
                )
            }
        };
        Ok(children)
    }

    fn regional_child(&self, view: &ActionView<'_>, region: RegionCode, hint: u64) -> LogicalRequest {
        let mut params = self.params.clone();
        params.insert(
            view.provider.region_str.clone(),
            Value::String(region.as_str().to_string()),
        );
        LogicalRequest {
            provider: self.provider.clone(),
            action: self.action.clone(),
            region_mode: RegionMode::Single,
            record_count_hint: hint,
            params,
            region: Some(region),
            children: OnceCell::new(),
        }
    }

    fn leaves(&self, view: &ActionView<'_>, records: u64) -> Result<Vec<LowLayerRequest>, SyncError> {
        let settings = &view.action.settings;
        if settings.region_required && !self.params.contains_key(&view.provider.region_str) {
            return Err(SyncError::validation(format!(
                "Action '{}' of provider '{}' requires the '{}' parameter",
                self.action, self.provider, view.provider.region_str
            )));
        }

        let scope = Arc::new(RequestScope {
            provider: self.provider.clone(),
            action: self.action.clone(),
            region: self.region.clone(),
        });

        if !settings.paging_required {
            return Ok(vec![LowLayerRequest::new(scope, self.params.clone(), None)]);
        }

        let paging = Paging::from(view.provider);
        let pages = paging.page_count(records);
        if pages > MAX_PAGES_PER_REQUEST {
            return Err(SyncError::Malformed(format!(
                "{} record(s) of {}/{} would need {} pages, more than the {} allowed",
                records, self.provider, self.action, pages, MAX_PAGES_PER_REQUEST
            )));
        }
        Ok(paging
            .windows(records)
            .map(|window| {
                let mut params = self.params.clone();
                paging.apply(&window, &mut params);
                LowLayerRequest::new(scope.clone(), params, Some(window))
            })
            .collect())
    }
}
