// src/request/leaf.rs
//! The atomic unit of work: one native API call.

use super::paging::PageWindow;
use crate::types::{ActionId, Params, ProviderId, RegionCode};
use std::fmt;
use std::sync::Arc;

/// What every leaf of one logical request has in common.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScope {
    pub provider: ProviderId,
    pub action: ActionId,
    /// Set on leaves produced by region fan-out.
    pub region: Option<RegionCode>,
}

/// Exact parameters of one native call, plus the page it covers when the
/// action is paginated.
#[derive(Debug, Clone)]
pub struct LowLayerRequest {
    scope: Arc<RequestScope>,
    params: Params,
    page: Option<PageWindow>,
}

impl LowLayerRequest {
    pub(crate) fn new(scope: Arc<RequestScope>, params: Params, page: Option<PageWindow>) -> Self {
        Self {
            scope,
            params,
            page,
        }
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    pub fn provider(&self) -> &ProviderId {
        &self.scope.provider
    }

    pub fn action(&self) -> &ActionId {
        &self.scope.action
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn page(&self) -> Option<&PageWindow> {
        self.page.as_ref()
    }

    pub fn is_paged(&self) -> bool {
        self.page.is_some()
    }
}

impl fmt::Display for LowLayerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope.provider, self.scope.action)?;
        if let Some(region) = &self.scope.region {
            write!(f, "@{}", region)?;
        }
        if let Some(page) = &self.page {
            write!(f, "#p{}", page.index)?;
        }
        Ok(())
    }
}
