// src/request/paging.rs
//! Page arithmetic for paginated provider actions.

use crate::catalog::{PagingBase, ProviderSettings};
use crate::types::Params;
use serde_json::Value;

/// Position of one page inside a paginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based page index.
    pub index: u64,
    /// Page size sent to the provider.
    pub limit: u64,
    /// Value of the provider's offset parameter for this page.
    pub offset: u64,
}

/// A provider's pagination convention, read from its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    limit_str: String,
    limit: u64,
    offset_str: String,
    offset_init: u64,
    base: PagingBase,
}

impl From<&ProviderSettings> for Paging {
    fn from(settings: &ProviderSettings) -> Self {
        Self {
            limit_str: settings.limit_str.clone(),
            limit: settings.limit_max.max(1),
            offset_str: settings.offset_str.clone(),
            offset_init: settings.offset_init,
            base: settings.paging_base,
        }
    }
}

impl Paging {
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Pages needed to cover `records`; an unknown or zero count still
    /// yields the first page.
    pub fn page_count(&self, records: u64) -> u64 {
        records.div_ceil(self.limit).max(1)
    }

    pub fn window(&self, index: u64) -> PageWindow {
        let step = match self.base {
            PagingBase::Page => 1,
            PagingBase::Offset => self.limit,
        };
        PageWindow {
            index,
            limit: self.limit,
            offset: self.offset_init.saturating_add(index.saturating_mul(step)),
        }
    }

    pub fn windows(&self, records: u64) -> impl Iterator<Item = PageWindow> + '_ {
        (0..self.page_count(records)).map(move |index| self.window(index))
    }

    /// Writes the page size and offset under the provider's parameter names.
    pub fn apply(&self, window: &PageWindow, params: &mut Params) {
        params.insert(self.limit_str.clone(), Value::from(window.limit));
        params.insert(self.offset_str.clone(), Value::from(window.offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(base: PagingBase, init: u64) -> ProviderSettings {
        serde_yaml::from_str::<ProviderSettings>(&format!(
            "limit_str: PageSize\nlimit_max: 20\noffset_str: PageNumber\noffset_init: {}\npaging_base: {}\n",
            init,
            match base {
                PagingBase::Page => "page",
                PagingBase::Offset => "offset",
            }
        ))
        .unwrap()
    }

    #[test]
    fn page_count_rounds_up() {
        let paging = Paging::from(&settings(PagingBase::Offset, 0));
        assert_eq!(paging.page_count(0), 1);
        assert_eq!(paging.page_count(1), 1);
        assert_eq!(paging.page_count(20), 1);
        assert_eq!(paging.page_count(21), 2);
        assert_eq!(paging.page_count(50), 3);
    }

    #[test]
    fn page_base_advances_by_one() {
        let paging = Paging::from(&settings(PagingBase::Page, 1));
        let offsets: Vec<_> = paging.windows(50).map(|w| w.offset).collect();
        assert_eq!(offsets, vec![1, 2, 3]);
    }

    #[test]
    fn offset_base_advances_by_limit() {
        let paging = Paging::from(&settings(PagingBase::Offset, 0));
        let offsets: Vec<_> = paging.windows(50).map(|w| w.offset).collect();
        assert_eq!(offsets, vec![0, 20, 40]);
    }

    #[test]
    fn apply_uses_provider_names() {
        let paging = Paging::from(&settings(PagingBase::Page, 1));
        let mut params = Params::new();
        params.insert("RegionId".into(), json!("cn-hangzhou"));
        paging.apply(&paging.window(2), &mut params);
        assert_eq!(
            Value::Object(params),
            json!({"RegionId": "cn-hangzhou", "PageSize": 20, "PageNumber": 3})
        );
    }
}
