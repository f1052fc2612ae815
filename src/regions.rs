// src/regions.rs
//! Region sources used by region fan-out.
//!
//! [`RegionCatalog`] answers "which regions does this provider have" for the
//! all-regions mode. [`RegionsWithData`] is the extension point for the
//! regions-with-data mode: it decides which regions are known to hold
//! records and how many. [`RecordCountIndex`] is the in-memory
//! implementation fed from previously synchronized record counts; callers
//! with another source of truth implement the trait themselves.

use crate::error::SyncError;
use crate::types::{ActionId, ProviderId, RegionCode};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Flat, ordered list of region codes per provider.
pub trait RegionCatalog: Send + Sync {
    fn regions(&self, provider: &ProviderId) -> Vec<RegionCode>;
}

/// A region together with the number of records it held at last count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRecordCount {
    pub region: RegionCode,
    pub records: u64,
}

/// Strategy for the regions-with-data fan-out mode.
pub trait RegionsWithData: Send + Sync {
    /// Regions believed to hold records for `action`, with their last known
    /// record counts. Regions with no records should be left out.
    fn regions_with_data(&self, provider: &ProviderId, action: &ActionId) -> Vec<RegionRecordCount>;
}

/// Region catalog backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticRegionCatalog {
    regions: HashMap<ProviderId, Vec<RegionCode>>,
}

impl StaticRegionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regions<I, S>(mut self, provider: &str, codes: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let provider = ProviderId::parse(provider)?;
        let codes = codes
            .into_iter()
            .map(|c| RegionCode::parse(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.regions.insert(provider, codes);
        Ok(self)
    }

    /// Loads a YAML map of `provider: [region, ...]`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let table: BTreeMap<ProviderId, Vec<RegionCode>> =
            serde_yaml::from_str(&text).map_err(|source| SyncError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!(
            "Loaded region catalog for {} provider(s) from {}",
            table.len(),
            path.display()
        );
        Ok(Self {
            regions: table.into_iter().collect(),
        })
    }
}

impl RegionCatalog for StaticRegionCatalog {
    fn regions(&self, provider: &ProviderId) -> Vec<RegionCode> {
        self.regions.get(provider).cloned().unwrap_or_default()
    }
}

type CountKey = (ProviderId, ActionId);

/// Per-(provider, action, region) record counts recorded by earlier syncs.
///
/// Counts are refreshed with [`record`](Self::record) after each
/// synchronization; regions whose count is zero are not reported.
#[derive(Debug, Default)]
pub struct RecordCountIndex {
    counts: RwLock<HashMap<CountKey, BTreeMap<RegionCode, u64>>>,
}

impl RecordCountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, provider: &ProviderId, action: &ActionId, region: &RegionCode, records: u64) {
        self.counts
            .write()
            .entry((provider.clone(), action.clone()))
            .or_default()
            .insert(region.clone(), records);
    }
}

impl RegionsWithData for RecordCountIndex {
    fn regions_with_data(&self, provider: &ProviderId, action: &ActionId) -> Vec<RegionRecordCount> {
        let counts = self.counts.read();
        counts
            .get(&(provider.clone(), action.clone()))
            .map(|regions| {
                regions
                    .iter()
                    .filter(|(_, records)| **records > 0)
                    .map(|(region, records)| RegionRecordCount {
                        region: region.clone(),
                        records: *records,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalog_keeps_order() {
        let catalog = StaticRegionCatalog::new()
            .with_regions("qcloud", ["ap-shanghai", "ap-beijing", "ap-guangzhou"])
            .unwrap();
        let codes: Vec<_> = catalog
            .regions(&ProviderId::parse("qcloud").unwrap())
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(codes, vec!["ap-shanghai", "ap-beijing", "ap-guangzhou"]);
        assert!(catalog
            .regions(&ProviderId::parse("ucloud").unwrap())
            .is_empty());
    }

    #[test]
    fn count_index_skips_empty_regions() {
        let index = RecordCountIndex::new();
        let provider = ProviderId::parse("alicloud").unwrap();
        let action = ActionId::parse("query_hosts").unwrap();
        let hz = RegionCode::parse("cn-hangzhou").unwrap();
        let bj = RegionCode::parse("cn-beijing").unwrap();

        index.record(&provider, &action, &hz, 120);
        index.record(&provider, &action, &bj, 0);

        let regions = index.regions_with_data(&provider, &action);
        assert_eq!(
            regions,
            vec![RegionRecordCount {
                region: hz.clone(),
                records: 120
            }]
        );

        index.record(&provider, &action, &hz, 0);
        assert!(index.regions_with_data(&provider, &action).is_empty());
    }
}
