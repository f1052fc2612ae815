// src/response.rs
//! Canonical response shape and the accumulator that merges partial results.

use crate::error::ProviderFault;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// One normalized record: canonical field name → value, in field-config order.
pub type CanonicalRecord = IndexMap<String, Value>;

/// `{total, current, data}`: the shape every provider payload is reduced to.
///
/// `current` is always `data.len()`; it is derived rather than stored so the
/// two can never drift apart. `total` is the provider's count for the whole
/// collection and may exceed `current` for a single page.
///
/// End hooks may adjust `total` (de-duplication lowers it). The count the
/// provider itself reported is kept apart in `reported_total`, which is
/// what pagination is planned from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalResponse {
    total: u64,
    reported_total: u64,
    data: Vec<CanonicalRecord>,
    faults: Vec<ProviderFault>,
}

impl CanonicalResponse {
    pub fn new(total: u64, data: Vec<CanonicalRecord>) -> Self {
        Self {
            total,
            reported_total: total,
            data,
            faults: Vec::new(),
        }
    }

    /// A response whose total equals its record count.
    pub fn complete(data: Vec<CanonicalRecord>) -> Self {
        Self::new(data.len() as u64, data)
    }

    /// A response carrying only a provider fault that survived retries.
    pub fn from_fault(fault: ProviderFault) -> Self {
        Self {
            faults: vec![fault],
            ..Self::default()
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// The provider's count before any end hook touched `total`.
    pub fn reported_total(&self) -> u64 {
        self.reported_total
    }

    pub fn current(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[CanonicalRecord] {
        &self.data
    }

    pub fn faults(&self) -> &[ProviderFault] {
        &self.faults
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    pub(crate) fn with_reported_total(self, reported_total: u64) -> Self {
        Self {
            reported_total,
            ..self
        }
    }

    pub fn into_parts(self) -> (u64, Vec<CanonicalRecord>, Vec<ProviderFault>) {
        (self.total, self.data, self.faults)
    }

    /// JSON export: `{total, current, data}` plus `errors` when faults exist.
    pub fn to_json(&self) -> Value {
        #[derive(Serialize)]
        struct Export<'a> {
            total: u64,
            current: usize,
            data: &'a [CanonicalRecord],
            #[serde(skip_serializing_if = "Vec::is_empty")]
            errors: Vec<&'a Value>,
        }

        serde_json::to_value(Export {
            total: self.total,
            current: self.current(),
            data: &self.data,
            errors: self.faults.iter().map(|f| &f.raw).collect(),
        })
        .unwrap_or(Value::Null)
    }
}

/// How partial responses combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Pages of one logical collection: they share one total.
    Pages,
    /// Distinct regions: each contributes its own total.
    Regions,
}

/// Accumulates partial responses under one [`MergeMode`].
///
/// Data is concatenated and `current` summed in both modes. With
/// [`MergeMode::Pages`] the total comes from the first part that carries
/// records; with [`MergeMode::Regions`] totals are summed.
#[derive(Debug)]
pub struct ResponseAggregate {
    mode: MergeMode,
    total: u64,
    total_settled: bool,
    data: Vec<CanonicalRecord>,
    faults: Vec<ProviderFault>,
}

impl ResponseAggregate {
    pub fn new(mode: MergeMode) -> Self {
        Self {
            mode,
            total: 0,
            total_settled: false,
            data: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn pages() -> Self {
        Self::new(MergeMode::Pages)
    }

    pub fn regions() -> Self {
        Self::new(MergeMode::Regions)
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    pub fn absorb(&mut self, part: CanonicalResponse) {
        let (total, data, faults) = part.into_parts();
        match self.mode {
            MergeMode::Pages => {
                if !self.total_settled && !data.is_empty() {
                    self.total = total;
                    self.total_settled = true;
                }
            }
            MergeMode::Regions => self.total += total,
        }
        self.data.extend(data);
        self.faults.extend(faults);
    }

    pub fn finish(self) -> CanonicalResponse {
        CanonicalResponse {
            total: self.total,
            reported_total: self.total,
            data: self.data,
            faults: self.faults,
        }
    }
}

impl Extend<CanonicalResponse> for ResponseAggregate {
    fn extend<I: IntoIterator<Item = CanonicalResponse>>(&mut self, iter: I) {
        for part in iter {
            self.absorb(part);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records(tag: &str, n: usize) -> Vec<CanonicalRecord> {
        (0..n)
            .map(|i| {
                let mut r = CanonicalRecord::new();
                r.insert("id".to_string(), json!(format!("{}-{}", tag, i)));
                r
            })
            .collect()
    }

    #[test]
    fn pages_take_total_from_first_part_with_records() {
        let a = records("a", 20);
        let b = records("b", 20);
        let c = records("c", 10);
        let mut aggregate = ResponseAggregate::pages();
        aggregate.absorb(CanonicalResponse::new(50, a.clone()));
        aggregate.absorb(CanonicalResponse::new(0, b.clone()));
        aggregate.absorb(CanonicalResponse::new(0, c.clone()));
        let merged = aggregate.finish();

        assert_eq!(merged.total(), 50);
        assert_eq!(merged.current(), 50);
        assert_eq!(merged.data(), [a, b, c].concat().as_slice());
    }

    #[test]
    fn pages_skip_empty_leading_parts_for_total() {
        let mut aggregate = ResponseAggregate::pages();
        aggregate.absorb(CanonicalResponse::new(99, vec![]));
        aggregate.absorb(CanonicalResponse::new(7, records("x", 7)));
        aggregate.absorb(CanonicalResponse::new(3, records("y", 3)));
        let merged = aggregate.finish();
        assert_eq!(merged.total(), 7);
        assert_eq!(merged.current(), 10);
    }

    #[test]
    fn regions_sum_totals() {
        let x = records("x", 10);
        let y = records("y", 5);
        let mut aggregate = ResponseAggregate::regions();
        aggregate.extend([
            CanonicalResponse::new(10, x.clone()),
            CanonicalResponse::new(5, y.clone()),
        ]);
        let merged = aggregate.finish();
        assert_eq!(merged.total(), 15);
        assert_eq!(merged.current(), 15);
        assert_eq!(merged.data(), [x, y].concat().as_slice());
    }

    #[test]
    fn empty_aggregate_is_a_valid_shape() {
        let merged = ResponseAggregate::regions().finish();
        assert_eq!(merged.to_json(), json!({"total": 0, "current": 0, "data": []}));
    }

    #[test]
    fn faults_are_exported_as_errors() {
        let fault = ProviderFault::from_marker(&json!({"Code": "Forbidden", "Message": "no"}));
        let response = CanonicalResponse::from_fault(fault);
        assert_eq!(response.current(), 0);
        assert_eq!(
            response.to_json(),
            json!({
                "total": 0,
                "current": 0,
                "data": [],
                "errors": [{"Code": "Forbidden", "Message": "no"}]
            })
        );
    }
}
