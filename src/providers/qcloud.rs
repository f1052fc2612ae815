// src/providers/qcloud.rs
//! QCloud (Tencent Cloud) cleaner.

use super::{acknowledgement, join_strings};
use crate::cleaner::{
    path, utc_offset_hours, HookTable, Kwargs, ProviderCleaner, ResolveScope, TimeBucket,
};
use crate::error::SyncError;
use crate::response::CanonicalResponse;
use crate::types::ActionId;
use serde_json::{Map, Value};

pub struct QCloudCleaner {
    hooks: HookTable,
}

impl QCloudCleaner {
    pub fn new() -> Self {
        let hooks = HookTable::common()
            .with_default_resolver("query_hosts", "public_ip", host_public_ip)
            .with_default_resolver("query_monitor_data", "host", monitored_host)
            .with_start("query_monitor_data", "bucket_timestamps", merge_datapoints);
        Self { hooks }
    }
}

impl Default for QCloudCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderCleaner for QCloudCleaner {
    fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    fn clean_operation(
        &self,
        _action: &ActionId,
        payload: &Value,
    ) -> Result<CanonicalResponse, SyncError> {
        Ok(acknowledgement(payload, "RequestId"))
    }
}

fn host_public_ip(_: &ResolveScope<'_>, record: &Value, _: usize) -> Option<Value> {
    join_strings(record.get("PublicIpAddresses")).or_else(|| Some(Value::from("")))
}

/// The monitored instance is named once per response, in the dimensions
/// of the first data point.
fn monitored_host(scope: &ResolveScope<'_>, _: &Value, _: usize) -> Option<Value> {
    path::extract(scope.origin, "DataPoints.0.Dimensions.0.Value", 0).cloned()
}

/// `DataPoints[0]` carries parallel `Timestamps` (seconds) and `Values`
/// lists; fold them into one list of bucketed records under `Values`.
fn merge_datapoints(mut payload: Value, kwargs: &Kwargs) -> Result<Value, SyncError> {
    let offset = utc_offset_hours(kwargs);
    let Some(point) = payload
        .get_mut("DataPoints")
        .and_then(|points| points.get_mut(0))
    else {
        return Ok(payload);
    };
    let point = point
        .as_object_mut()
        .ok_or_else(|| SyncError::Malformed("DataPoints[0] is not an object".to_string()))?;

    let timestamps = point
        .get("Timestamps")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let values = point
        .get("Values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if timestamps.len() != values.len() {
        return Err(SyncError::Malformed(format!(
            "DataPoints carries {} timestamps but {} values",
            timestamps.len(),
            values.len()
        )));
    }

    let merged: Vec<Value> = timestamps
        .iter()
        .zip(values)
        .filter_map(|(ts, value)| {
            let bucket = TimeBucket::from_unix_seconds(ts.as_i64()?, offset)?;
            let mut record = Map::new();
            bucket.write_into(&mut record);
            record.insert("Value".into(), value);
            Some(Value::Object(record))
        })
        .collect();

    point.insert("Values".to_string(), Value::Array(merged));
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn public_ips_are_joined() {
        let action = ActionId::parse("query_hosts").unwrap();
        let empty = json!({});
        let scope = ResolveScope {
            origin: &empty,
            params: &empty,
            action: &action,
        };
        let record = json!({"PublicIpAddresses": ["1.1.1.1", "2.2.2.2"]});
        assert_eq!(
            host_public_ip(&scope, &record, 0),
            Some(json!("1.1.1.1,2.2.2.2"))
        );
        assert_eq!(
            host_public_ip(&scope, &json!({"PublicIpAddresses": null}), 0),
            Some(json!(""))
        );
    }

    #[test]
    fn timestamps_and_values_are_merged() {
        let payload = json!({
            "DataPoints": [{
                "Dimensions": [{"Name": "InstanceId", "Value": "ins-1"}],
                "Timestamps": [1577838600, 1577838660],
                "Values": [0.5, 0.75]
            }]
        });
        let hooked = merge_datapoints(payload, &Kwargs::new()).unwrap();
        assert_eq!(
            hooked["DataPoints"][0]["Values"],
            json!([
                {"Day": "2020-01-01", "Hour": 8, "Minute": 30, "Value": 0.5},
                {"Day": "2020-01-01", "Hour": 8, "Minute": 31, "Value": 0.75}
            ])
        );
    }

    #[test]
    fn mismatched_series_are_malformed() {
        let payload = json!({"DataPoints": [{"Timestamps": [1], "Values": []}]});
        assert!(matches!(
            merge_datapoints(payload, &Kwargs::new()),
            Err(SyncError::Malformed(_))
        ));
    }

    #[test]
    fn non_object_datapoint_is_malformed() {
        let payload = json!({"DataPoints": [0]});
        assert!(matches!(
            merge_datapoints(payload, &Kwargs::new()),
            Err(SyncError::Malformed(_))
        ));
    }

    #[test]
    fn host_comes_from_the_original_payload() {
        let action = ActionId::parse("query_monitor_data").unwrap();
        let origin = json!({"DataPoints": [{"Dimensions": [{"Value": "ins-9"}]}]});
        let params = json!({});
        let scope = ResolveScope {
            origin: &origin,
            params: &params,
            action: &action,
        };
        assert_eq!(monitored_host(&scope, &json!({}), 3), Some(json!("ins-9")));
    }
}
