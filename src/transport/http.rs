// src/transport/http.rs
//! Thin reqwest wrapper speaking the providers' query-string APIs.
//!
//! Requests are `GET <endpoint>?Action=<name>&Version=<version>&<params>`.
//! Each provider reports errors its own way; [`Dialect::interpret`] folds
//! them all into the `{"Error": {Code, Message, RequestId}}` marker.
//! Request signing is left to a proxy or gateway in front of the endpoint.

use super::{NativeTransport, RawPayload};
use crate::catalog::InterfaceConfig;
use crate::constants::BODY_PREVIEW_CHARS;
use crate::error::TransportError;
use crate::types::{Params, ProviderId, ValidatedUrl};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Wire conventions of one provider family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    AliCloud,
    QCloud,
    UCloud,
    KSCloud,
}

impl Dialect {
    pub fn for_provider(provider: &ProviderId) -> Option<Self> {
        match provider.as_str() {
            "alicloud" => Some(Dialect::AliCloud),
            "qcloud" => Some(Dialect::QCloud),
            "ucloud" => Some(Dialect::UCloud),
            "kscloud" => Some(Dialect::KSCloud),
            _ => None,
        }
    }

    /// Endpoint used when the provider settings do not name one.
    pub fn default_endpoint(self, module: Option<&str>) -> String {
        match self {
            Dialect::AliCloud => format!("https://{}.aliyuncs.com/", module.unwrap_or("ecs")),
            Dialect::QCloud => format!("https://{}.tencentcloudapi.com/", module.unwrap_or("cvm")),
            Dialect::UCloud => "https://api.ucloud.cn/".to_string(),
            Dialect::KSCloud => format!("https://{}.api.ksyun.com/", module.unwrap_or("kec")),
        }
    }

    /// First index used when a list parameter is spread over `Name.<i>`.
    fn list_base(self) -> usize {
        match self {
            Dialect::AliCloud | Dialect::KSCloud => 1,
            Dialect::QCloud | Dialect::UCloud => 0,
        }
    }

    fn param_name(self, key: &str) -> String {
        match self {
            // UCloud spells `UHostIds.0` as `UHostIds_0` in its parameter maps.
            Dialect::UCloud => key.replace('_', "."),
            _ => key.to_string(),
        }
    }

    /// Normalizes a decoded response body into a payload, moving any
    /// provider error under the error marker.
    pub fn interpret(self, status: u16, body: Value) -> RawPayload {
        let success = (200..300).contains(&status);
        match self {
            Dialect::AliCloud => {
                if success {
                    RawPayload::new(body)
                } else {
                    let code = body
                        .get("Code")
                        .map(text)
                        .unwrap_or_else(|| status.to_string());
                    RawPayload::error(
                        &code,
                        &body.get("Message").map(text).unwrap_or_else(unknown),
                        body.get("RequestId").map(text).as_deref(),
                    )
                }
            }
            Dialect::QCloud => {
                let mut body = body;
                let inner = body
                    .get_mut("Response")
                    .map(Value::take)
                    .unwrap_or(body);
                match inner.get("Error") {
                    Some(error) => RawPayload::error(
                        &error.get("Code").map(text).unwrap_or_else(unknown),
                        &error.get("Message").map(text).unwrap_or_else(unknown),
                        inner.get("RequestId").map(text).as_deref(),
                    ),
                    None => RawPayload::new(inner),
                }
            }
            Dialect::UCloud => {
                let ret_code = body.get("RetCode").map(text).unwrap_or_else(|| "0".into());
                if ret_code == "0" {
                    RawPayload::new(body)
                } else {
                    RawPayload::error(
                        &ret_code,
                        &body.get("Message").map(text).unwrap_or_else(unknown),
                        None,
                    )
                }
            }
            Dialect::KSCloud => match body.get("Error") {
                Some(error) => RawPayload::error(
                    &error.get("Code").map(text).unwrap_or_else(unknown),
                    &error.get("Message").map(text).unwrap_or_else(unknown),
                    body.get("RequestId").map(text).as_deref(),
                ),
                None => RawPayload::new(body),
            },
        }
    }

    /// Query-string pairs for one call.
    pub fn query_pairs(self, interface: &InterfaceConfig, params: &Params) -> Vec<(String, String)> {
        let mut pairs = vec![("Action".to_string(), interface.name.clone())];
        if let Some(version) = &interface.version {
            pairs.push(("Version".to_string(), version.clone()));
        }
        for (key, value) in params {
            self.flatten(self.param_name(key), value, &mut pairs);
        }
        pairs
    }

    fn flatten(self, name: String, value: &Value, out: &mut Vec<(String, String)>) {
        match value {
            Value::Null => {}
            Value::Bool(b) => out.push((name, b.to_string())),
            Value::Number(n) => {
                let rendered = match n.as_f64() {
                    Some(f) if n.is_f64() && f.fract() == 0.0 => format!("{}", f as i64),
                    _ => n.to_string(),
                };
                out.push((name, rendered));
            }
            Value::String(s) => out.push((name, s.clone())),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.flatten(format!("{}.{}", name, i + self.list_base()), item, out);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    self.flatten(format!("{}.{}", name, key), item, out);
                }
            }
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

/// HTTP transport for one provider.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Option<ValidatedUrl>,
    dialect: Dialect,
}

impl HttpTransport {
    pub fn new(
        dialect: Dialect,
        endpoint: Option<ValidatedUrl>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Http {
                action: "client setup".to_string(),
                source,
            })?;
        Ok(Self {
            client,
            endpoint,
            dialect,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn endpoint_for(&self, interface: &InterfaceConfig) -> Result<reqwest::Url, TransportError> {
        match &self.endpoint {
            Some(endpoint) => Ok(endpoint.as_url().clone()),
            None => {
                let endpoint = self.dialect.default_endpoint(interface.module.as_deref());
                reqwest::Url::parse(&endpoint).map_err(|e| TransportError::InvalidEndpoint {
                    endpoint,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn timeout_fault(interface: &InterfaceConfig) -> RawPayload {
        log::warn!("{} timed out", interface.name);
        RawPayload::error("RequestTimeout", "native request timed out", None)
    }
}

#[async_trait::async_trait]
impl NativeTransport for HttpTransport {
    async fn request(
        &self,
        interface: &InterfaceConfig,
        params: &Params,
    ) -> Result<RawPayload, TransportError> {
        let mut url = self.endpoint_for(interface)?;
        url.query_pairs_mut()
            .extend_pairs(self.dialect.query_pairs(interface, params));

        log::debug!("GET {} ({})", interface.name, url.host_str().unwrap_or("-"));

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            // A timeout may be transient; report it as a retryable fault.
            Err(e) if e.is_timeout() => return Ok(Self::timeout_fault(interface)),
            Err(source) => {
                return Err(TransportError::Http {
                    action: interface.name.clone(),
                    source,
                })
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Ok(Self::timeout_fault(interface)),
            Err(source) => {
                return Err(TransportError::Http {
                    action: interface.name.clone(),
                    source,
                })
            }
        };

        let decoded: Value =
            serde_json::from_str(&body).map_err(|_| TransportError::UndecodableBody {
                action: interface.name.clone(),
                preview: body.chars().take(BODY_PREVIEW_CHARS).collect(),
            })?;

        Ok(self.dialect.interpret(status, decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn interface(yaml: &str) -> InterfaceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn alicloud_errors_come_from_status() {
        let fault = Dialect::AliCloud
            .interpret(
                400,
                json!({"Code": "InvalidRegionId.NotFound", "Message": "bad region", "RequestId": "A1"}),
            )
            .fault()
            .unwrap();
        assert_eq!(fault.code, "InvalidRegionId.NotFound");
        assert_eq!(fault.request_id.as_deref(), Some("A1"));

        let ok = Dialect::AliCloud.interpret(200, json!({"Code": "200", "TotalCount": 1}));
        assert!(ok.fault().is_none());
    }

    #[test]
    fn qcloud_unwraps_response() {
        let ok = Dialect::QCloud.interpret(
            200,
            json!({"Response": {"TotalCount": 2, "InstanceSet": [], "RequestId": "q-1"}}),
        );
        assert_eq!(ok.as_value()["TotalCount"], json!(2));

        let err = Dialect::QCloud.interpret(
            200,
            json!({"Response": {"Error": {"Code": "RequestLimitExceeded", "Message": "slow"}, "RequestId": "q-2"}}),
        );
        let fault = err.fault().unwrap();
        assert!(fault.is_throttling());
        assert_eq!(fault.request_id.as_deref(), Some("q-2"));
    }

    #[test]
    fn ucloud_uses_ret_code() {
        assert!(Dialect::UCloud
            .interpret(200, json!({"RetCode": 0, "UHostSet": []}))
            .fault()
            .is_none());
        let fault = Dialect::UCloud
            .interpret(200, json!({"RetCode": 171, "Message": "Signature VerifyAC Error"}))
            .fault()
            .unwrap();
        assert_eq!(fault.code, "171");
    }

    #[test]
    fn kscloud_reads_error_member() {
        let fault = Dialect::KSCloud
            .interpret(403, json!({"Error": {"Code": "Forbidden", "Message": "no"}, "RequestId": "k"}))
            .fault()
            .unwrap();
        assert_eq!(fault.to_string(), "Forbidden: no (request k)");
    }

    #[test]
    fn params_are_flattened_per_dialect() {
        let iface = interface("name: DescribeUHostInstance\nversion: \"2019-01-01\"\n");
        let mut params = Params::new();
        params.insert("UHostIds_0".into(), json!("uhost-1"));
        params.insert("Limit".into(), json!(100.0));
        params.insert("Tags".into(), json!([{"Key": "env"}]));
        params.insert("Dry".into(), json!(false));
        params.insert("Skip".into(), Value::Null);

        let mut pairs = Dialect::UCloud.query_pairs(&iface, &params);
        assert_eq!(pairs[0], ("Action".to_string(), "DescribeUHostInstance".to_string()));
        assert_eq!(pairs[1], ("Version".to_string(), "2019-01-01".to_string()));
        pairs.sort();
        let expected: Vec<(String, String)> = [
            ("Action", "DescribeUHostInstance"),
            ("Dry", "false"),
            ("Limit", "100"),
            ("Tags.0.Key", "env"),
            ("UHostIds.0", "uhost-1"),
            ("Version", "2019-01-01"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(pairs, expected);

        let ali = Dialect::AliCloud.query_pairs(&iface, &params);
        assert!(ali.contains(&("Tags.1.Key".to_string(), "env".to_string())));
        assert!(ali.contains(&("UHostIds_0".to_string(), "uhost-1".to_string())));
    }

    #[test]
    fn default_endpoints_follow_module() {
        assert_eq!(
            Dialect::AliCloud.default_endpoint(Some("cms")),
            "https://cms.aliyuncs.com/"
        );
        assert_eq!(
            Dialect::QCloud.default_endpoint(None),
            "https://cvm.tencentcloudapi.com/"
        );
    }
}
