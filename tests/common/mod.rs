// tests/common/mod.rs
//! Shared helpers: a scripted in-memory transport and a small catalog.
#![allow(dead_code)]

use cloudsync::transport::{NativeTransport, RawPayload};
use cloudsync::{InterfaceConfig, Params, TransportError};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MOCKCLOUD: &str = r#"
settings:
  req_limit: 2
  limit_str: Limit
  limit_max: 10
  offset_str: Offset
  offset_init: 0
  paging_base: offset
  region_str: Region
actions:
  query_hosts:
    settings:
      paging: true
    interface:
      name: DescribeHosts
      output:
        data: Hosts
        total: TotalCount
        fields:
          id:
            src: record
            path: Id
          region:
            src: request
            path: Region
            default: default
  query_unique_hosts:
    settings:
      paging: true
    interface:
      name: DescribeHosts
      output:
        data: Hosts
        total: TotalCount
        fields:
          id:
            src: record
            path: Id
        hooks:
          end:
            method: make_unique
            base: common
            kwargs:
              unique_keys: [id]
  query_zones:
    interface:
      name: DescribeZones
      output:
        data: Zones
        fields:
          zone:
            src: record
            path: Zone
  operation_stop_hosts:
    interface:
      name: StopHosts
      input_params: [HostIds]
"#;

type Responder =
    dyn Fn(&InterfaceConfig, &Params, usize) -> Result<RawPayload, TransportError> + Send + Sync;

/// In-memory transport answering from a closure after a fixed latency.
///
/// Counts calls and the highest number of calls in flight at once.
pub struct ScriptedTransport {
    latency: Duration,
    responder: Box<Responder>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new<F>(latency: Duration, responder: F) -> Arc<Self>
    where
        F: Fn(&InterfaceConfig, &Params, usize) -> Result<RawPayload, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            latency,
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NativeTransport for ScriptedTransport {
    async fn request(
        &self,
        interface: &InterfaceConfig,
        params: &Params,
    ) -> Result<RawPayload, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.responder)(interface, params, call)
    }
}

/// One page of `total` hosts, honouring `Offset` and `Limit`.
/// Host ids are `<region>-<n>`.
pub fn hosts_page(params: &Params, total: u64) -> RawPayload {
    let offset = params.get("Offset").and_then(Value::as_u64).unwrap_or(0);
    let limit = params.get("Limit").and_then(Value::as_u64).unwrap_or(10);
    let region = params
        .get("Region")
        .and_then(Value::as_str)
        .unwrap_or("default");
    let hosts: Vec<Value> = (offset..(offset + limit).min(total))
        .map(|i| json!({ "Id": format!("{}-{}", region, i) }))
        .collect();
    RawPayload::new(json!({ "Hosts": hosts, "TotalCount": total }))
}

pub fn zones() -> RawPayload {
    RawPayload::new(json!({ "Zones": [{ "Zone": "z-1" }, { "Zone": "z-2" }] }))
}

pub fn throttled() -> RawPayload {
    RawPayload::error("Throttling", "Request was denied due to flow control", Some("req-x"))
}

/// Offset of a paginated call.
pub fn offset(params: &Params) -> u64 {
    params.get("Offset").and_then(Value::as_u64).unwrap_or(0)
}

pub fn region(params: &Params) -> &str {
    params.get("Region").and_then(Value::as_str).unwrap_or("")
}

/// The provider configurations shipped in `config/providers`.
pub fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/providers")
}

pub fn shipped_regions_file() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/regions.yaml")
}

pub fn fixture(name: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/payloads")
        .join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e));
    serde_json::from_str(&text).unwrap()
}
