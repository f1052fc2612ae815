// benches/cleaner_bench.rs
//! Benchmarks for the cleaning pipeline and response merging.

use cloudsync::cleaner::{clean, path};
use cloudsync::providers::QCloudCleaner;
use cloudsync::transport::RawPayload;
use cloudsync::{
    BuildContext, CanonicalRecord, CanonicalResponse, Catalog, Children, LogicalRequest,
    ResponseAggregate, StaticRegionCatalog,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use std::sync::Arc;

const HOSTS: &str = r#"
settings:
  region_str: Region
actions:
  query_hosts:
    interface:
      name: DescribeInstances
      output:
        data: InstanceSet
        fields:
          instance_id:
            src: record
            path: InstanceId
          state:
            src: record
            path: InstanceState
            mapping:
              RUNNING: 1
              STOPPED: 4
            default: 9
          private_ip:
            src: record
            path: PrivateIpAddresses.0
            default: ""
          public_ip:
            default: ""
          zone:
            src: record
            path: Placement.Zone
          region:
            src: request
            path: Region
        hooks:
          end:
            method: make_unique
            base: common
            kwargs:
              unique_keys: [instance_id]
"#;

/// A DescribeInstances-shaped payload with `count` hosts.
fn create_payload(count: usize) -> Value {
    let hosts: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "InstanceId": format!("ins-{:08}", i),
                "InstanceState": if i % 3 == 0 { "STOPPED" } else { "RUNNING" },
                "PrivateIpAddresses": [format!("10.0.{}.{}", i / 256, i % 256)],
                "PublicIpAddresses": [format!("139.199.{}.{}", i / 256, i % 256)],
                "Placement": {"Zone": "ap-guangzhou-3"}
            })
        })
        .collect();
    json!({"TotalCount": count, "InstanceSet": hosts})
}

fn bench_clean(c: &mut Criterion) {
    let catalog = Arc::new(Catalog::new().with_provider("qcloud", HOSTS).unwrap());
    let ctx = BuildContext::new(catalog.clone(), Arc::new(StaticRegionCatalog::new()));
    let request = LogicalRequest::new("qcloud", "query_hosts").unwrap();
    let leaf = match request.children(&ctx).unwrap() {
        Children::Leaves(leaves) => leaves[0].clone(),
        Children::Regions(_) => unreachable!(),
    };
    let view = catalog
        .action(request.provider(), request.action())
        .unwrap();
    let cleaner = QCloudCleaner::new();

    let mut group = c.benchmark_group("clean_query");
    for count in [10, 100, 1000] {
        let payload = create_payload(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &payload, |b, payload| {
            b.iter(|| {
                clean(
                    &cleaner,
                    &view.action.interface.output,
                    &leaf,
                    RawPayload::new(black_box(payload.clone())),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_path(c: &mut Criterion) {
    let payload = create_payload(100);
    c.bench_function("path_extract_current_index", |b| {
        b.iter(|| {
            for i in 0..100 {
                black_box(path::extract(&payload, "InstanceSet.N.Placement.Zone", i));
            }
        })
    });
}

fn bench_merge(c: &mut Criterion) {
    let pages: Vec<CanonicalResponse> = (0..50)
        .map(|page| {
            let data: Vec<CanonicalRecord> = (0..100)
                .map(|i| {
                    let mut record = CanonicalRecord::new();
                    record.insert("id".into(), json!(page * 100 + i));
                    record
                })
                .collect();
            CanonicalResponse::new(5000, data)
        })
        .collect();

    c.bench_function("merge_50_pages", |b| {
        b.iter(|| {
            let mut aggregate = ResponseAggregate::pages();
            aggregate.extend(pages.iter().cloned());
            black_box(aggregate.finish())
        })
    });
}

criterion_group!(benches, bench_clean, bench_path, bench_merge);
criterion_main!(benches);
