//! End-to-end runs against the embedded stores.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use jobbench::backends::{Backend, EmbeddedChannel, NativeKvBackend, SqlOverlayBackend};
use jobbench::config::{BackendsConfig, NativeKvConfig, OverlayEndpoint};
use jobbench::{
    BackendKind, BackendSet, BenchConfig, CollectingReporter, ConfiguredConnector, JobGenerator,
    Phase, Runner,
};

fn data_generator() -> JobGenerator {
    let data = concat!(env!("CARGO_MANIFEST_DIR"), "/data");
    JobGenerator::from_paths(
        format!("{}/job.json", data),
        format!("{}/firstnames.txt", data),
        format!("{}/lastnames.txt", data),
    )
    .unwrap()
}

#[test]
fn test_bundled_template_matches_job_model() {
    let generator = data_generator();
    let job = generator.template().to_typed().unwrap();
    assert_eq!(job.nodes.len(), 2);

    let mut rng = StdRng::seed_from_u64(1);
    let record = generator.produce(77, &mut rng);
    let typed = record.to_typed().unwrap();
    assert_eq!(typed.job_id, 77);
    assert_eq!(typed.customer_name, record.customer_name());
    assert_eq!(typed.cost, job.cost);
}

#[tokio::test]
async fn test_native_kv_reports_missing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let config = NativeKvConfig {
        path: Some(dir.path().join("sled")),
        ..NativeKvConfig::default()
    };
    let backend = NativeKvBackend::open(&config).unwrap();
    backend.prepare().await.unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let records = data_generator().generate(20, &mut rng);
    for result in backend.insert_many(&records, Duration::from_secs(1)).await {
        result.unwrap();
    }

    for id in 0..20 {
        let stored: serde_json::Value =
            serde_json::from_str(&backend.get(id).await.unwrap()).unwrap();
        assert_eq!(stored["JobId"], id);
    }
    for id in [20, 21, 10_000] {
        assert!(backend.get(id).await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn test_overlay_round_trip_through_embedded_channel() {
    let backend =
        SqlOverlayBackend::with_channel(Box::new(EmbeddedChannel::new()), "jobs_db", "jobs")
            .unwrap();
    backend.prepare().await.unwrap();

    let mut rng = StdRng::seed_from_u64(4);
    let records = data_generator().generate(5, &mut rng);
    for record in &records {
        backend.insert(record).await.unwrap();
    }

    let rows = backend.query("SELECT * FROM jobs").await.unwrap();
    assert_eq!(rows.len(), 5);
    for row in &rows {
        assert_eq!(row.columns(), &["id", "data", "timestamp"]);
    }

    let stored = backend.get(3).await.unwrap();
    assert_eq!(stored, records[3].to_json());
}

#[tokio::test]
async fn test_configured_connector_runs_embedded_backends() {
    let dir = tempfile::tempdir().unwrap();
    let mut connections = BackendsConfig::default();
    connections.native_kv.path = Some(dir.path().join("sled"));
    connections.sql_overlay.endpoint = OverlayEndpoint::Embedded;

    let config = BenchConfig::new(BackendSet::only(BackendKind::SqlOverlay) | BackendKind::NativeKv)
        .with_record_count(50)
        .with_lookups_per_round(25)
        .with_read_rounds(2)
        .with_seed(9)
        .with_connections(connections.clone());

    let mut reporter = CollectingReporter::new();
    let summary = Runner::new(config, ConfiguredConnector::new(connections))
        .run(&data_generator(), &mut reporter)
        .await
        .unwrap();

    assert!(summary.unavailable.is_empty());
    assert_eq!(reporter.samples.len(), 2 * (1 + 2));
    assert_eq!(reporter.samples[0].backend, BackendKind::NativeKv);
    assert_eq!(reporter.samples[3].backend, BackendKind::SqlOverlay);

    for sample in &reporter.samples {
        assert_eq!(sample.tally.failed, 0, "{:?}", sample);
        if sample.phase == Phase::Read {
            assert_eq!(sample.tally.hits, 25);
        }
    }
}
