//! Orchestrator end-to-end tests.
//!
//! Full flow against real directories: build -> start -> ingest -> report
//! -> shutdown, then a second daemon instance over the same data directory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use logdrop_core::config::LogdropConfig;
use logdrop_core::pipeline::HealthStatus;
use logdrop_daemon::orchestrator::Orchestrator;

const UNIT_A: &str = "6f1c2d3e-4a5b-4c6d-8e7f-901a2b3c4d5e";
const UNIT_B: &str = "0a1b2c3d-4e5f-4a6b-9c7d-8e9f0a1b2c3d";
const WAIT: Duration = Duration::from_secs(10);

fn test_config(root: &Path) -> LogdropConfig {
    let mut config = LogdropConfig::default();
    config.general.log_format = "pretty".to_owned();
    config.ingest.input_dir = root.join("incoming").display().to_string();
    config.ingest.workers = 2;
    config.ingest.scan_interval_secs = 1;
    config.storage.data_dir = root.join("data").display().to_string();
    config.report.output_dir = root.join("reports").display().to_string();
    config
}

fn row(unit: &str, msg_id: &str) -> String {
    [
        "plant/line2",
        "1",
        unit,
        msg_id,
        "Pressure low",
        "pump",
        "warning",
        "1",
        "B2",
        "DB30.DBW4",
        "7",
        "int",
        "",
        "1",
    ]
    .join("\t")
}

fn drop_file(root: &Path, name: &str, rows: &[String]) -> PathBuf {
    let dir = root.join("incoming");
    std::fs::create_dir_all(&dir).expect("create input dir");
    let path = dir.join(name);
    std::fs::write(&path, format!("{}\n", rows.join("\n"))).expect("write tsv");
    path
}

fn report_path(root: &Path, unit: &str) -> PathBuf {
    root.join("reports").join(format!("{unit}.txt"))
}

async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[tokio::test]
async fn test_dropped_file_produces_reports_per_unit() {
    // Given: A file with rows for two units and one malformed row
    let temp_dir = TempDir::new().expect("should create temp dir");
    let root = temp_dir.path();
    drop_file(
        root,
        "batch-001.tsv",
        &[
            row(UNIT_A, "P-1"),
            row(UNIT_A, "P-2"),
            row(UNIT_B, "P-3"),
            "too\tfew\tcolumns".to_owned(),
        ],
    );
    let mut orchestrator = Orchestrator::build_from_config(test_config(root))
        .await
        .expect("orchestrator should build");

    // When: Starting the daemon pipeline
    orchestrator.start().await.expect("should start");
    let orch = &orchestrator;
    let finished =
        wait_until(move || async move { orch.health().await.stats.files_finished() >= 1 }).await;

    // Then: The file completes as failed (one bad row) and both unit reports exist
    assert!(finished, "file should be processed");
    let health = orchestrator.health().await;
    assert_eq!(health.stats.rows_stored, 3);
    assert_eq!(health.stats.parse_failures, 1);
    assert_eq!(health.stats.files_failed, 1);
    assert_eq!(health.completed_files, 1);

    assert!(
        wait_until(move || async move {
            report_path(root, UNIT_A).exists() && report_path(root, UNIT_B).exists()
        })
        .await,
        "reports for both units should be written"
    );
    let report_a = std::fs::read_to_string(report_path(root, UNIT_A)).expect("read report");
    assert!(report_a.contains(UNIT_A));
    assert!(report_a.contains("P-1"));
    assert!(report_a.contains("P-2"));
    assert!(!report_a.contains("P-3"));

    orchestrator.shutdown().await.expect("should shut down");
    assert_eq!(orchestrator.state_name(), "stopped");
}

#[tokio::test]
async fn test_restarted_daemon_skips_completed_files() {
    // Given: A first daemon run that processed one file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let root = temp_dir.path();
    drop_file(root, "batch-002.tsv", &[row(UNIT_A, "R-1")]);

    let mut first = Orchestrator::build_from_config(test_config(root))
        .await
        .expect("first build");
    first.start().await.expect("first start");
    let orch = &first;
    assert!(
        wait_until(move || async move { orch.health().await.completed_files == 1 }).await,
        "first run should complete the file"
    );
    first.shutdown().await.expect("first shutdown");

    // When: A second daemon starts over the same data directory
    let mut second = Orchestrator::build_from_config(test_config(root))
        .await
        .expect("second build");
    second.start().await.expect("second start");
    let orch = &second;
    assert!(
        wait_until(move || async move { orch.health().await.stats.scans >= 2 }).await,
        "second run should scan"
    );

    // Then: Nothing is enqueued and no new rows are stored
    let health = second.health().await;
    assert_eq!(health.completed_files, 1);
    assert_eq!(health.stats.files_enqueued, 0);
    assert_eq!(health.stats.rows_stored, 0);
    second.shutdown().await.expect("second shutdown");
}

#[tokio::test]
async fn test_health_follows_lifecycle() {
    // Given: A built but not started orchestrator
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut orchestrator = Orchestrator::build_from_config(test_config(temp_dir.path()))
        .await
        .expect("should build");

    // Then: Not started is unhealthy
    let before = orchestrator.health().await;
    assert_eq!(
        before.status,
        HealthStatus::Unhealthy("ingest-pipeline: not started".to_owned())
    );

    // When: Running with an empty input directory
    orchestrator.start().await.expect("should start");
    let running = orchestrator.health().await;
    assert_eq!(running.status, HealthStatus::Healthy);
    assert_eq!(running.components.len(), 4);

    // When: Stopped
    orchestrator.shutdown().await.expect("should stop");
    let after = orchestrator.health().await;
    assert_eq!(
        after.status,
        HealthStatus::Unhealthy("ingest-pipeline: stopped".to_owned())
    );
}

#[tokio::test]
async fn test_missing_report_dir_turns_health_unhealthy() {
    // Given: A running orchestrator
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut orchestrator = Orchestrator::build_from_config(test_config(temp_dir.path()))
        .await
        .expect("should build");
    orchestrator.start().await.expect("should start");

    // When: The report directory disappears
    std::fs::remove_dir_all(temp_dir.path().join("reports")).expect("remove reports");

    // Then: The aggregated status names the component
    match orchestrator.health().await.status {
        HealthStatus::Unhealthy(reason) => assert!(reason.starts_with("report-dir:"), "{reason}"),
        other => panic!("expected unhealthy, got {other:?}"),
    }
    orchestrator.shutdown().await.expect("should stop");
}

#[tokio::test]
async fn test_double_start_and_stop_are_rejected() {
    // Given: A running orchestrator
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut orchestrator = Orchestrator::build_from_config(test_config(temp_dir.path()))
        .await
        .expect("should build");
    orchestrator.start().await.expect("first start");

    // When/Then: A second start fails
    let err = orchestrator.start().await.expect_err("second start should fail");
    assert!(err.to_string().contains("failed to start ingest pipeline"));

    // When/Then: Stop succeeds once, then fails
    orchestrator.shutdown().await.expect("first shutdown");
    assert!(orchestrator.shutdown().await.is_err());
}

#[tokio::test]
async fn test_health_report_serializes_to_json() {
    // Given: A fresh orchestrator
    let temp_dir = TempDir::new().expect("should create temp dir");
    let orchestrator = Orchestrator::build_from_config(test_config(temp_dir.path()))
        .await
        .expect("should build");

    // When: Serializing its health report
    let json = serde_json::to_value(orchestrator.health().await).expect("serialize");

    // Then: Status is tagged and counters are present
    assert_eq!(json["status"]["status"], "unhealthy");
    assert_eq!(json["stats"]["files_enqueued"], 0);
    assert_eq!(json["components"][0]["name"], "ingest-pipeline");
}
