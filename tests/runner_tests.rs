//! Orchestration tests for the backup runner
//!
//! These drive full runs against targets whose volume group does not exist,
//! so the storage phase fails naturally while the handshake phases are
//! observed through a wiremock control plane.

use serial_test::serial;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lvback::config::{BackupTarget, TargetConfig};
use lvback::errors::BackupError;
use lvback::snapshot::SnapshotHandle;
use lvback::BackupRunner;

fn test_target(
    temp_dir: &TempDir,
    name: &str,
    lock_url: Option<String>,
    unlock_url: Option<String>,
) -> BackupTarget {
    let source_dir = temp_dir.path().join("source");
    std::fs::create_dir_all(&source_dir).unwrap();
    std::fs::write(source_dir.join("data.bin"), b"five bytes worth of state").unwrap();

    BackupTarget::from_config(
        name,
        TargetConfig {
            volume_group: "vg-missing".to_string(),
            logical_volume: "lv-missing".to_string(),
            source_dir: source_dir.to_string_lossy().to_string(),
            archive_prefix: temp_dir.path().join(name).to_string_lossy().to_string(),
            use_sudo: false,
            lock_url,
            unlock_url,
            overhead_mb: 10,
            compression: Default::default(),
        },
    )
    .unwrap()
}

#[tokio::test]
#[serial]
async fn test_rejected_lock_aborts_before_any_storage_is_touched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pause"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let target = test_target(
        &temp_dir,
        "paused",
        Some(format!("{}/pause", server.uri())),
        Some(format!("{}/resume", server.uri())),
    );
    let handle = SnapshotHandle::for_target(&target);

    let runner = BackupRunner::new();
    let result = runner.run(&target).await;

    assert!(matches!(result, Err(BackupError::Handshake(_))));
    assert!(
        !Path::new(&handle.staging_dir).exists(),
        "a rejected lock must abort before storage is touched"
    );
    server.verify().await;
}

#[tokio::test]
#[serial]
async fn test_unlock_is_skipped_when_the_snapshot_phase_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pause"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let target = test_target(
        &temp_dir,
        "stuckpause",
        Some(format!("{}/pause", server.uri())),
        Some(format!("{}/resume", server.uri())),
    );
    let handle = SnapshotHandle::for_target(&target);

    let runner = BackupRunner::new();
    let result = runner.run(&target).await;

    // No volume group exists, so creation fails after the lock; the remote
    // side deliberately stays paused.
    assert!(matches!(result, Err(BackupError::Snapshot(_))));
    assert!(!Path::new(&handle.staging_dir).exists());
    server.verify().await;
}

#[tokio::test]
#[serial]
async fn test_failed_run_still_tears_down_leftover_staging() {
    let temp_dir = TempDir::new().unwrap();
    let target = test_target(&temp_dir, "relic", None, None);
    let handle = SnapshotHandle::for_target(&target);

    // Simulate the residue of a crashed earlier run.
    std::fs::create_dir_all(&handle.mount_point).unwrap();

    let runner = BackupRunner::new();
    let result = runner.run(&target).await;

    assert!(matches!(result, Err(BackupError::Snapshot(_))));
    assert!(
        !Path::new(&handle.staging_dir).exists(),
        "teardown must reclaim the staging tree before the error surfaces"
    );
}

#[tokio::test]
#[serial]
async fn test_error_reports_name_the_failing_target() {
    let temp_dir = TempDir::new().unwrap();
    let target = test_target(&temp_dir, "named-target", None, None);

    let runner = BackupRunner::new();
    let error = runner.run(&target).await.unwrap_err();

    assert!(error.to_string().contains("named-target"));
}
