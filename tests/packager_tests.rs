//! Integration tests for the archive packager
//!
//! A staging directory stands in for the mounted snapshot, so the tar and
//! compressor pipeline runs against real files without any LVM state.

use chrono::{TimeZone, Utc};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use lvback::config::{BackupTarget, TargetConfig};
use lvback::errors::BackupError;
use lvback::snapshot::SnapshotHandle;
use lvback::{ArchivePackager, CommandPipeline, Compression, CompressionStage, Compressor};

/// Compressor stand-in that passes bytes through but still claims an
/// extension, so suffix chaining is observable without a gzip binary.
struct PassThrough(&'static str);

impl Compressor for PassThrough {
    fn stages(&self) -> Vec<CompressionStage> {
        vec![CompressionStage {
            command: vec!["cat".to_string()],
            extension: self.0.to_string(),
        }]
    }
}

struct ChainedPassThrough;

impl Compressor for ChainedPassThrough {
    fn stages(&self) -> Vec<CompressionStage> {
        vec![
            CompressionStage {
                command: vec!["cat".to_string()],
                extension: ".gz".to_string(),
            },
            CompressionStage {
                command: vec!["cat".to_string()],
                extension: ".age".to_string(),
            },
        ]
    }
}

fn test_target(temp_dir: &TempDir, name: &str) -> BackupTarget {
    let source_dir = temp_dir.path().join("source");
    fs::create_dir_all(&source_dir).unwrap();

    BackupTarget::from_config(
        name,
        TargetConfig {
            volume_group: "vg0".to_string(),
            logical_volume: "data".to_string(),
            source_dir: source_dir.to_string_lossy().to_string(),
            archive_prefix: temp_dir.path().join(name).to_string_lossy().to_string(),
            use_sudo: false,
            lock_url: None,
            unlock_url: None,
            overhead_mb: 10,
            compression: Compression::None,
        },
    )
    .unwrap()
}

/// Build the staging tree the lifecycle manager would have mounted.
fn populate_staging(handle: &SnapshotHandle) {
    fs::create_dir_all(&handle.mount_point).unwrap();
    fs::write(Path::new(&handle.mount_point).join("data.bin"), b"payload bytes").unwrap();
    fs::create_dir_all(Path::new(&handle.mount_point).join("nested")).unwrap();
    fs::write(
        Path::new(&handle.mount_point).join("nested/inner.txt"),
        b"nested payload",
    )
    .unwrap();
}

fn fixed_start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
}

#[tokio::test]
async fn test_package_without_compressor_writes_a_plain_tar() {
    let temp_dir = TempDir::new().unwrap();
    let target = test_target(&temp_dir, "bundle");
    let handle = SnapshotHandle::for_target(&target);
    populate_staging(&handle);

    let packager = ArchivePackager::new();
    let archive_path = packager
        .package(&target, &handle, &Compression::None, fixed_start())
        .await
        .unwrap();

    assert_eq!(
        archive_path,
        format!("{}-2026-01-02_03-04.tar", target.archive_prefix)
    );
    assert!(fs::metadata(&archive_path).unwrap().len() > 0);

    // Entries sit under a single top-level directory named after the target.
    let mut listing = CommandPipeline::new();
    listing.add(["tar", "-tf", archive_path.as_str()]);
    listing.run_streamed(None).await;
    assert!(listing.success());
    assert!(listing.stdout().contains("bundle/data.bin"));
    assert!(listing.stdout().contains("bundle/nested/inner.txt"));
}

#[tokio::test]
async fn test_package_removes_the_staging_directory_on_success() {
    let temp_dir = TempDir::new().unwrap();
    let target = test_target(&temp_dir, "cleaned");
    let handle = SnapshotHandle::for_target(&target);
    populate_staging(&handle);

    let packager = ArchivePackager::new();
    packager
        .package(&target, &handle, &Compression::None, fixed_start())
        .await
        .unwrap();

    assert!(!Path::new(&handle.staging_dir).exists());
}

#[tokio::test]
async fn test_compressor_extension_is_appended_after_tar() {
    let temp_dir = TempDir::new().unwrap();
    let target = test_target(&temp_dir, "zipped");
    let handle = SnapshotHandle::for_target(&target);
    populate_staging(&handle);

    let packager = ArchivePackager::new();
    let archive_path = packager
        .package(&target, &handle, &PassThrough(".gz"), fixed_start())
        .await
        .unwrap();

    assert!(archive_path.ends_with(".tar.gz"));
    assert!(fs::metadata(&archive_path).unwrap().len() > 0);
}

#[tokio::test]
async fn test_chained_compressor_stages_concatenate_extensions() {
    let temp_dir = TempDir::new().unwrap();
    let target = test_target(&temp_dir, "layered");
    let handle = SnapshotHandle::for_target(&target);
    populate_staging(&handle);

    let packager = ArchivePackager::new();
    let archive_path = packager
        .package(&target, &handle, &ChainedPassThrough, fixed_start())
        .await
        .unwrap();

    assert!(archive_path.ends_with(".tar.gz.age"));
}

#[tokio::test]
async fn test_package_failure_names_the_output_and_leaves_the_partial_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = test_target(&temp_dir, "broken");
    let handle = SnapshotHandle::for_target(&target);
    // No staging tree: the tar stage fails immediately.

    let packager = ArchivePackager::new();
    let result = packager
        .package(&target, &handle, &Compression::None, fixed_start())
        .await;

    let expected_path = format!("{}-2026-01-02_03-04.tar", target.archive_prefix);
    match result {
        Err(BackupError::Packaging(e)) => {
            assert!(e.to_string().contains(&expected_path));
        }
        other => panic!("expected a packaging error, got {:?}", other.map(|_| ())),
    }
    assert!(
        Path::new(&expected_path).exists(),
        "the partial output file stays behind for diagnosis"
    );
}

#[test]
fn test_builtin_compression_selections() {
    assert!(Compression::None.stages().is_empty());

    let gzip = Compression::Gzip.stages();
    assert_eq!(gzip.len(), 1);
    assert_eq!(gzip[0].command, vec!["gzip", "-c"]);
    assert_eq!(gzip[0].extension, ".gz");

    let lz4 = Compression::Lz4.stages();
    assert_eq!(lz4.len(), 1);
    assert_eq!(lz4[0].command, vec!["lz4", "-z", "-c"]);
    assert_eq!(lz4[0].extension, ".lz4");
}
