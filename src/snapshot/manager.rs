use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::BackupTarget;
use crate::errors::{BackupError, SnapshotError, TeardownError};
use crate::pipeline::CommandPipeline;

/// Derived snapshot names and paths for one target.
///
/// Never persisted: everything here is a pure function of the target, so
/// cleanup can recompute it even if creation never completed.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    pub snapshot_name: String,
    pub device_path: String,
    pub staging_dir: String,
    pub mount_point: String,
}

impl SnapshotHandle {
    pub fn for_target(target: &BackupTarget) -> Self {
        let snapshot_name = format!("{}-snap", target.name);
        let device_path = format!("/dev/{}/{}", target.volume_group, snapshot_name);
        let staging_dir = format!("{}-staging", target.archive_prefix);
        let mount_point = format!("{}/{}", staging_dir, target.name);
        Self {
            snapshot_name,
            device_path,
            staging_dir,
            mount_point,
        }
    }
}

/// Snapshot extent request: measured usage plus the configured margin.
/// An empty source still requests at least the margin, never zero extents.
pub fn required_size_mb(usage_mb: u64, overhead_mb: u64) -> u64 {
    usage_mb.saturating_add(overhead_mb).max(overhead_mb.max(1))
}

/// Creates, mounts, unmounts and destroys the copy-on-write snapshot of a
/// target's logical volume.
pub struct SnapshotManager;

impl SnapshotManager {
    pub fn new() -> Self {
        Self
    }

    /// Create the snapshot device and mount it at the staging path.
    ///
    /// A stale snapshot with the same derived name is torn down first, so a
    /// previous crashed run cannot block this one. After any stage failure
    /// the device and mount point are in an undefined state, to be reclaimed
    /// by a subsequent `teardown`.
    pub async fn create_and_mount(
        &self,
        target: &BackupTarget,
    ) -> Result<SnapshotHandle, BackupError> {
        self.teardown(target).await?;

        let usage_mb = self.directory_usage_mb(target).await?;
        let size_mb = required_size_mb(usage_mb, target.overhead_mb);
        let handle = SnapshotHandle::for_target(target);
        let origin = format!("/dev/{}/{}", target.volume_group, target.logical_volume);
        let size_arg = format!("{}M", size_mb);

        info!(
            "Creating {} snapshot {} of {} for target {} ({}M used in {})",
            size_arg, handle.snapshot_name, origin, target.name, usage_mb, target.source_dir
        );

        let mut pipeline = CommandPipeline::new();
        pipeline.add(target.privileged(&[
            "lvcreate",
            "--snapshot",
            "--size",
            &size_arg,
            "--name",
            &handle.snapshot_name,
            &origin,
        ]));
        pipeline.add(target.privileged(&["mkdir", "-p", &handle.mount_point]));
        pipeline.add(target.privileged(&["mount", &handle.device_path, &handle.mount_point]));
        pipeline.run_sequence().await;

        if !pipeline.success() {
            return Err(SnapshotError::PipelineFailed {
                target: target.name.clone(),
                transcript: pipeline.transcript(),
            }
            .into());
        }

        info!(
            "Snapshot {} mounted at {}",
            handle.snapshot_name, handle.mount_point
        );
        Ok(handle)
    }

    /// Unmount and destroy whatever of the snapshot exists.
    ///
    /// Runs unconditionally in cleanup paths: an absent mount is skipped
    /// silently, an absent device is never touched, and device removal is
    /// best-effort. Failure is raised only when the unmount/removal pipeline
    /// failed while there was something to clean up.
    pub async fn teardown(&self, target: &BackupTarget) -> Result<(), BackupError> {
        let handle = SnapshotHandle::for_target(target);
        let mut pipeline = CommandPipeline::new();

        if is_mounted(&handle.mount_point).await {
            pipeline.add(target.privileged(&["umount", &handle.mount_point]));
        }
        if Path::new(&handle.staging_dir).exists() {
            pipeline.add(target.privileged(&["rm", "-rf", &handle.staging_dir]));
        }

        if !pipeline.is_empty() {
            info!(
                "Tearing down mount {} for target {}",
                handle.mount_point, target.name
            );
            pipeline.run_sequence().await;
        }
        let unmount_ok = pipeline.success();

        // The snapshot device may be gone already or busy settling; its
        // removal must never fail teardown.
        if Path::new(&handle.device_path).exists() {
            let mut removal = CommandPipeline::new();
            removal.add(target.privileged(&["lvremove", "--force", &handle.device_path]));
            removal.run_sequence().await;
            if removal.success() {
                info!("Removed snapshot device {}", handle.device_path);
            } else {
                warn!(
                    "Snapshot device removal for target {} did not complete cleanly: {}",
                    target.name,
                    removal.transcript()
                );
            }
        }

        if unmount_ok {
            Ok(())
        } else {
            Err(TeardownError::PipelineFailed {
                target: target.name.clone(),
                transcript: pipeline.transcript(),
            }
            .into())
        }
    }

    /// Source directory usage in megabytes, as reported by `du`.
    pub async fn directory_usage_mb(&self, target: &BackupTarget) -> Result<u64, BackupError> {
        let mut pipeline = CommandPipeline::new();
        pipeline.add(target.privileged(&["du", "-sm", &target.source_dir]));
        pipeline.run_streamed(None).await;

        if !pipeline.success() {
            return Err(SnapshotError::Sizing {
                target: target.name.clone(),
                reason: pipeline.transcript(),
            }
            .into());
        }

        pipeline
            .stdout()
            .split_whitespace()
            .next()
            .and_then(|value| value.parse::<u64>().ok())
            .ok_or_else(|| {
                SnapshotError::Sizing {
                    target: target.name.clone(),
                    reason: format!("unexpected du output: {:?}", pipeline.stdout()),
                }
                .into()
            })
    }
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn is_mounted(mount_point: &str) -> bool {
    match tokio::fs::read_to_string("/proc/mounts").await {
        Ok(mounts) => mounts
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(mount_point)),
        Err(e) => {
            debug!("Could not read /proc/mounts: {}", e);
            false
        }
    }
}
