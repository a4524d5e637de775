use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info};

use super::Compressor;
use crate::config::BackupTarget;
use crate::errors::{BackupError, PackagingError};
use crate::pipeline::CommandPipeline;
use crate::snapshot::SnapshotHandle;

/// Streams the mounted snapshot through tar and the configured compressor
/// stages into a timestamped archive file.
pub struct ArchivePackager;

impl ArchivePackager {
    pub fn new() -> Self {
        Self
    }

    /// Package the mounted snapshot into `<prefix>-<YYYY-MM-DD_HH-MM>.tar<exts>`.
    ///
    /// The archive reads from the staging directory so its entries sit under
    /// a single top-level directory named after the target, with permissions
    /// and ownership preserved. Two runs of the same target within one
    /// minute collide on the output name; that collision is accepted.
    pub async fn package(
        &self,
        target: &BackupTarget,
        handle: &SnapshotHandle,
        compressor: &dyn Compressor,
        started_at: DateTime<Utc>,
    ) -> Result<String, BackupError> {
        let mut pipeline = CommandPipeline::new();
        pipeline.add(target.privileged(&[
            "tar",
            "-cpf",
            "-",
            "-C",
            &handle.staging_dir,
            &target.name,
        ]));

        let mut extension = String::from(".tar");
        for stage in compressor.stages() {
            pipeline.add(stage.command);
            extension.push_str(&stage.extension);
        }

        let output_path = format!(
            "{}-{}{}",
            target.archive_prefix,
            started_at.format("%Y-%m-%d_%H-%M"),
            extension
        );

        info!("Packaging target {} into {}", target.name, output_path);
        pipeline.run_streamed(Some(Path::new(&output_path))).await;

        if !pipeline.success() {
            // The partial archive stays behind for diagnosis.
            return Err(PackagingError::PipelineFailed {
                target: target.name.clone(),
                output_path,
                transcript: pipeline.transcript(),
            }
            .into());
        }

        // The staging tree still holds the live mount until teardown runs;
        // removal here only reclaims it once the mount is gone.
        if let Err(e) = tokio::fs::remove_dir_all(&handle.staging_dir).await {
            debug!(
                "Staging directory {} not removed yet: {}",
                handle.staging_dir, e
            );
        }

        info!("Packaged target {} into {}", target.name, output_path);
        Ok(output_path)
    }
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self::new()
    }
}
