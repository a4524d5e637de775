use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::archive::ArchivePackager;
use crate::config::BackupTarget;
use crate::errors::BackupError;
use crate::http::HandshakeClient;
use crate::snapshot::SnapshotManager;

/// Terminal state of one successful run.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub target: String,
    pub archive_path: String,
    pub started_at: DateTime<Utc>,
}

/// Sequences one backup run: optional lock, snapshot and mount, optional
/// unlock, packaging - with teardown executed exactly once on every exit
/// path before the result surfaces to the caller.
pub struct BackupRunner {
    handshake: HandshakeClient,
    snapshots: SnapshotManager,
    packager: ArchivePackager,
}

impl BackupRunner {
    pub fn new() -> Self {
        Self {
            handshake: HandshakeClient::new(),
            snapshots: SnapshotManager::new(),
            packager: ArchivePackager::new(),
        }
    }

    pub async fn run(&self, target: &BackupTarget) -> Result<BackupOutcome, BackupError> {
        let started_at = Utc::now();
        info!("Starting backup run for target {}", target.name);

        let result = self.capture(target, started_at).await;
        let teardown = self.snapshots.teardown(target).await;

        match (result, teardown) {
            (Ok(outcome), Ok(())) => {
                info!(
                    "Backup run for target {} completed: {}",
                    target.name, outcome.archive_path
                );
                Ok(outcome)
            }
            (Ok(outcome), Err(teardown_err)) => {
                error!(
                    "Backup for target {} produced {} but teardown failed",
                    target.name, outcome.archive_path
                );
                Err(teardown_err)
            }
            (Err(cause), Ok(())) => Err(cause),
            (Err(cause), Err(teardown_err)) => Err(BackupError::CleanupAfterFailure {
                cause: Box::new(cause),
                teardown: Box::new(teardown_err),
            }),
        }
    }

    async fn capture(
        &self,
        target: &BackupTarget,
        started_at: DateTime<Utc>,
    ) -> Result<BackupOutcome, BackupError> {
        if let Some(url) = &target.lock_url {
            self.handshake.lock(url).await?;
        }

        // A failed snapshot must not silently resume a service that is not
        // yet safely captured; the unlock only runs after a successful mount
        // and an operator resumes manually on this failure path.
        let handle = self.snapshots.create_and_mount(target).await?;

        if let Some(url) = &target.unlock_url {
            self.handshake.unlock(url).await?;
        }

        let archive_path = self
            .packager
            .package(target, &handle, &target.compression, started_at)
            .await?;

        Ok(BackupOutcome {
            target: target.name.clone(),
            archive_path,
            started_at,
        })
    }
}

impl Default for BackupRunner {
    fn default() -> Self {
        Self::new()
    }
}
