use reqwest::{Client, StatusCode};
use tracing::info;

use crate::errors::{BackupError, HandshakeError};

/// Remote pause/resume client.
///
/// The endpoints exist specifically to quiesce and resume a data service
/// quickly, so there is no retry and no timeout beyond the transport
/// default; anything other than an exact 200 aborts the whole run.
pub struct HandshakeClient {
    client: Client,
}

impl HandshakeClient {
    pub fn new() -> Self {
        // No timeout - the remote side decides how long a pause takes
        Self {
            client: Client::new(),
        }
    }

    /// Pause the remote service before the snapshot is taken.
    pub async fn lock(&self, url: &str) -> Result<(), BackupError> {
        self.request("lock", url).await
    }

    /// Resume the remote service once the snapshot is mounted.
    pub async fn unlock(&self, url: &str) -> Result<(), BackupError> {
        self.request("unlock", url).await
    }

    async fn request(&self, phase: &str, url: &str) -> Result<(), BackupError> {
        info!("Requesting {} via {}", phase, url);

        let response = self.client.get(url).send().await.map_err(|e| {
            HandshakeError::RequestFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if response.status() != StatusCode::OK {
            return Err(HandshakeError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        info!("{} confirmed by {}", phase, url);
        Ok(())
    }
}

impl Default for HandshakeClient {
    fn default() -> Self {
        Self::new()
    }
}
