use tokio::fs;
use tracing::debug;

use super::{BackupTarget, Config};
use crate::errors::{BackupError, ConfigError};

/// Loads and validates the backup configuration file.
pub struct ConfigManager {
    pub alert_webhook_url: Option<String>,
    pub targets: Vec<BackupTarget>,
}

impl ConfigManager {
    pub async fn load(path: &str) -> Result<Self, BackupError> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            BackupError::Config(ConfigError::LoadFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            BackupError::Config(ConfigError::ParseError {
                reason: e.to_string(),
            })
        })?;

        let mut targets = config
            .targets
            .into_iter()
            .map(|(name, target_config)| {
                debug!("Validating target config: {}", name);
                BackupTarget::from_config(&name, target_config)
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Deterministic run order regardless of table order in the file.
        targets.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            alert_webhook_url: config
                .alert_webhook_url
                .filter(|url| !url.trim().is_empty()),
            targets,
        })
    }

    pub fn target(&self, name: &str) -> Option<&BackupTarget> {
        self.targets.iter().find(|target| target.name == name)
    }
}
