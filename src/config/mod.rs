pub mod manager;
pub use manager::ConfigManager;

use serde::Deserialize;
use std::collections::HashMap;

use crate::archive::Compression;
use crate::errors::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub alert_webhook_url: Option<String>,
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub volume_group: String,
    pub logical_volume: String,
    pub source_dir: String,
    pub archive_prefix: String,
    #[serde(default)]
    pub use_sudo: bool,
    pub lock_url: Option<String>,
    pub unlock_url: Option<String>,
    #[serde(default = "default_overhead_mb")]
    pub overhead_mb: u64,
    #[serde(default)]
    pub compression: Compression,
}

fn default_overhead_mb() -> u64 {
    10
}

/// One validated backup target, immutable for the duration of a run.
///
/// Snapshot device and mount names derive from `name`, so only one run per
/// target name may execute at a time; that serialization is the caller's
/// responsibility.
#[derive(Debug, Clone)]
pub struct BackupTarget {
    pub name: String,
    pub volume_group: String,
    pub logical_volume: String,
    pub source_dir: String,
    pub archive_prefix: String,
    pub use_sudo: bool,
    pub lock_url: Option<String>,
    pub unlock_url: Option<String>,
    pub overhead_mb: u64,
    pub compression: Compression,
}

impl BackupTarget {
    pub fn from_config(name: &str, config: TargetConfig) -> Result<Self, ConfigError> {
        validate_name(name)?;
        require("volume_group", &config.volume_group)?;
        require("logical_volume", &config.logical_volume)?;
        require("source_dir", &config.source_dir)?;
        require("archive_prefix", &config.archive_prefix)?;

        // Derived mount paths are matched verbatim against /proc/mounts.
        if config.archive_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "archive_prefix".to_string(),
                reason: "must not contain whitespace".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            volume_group: config.volume_group,
            logical_volume: config.logical_volume,
            source_dir: config.source_dir,
            archive_prefix: config.archive_prefix,
            use_sudo: config.use_sudo,
            lock_url: normalize_url(config.lock_url),
            unlock_url: normalize_url(config.unlock_url),
            overhead_mb: config.overhead_mb,
            compression: config.compression,
        })
    }

    /// Prefix a storage command with sudo when the target requires it.
    pub fn privileged(&self, argv: &[&str]) -> Vec<String> {
        let mut command: Vec<String> = Vec::with_capacity(argv.len() + 1);
        if self.use_sudo {
            command.push("sudo".to_string());
        }
        command.extend(argv.iter().map(|arg| arg.to_string()));
        command
    }
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "target name".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ConfigError::InvalidValue {
            field: "target name".to_string(),
            reason: format!("'{}' may only contain letters, digits, '-', '_' and '.'", name),
        });
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

// An empty URL means the handshake is not configured at all.
fn normalize_url(url: Option<String>) -> Option<String> {
    url.filter(|value| !value.trim().is_empty())
}
