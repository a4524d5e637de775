//! Custom error types for the backup tool
//!
//! Provides structured error handling with context for each phase of a run.

use std::fmt;

/// Main error type for a backup run
#[derive(Debug)]
pub enum BackupError {
    /// Configuration-related errors
    Config(ConfigError),

    /// Remote pause/resume handshake errors
    Handshake(HandshakeError),

    /// Snapshot creation or mount errors
    Snapshot(SnapshotError),

    /// Archiving, compression or output-write errors
    Packaging(PackagingError),

    /// Cleanup errors while resources were known to exist
    Teardown(TeardownError),

    /// A run-phase error followed by a teardown failure during cleanup
    CleanupAfterFailure {
        cause: Box<BackupError>,
        teardown: Box<BackupError>,
    },
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    LoadFailed { path: String, reason: String },

    /// Configuration parsing error
    ParseError { reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },
}

/// Remote handshake error variants
#[derive(Debug)]
pub enum HandshakeError {
    /// The GET request itself failed
    RequestFailed { url: String, reason: String },

    /// The endpoint answered with something other than 200
    UnexpectedStatus { url: String, status: u16 },
}

/// Snapshot lifecycle error variants
#[derive(Debug)]
pub enum SnapshotError {
    /// A storage-stage command failed
    PipelineFailed { target: String, transcript: String },

    /// Source directory usage could not be determined
    Sizing { target: String, reason: String },
}

/// Packaging error variants
#[derive(Debug)]
pub enum PackagingError {
    /// An archive, compression or write stage failed
    PipelineFailed {
        target: String,
        output_path: String,
        transcript: String,
    },
}

/// Teardown error variants
#[derive(Debug)]
pub enum TeardownError {
    /// An unmount or removal stage failed while resources existed
    PipelineFailed { target: String, transcript: String },
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::Config(e) => write!(f, "Configuration error: {}", e),
            BackupError::Handshake(e) => write!(f, "Handshake error: {}", e),
            BackupError::Snapshot(e) => write!(f, "Snapshot error: {}", e),
            BackupError::Packaging(e) => write!(f, "Packaging error: {}", e),
            BackupError::Teardown(e) => write!(f, "Teardown error: {}", e),
            BackupError::CleanupAfterFailure { cause, teardown } => {
                write!(f, "{} (teardown also failed: {})", cause, teardown)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::ParseError { reason } => {
                write!(f, "Failed to parse config: {}", reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::RequestFailed { url, reason } => {
                write!(f, "Request to {} failed: {}", url, reason)
            }
            HandshakeError::UnexpectedStatus { url, status } => {
                write!(f, "{} answered with status {} instead of 200", url, status)
            }
        }
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::PipelineFailed { target, transcript } => {
                write!(f, "Snapshot pipeline for '{}' failed: {}", target, transcript)
            }
            SnapshotError::Sizing { target, reason } => {
                write!(f, "Could not size snapshot for '{}': {}", target, reason)
            }
        }
    }
}

impl fmt::Display for PackagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackagingError::PipelineFailed {
                target,
                output_path,
                transcript,
            } => {
                write!(
                    f,
                    "Packaging '{}' into {} failed: {}",
                    target, output_path, transcript
                )
            }
        }
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownError::PipelineFailed { target, transcript } => {
                write!(f, "Teardown for '{}' failed: {}", target, transcript)
            }
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::CleanupAfterFailure { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for HandshakeError {}
impl std::error::Error for SnapshotError {}
impl std::error::Error for PackagingError {}
impl std::error::Error for TeardownError {}

// Conversion helpers for sub-errors
impl From<ConfigError> for BackupError {
    fn from(err: ConfigError) -> Self {
        BackupError::Config(err)
    }
}

impl From<HandshakeError> for BackupError {
    fn from(err: HandshakeError) -> Self {
        BackupError::Handshake(err)
    }
}

impl From<SnapshotError> for BackupError {
    fn from(err: SnapshotError) -> Self {
        BackupError::Snapshot(err)
    }
}

impl From<PackagingError> for BackupError {
    fn from(err: PackagingError) -> Self {
        BackupError::Packaging(err)
    }
}

impl From<TeardownError> for BackupError {
    fn from(err: TeardownError) -> Self {
        BackupError::Teardown(err)
    }
}
