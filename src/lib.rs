pub mod archive;
pub mod config;
pub mod errors;
pub mod http;
pub mod pipeline;
pub mod runner;
pub mod snapshot;

// Re-export commonly used types
pub use archive::{ArchivePackager, Compression, CompressionStage, Compressor};
pub use config::{BackupTarget, Config, ConfigManager, TargetConfig};
pub use errors::BackupError;
pub use http::{AlertService, HandshakeClient};
pub use pipeline::CommandPipeline;
pub use runner::{BackupOutcome, BackupRunner};
pub use snapshot::{SnapshotHandle, SnapshotManager};
