pub mod manager;

pub use manager::{required_size_mb, SnapshotHandle, SnapshotManager};
