pub mod compression;
pub mod packager;

pub use compression::{Compression, CompressionStage, Compressor};
pub use packager::ArchivePackager;
