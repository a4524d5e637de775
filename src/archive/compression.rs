use serde::{Deserialize, Serialize};

/// One transformation inserted between the archive stream and the output
/// file, together with the filename extension it implies.
#[derive(Debug, Clone)]
pub struct CompressionStage {
    pub command: Vec<String>,
    pub extension: String,
}

/// Supplies the pipeline stages a compressor contributes.
///
/// Zero stages mean the archive is written uncompressed; multiple stages
/// chain left to right and their extensions concatenate onto `.tar`.
pub trait Compressor {
    fn stages(&self) -> Vec<CompressionStage>;
}

/// Built-in compressor selection, chosen per target in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Lz4,
}

impl Compressor for Compression {
    fn stages(&self) -> Vec<CompressionStage> {
        match self {
            Compression::None => Vec::new(),
            Compression::Gzip => vec![CompressionStage {
                command: vec!["gzip".to_string(), "-c".to_string()],
                extension: ".gz".to_string(),
            }],
            Compression::Lz4 => vec![CompressionStage {
                command: vec!["lz4".to_string(), "-z".to_string(), "-c".to_string()],
                extension: ".lz4".to_string(),
            }],
        }
    }
}
