use std::io;
use thiserror::Error;


/// Everything that can go wrong while addressing or decoding a world file.
/// A decode that fails returns nothing, there are no partially filled records.
#[derive(Debug, Error)]
pub enum DatError {
    #[error("truncated input at offset {position}: expected {expected} bytes, {available} available")]
    TruncatedInput { position: u64, expected: u64, available: u64 },

    #[error("fixture count {count} exceeds the limit of {max}")]
    InvalidCount { count: u32, max: u32 },

    #[error("terrain layer {layer} declares {row_count} rows of {row_size} bytes, more than the limit of {max} bytes")]
    InvalidLayerDimensions { layer: usize, row_count: u32, row_size: u32, max: u64 },

    /// reserved for versions a decoder refuses, every version is currently accepted
    #[error("unsupported format version {version}")]
    UnsupportedVersion { version: u32 },

    #[error("'{name}' is not a content file name")]
    InvalidFilename { name: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DatError {
    /// true when the error is the source file missing, used to skip absent cells
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatError::Io(err) if err.kind() == io::ErrorKind::NotFound)
    }
}
