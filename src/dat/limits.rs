use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::dat::DatError;


/// Upper bounds applied to counts and sizes read from a file before anything is allocated.
/// The files themselves carry no such bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    pub max_fixtures: u32,
    pub max_layer_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        DecodeLimits {
            max_fixtures: 1 << 20,
            max_layer_bytes: 64 << 20,
        }
    }
}

impl DecodeLimits {
    /// reads limits from a json file, missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, DatError> {
        let f = BufReader::new(File::open(path)?);
        let limits = serde_json::from_reader(f).map_err(std::io::Error::from)?;
        Ok(limits)
    }
}
