use std::io::{Read, Seek};
use std::path::Path;
use log::{debug, trace};
use crate::dat::{DatError, DatReader, DecodeLimits};


/*
    terrain file

    u16             version
    [7]             unknown
    u8              layer count
    layer count *   [5] unknown, u32 declared layer size
    [82]            global terrain metadata, unknown
    for every layer with declared size != 0, in slot order:
        [4] u32 row count [4] u32 row size
        row count * ([2] row of row size bytes)
        [4]
 */
const HEADER_GAP: u64 = 7;
const SIZE_ENTRY_GAP: u64 = 5;
const METADATA_SIZE: u64 = 82;
const ROW_GAP: u64 = 2;
const LAYER_TRAILER: u64 = 4;


/// One raster plane of a terrain cell, rows stored back to back.
/// How a cell byte is interpreted (height, splat...) depends on the layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainLayer {
    pub index: u32,
    pub row_count: u32,
    pub row_size: u32,
    pub data: Vec<u8>,
}

impl TerrainLayer {
    pub fn row(&self, row: u32) -> Option<&[u8]> {
        if row >= self.row_count {
            return None;
        }
        let start = row as usize * self.row_size as usize;
        self.data.get(start..start + self.row_size as usize)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.row_count).filter_map(move |row| self.row(row))
    }
}

/// Terrain cell. `layers` has one slot per declared layer, a slot whose declared size
/// is zero was not stored in the file and stays `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainFile {
    pub version: u16,
    pub layer_count: u8,
    pub layer_sizes: Vec<u32>,
    pub layers: Vec<Option<TerrainLayer>>,
}

impl TerrainFile {
    pub fn read(path: &Path, limits: &DecodeLimits) -> Result<Self, DatError> {
        trace!("TerrainFile::read {}", path.display());
        Self::read_from(&mut DatReader::open(path)?, limits)
    }

    pub fn from_bytes(bytes: &[u8], limits: &DecodeLimits) -> Result<Self, DatError> {
        Self::read_from(&mut DatReader::from_bytes(bytes), limits)
    }

    pub fn read_from<R: Read + Seek>(r: &mut DatReader<R>, limits: &DecodeLimits) -> Result<Self, DatError> {
        let version = r.read_u16()?;
        r.seek_relative(HEADER_GAP)?;
        let layer_count = r.read_u8()?;

        let mut layer_sizes = Vec::with_capacity(layer_count as usize);
        for _ in 0..layer_count {
            r.seek_relative(SIZE_ENTRY_GAP)?;
            layer_sizes.push(r.read_u32()?);
        }
        debug!("terrain version {version}, {layer_count} layers, sizes {layer_sizes:?}");

        r.seek_relative(METADATA_SIZE)?;

        // bodies follow each other, so slots are visited strictly in order
        // and an empty slot must not move the cursor
        let mut layers = Vec::with_capacity(layer_count as usize);
        for (index, &size) in layer_sizes.iter().enumerate() {
            let layer = if size != 0 {
                Some(Self::read_layer(r, index, limits)?)
            } else {
                None
            };
            layers.push(layer);
        }

        Ok(TerrainFile { version, layer_count, layer_sizes, layers })
    }

    fn read_layer<R: Read + Seek>(r: &mut DatReader<R>, index: usize, limits: &DecodeLimits) -> Result<TerrainLayer, DatError> {
        r.seek_relative(4)?;
        let row_count = r.read_u32()?;
        r.seek_relative(4)?;
        let row_size = r.read_u32()?;

        let total = row_count as u64 * row_size as u64;
        if total > limits.max_layer_bytes {
            return Err(DatError::InvalidLayerDimensions {
                layer: index,
                row_count,
                row_size,
                max: limits.max_layer_bytes,
            });
        }
        debug!("terrain layer {index}: {row_count} rows of {row_size} bytes at {}", r.position());

        let mut data = vec![0u8; total as usize];
        if row_size > 0 {
            for row in data.chunks_exact_mut(row_size as usize) {
                r.seek_relative(ROW_GAP)?;
                r.read_into(row)?;
            }
        } else {
            // rows of zero width still carry their gap
            for _ in 0..row_count {
                r.seek_relative(ROW_GAP)?;
            }
        }
        r.seek_relative(LAYER_TRAILER)?;

        Ok(TerrainLayer { index: index as u32, row_count, row_size, data })
    }

    pub fn layer(&self, index: usize) -> Option<&TerrainLayer> {
        self.layers.get(index).and_then(Option::as_ref)
    }

    pub fn present_layers(&self) -> impl Iterator<Item = &TerrainLayer> {
        self.layers.iter().flatten()
    }
}
