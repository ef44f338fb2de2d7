use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::dat::DatError;


// key layout, MSB first
// |63|62|61..59|58|57..48|47......37|36...32|31.....16|15......0|
// | 0| 1|  0   |T |  0   |  world  | layer |    x    |    y    |
// T=1 marks a world table of contents, the world id then sits in bits 0..31

const TAG_MASK: u64 = 0xFC00_0000_0000_0000;
const TOC_TAG: u64 = 0x4400_0000_0000_0000;
const CELL_TAG: u64 = 0x4000_0000_0000_0000;

const TOC_RESERVED_MASK: u64 = 0x03FF_FFFF_0000_0000;
const CELL_RESERVED_MASK: u64 = 0x03FF_0000_0000_0000;

const WORLD_BITS: u32 = 0x7FF;
const LAYER_BITS: u32 = 0x1F;
const AXIS_BITS: u32 = 0xFFFF;

const WORLD_SHIFT: u32 = 37;
const LAYER_SHIFT: u32 = 32;
const X_SHIFT: u32 = 16;

pub const CONTENT_EXTENSION: &str = "dat";

/// number of distinct x (or y) values a cell key can address
pub const CELL_AXIS_LIMIT: u32 = AXIS_BITS + 1;


#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContentKind {
    WorldToc,
    WorldCell,
}

/// world/layer/cell address packed into a cell key
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub world: u32,
    pub layer: u32,
    pub x: u32,
    pub y: u32,
}

/// 64-bit content key addressing one file of the world archive.
/// The canonical file name is the key in 16 uppercase hex digits plus `.dat`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey(pub u64);

impl ContentKey {
    pub fn world_toc(world: u32) -> Self {
        ContentKey(TOC_TAG | world as u64)
    }

    /// fields wider than their slot are masked, not rejected
    pub fn world_cell(world: u32, layer: u32, x: u32, y: u32) -> Self {
        ContentKey(CELL_TAG
            | ((world & WORLD_BITS) as u64) << WORLD_SHIFT
            | ((layer & LAYER_BITS) as u64) << LAYER_SHIFT
            | ((x & AXIS_BITS) as u64) << X_SHIFT
            | (y & AXIS_BITS) as u64)
    }

    pub fn kind(&self) -> Option<ContentKind> {
        match self.0 & TAG_MASK {
            TOC_TAG if self.0 & TOC_RESERVED_MASK == 0 => Some(ContentKind::WorldToc),
            CELL_TAG if self.0 & CELL_RESERVED_MASK == 0 => Some(ContentKind::WorldCell),
            _ => None,
        }
    }

    pub fn toc_world(&self) -> Option<u32> {
        match self.kind() {
            Some(ContentKind::WorldToc) => Some(self.0 as u32),
            _ => None,
        }
    }

    pub fn cell_coord(&self) -> Option<CellCoord> {
        match self.kind() {
            Some(ContentKind::WorldCell) => Some(CellCoord {
                world: (self.0 >> WORLD_SHIFT) as u32 & WORLD_BITS,
                layer: (self.0 >> LAYER_SHIFT) as u32 & LAYER_BITS,
                x: (self.0 >> X_SHIFT) as u32 & AXIS_BITS,
                y: self.0 as u32 & AXIS_BITS,
            }),
            _ => None,
        }
    }

    pub fn filename(&self) -> String {
        format!("{:016X}.{CONTENT_EXTENSION}", self.0)
    }

    /// inverse of `filename`, only the exact canonical form is accepted
    pub fn from_filename(name: &str) -> Result<Self, DatError> {
        let invalid = || DatError::InvalidFilename { name: name.to_string() };

        let hex = name
            .strip_suffix(CONTENT_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(invalid)?;

        if hex.len() != 16 || !hex.bytes().all(|c| matches!(c, b'0'..=b'9' | b'A'..=b'F')) {
            return Err(invalid());
        }

        u64::from_str_radix(hex, 16).map(ContentKey).map_err(|_| invalid())
    }
}

impl From<CellCoord> for ContentKey {
    fn from(c: CellCoord) -> Self {
        ContentKey::world_cell(c.world, c.layer, c.x, c.y)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

impl FromStr for ContentKey {
    type Err = DatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKey::from_filename(s)
    }
}
