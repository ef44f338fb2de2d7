use std::io::{Read, Seek};
use std::path::Path;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use crate::dat::{DatError, DatReader};


/// World extent in grid cells, read from the world table of contents
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toc {
    pub size_x: u32,
    pub size_y: u32,
}

impl Toc {
    pub fn read(path: &Path) -> Result<Self, DatError> {
        trace!("Toc::read {}", path.display());
        Self::read_from(&mut DatReader::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatError> {
        Self::read_from(&mut DatReader::from_bytes(bytes))
    }

    pub fn read_from<R: Read + Seek>(r: &mut DatReader<R>) -> Result<Self, DatError> {
        r.seek_relative(4)?;    // header, unknown
        let toc = Toc {
            size_x: r.read_u32()?,
            size_y: r.read_u32()?,
        };
        // anything after the sizes is not interpreted

        debug!("toc {}x{} cells", toc.size_x, toc.size_y);
        Ok(toc)
    }

    /// all cell coordinates of the world, x-major
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> {
        let size_y = self.size_y;
        (0..self.size_x).flat_map(move |x| (0..size_y).map(move |y| (x, y)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn toc_bytes(size_x: u32, size_y: u32) -> Vec<u8> {
        let mut bytes = vec![0xEE; 4];
        bytes.extend_from_slice(&size_x.to_le_bytes());
        bytes.extend_from_slice(&size_y.to_le_bytes());
        bytes
    }

    #[test]
    fn decodes_sizes_after_header() {
        assert_eq!(Toc::from_bytes(&toc_bytes(5, 7)).unwrap(), Toc { size_x: 5, size_y: 7 });
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = toc_bytes(300, 200);
        bytes.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(Toc::from_bytes(&bytes).unwrap(), Toc { size_x: 300, size_y: 200 });
    }

    #[test]
    fn one_byte_short_is_truncated() {
        let bytes = toc_bytes(5, 7);
        assert!(matches!(
            Toc::from_bytes(&bytes[..11]),
            Err(DatError::TruncatedInput { position: 8, expected: 4, available: 3 })
        ));
        assert!(matches!(Toc::from_bytes(&[]), Err(DatError::TruncatedInput { position: 0, .. })));
    }

    #[test]
    fn cells_cover_the_grid() {
        let cells: Vec<_> = Toc { size_x: 2, size_y: 3 }.cells().collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }
}
