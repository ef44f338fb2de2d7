use std::path::{Path, PathBuf};
use log::{debug, trace};
use crate::dat::{ContentKey, DatError, DecodeLimits, FixtureFile, TerrainFile, Toc};
use crate::dat::keys::CELL_AXIS_LIMIT;


/// Directory of key-named world files, e.g. `4400000000000000.dat` for the toc of world 0.
/// Every call decodes from disk, nothing is kept between calls
#[derive(Debug, Clone)]
pub struct WorldArchive {
    data_path: PathBuf,
    limits: DecodeLimits,
}

impl WorldArchive {
    pub fn new(data_path: &Path, limits: DecodeLimits) -> Self {
        WorldArchive {
            data_path: data_path.to_path_buf(),
            limits,
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    pub fn path_of(&self, key: ContentKey) -> PathBuf {
        self.data_path.join(key.filename())
    }

    pub fn toc(&self, world: u32) -> Result<Toc, DatError> {
        Toc::read(&self.path_of(ContentKey::world_toc(world)))
    }

    pub fn fixtures(&self, world: u32, layer: u32, x: u32, y: u32) -> Result<FixtureFile, DatError> {
        FixtureFile::read(&self.path_of(ContentKey::world_cell(world, layer, x, y)), &self.limits)
    }

    pub fn terrain(&self, world: u32, layer: u32, x: u32, y: u32) -> Result<TerrainFile, DatError> {
        TerrainFile::read(&self.path_of(ContentKey::world_cell(world, layer, x, y)), &self.limits)
    }

    /// fixture files of every cell inside the world bounds, x-major.
    /// cells without a file are skipped, any other failure stops the walk
    pub fn world_fixtures(&self, world: u32, layer: u32) -> Result<Vec<(u32, u32, FixtureFile)>, DatError> {
        trace!("WorldArchive::world_fixtures world {world} layer {layer}");
        let toc = self.toc(world)?;

        // cell keys hold 16 bits per axis, larger coordinates would alias lower cells
        let bounds = Toc {
            size_x: toc.size_x.min(CELL_AXIS_LIMIT),
            size_y: toc.size_y.min(CELL_AXIS_LIMIT),
        };
        if bounds != toc {
            debug!("world {world} is {}x{} cells, walking the addressable {}x{}", toc.size_x, toc.size_y, bounds.size_x, bounds.size_y);
        }

        let mut result = Vec::new();
        for (x, y) in bounds.cells() {
            match self.fixtures(world, layer, x, y) {
                Ok(file) => result.push((x, y, file)),
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }

        debug!("world {world} layer {layer}: {} of {} cells have fixtures", result.len(), toc.size_x as u64 * toc.size_y as u64);
        Ok(result)
    }
}
