use std::io::{Read, Seek};
use std::path::Path;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use crate::dat::{DatError, DatReader, DecodeLimits};


/*
    fixture record, offsets in bytes

    0   u64     id
    8   [8]     unknown
    16  f32x3   rotation x, y, z
    28  f32x3   position x, y, z
    40  [12]    end of fixture header, unknown
    52  [16]    start of static section, unknown
    68  u32     model
    72  [8]     unknown
    80  [16]    only when version != 22
 */
const FIXTURE_RECORD_SIZE: u64 = 80;
const FIXTURE_EXTENDED_TAIL: u64 = 16;

/// the only version known to lack the trailing block
const COMPACT_VERSION: u32 = 22;


/// Record layout selected by the file version
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FixtureLayout {
    /// version 22, records end right after the model block
    Compact,
    /// any other version, 16 more bytes per record
    Extended,
}

impl FixtureLayout {
    pub fn from_version(version: u32) -> Self {
        if version == COMPACT_VERSION { FixtureLayout::Compact } else { FixtureLayout::Extended }
    }

    #[inline]
    fn tail(&self) -> u64 {
        match self {
            FixtureLayout::Compact => 0,
            FixtureLayout::Extended => FIXTURE_EXTENDED_TAIL,
        }
    }

    pub fn record_size(&self) -> u64 {
        FIXTURE_RECORD_SIZE + self.tail()
    }
}


/// One placed static object. Ids are not unique, neither inside a file nor across files
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rot_x: f32,
    pub rot_y: f32,
    pub rot_z: f32,
    pub model: u32,
}

/// Fixtures of one cell in file order
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureFile {
    pub version: u32,
    pub fixture_count: u32,
    fixtures: Vec<Fixture>,
}

impl FixtureFile {
    pub fn read(path: &Path, limits: &DecodeLimits) -> Result<Self, DatError> {
        trace!("FixtureFile::read {}", path.display());
        Self::read_from(&mut DatReader::open(path)?, limits)
    }

    pub fn from_bytes(bytes: &[u8], limits: &DecodeLimits) -> Result<Self, DatError> {
        Self::read_from(&mut DatReader::from_bytes(bytes), limits)
    }

    pub fn read_from<R: Read + Seek>(r: &mut DatReader<R>, limits: &DecodeLimits) -> Result<Self, DatError> {
        let version = r.read_u32()?;
        let fixture_count = r.read_u32()?;

        if fixture_count > limits.max_fixtures {
            return Err(DatError::InvalidCount { count: fixture_count, max: limits.max_fixtures });
        }

        let layout = FixtureLayout::from_version(version);
        debug!("fixture file version {version} ({layout:?}), {fixture_count} fixtures");

        let required = fixture_count as u64 * layout.record_size();
        if required > r.remaining() {
            return Err(DatError::TruncatedInput {
                position: r.position(),
                expected: required,
                available: r.remaining(),
            });
        }

        let mut fixtures = Vec::with_capacity(fixture_count as usize);
        for _ in 0..fixture_count {
            fixtures.push(Self::read_fixture(r, layout)?);
        }

        Ok(FixtureFile { version, fixture_count, fixtures })
    }

    #[inline]
    fn read_fixture<R: Read + Seek>(r: &mut DatReader<R>, layout: FixtureLayout) -> Result<Fixture, DatError> {
        let id = r.read_u64()?;
        r.seek_relative(8)?;

        let (rot_x, rot_y, rot_z) = (r.read_f32()?, r.read_f32()?, r.read_f32()?);
        let (x, y, z) = (r.read_f32()?, r.read_f32()?, r.read_f32()?);

        r.seek_relative(12)?;   // fixture header end
        r.seek_relative(16)?;   // static start

        let model = r.read_u32()?;
        r.seek_relative(8)?;
        r.seek_relative(layout.tail())?;

        Ok(Fixture { id, x, y, z, rot_x, rot_y, rot_z, model })
    }

    pub fn layout(&self) -> FixtureLayout {
        FixtureLayout::from_version(self.version)
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fixture> {
        self.fixtures.iter()
    }

    /// distinct model ids in order of first use, the set a mesh provider has to resolve
    pub fn models(&self) -> Vec<u32> {
        let mut models = Vec::new();
        for fixture in &self.fixtures {
            if !models.contains(&fixture.model) {
                models.push(fixture.model);
            }
        }
        models
    }

    pub fn into_fixtures(self) -> Vec<Fixture> {
        self.fixtures
    }
}

impl<'a> IntoIterator for &'a FixtureFile {
    type Item = &'a Fixture;
    type IntoIter = std::slice::Iter<'a, Fixture>;

    fn into_iter(self) -> Self::IntoIter {
        self.fixtures.iter()
    }
}
