pub mod error;
pub mod datreader;
pub mod keys;
pub mod limits;
pub mod toc;
pub mod fixtures;
pub mod terrain;


pub use error::DatError;
pub use datreader::DatReader;
pub use keys::{CellCoord, ContentKey, ContentKind};
pub use limits::DecodeLimits;
pub use toc::Toc;
pub use fixtures::{Fixture, FixtureFile, FixtureLayout};
pub use terrain::{TerrainFile, TerrainLayer};
