use std::fs;
use std::path::Path;
use tempfile::TempDir;

use eso_world_lib::{ContentKey, DatError, DecodeLimits, WorldArchive};


fn write_toc(dir: &Path, world: u32, size_x: u32, size_y: u32) {
    let mut bytes = vec![1, 0, 0, 0];
    bytes.extend_from_slice(&size_x.to_le_bytes());
    bytes.extend_from_slice(&size_y.to_le_bytes());
    fs::write(dir.join(ContentKey::world_toc(world).filename()), bytes).unwrap();
}

fn fixture_bytes(version: u32, models: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&version.to_le_bytes());
    bytes.extend_from_slice(&(models.len() as u32).to_le_bytes());
    for (i, model) in models.iter().enumerate() {
        bytes.extend_from_slice(&(i as u64 + 1000).to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        for v in [0.0f32, 90.0, 180.0, i as f32, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[0; 28]);
        bytes.extend_from_slice(&model.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        if version != 22 {
            bytes.extend_from_slice(&[0; 16]);
        }
    }
    bytes
}

fn terrain_bytes(rows: &[&[u8]]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 7]);
    bytes.push(2);
    for size in [0u32, 64] {
        bytes.extend_from_slice(&[0; 5]);
        bytes.extend_from_slice(&size.to_le_bytes());
    }
    bytes.extend_from_slice(&[0; 82]);
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&(rows[0].len() as u32).to_le_bytes());
    for row in rows {
        bytes.extend_from_slice(&[0; 2]);
        bytes.extend_from_slice(row);
    }
    bytes.extend_from_slice(&[0; 4]);
    bytes
}

fn write_cell(dir: &Path, world: u32, layer: u32, x: u32, y: u32, bytes: &[u8]) {
    fs::write(dir.join(ContentKey::world_cell(world, layer, x, y).filename()), bytes).unwrap();
}


#[test]
fn reads_toc_fixtures_and_terrain_by_coordinates() {
    let dir = TempDir::new().unwrap();
    write_toc(dir.path(), 2, 3, 4);
    write_cell(dir.path(), 2, 1, 0, 3, &fixture_bytes(22, &[7, 8]));
    write_cell(dir.path(), 2, 5, 0, 3, &terrain_bytes(&[&[1, 2, 3], &[4, 5, 6]]));

    let archive = WorldArchive::new(dir.path(), DecodeLimits::default());

    let toc = archive.toc(2).unwrap();
    assert_eq!((toc.size_x, toc.size_y), (3, 4));

    let fixtures = archive.fixtures(2, 1, 0, 3).unwrap();
    assert_eq!(fixtures.version, 22);
    assert_eq!(fixtures.models(), vec![7, 8]);
    assert_eq!(fixtures.fixtures()[1].x, 1.0);
    assert_eq!(fixtures.fixtures()[1].rot_y, 90.0);

    let terrain = archive.terrain(2, 5, 0, 3).unwrap();
    assert!(terrain.layer(0).is_none());
    assert_eq!(terrain.layer(1).unwrap().data, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn world_walk_skips_missing_cells() {
    let dir = TempDir::new().unwrap();
    write_toc(dir.path(), 0, 2, 2);
    write_cell(dir.path(), 0, 0, 1, 0, &fixture_bytes(23, &[1]));
    write_cell(dir.path(), 0, 0, 0, 1, &fixture_bytes(22, &[2, 3]));
    // outside the toc bounds, never visited
    write_cell(dir.path(), 0, 0, 5, 5, &fixture_bytes(22, &[4]));

    let archive = WorldArchive::new(dir.path(), DecodeLimits::default());
    let cells = archive.world_fixtures(0, 0).unwrap();

    let found: Vec<_> = cells.iter().map(|(x, y, file)| (*x, *y, file.len())).collect();
    assert_eq!(found, vec![(0, 1, 2), (1, 0, 1)]);
}

#[test]
fn world_walk_stops_on_broken_cell() {
    let dir = TempDir::new().unwrap();
    write_toc(dir.path(), 0, 1, 2);
    let mut broken = fixture_bytes(23, &[1]);
    broken.pop();
    write_cell(dir.path(), 0, 0, 0, 1, &broken);

    let archive = WorldArchive::new(dir.path(), DecodeLimits::default());
    assert!(matches!(archive.world_fixtures(0, 0), Err(DatError::TruncatedInput { .. })));
}

#[test]
fn missing_toc_is_not_found() {
    let dir = TempDir::new().unwrap();
    let archive = WorldArchive::new(dir.path(), DecodeLimits::default());
    let err = archive.toc(9).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn limits_apply_through_the_archive() {
    let dir = TempDir::new().unwrap();
    write_cell(dir.path(), 0, 0, 0, 0, &fixture_bytes(22, &[1, 2, 3]));

    let limits_path = dir.path().join("limits.json");
    fs::write(&limits_path, r#"{"max_fixtures": 2}"#).unwrap();
    let limits = DecodeLimits::load(&limits_path).unwrap();

    let archive = WorldArchive::new(dir.path(), limits);
    assert!(matches!(archive.fixtures(0, 0, 0, 0), Err(DatError::InvalidCount { count: 3, max: 2 })));
}

#[test]
fn archive_files_use_canonical_names() {
    let dir = TempDir::new().unwrap();
    let archive = WorldArchive::new(dir.path(), DecodeLimits::default());
    let path = archive.path_of(ContentKey::world_cell(1, 2, 3, 4));
    assert_eq!(path.file_name().unwrap(), "4000002200030004.dat");
}

#[test]
fn world_walk_stops_at_addressable_cells() {
    let dir = TempDir::new().unwrap();
    // one column wider than a cell key can address
    write_toc(dir.path(), 0, 0x10001, 1);
    write_cell(dir.path(), 0, 0, 0, 0, &fixture_bytes(22, &[1]));

    let archive = WorldArchive::new(dir.path(), DecodeLimits::default());
    let cells = archive.world_fixtures(0, 0).unwrap();

    let found: Vec<_> = cells.iter().map(|(x, y, _)| (*x, *y)).collect();
    assert_eq!(found, vec![(0, 0)]);
}
