//! Terrain data files.
//!
//! The encoded level-0 tiles are concatenated in slot order and split into
//! `chunk_count` files named `terrain{i}.bin`; every file holds the same
//! number of bytes except the last, which also takes the remainder. The
//! biome field is stored raw in `biome.bin`.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use delve_core::{Error, Result};

/// Name of the raw RGBA8 biome file.
pub const BIOME_FILE: &str = "biome.bin";

/// Path of the `index`-th terrain chunk inside `dir`.
pub fn terrain_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("terrain{index}.bin"))
}

/// Byte range of every chunk when `total` bytes are split `chunk_count` ways.
pub fn chunk_ranges(total: usize, chunk_count: usize) -> Vec<Range<usize>> {
    assert!(chunk_count > 0, "chunk count must be non-zero");
    let chunk = total / chunk_count;
    (0..chunk_count)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == chunk_count { total } else { start + chunk };
            start..end
        })
        .collect()
}

fn read_exact_file(path: &Path, expected: usize) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    if bytes.len() != expected {
        return Err(Error::TruncatedData {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Read and concatenate the terrain chunks in `dir`.
pub fn read_level0(dir: &Path, total: usize, chunk_count: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(total);
    for (i, range) in chunk_ranges(total, chunk_count).into_iter().enumerate() {
        bytes.extend(read_exact_file(&terrain_path(dir, i), range.len())?);
    }
    Ok(bytes)
}

/// Split `bytes` into `chunk_count` terrain files in `dir`.
pub fn write_level0(dir: &Path, bytes: &[u8], chunk_count: usize) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    for (i, range) in chunk_ranges(bytes.len(), chunk_count).into_iter().enumerate() {
        let path = terrain_path(dir, i);
        fs::write(&path, &bytes[range]).map_err(|e| Error::io(&path, e))?;
    }
    Ok(())
}

/// Read the raw biome field from `dir`.
pub fn read_biome(dir: &Path, expected: usize) -> Result<Vec<u8>> {
    read_exact_file(&dir.join(BIOME_FILE), expected)
}

/// Write the raw biome field into `dir`.
pub fn write_biome(dir: &Path, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let path = dir.join(BIOME_FILE);
    fs::write(&path, bytes).map_err(|e| Error::io(&path, e))
}
