//! Synthetic worlds and field comparison.

use delve_core::{Density, TileIndex};
use delve_sdf::JobScheduler;
use delve_world::{BiomeField, DensityStore, TerrainConfig, TerrainEngine};

use crate::{Result, TestError};

/// Small configuration suited to tests.
pub fn test_config(tiles_per_side: u32) -> TerrainConfig {
    TerrainConfig {
        tiles_per_side,
        cache_slots: 64,
        biome_cell_size: 32,
        chunk_count: 4,
        ..Default::default()
    }
}

/// A map that is solid everywhere, all biome channel 0.
pub fn solid_world<S: JobScheduler>(tiles_per_side: u32, scheduler: S) -> Result<TerrainEngine<S>> {
    Ok(TerrainEngine::new_filled(
        test_config(tiles_per_side),
        Density::SOLID,
        [255, 0, 0, 0],
        scheduler,
    )?)
}

/// Height of the rolling ground at column `x` of a map `side` texels wide.
pub fn ground_height(x: f32, side: f32) -> f32 {
    side * 0.5 + side * 0.08 * (x * 0.031).sin() + 6.0 * (x * 0.17).cos()
}

/// Air above [`ground_height`], material below it, all biome channel 1.
///
/// Samples hold the vertical distance to the surface, which overestimates
/// the true distance on slopes.
pub fn ground_world<S: JobScheduler>(tiles_per_side: u32, scheduler: S) -> Result<TerrainEngine<S>> {
    let config = test_config(tiles_per_side);
    let side = config.texels_per_side() as f32;
    let store = DensityStore::from_fn(TileIndex::new(tiles_per_side), |x, y| {
        Density::from_distance(y as f32 - ground_height(x as f32, side))
    });
    let biome = BiomeField::new(
        config.biome_cells_per_side(),
        config.biome_cell_size,
        [0, 255, 0, 0],
    );
    Ok(TerrainEngine::from_parts(config, store, biome, scheduler)?)
}

/// How far two density fields may differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTolerance {
    /// Largest byte difference that still counts as equal.
    pub max_delta: u8,
    /// Number of samples allowed to exceed `max_delta`.
    pub max_outliers: usize,
}

/// Compare two byte fields sample by sample. Returns the outlier count.
pub fn compare_fields(expected: &[u8], actual: &[u8], tolerance: FieldTolerance) -> Result<usize> {
    if expected.len() != actual.len() {
        return Err(TestError::FieldComparison(format!(
            "field sizes differ: {} vs {}",
            expected.len(),
            actual.len()
        )));
    }

    let mut outliers = 0;
    let mut first = None;
    for (i, (&e, &a)) in expected.iter().zip(actual).enumerate() {
        if e.abs_diff(a) > tolerance.max_delta {
            outliers += 1;
            first.get_or_insert((i, e, a));
        }
    }

    if outliers > tolerance.max_outliers {
        let (i, e, a) = first.unwrap_or_default();
        return Err(TestError::FieldComparison(format!(
            "{outliers} samples differ by more than {} (first at {i}: {e} vs {a})",
            tolerance.max_delta
        )));
    }
    Ok(outliers)
}
