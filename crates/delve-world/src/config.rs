//! Terrain engine configuration.

use delve_core::constants::TILE_SIZE;
use delve_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Terrain engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Level-0 tiles per map axis. Must be a power of two.
    pub tiles_per_side: u32,
    /// Texture slots in the tile cache (array texture layers).
    pub cache_slots: usize,
    /// Level-0 texels covered by one biome cell per axis.
    pub biome_cell_size: u32,
    /// Number of `terrain{i}.bin` files the level-0 tiles are split across.
    pub chunk_count: usize,
    /// Step cap for sphere tracing.
    pub raymarch_max_steps: u32,
    /// Weight of the dominant-channel penalty when painting biomes.
    pub biome_penalty: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            tiles_per_side: 64,
            cache_slots: 1024,
            biome_cell_size: TILE_SIZE as u32,
            chunk_count: 4,
            raymarch_max_steps: 100,
            biome_penalty: 0.5,
        }
    }
}

impl TerrainConfig {
    /// Level-0 texels per map axis.
    #[inline]
    pub const fn texels_per_side(&self) -> u32 {
        self.tiles_per_side * TILE_SIZE as u32
    }

    /// Biome cells per map axis.
    #[inline]
    pub const fn biome_cells_per_side(&self) -> u32 {
        self.texels_per_side() / self.biome_cell_size
    }

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.tiles_per_side.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "tiles_per_side must be a power of two, got {}",
                self.tiles_per_side
            )));
        }
        if self.tiles_per_side > 1 << 12 {
            return Err(Error::InvalidConfig(format!(
                "tiles_per_side {} exceeds the 4096 limit",
                self.tiles_per_side
            )));
        }
        if self.cache_slots == 0 {
            return Err(Error::InvalidConfig("cache_slots must be non-zero".into()));
        }
        if self.biome_cell_size == 0 || self.texels_per_side() % self.biome_cell_size != 0 {
            return Err(Error::InvalidConfig(format!(
                "biome_cell_size {} must divide the map width of {} texels",
                self.biome_cell_size,
                self.texels_per_side()
            )));
        }
        if self.chunk_count == 0 {
            return Err(Error::InvalidConfig("chunk_count must be non-zero".into()));
        }
        if self.raymarch_max_steps == 0 {
            return Err(Error::InvalidConfig(
                "raymarch_max_steps must be non-zero".into(),
            ));
        }
        if !(self.biome_penalty.is_finite() && self.biome_penalty >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "biome_penalty must be finite and non-negative, got {}",
                self.biome_penalty
            )));
        }
        Ok(())
    }
}
