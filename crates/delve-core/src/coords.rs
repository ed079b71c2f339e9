//! Tile coordinates and the quad-tree tile index.
//!
//! Tiles are laid out level by level: every level-0 tile first, then every
//! level-1 tile, and so on up to the single root tile. Within a level tiles
//! are stored row-major.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::constants::TILE_SIZE;
use crate::math::Rect;

/// Position of a tile in the mip hierarchy.
///
/// Level 0 is full resolution; each level up halves the tile grid per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub level: u32,
}

impl TileCoord {
    /// Create a new tile coordinate
    #[inline]
    pub const fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }

    /// World units covered by one texel of this tile
    #[inline]
    pub const fn texel_size(self) -> u32 {
        1 << self.level
    }

    /// World units covered by this tile per axis
    #[inline]
    pub const fn world_size(self) -> u32 {
        (TILE_SIZE as u32) << self.level
    }

    /// World position of the tile's first sample
    #[inline]
    pub fn world_origin(self) -> Vec2 {
        let size = self.world_size() as f32;
        Vec2::new(self.x as f32 * size, self.y as f32 * size)
    }

    /// Parent coordinate one level up
    #[inline]
    pub const fn parent(self) -> Self {
        Self::new(self.x >> 1, self.y >> 1, self.level + 1)
    }

    /// The four children one level down, in row-major order.
    ///
    /// Returns `None` for level-0 tiles.
    pub const fn children(self) -> Option<[Self; 4]> {
        if self.level == 0 {
            return None;
        }
        let (x, y, level) = (self.x << 1, self.y << 1, self.level - 1);
        Some([
            Self::new(x, y, level),
            Self::new(x + 1, y, level),
            Self::new(x, y + 1, level),
            Self::new(x + 1, y + 1, level),
        ])
    }

    /// Neighbor at a tile offset on the same level, if it has non-negative coordinates.
    pub fn offset(self, delta: IVec2) -> Option<Self> {
        let x = i64::from(self.x) + i64::from(delta.x);
        let y = i64::from(self.y) + i64::from(delta.y);
        (x >= 0 && y >= 0).then(|| Self::new(x as u32, y as u32, self.level))
    }
}

/// Flat slot of a tile in the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TileHandle(pub u32);

impl TileHandle {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bijective mapping between [`TileCoord`]s and flat [`TileHandle`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileIndex {
    tiles_per_side: u32,
    /// `mip_bases[l]` is the slot of the first tile at level `l`; the final
    /// element is the total tile count.
    mip_bases: Vec<u32>,
}

impl TileIndex {
    /// Create an index for a map `tiles_per_side` level-0 tiles wide.
    pub fn new(tiles_per_side: u32) -> Self {
        assert!(
            tiles_per_side.is_power_of_two(),
            "tiles per side must be a power of two, got {tiles_per_side}"
        );
        let level_count = tiles_per_side.trailing_zeros() + 1;
        let area = u64::from(tiles_per_side) * u64::from(tiles_per_side);
        let mip_bases = (0..=level_count)
            .map(|level| {
                // Geometric series: area * (1 + 1/4 + ... + 1/4^(level-1)).
                let tail = if level >= 32 { 0 } else { (4 * area) >> (2 * level) };
                ((4 * area - tail) / 3) as u32
            })
            .collect();
        Self {
            tiles_per_side,
            mip_bases,
        }
    }

    /// Level-0 tiles per axis
    #[inline]
    pub const fn tiles_per_side(&self) -> u32 {
        self.tiles_per_side
    }

    /// Level-0 texels per axis
    #[inline]
    pub const fn texels_per_side(&self) -> u32 {
        self.tiles_per_side * TILE_SIZE as u32
    }

    /// Number of mip levels, including level 0
    #[inline]
    pub fn level_count(&self) -> u32 {
        (self.mip_bases.len() - 1) as u32
    }

    /// Total number of tiles across all levels
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.mip_bases[self.mip_bases.len() - 1] as usize
    }

    /// Tiles per axis at `level`
    #[inline]
    pub const fn side_at(&self, level: u32) -> u32 {
        self.tiles_per_side >> level
    }

    /// Slot of the first tile at `level`
    #[inline]
    pub fn mip_base(&self, level: u32) -> u32 {
        self.mip_bases[level as usize]
    }

    /// Range of slots holding the tiles of `level`
    pub fn level_range(&self, level: u32) -> std::ops::Range<usize> {
        self.mip_bases[level as usize] as usize..self.mip_bases[level as usize + 1] as usize
    }

    /// Flat slot of `coord`, or `None` if the coordinate is outside the map.
    #[inline]
    pub fn index(&self, coord: TileCoord) -> Option<TileHandle> {
        if coord.level >= self.level_count() {
            return None;
        }
        let side = self.side_at(coord.level);
        if coord.x >= side || coord.y >= side {
            return None;
        }
        Some(TileHandle(
            self.mip_base(coord.level) + coord.y * side + coord.x,
        ))
    }

    /// Coordinate of a valid handle.
    pub fn coord(&self, handle: TileHandle) -> TileCoord {
        assert!(
            handle.index() < self.tile_count(),
            "tile handle {} out of range ({} tiles)",
            handle.0,
            self.tile_count()
        );
        let level = self.mip_bases[1..]
            .iter()
            .position(|&end| handle.0 < end)
            .unwrap_or(0) as u32;
        let local = handle.0 - self.mip_base(level);
        let side = self.side_at(level);
        TileCoord::new(local % side, local / side, level)
    }

    /// Handle of the parent tile, or `None` for the root.
    pub fn parent(&self, handle: TileHandle) -> Option<TileHandle> {
        self.index(self.coord(handle).parent())
    }

    /// Every ancestor of `handle`, nearest first.
    pub fn ancestors(&self, handle: TileHandle) -> impl Iterator<Item = TileHandle> + '_ {
        std::iter::successors(self.parent(handle), move |&h| self.parent(h))
    }

    /// Handles of all tiles at `level` intersecting `rect` (world units).
    pub fn tiles_in_rect(&self, rect: Rect, level: u32) -> Vec<TileHandle> {
        if level >= self.level_count() {
            return Vec::new();
        }
        let size = ((TILE_SIZE as u32) << level) as f32;
        let side = self.side_at(level) as i64;
        let min = (rect.min / size).floor();
        let max = (rect.max / size).floor();
        let (x0, y0) = ((min.x as i64).max(0), (min.y as i64).max(0));
        let (x1, y1) = ((max.x as i64).min(side - 1), (max.y as i64).min(side - 1));
        if x0 > x1 || y0 > y1 {
            return Vec::new();
        }

        let mut handles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                if let Some(h) = self.index(TileCoord::new(x as u32, y as u32, level)) {
                    handles.push(h);
                }
            }
        }
        handles
    }
}
