//! Core types, coordinates, and error types for the Delve terrain engine.
//!
//! This crate provides the foundational types shared by the terrain crates:
//! - Tile coordinates and the quad-tree tile index
//! - The 8-bit signed distance encoding
//! - 2D math helpers (rectangles, segments)
//! - Common error types

pub mod coords;
pub mod error;
pub mod math;
pub mod types;

pub use coords::{TileCoord, TileHandle, TileIndex};
pub use error::{Error, Result};
pub use math::{Rect, Segment};
pub use types::{Density, TextureSlot, TileState};

/// Engine-wide constants
pub mod constants {
    /// Size of a tile in texels per axis
    pub const TILE_SIZE: usize = 32;
    /// Total texels in a tile (32^2)
    pub const TILE_TEXELS: usize = TILE_SIZE * TILE_SIZE;
    /// Largest representable distance magnitude, in level-local texels
    pub const MAX_DISTANCE: f32 = 16.0;
    /// Encoded density at which a sample counts as solid
    pub const DENSITY_THRESHOLD: u8 = 128;
    /// Sub-texel steps per texel used for contour endpoints
    pub const SUBPIXEL_STEPS: i32 = 8;
}
