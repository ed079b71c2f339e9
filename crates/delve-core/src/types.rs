//! Core terrain sample types.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::constants::{DENSITY_THRESHOLD, MAX_DISTANCE};

/// An 8-bit encoded signed distance.
///
/// Distances in `[-MAX_DISTANCE, MAX_DISTANCE]` map linearly onto `[0, 255]`.
/// Positive distances are inside material, so bytes at or above
/// [`Density::THRESHOLD`] are solid.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Density(pub u8);

impl Density {
    /// Bytes per unit of distance.
    pub const RESOLUTION: f32 = 127.5 / MAX_DISTANCE;
    /// As far into open air as can be represented.
    pub const AIR: Self = Self(0);
    /// As deep inside material as can be represented.
    pub const SOLID: Self = Self(u8::MAX);
    /// The surface bias point.
    pub const THRESHOLD: Self = Self(DENSITY_THRESHOLD);

    /// Encode a distance, clamping to the representable range.
    #[inline]
    pub fn from_distance(distance: f32) -> Self {
        let biased = 127.5 + distance.clamp(-MAX_DISTANCE, MAX_DISTANCE) * Self::RESOLUTION;
        Self(biased.round().clamp(0.0, 255.0) as u8)
    }

    /// Decode to a distance in `[-MAX_DISTANCE, MAX_DISTANCE]`.
    #[inline]
    pub fn distance(self) -> f32 {
        (f32::from(self.0) - 127.5) / Self::RESOLUTION
    }

    /// Returns true if this sample lies inside material
    #[inline]
    pub const fn is_solid(self) -> bool {
        self.0 >= DENSITY_THRESHOLD
    }
}

impl From<Density> for f32 {
    #[inline]
    fn from(d: Density) -> Self {
        d.distance()
    }
}

impl From<f32> for Density {
    #[inline]
    fn from(distance: f32) -> Self {
        Self::from_distance(distance)
    }
}

/// Where a tile's density stands relative to its GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileState {
    /// Density is stale and must be gathered from finer mips.
    Dirty,
    /// Density is valid but no texture slot is assigned.
    Ready,
    /// Density is valid and uploaded to a texture slot.
    Cached,
}

impl Default for TileState {
    fn default() -> Self {
        Self::Dirty
    }
}

/// Index of one layer in the terrain array texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TextureSlot(pub u32);

impl TextureSlot {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
