//! Distance field reconstruction and sphere tracing over level-0 samples.

use delve_core::constants::TILE_SIZE;
use delve_core::Density;
use glam::Vec2;

use crate::store::DensityStore;

/// Default step cap for [`DensityStore::raymarch`].
pub const RAYMARCH_MAX_STEPS: u32 = 100;

/// Reconstructed distance and unit gradient at a point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SdfSample {
    /// Signed distance in world units; `>= 0` is solid.
    pub dist: f32,
    /// Normalized gradient, pointing into material. Zero on flat regions.
    pub grad: Vec2,
}

impl SdfSample {
    #[inline]
    pub fn is_solid(&self) -> bool {
        self.dist >= 0.0
    }
}

impl DensityStore {
    /// Nearest-texel distance with a central-difference gradient.
    pub fn sample_coarse(&self, pos: Vec2) -> SdfSample {
        let sample = self.sample(pos);
        let byte = self.tile(sample.handle)[sample.offset / TILE_SIZE][sample.offset % TILE_SIZE];
        SdfSample {
            dist: Density(byte).distance(),
            grad: sample.gradient.normalize_or_zero(),
        }
    }

    /// Bilinear distance and blended gradient from the four surrounding texels.
    ///
    /// Positions off the map read the clamped edge texels.
    pub fn sample_fine(&self, pos: Vec2) -> SdfSample {
        // Keep the texel arithmetic below in range for far-off positions.
        let side = self.index().texels_per_side() as f32;
        let pos = pos.clamp(Vec2::splat(-1.0), Vec2::splat(side));
        let base = pos.floor();
        let (fx, fy) = (pos.x - base.x, pos.y - base.y);
        let (ix, iy) = (base.x as i32, base.y as i32);

        let d00 = self.distance_at(ix, iy);
        let d10 = self.distance_at(ix + 1, iy);
        let d01 = self.distance_at(ix, iy + 1);
        let d11 = self.distance_at(ix + 1, iy + 1);

        let top = d00 + (d10 - d00) * fx;
        let bottom = d01 + (d11 - d01) * fx;
        let dist = top + (bottom - top) * fy;

        let gx = (d10 - d00) + ((d11 - d01) - (d10 - d00)) * fy;
        let gy = (d01 - d00) + ((d11 - d10) - (d01 - d00)) * fx;

        SdfSample {
            dist,
            grad: Vec2::new(gx, gy).normalize_or_zero(),
        }
    }

    /// Sphere-trace a disc of `radius` from `a` toward `b`.
    ///
    /// Returns the fraction of the segment travelled before the free-space
    /// clearance minus `radius` drops below `threshold`, or `1.0` if the disc
    /// reaches `b` (or runs out of steps) without doing so.
    pub fn raymarch(&self, a: Vec2, b: Vec2, radius: f32, threshold: f32, max_steps: u32) -> f32 {
        let delta = b - a;
        let length = delta.length();
        let dir = delta.normalize_or_zero();

        let mut travelled = 0.0f32;
        for _ in 0..max_steps {
            let p = a + dir * travelled;
            let gap = -self.sample_fine(p).dist - radius;
            if gap < threshold {
                return if length > 0.0 {
                    (travelled / length).clamp(0.0, 1.0)
                } else {
                    0.0
                };
            }
            travelled += gap;
            if travelled >= length {
                return 1.0;
            }
        }
        1.0
    }
}
