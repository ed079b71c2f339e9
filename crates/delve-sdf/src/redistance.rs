//! Jump-flood redistancing.
//!
//! After an edit the magnitudes near the changed region no longer describe
//! the distance to the nearest surface. [`Redistancer::run`] rebuilds them:
//!
//! 1. Every cell is seeded with a *feature*: an offset to a known surface
//!    point plus a residual distance. Cells next to a sign change get the
//!    interpolated zero crossing; cells the caller trusts keep their old
//!    magnitude as a residual; everything else starts out unknown.
//! 2. Separable jump flooding: for each radius, a row pass compares every
//!    cell with the cells `radius` texels left and right, then the grid is
//!    transposed so the same row routine handles columns.
//! 3. Each cell resolves to `|offset| + residual` with its original sign.
//!
//! Rows are independent within a pass, so each pass is one scheduler batch.

use delve_core::constants::MAX_DISTANCE;
use glam::Vec2;

use crate::jobs::JobScheduler;

/// Smallest magnitude written back for air cells, so they keep encoding as air.
const MIN_AIR_DISTANCE: f32 = 1.0 / 64.0;

const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Row-major scratch grid of signed distances, in texels.
///
/// Values `>= 0` are solid, values `< 0` are air.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceGrid {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl DistanceGrid {
    /// Create a grid filled with `value`.
    pub fn new(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    /// Wrap existing row-major values.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Self {
        assert_eq!(values.len(), width * height, "grid dimensions mismatch");
        Self {
            width,
            height,
            values,
        }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.values[y * self.width + x] = value;
    }
}

/// Offset from a cell to its nearest known surface point, plus residual distance.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Feature {
    offset: Vec2,
    residual: f32,
}

impl Feature {
    const UNKNOWN: Self = Self {
        offset: Vec2::ZERO,
        residual: MAX_DISTANCE,
    };

    #[inline]
    fn distance(self) -> f32 {
        self.offset.length() + self.residual
    }

    #[inline]
    fn shifted(self, dx: f32) -> Self {
        Self {
            offset: Vec2::new(self.offset.x + dx, self.offset.y),
            residual: self.residual,
        }
    }

    #[inline]
    fn transposed(self) -> Self {
        Self {
            offset: Vec2::new(self.offset.y, self.offset.x),
            residual: self.residual,
        }
    }
}

/// Parallel jump-flood distance transform.
#[derive(Clone, Copy, Debug)]
pub struct Redistancer {
    max_distance: f32,
}

impl Default for Redistancer {
    fn default() -> Self {
        Self::new(MAX_DISTANCE)
    }
}

impl Redistancer {
    /// Create a redistancer clamping results to `max_distance`.
    pub fn new(max_distance: f32) -> Self {
        assert!(max_distance >= 1.0, "max distance must be at least one texel");
        Self { max_distance }
    }

    /// Jump radii in pass order: half the max distance, halving down to 1.
    pub fn radii(&self) -> impl Iterator<Item = usize> {
        let start = ((self.max_distance as usize) / 2).max(1);
        std::iter::successors(Some(start), |&r| (r > 1).then_some(r / 2))
    }

    /// Recompute every distance in `grid`.
    ///
    /// `trusted(x, y, value)` marks cells whose current magnitude is still a
    /// valid distance; they seed the flood with it instead of starting unknown.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn run<S, T>(&self, grid: &mut DistanceGrid, scheduler: &S, trusted: T)
    where
        S: JobScheduler,
        T: Fn(usize, usize, f32) -> bool + Sync,
    {
        let (width, height) = (grid.width, grid.height);
        if width == 0 || height == 0 {
            return;
        }

        let mut features = vec![Feature::UNKNOWN; width * height];
        let values = grid.values.as_slice();
        scheduler.run_batch(&mut features, width, |y, row| {
            for (x, feature) in row.iter_mut().enumerate() {
                *feature = seed(values, width, height, x, y, &trusted);
            }
        });

        let mut scratch = vec![Feature::UNKNOWN; width * height];
        for radius in self.radii() {
            row_pass(scheduler, &features, &mut scratch, width, radius);
            transpose(scheduler, &scratch, &mut features, width, height);
            row_pass(scheduler, &features, &mut scratch, height, radius);
            transpose(scheduler, &scratch, &mut features, height, width);
        }

        let max_distance = self.max_distance;
        scheduler.run_batch(&mut grid.values, width, |y, row| {
            for (x, value) in row.iter_mut().enumerate() {
                let d = features[y * width + x].distance().min(max_distance);
                *value = if *value >= 0.0 {
                    d
                } else {
                    -d.max(MIN_AIR_DISTANCE)
                };
            }
        });
    }
}

fn seed<T>(values: &[f32], width: usize, height: usize, x: usize, y: usize, trusted: &T) -> Feature
where
    T: Fn(usize, usize, f32) -> bool,
{
    let v = values[y * width + x];
    let solid = v >= 0.0;

    let mut best: Option<Feature> = None;
    for (ox, oy) in NEIGHBORS {
        let (nx, ny) = (x as i32 + ox, y as i32 + oy);
        if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
            continue;
        }
        let n = values[ny as usize * width + nx as usize];
        if (n >= 0.0) == solid {
            continue;
        }
        // Linear zero crossing between the two samples.
        let t = v / (v - n);
        let offset = Vec2::new(ox as f32, oy as f32) * t;
        if best.map_or(true, |b| offset.length() < b.offset.length()) {
            best = Some(Feature {
                offset,
                residual: 0.0,
            });
        }
    }

    best.unwrap_or_else(|| {
        if trusted(x, y, v) {
            Feature {
                offset: Vec2::ZERO,
                residual: v.abs().min(MAX_DISTANCE),
            }
        } else {
            Feature::UNKNOWN
        }
    })
}

/// One horizontal jump: every cell considers the cells `radius` to either side.
fn row_pass<S: JobScheduler>(
    scheduler: &S,
    src: &[Feature],
    dst: &mut [Feature],
    width: usize,
    radius: usize,
) {
    let step = radius as f32;
    scheduler.run_batch(dst, width, |y, out| {
        let row = &src[y * width..(y + 1) * width];
        for (x, cell) in out.iter_mut().enumerate() {
            let mut best = row[x];
            let mut best_distance = best.distance();
            if x >= radius {
                let candidate = row[x - radius].shifted(-step);
                let d = candidate.distance();
                if d < best_distance {
                    best = candidate;
                    best_distance = d;
                }
            }
            if x + radius < width {
                let candidate = row[x + radius].shifted(step);
                if candidate.distance() < best_distance {
                    best = candidate;
                }
            }
            *cell = best;
        }
    });
}

/// Transpose a `width x height` grid into a `height x width` grid.
fn transpose<S: JobScheduler>(
    scheduler: &S,
    src: &[Feature],
    dst: &mut [Feature],
    width: usize,
    height: usize,
) {
    scheduler.run_batch(dst, height, |x, out| {
        for (y, cell) in out.iter_mut().enumerate() {
            *cell = src[y * width + x].transposed();
        }
    });
}
