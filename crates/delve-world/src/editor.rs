//! Terrain and biome editing.
//!
//! Density edits run in three steps over a square window around the edit:
//! apply the brush to the decoded samples, re-distance the window with the
//! jump flood, then re-encode and mark every touched tile edited so its mip
//! ancestors re-gather on their next request.

use delve_core::constants::MAX_DISTANCE;
use delve_core::{Density, TileHandle};
use delve_sdf::{DistanceGrid, JobScheduler, Redistancer};
use glam::{IVec2, Vec2};
use hashbrown::HashSet;
use tracing::{debug, info};

use crate::biome::{cell_weights, dominant_channel, BiomeCell, BiomeField};
use crate::brush::Brush;
use crate::store::DensityStore;

/// Extra texels around a dig window beyond the largest affected distance.
const DIG_MARGIN: f32 = 2.0;

/// What an edit changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditSummary {
    /// Level-0 samples whose byte changed.
    pub changed_texels: usize,
    /// Level-0 tiles marked edited, sorted by handle.
    pub tiles: Vec<TileHandle>,
}

impl EditSummary {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changed_texels == 0
    }
}

/// Applies brushes, digs and biome paint to the terrain.
#[derive(Clone, Debug)]
pub struct Editor {
    redistancer: Redistancer,
    biome_penalty: f32,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Editor {
    pub fn new(biome_penalty: f32) -> Self {
        Self {
            redistancer: Redistancer::new(MAX_DISTANCE),
            biome_penalty,
        }
    }

    /// Carve a disc of `radius` around `pos`. Never adds material.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn dig<S: JobScheduler>(
        &self,
        store: &mut DensityStore,
        scheduler: &S,
        pos: Vec2,
        radius: f32,
    ) -> EditSummary {
        let reach = radius + MAX_DISTANCE + DIG_MARGIN;
        self.apply(
            store,
            scheduler,
            pos,
            radius,
            reach,
            |value, dist, _| value.min(dist - radius),
            true,
        )
    }

    /// Apply `brush` to every sample within `radius + MAX_DISTANCE` of `pos`.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn edit<S: JobScheduler, B: Brush>(
        &self,
        store: &mut DensityStore,
        scheduler: &S,
        pos: Vec2,
        radius: f32,
        brush: &B,
    ) -> EditSummary {
        let reach = radius + MAX_DISTANCE;
        self.apply(
            store,
            scheduler,
            pos,
            radius,
            reach,
            |value, dist, p| brush.apply(value, dist, radius, p),
            false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn apply<S, F>(
        &self,
        store: &mut DensityStore,
        scheduler: &S,
        pos: Vec2,
        radius: f32,
        reach: f32,
        brush: F,
        never_add: bool,
    ) -> EditSummary
    where
        S: JobScheduler,
        F: Fn(f32, f32, Vec2) -> f32,
    {
        let last = store.index().texels_per_side() as i32 - 1;
        let x0 = ((pos.x - reach).floor() as i32).max(0);
        let y0 = ((pos.y - reach).floor() as i32).max(0);
        let x1 = ((pos.x + reach).ceil() as i32).min(last);
        let y1 = ((pos.y + reach).ceil() as i32).min(last);
        if x0 > x1 || y0 > y1 {
            return EditSummary::default();
        }

        let width = (x1 - x0 + 1) as usize;
        let height = (y1 - y0 + 1) as usize;
        let mut edited = Vec::with_capacity(width * height);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Vec2::new(x as f32, y as f32);
                edited.push(brush(store.distance_at(x, y), p.distance(pos), p));
            }
        }

        let mut grid = DistanceGrid::from_values(width, height, edited.clone());
        self.redistancer.run(&mut grid, scheduler, |gx, gy, value| {
            let p = Vec2::new((x0 + gx as i32) as f32, (y0 + gy as i32) as f32);
            value.abs() + 1.0 <= (p.distance(pos) - radius).max(0.0)
        });

        let mut changed_texels = 0;
        let mut touched = HashSet::new();
        for (i, (&redistanced, &brushed)) in grid.values().iter().zip(&edited).enumerate() {
            let value = if never_add {
                redistanced.min(brushed)
            } else {
                redistanced
            };
            let x = (x0 + (i % width) as i32) as u32;
            let y = (y0 + (i / width) as i32) as u32;
            if let Some(tile) = store.set_texel(x, y, Density::from_distance(value)) {
                changed_texels += 1;
                touched.insert(tile);
            }
        }

        let tiles = mark_touched(store, &touched);
        debug!(
            "Edit at ({:.1}, {:.1}) r={:.1}: {} texels changed, {} tiles marked",
            pos.x,
            pos.y,
            radius,
            changed_texels,
            tiles.len()
        );
        EditSummary {
            changed_texels,
            tiles,
        }
    }

    /// Re-distance the whole level-0 field from its zero crossings alone.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn rectify<S: JobScheduler>(&self, store: &mut DensityStore, scheduler: &S) -> EditSummary {
        let side = store.index().texels_per_side() as usize;
        let values = (0..side * side)
            .map(|i| store.distance_at((i % side) as i32, (i / side) as i32))
            .collect();
        let mut grid = DistanceGrid::from_values(side, side, values);
        self.redistancer.run(&mut grid, scheduler, |_, _, _| false);

        let mut changed_texels = 0;
        for (i, &value) in grid.values().iter().enumerate() {
            let (x, y) = ((i % side) as u32, (i / side) as u32);
            if store.set_texel(x, y, Density::from_distance(value)).is_some() {
                changed_texels += 1;
            }
        }

        let tiles: Vec<_> = store
            .index()
            .level_range(0)
            .map(|slot| TileHandle(slot as u32))
            .collect();
        for &tile in &tiles {
            store.mark_edited(tile);
        }
        info!(
            "Rectified {}x{} texels, {} changed",
            side, side, changed_texels
        );
        EditSummary {
            changed_texels,
            tiles,
        }
    }

    /// Blend biome cells within `radius` of `pos` toward `target`.
    ///
    /// Cells dominated by a channel the target has less of resist the blend.
    /// Returns the number of cells changed.
    pub fn biome_edit(
        &self,
        field: &mut BiomeField,
        pos: Vec2,
        radius: f32,
        target: BiomeCell,
    ) -> usize {
        if radius <= 0.0 {
            return 0;
        }
        let target_weights = cell_weights(target);
        let cells: Vec<_> = field.cells_near(pos, radius).collect();

        let mut changed = 0;
        for cell in cells {
            let dist = field.cell_center(cell).distance(pos);
            if dist > radius {
                continue;
            }
            let current = cell_weights(field.cell(cell));
            let dominant = dominant_channel(current.to_array());
            let penalty = (current[dominant] - target_weights[dominant]).max(0.0);
            let alpha = (1.0 - dist / radius - self.biome_penalty * penalty).clamp(0.0, 1.0);
            if alpha <= 0.0 {
                continue;
            }

            let blended = (current.lerp(target_weights, alpha) * 255.0).round();
            let value = blended.to_array().map(|c| c.clamp(0.0, 255.0) as u8);
            if value != field.cell(cell) {
                field.set_cell(cell, value);
                changed += 1;
            }
        }
        changed
    }
}

/// Mark every changed tile edited, plus the tiles whose gathered texels read
/// its samples (right, down and down-right neighbours).
fn mark_touched(store: &mut DensityStore, touched: &HashSet<TileHandle>) -> Vec<TileHandle> {
    let mut marked = HashSet::with_capacity(touched.len() * 4);
    for &tile in touched {
        let coord = store.index().coord(tile);
        for delta in [IVec2::ZERO, IVec2::X, IVec2::Y, IVec2::ONE] {
            if let Some(handle) = coord.offset(delta).and_then(|c| store.index().index(c)) {
                marked.insert(handle);
            }
        }
    }

    let mut tiles: Vec<_> = marked.into_iter().collect();
    tiles.sort_unstable();
    for &tile in &tiles {
        store.mark_edited(tile);
    }
    tiles
}
