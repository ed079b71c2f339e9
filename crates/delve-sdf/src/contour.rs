//! Marching-squares collision geometry.
//!
//! Each packed texel carries the four corners of the cell whose bottom-right
//! corner is that texel (y grows downward, so "bottom" is the larger y):
//!
//! ```text
//!   c ---- d        c = (x-1, y-1)   d = (x, y-1)
//!   |      |
//!   a ---- b        a = (x-1, y)     b = (x, y)
//! ```
//!
//! Corners at or above the threshold are solid. The 4-bit selector indexes a
//! fixed table of edge pairs, and endpoints are interpolated along the
//! straddling edges in 1/8 texel steps. Segments keep solid on their right.

use bytemuck::{Pod, Zeroable};
use delve_core::constants::{SUBPIXEL_STEPS, TILE_SIZE};
use delve_core::Segment;
use glam::{IVec2, Vec2};

/// Upper bound on segments kept for one tile.
pub const MAX_SEGMENTS_PER_TILE: usize = 512;

/// Four corner densities of one cell, packed as one RGBA8 texel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct CellCorners {
    /// Bottom-left
    pub a: u8,
    /// Bottom-right
    pub b: u8,
    /// Top-left
    pub c: u8,
    /// Top-right
    pub d: u8,
}

impl CellCorners {
    #[inline]
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self { a, b, c, d }
    }

    #[inline]
    pub const fn splat(value: u8) -> Self {
        Self::new(value, value, value, value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

use Edge::{Bottom, Left, Right, Top};

/// Edge pairs per selector (bit0 = a, bit1 = b, bit2 = c, bit3 = d).
const SEGMENT_TABLE: [&[(Edge, Edge)]; 16] = [
    &[],                // 0: all air
    &[(Left, Bottom)],  // 1: a
    &[(Bottom, Right)], // 2: b
    &[(Left, Right)],   // 3: a b
    &[(Top, Left)],     // 4: c
    &[(Top, Bottom)],   // 5: a c
    // TODO: saddles 6 and 9 need a centre sample to pick a diagonal.
    &[],                // 6: b c
    &[(Top, Right)],    // 7: a b c
    &[(Right, Top)],    // 8: d
    &[],                // 9: a d
    &[(Bottom, Top)],   // 10: b d
    &[(Left, Top)],     // 11: a b d
    &[(Right, Left)],   // 12: c d
    &[(Right, Bottom)], // 13: a c d
    &[(Bottom, Left)],  // 14: b c d
    &[],                // 15: all solid
];

/// 4-bit corner classification of a cell.
#[inline]
pub const fn selector(corners: CellCorners, threshold: u8) -> u8 {
    (corners.a >= threshold) as u8
        | ((corners.b >= threshold) as u8) << 1
        | ((corners.c >= threshold) as u8) << 2
        | ((corners.d >= threshold) as u8) << 3
}

/// Sub-texel position of the threshold crossing from `p` toward `q`.
#[inline]
fn mid(p: u8, q: u8, threshold: u8) -> i32 {
    let (p, q, t) = (i32::from(p), i32::from(q), i32::from(threshold));
    SUBPIXEL_STEPS * (t - p) / (q - p)
}

fn edge_point(edge: Edge, corners: CellCorners, threshold: u8) -> IVec2 {
    let CellCorners { a, b, c, d } = corners;
    match edge {
        Top => IVec2::new(mid(c, d, threshold), 0),
        Bottom => IVec2::new(mid(a, b, threshold), SUBPIXEL_STEPS),
        Left => IVec2::new(0, mid(c, a, threshold)),
        Right => IVec2::new(SUBPIXEL_STEPS, mid(d, b, threshold)),
    }
}

/// Segments of one cell in sub-texel units relative to its top-left corner.
pub fn cell_segments(
    corners: CellCorners,
    threshold: u8,
) -> impl Iterator<Item = (IVec2, IVec2)> {
    SEGMENT_TABLE[selector(corners, threshold) as usize]
        .iter()
        .map(move |&(from, to)| {
            (
                edge_point(from, corners, threshold),
                edge_point(to, corners, threshold),
            )
        })
}

/// Extract world-space segments for one tile of packed texels.
///
/// `origin` is the world position of the tile's first sample and
/// `texel_size` the world size of one texel. Replaces the contents of `out`.
pub fn extract_tile_segments(
    texels: &[CellCorners],
    origin: Vec2,
    texel_size: f32,
    threshold: u8,
    out: &mut Vec<Segment>,
) {
    assert_eq!(texels.len(), TILE_SIZE * TILE_SIZE, "tile texel count mismatch");
    out.clear();

    let scale = texel_size / SUBPIXEL_STEPS as f32;
    let mut overflow = 0usize;
    for (i, &corners) in texels.iter().enumerate() {
        let (x, y) = ((i % TILE_SIZE) as f32, (i / TILE_SIZE) as f32);
        let cell_min = origin + Vec2::new(x - 1.0, y - 1.0) * texel_size;
        for (from, to) in cell_segments(corners, threshold) {
            if out.len() == MAX_SEGMENTS_PER_TILE {
                overflow += 1;
                continue;
            }
            out.push(Segment::new(
                cell_min + from.as_vec2() * scale,
                cell_min + to.as_vec2() * scale,
            ));
        }
    }

    if overflow > 0 {
        tracing::warn!(
            "Tile at {:?} produced {} segments over the {} limit; dropped",
            origin,
            overflow,
            MAX_SEGMENTS_PER_TILE
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::constants::DENSITY_THRESHOLD;

    const T: u8 = DENSITY_THRESHOLD;

    fn segments(corners: CellCorners) -> Vec<(IVec2, IVec2)> {
        cell_segments(corners, T).collect()
    }

    #[test]
    fn uniform_cells_are_empty() {
        assert!(segments(CellCorners::splat(255)).is_empty());
        assert!(segments(CellCorners::splat(0)).is_empty());
        assert!(segments(CellCorners::splat(T)).is_empty());
        assert!(segments(CellCorners::splat(T - 1)).is_empty());
    }

    #[test]
    fn single_air_corner_cuts_adjacent_edges() {
        // a below threshold, everything else solid: selector 14.
        let corners = CellCorners::new(T - 64, 200, 200, 200);
        assert_eq!(selector(corners, T), 14);
        let segs = segments(corners);
        assert_eq!(segs.len(), 1);
        let (from, to) = segs[0];
        // Bottom edge then left edge, both touching corner a = (0, 8).
        assert_eq!(from.y, SUBPIXEL_STEPS);
        assert!((0..=SUBPIXEL_STEPS).contains(&from.x));
        assert_eq!(to.x, 0);
        assert!((0..=SUBPIXEL_STEPS).contains(&to.y));
    }

    #[test]
    fn single_solid_corner_cuts_adjacent_edges() {
        let corners = CellCorners::new(20, 20, 20, 220);
        assert_eq!(selector(corners, T), 8);
        let segs = segments(corners);
        assert_eq!(segs.len(), 1);
        let (from, to) = segs[0];
        assert_eq!(from.x, SUBPIXEL_STEPS);
        assert_eq!(to.y, 0);
    }

    #[test]
    fn saddles_emit_nothing() {
        let bc = CellCorners::new(0, 255, 255, 0);
        let ad = CellCorners::new(255, 0, 0, 255);
        assert_eq!(selector(bc, T), 6);
        assert_eq!(selector(ad, T), 9);
        assert!(segments(bc).is_empty());
        assert!(segments(ad).is_empty());
    }

    #[test]
    fn interpolation_is_linear_in_bytes() {
        // Solid floor along the bottom edge, crossing halfway up both sides.
        let corners = CellCorners::new(T + 64, T + 64, T - 64, T - 64);
        assert_eq!(selector(corners, T), 3);
        assert_eq!(
            segments(corners),
            vec![(IVec2::new(0, 4), IVec2::new(SUBPIXEL_STEPS, 4))]
        );
    }

    #[test]
    fn solid_lies_right_of_segment() {
        // Solid bottom half: walking left to right keeps +y (down) on the right.
        let corners = CellCorners::new(255, 255, 0, 0);
        let (from, to) = segments(corners)[0];
        assert!(to.x > from.x);
        // Solid left half: walking top to bottom keeps -x on the right.
        let corners = CellCorners::new(255, 0, 255, 0);
        let (from, to) = segments(corners)[0];
        assert!(to.y > from.y);
    }

    #[test]
    fn tile_extraction_places_segments_in_world_space() {
        let mut texels = vec![CellCorners::splat(255); TILE_SIZE * TILE_SIZE];
        // Texel (3, 2): cell spans x in [2, 3], y in [1, 2] at texel size 1.
        texels[2 * TILE_SIZE + 3] = CellCorners::new(255, 255, 0, 0);
        let mut out = vec![Segment::default(); 3];
        extract_tile_segments(&texels, Vec2::new(64.0, 32.0), 1.0, T, &mut out);
        assert_eq!(out.len(), 1);
        let seg = out[0];
        assert!((seg.a.x - 66.0).abs() < 1e-6);
        assert!((seg.b.x - 67.0).abs() < 1e-6);
        assert!(seg.a.y > 33.0 && seg.a.y < 34.0);
    }

    #[test]
    fn uniform_tiles_produce_no_geometry() {
        let mut out = Vec::new();
        let solid = vec![CellCorners::splat(255); TILE_SIZE * TILE_SIZE];
        extract_tile_segments(&solid, Vec2::ZERO, 1.0, T, &mut out);
        assert!(out.is_empty());
        let air = vec![CellCorners::splat(0); TILE_SIZE * TILE_SIZE];
        extract_tile_segments(&air, Vec2::ZERO, 1.0, T, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn overflow_is_clamped() {
        // Alternate solid/air columns so nearly every cell has a vertical edge.
        let texels: Vec<_> = (0..TILE_SIZE * TILE_SIZE)
            .map(|i| {
                if (i % TILE_SIZE) % 2 == 0 {
                    CellCorners::new(0, 255, 0, 255)
                } else {
                    CellCorners::new(255, 0, 255, 0)
                }
            })
            .collect();
        let mut out = Vec::new();
        extract_tile_segments(&texels, Vec2::ZERO, 1.0, T, &mut out);
        assert_eq!(out.len(), MAX_SEGMENTS_PER_TILE);
    }
}
