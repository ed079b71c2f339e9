//! Low-resolution RGBA biome blend map.
//!
//! Each cell holds four 8-bit biome weights and covers `cell_size` level-0
//! texels per axis. Cell centres sit at `(i + 0.5) * cell_size`.

use glam::{UVec2, Vec2, Vec4};

/// Weights of the four biome channels at one cell.
pub type BiomeCell = [u8; 4];

/// Grid of biome cells spanning the whole map.
#[derive(Clone, Debug, PartialEq)]
pub struct BiomeField {
    cells_per_side: u32,
    cell_size: f32,
    cells: Vec<BiomeCell>,
}

impl BiomeField {
    /// Create a field with every cell set to `fill`.
    pub fn new(cells_per_side: u32, cell_size: u32, fill: BiomeCell) -> Self {
        assert!(cells_per_side > 0 && cell_size > 0, "empty biome field");
        Self {
            cells_per_side,
            cell_size: cell_size as f32,
            cells: vec![fill; (cells_per_side * cells_per_side) as usize],
        }
    }

    /// Wrap raw row-major RGBA8 bytes.
    pub fn from_bytes(cells_per_side: u32, cell_size: u32, bytes: &[u8]) -> Self {
        let mut field = Self::new(cells_per_side, cell_size, [0; 4]);
        let cells: &mut [u8] = bytemuck::cast_slice_mut(&mut field.cells);
        assert_eq!(bytes.len(), cells.len(), "biome byte count mismatch");
        cells.copy_from_slice(bytes);
        field
    }

    /// Raw row-major RGBA8 bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    #[inline]
    pub const fn cells_per_side(&self) -> u32 {
        self.cells_per_side
    }

    /// Level-0 texels per cell edge.
    #[inline]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn cell(&self, cell: UVec2) -> BiomeCell {
        self.cells[(cell.y * self.cells_per_side + cell.x) as usize]
    }

    #[inline]
    pub fn set_cell(&mut self, cell: UVec2, value: BiomeCell) {
        self.cells[(cell.y * self.cells_per_side + cell.x) as usize] = value;
    }

    /// World position of a cell's centre.
    #[inline]
    pub fn cell_center(&self, cell: UVec2) -> Vec2 {
        (cell.as_vec2() + 0.5) * self.cell_size
    }

    /// Cells whose centres may lie within `radius` of `pos`.
    pub fn cells_near(&self, pos: Vec2, radius: f32) -> impl Iterator<Item = UVec2> {
        let last = self.cells_per_side as i32 - 1;
        let to_cell = |v: f32| ((v / self.cell_size - 0.5).floor() as i32).clamp(0, last) as u32;
        let (x0, y0) = (to_cell(pos.x - radius), to_cell(pos.y - radius));
        let (x1, y1) = (
            to_cell(pos.x + radius + self.cell_size),
            to_cell(pos.y + radius + self.cell_size),
        );
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| UVec2::new(x, y)))
    }

    /// Bilinearly blended channel weights in `[0, 1]`.
    pub fn sample_biome_weighted(&self, pos: Vec2) -> [f32; 4] {
        let grid = pos / self.cell_size - 0.5;
        let base = grid.floor();
        let f = grid - base;
        let last = self.cells_per_side as i32 - 1;
        let fetch = |dx: i32, dy: i32| {
            let x = (base.x as i32 + dx).clamp(0, last) as u32;
            let y = (base.y as i32 + dy).clamp(0, last) as u32;
            cell_weights(self.cell(UVec2::new(x, y)))
        };

        let top = fetch(0, 0).lerp(fetch(1, 0), f.x);
        let bottom = fetch(0, 1).lerp(fetch(1, 1), f.x);
        top.lerp(bottom, f.y).to_array()
    }

    /// Index of the winning biome channel at `pos`.
    pub fn sample_biome(&self, pos: Vec2) -> usize {
        dominant_channel(self.sample_biome_weighted(pos))
    }
}

/// Normalized weights of a cell.
#[inline]
pub fn cell_weights(cell: BiomeCell) -> Vec4 {
    Vec4::new(
        f32::from(cell[0]),
        f32::from(cell[1]),
        f32::from(cell[2]),
        f32::from(cell[3]),
    ) / 255.0
}

/// Pick the dominant channel: the larger of channels 0 and 1 is compared
/// against the larger of channels 2 and 3. Ties go to the lower index.
#[inline]
pub fn dominant_channel(weights: [f32; 4]) -> usize {
    let low = if weights[0] >= weights[1] { 0 } else { 1 };
    let high = if weights[2] >= weights[3] { 2 } else { 3 };
    if weights[low] >= weights[high] {
        low
    } else {
        high
    }
}
