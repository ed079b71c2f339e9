//! Per-tile density samples for every level of the mip hierarchy.
//!
//! Level-0 tiles are authoritative. Coarser tiles are derived lazily by
//! [`DensityStore::gather_mip`] whenever they are marked [`TileState::Dirty`].

use delve_core::constants::TILE_SIZE;
use delve_core::{Density, TileCoord, TileHandle, TileIndex, TileState};
use delve_sdf::{decode_tile, encode_tile, CellCorners, JobScheduler, TileSamples};
use glam::{IVec2, Vec2};

const TILE: i32 = TILE_SIZE as i32;

/// Result of a nearest-texel store lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StoreSample {
    /// Level-0 tile holding the sample.
    pub handle: TileHandle,
    /// Row-major byte offset of the sample inside the tile.
    pub offset: usize,
    /// Central-difference gradient in distance units per texel.
    pub gradient: Vec2,
}

/// Density samples and gather state for every tile.
#[derive(Clone, Debug)]
pub struct DensityStore {
    index: TileIndex,
    tiles: Vec<TileSamples>,
    states: Vec<TileState>,
}

impl DensityStore {
    /// Create a store with every level-0 sample set to `fill`.
    pub fn new(index: TileIndex, fill: Density) -> Self {
        Self::from_fn(index, |_, _| fill)
    }

    /// Create a store from a level-0 sample function of texel coordinates.
    ///
    /// Mip tiles start out dirty.
    pub fn from_fn(index: TileIndex, f: impl Fn(u32, u32) -> Density) -> Self {
        let count = index.tile_count();
        let mut tiles = vec![[[0u8; TILE_SIZE]; TILE_SIZE]; count];
        let mut states = vec![TileState::Dirty; count];

        for slot in index.level_range(0) {
            let coord = index.coord(TileHandle(slot as u32));
            let (ox, oy) = (coord.x * TILE as u32, coord.y * TILE as u32);
            for (y, row) in tiles[slot].iter_mut().enumerate() {
                for (x, texel) in row.iter_mut().enumerate() {
                    *texel = f(ox + x as u32, oy + y as u32).0;
                }
            }
            states[slot] = TileState::Ready;
        }

        Self {
            index,
            tiles,
            states,
        }
    }

    /// The tile index this store is laid out by.
    #[inline]
    pub fn index(&self) -> &TileIndex {
        &self.index
    }

    /// Raw samples of a tile.
    #[inline]
    pub fn tile(&self, handle: TileHandle) -> &TileSamples {
        &self.tiles[handle.index()]
    }

    #[inline]
    pub fn state(&self, handle: TileHandle) -> TileState {
        self.states[handle.index()]
    }

    #[inline]
    pub fn set_state(&mut self, handle: TileHandle, state: TileState) {
        self.states[handle.index()] = state;
    }

    /// Apply the file transform's decode step to every level-0 tile.
    pub fn decode_all<S: JobScheduler>(&mut self, scheduler: &S) {
        let range = self.index.level_range(0);
        scheduler.run_batch(&mut self.tiles[range], 1, |_, tile| decode_tile(&mut tile[0]));
    }

    /// Apply the file transform's encode step to every level-0 tile.
    pub fn encode_all<S: JobScheduler>(&mut self, scheduler: &S) {
        let range = self.index.level_range(0);
        scheduler.run_batch(&mut self.tiles[range], 1, |_, tile| encode_tile(&mut tile[0]));
    }

    /// Level-0 tiles in slot order, as one contiguous byte buffer.
    pub fn level0_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tiles[self.index.level_range(0)])
    }

    /// Encoded copy of the level-0 tiles, leaving the store untouched.
    pub fn encoded_level0<S: JobScheduler>(&self, scheduler: &S) -> Vec<u8> {
        let mut tiles = self.tiles[self.index.level_range(0)].to_vec();
        scheduler.run_batch(&mut tiles, 1, |_, tile| encode_tile(&mut tile[0]));
        bytemuck::cast_slice(&tiles).to_vec()
    }

    /// Overwrite every level-0 tile from a contiguous byte buffer and mark
    /// all mips dirty.
    pub fn copy_level0_from(&mut self, bytes: &[u8]) {
        let range = self.index.level_range(0);
        let level0: &mut [u8] = bytemuck::cast_slice_mut(&mut self.tiles[range.clone()]);
        assert_eq!(bytes.len(), level0.len(), "level-0 byte count mismatch");
        level0.copy_from_slice(bytes);
        for (slot, state) in self.states.iter_mut().enumerate() {
            *state = if range.contains(&slot) {
                TileState::Ready
            } else {
                TileState::Dirty
            };
        }
    }

    /// Level-0 handle of an in-range texel.
    #[inline]
    pub fn level0_handle(&self, ix: u32, iy: u32) -> TileHandle {
        let side = self.index.tiles_per_side();
        TileHandle((iy / TILE as u32) * side + ix / TILE as u32)
    }

    /// Sample at texel `(gx, gy)` of `level`, clamped to the map edge.
    fn level_texel(&self, level: u32, gx: i32, gy: i32) -> u8 {
        let side = self.index.side_at(level) as i32;
        let gx = gx.clamp(0, side * TILE - 1);
        let gy = gy.clamp(0, side * TILE - 1);
        let slot = self.index.mip_base(level) as usize + ((gy / TILE) * side + gx / TILE) as usize;
        self.tiles[slot][(gy % TILE) as usize][(gx % TILE) as usize]
    }

    /// Level-0 density at a texel, clamped to the map edge.
    #[inline]
    pub fn texel(&self, ix: i32, iy: i32) -> Density {
        Density(self.level_texel(0, ix, iy))
    }

    /// Decoded level-0 distance at a texel, clamped to the map edge.
    #[inline]
    pub fn distance_at(&self, ix: i32, iy: i32) -> f32 {
        self.texel(ix, iy).distance()
    }

    /// Write one level-0 texel. Returns the tile if the byte changed.
    ///
    /// Does not touch tile states; see [`DensityStore::mark_edited`].
    pub fn set_texel(&mut self, ix: u32, iy: u32, value: Density) -> Option<TileHandle> {
        let texels = self.index.texels_per_side();
        assert!(ix < texels && iy < texels, "texel ({ix}, {iy}) outside the map");
        let handle = self.level0_handle(ix, iy);
        let byte = &mut self.tiles[handle.index()][iy as usize % TILE_SIZE][ix as usize % TILE_SIZE];
        (*byte != value.0).then(|| {
            *byte = value.0;
            handle
        })
    }

    /// Nearest level-0 texel to `pos` with a coarse gradient estimate.
    pub fn sample(&self, pos: Vec2) -> StoreSample {
        let last = self.index.texels_per_side() as i32 - 1;
        let ix = (pos.x.round() as i32).clamp(0, last);
        let iy = (pos.y.round() as i32).clamp(0, last);
        let gradient = Vec2::new(
            self.distance_at(ix + 1, iy) - self.distance_at(ix - 1, iy),
            self.distance_at(ix, iy + 1) - self.distance_at(ix, iy - 1),
        ) * 0.5;
        StoreSample {
            handle: self.level0_handle(ix as u32, iy as u32),
            offset: (iy % TILE) as usize * TILE_SIZE + (ix % TILE) as usize,
            gradient,
        }
    }

    /// Mark a level-0 tile as freshly edited: its own samples are valid and
    /// every coarser tile above it must be re-gathered.
    pub fn mark_edited(&mut self, handle: TileHandle) {
        self.states[handle.index()] = TileState::Ready;
        for ancestor in self.index.ancestors(handle) {
            self.states[ancestor.index()] = TileState::Dirty;
        }
    }

    /// Rebuild a dirty mip tile from its children, gathering dirty children
    /// first. No-op for level-0 tiles and tiles that are not dirty.
    pub fn gather_mip(&mut self, handle: TileHandle) {
        let coord = self.index.coord(handle);
        if coord.level == 0 || self.states[handle.index()] != TileState::Dirty {
            return;
        }

        let children = child_handles(&self.index, coord);
        for child in children {
            if self.states[child.index()] == TileState::Dirty {
                self.gather_mip(child);
            }
        }

        let mut out = [[0u8; TILE_SIZE]; TILE_SIZE];
        downsample(children.map(|h| &self.tiles[h.index()]), &mut out);
        self.tiles[handle.index()] = out;
        self.states[handle.index()] = TileState::Ready;
    }

    /// Gather every dirty mip tile, finest level first, in parallel per level.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn gather_all_mips<S: JobScheduler>(&mut self, scheduler: &S) {
        for level in 1..self.index.level_count() {
            let range = self.index.level_range(level);
            let (finer, rest) = self.tiles.split_at_mut(range.start);
            let finer: &[TileSamples] = finer;
            let index = &self.index;
            let states = &self.states;
            let base = range.start;

            scheduler.run_batch(&mut rest[..range.len()], 1, |i, tile| {
                let handle = TileHandle((base + i) as u32);
                if states[handle.index()] != TileState::Dirty {
                    return;
                }
                let children = child_handles(index, index.coord(handle));
                downsample(children.map(|h| &finer[h.index()]), &mut tile[0]);
            });

            for state in &mut self.states[range] {
                if *state == TileState::Dirty {
                    *state = TileState::Ready;
                }
            }
        }
    }

    /// Packed 2x2 neighbourhoods for every texel of a tile.
    ///
    /// Texel `(x, y)` carries the corners of the cell whose bottom-right
    /// corner it is. The left, up and up-left neighbours at the same level
    /// are gathered first when dirty; at the map border the edge texel is
    /// replicated.
    pub fn gather_texels(&mut self, handle: TileHandle) -> Vec<CellCorners> {
        let coord = self.index.coord(handle);
        self.gather_mip(handle);
        for (dx, dy) in [(-1, 0), (0, -1), (-1, -1)] {
            let neighbor = coord
                .offset(IVec2::new(dx, dy))
                .and_then(|c| self.index.index(c));
            if let Some(neighbor) = neighbor {
                self.gather_mip(neighbor);
            }
        }

        let (ox, oy) = (coord.x as i32 * TILE, coord.y as i32 * TILE);
        let level = coord.level;
        let mut texels = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
        for y in oy..oy + TILE {
            for x in ox..ox + TILE {
                texels.push(CellCorners::new(
                    self.level_texel(level, x - 1, y),
                    self.level_texel(level, x, y),
                    self.level_texel(level, x - 1, y - 1),
                    self.level_texel(level, x, y - 1),
                ));
            }
        }
        texels
    }
}

/// Children of a mip tile in row-major order.
fn child_handles(index: &TileIndex, coord: TileCoord) -> [TileHandle; 4] {
    let level = coord.level - 1;
    let side = index.side_at(level);
    let base = index.mip_base(level);
    let (x, y) = (coord.x * 2, coord.y * 2);
    [
        TileHandle(base + y * side + x),
        TileHandle(base + y * side + x + 1),
        TileHandle(base + (y + 1) * side + x),
        TileHandle(base + (y + 1) * side + x + 1),
    ]
}

/// Box-filter four row-major children into their parent.
///
/// Distances are averaged in child texels, then halved to express them in
/// parent texels.
fn downsample(children: [&TileSamples; 4], out: &mut TileSamples) {
    const HALF: usize = TILE_SIZE / 2;
    let decode = |b: u8| Density(b).distance();
    for (py, row) in out.iter_mut().enumerate() {
        for (px, texel) in row.iter_mut().enumerate() {
            let child = children[(py / HALF) * 2 + px / HALF];
            let (cx, cy) = ((px % HALF) * 2, (py % HALF) * 2);
            let sum = decode(child[cy][cx])
                + decode(child[cy][cx + 1])
                + decode(child[cy + 1][cx])
                + decode(child[cy + 1][cx + 1]);
            *texel = Density::from_distance(sum * 0.125).0;
        }
    }
}
