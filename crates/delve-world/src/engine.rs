//! Terrain engine facade.
//!
//! [`TerrainEngine`] owns the density store, biome field, tile cache and
//! editor, and is the single entry point the renderer and game logic talk to.

use std::path::Path;
use std::time::Instant;

use delve_core::{Density, Error, Rect, Result, Segment, TileHandle, TileIndex};
use delve_sdf::{JobScheduler, RayonScheduler};
use glam::Vec2;
use tracing::{debug, info};

use crate::biome::{BiomeCell, BiomeField};
use crate::brush::Brush;
use crate::cache::{CacheStats, TileCache};
use crate::config::TerrainConfig;
use crate::editor::{EditSummary, Editor};
use crate::gpu::TextureUploader;
use crate::io;
use crate::sampler::SdfSample;
use crate::store::DensityStore;

/// Editable 2D terrain with a streamed GPU tile cache.
#[derive(Debug)]
pub struct TerrainEngine<S: JobScheduler = RayonScheduler> {
    config: TerrainConfig,
    scheduler: S,
    store: DensityStore,
    biome: BiomeField,
    cache: TileCache,
    editor: Editor,
    frame: u64,
}

impl TerrainEngine<RayonScheduler> {
    /// Load terrain and biome files from `dir` using the rayon pool.
    pub fn load(dir: impl AsRef<Path>, config: TerrainConfig) -> Result<Self> {
        Self::load_with(dir, config, RayonScheduler)
    }
}

impl<S: JobScheduler> TerrainEngine<S> {
    /// Load terrain and biome files from `dir`.
    ///
    /// Level-0 tiles are decoded and every mip level is gathered up front.
    pub fn load_with(dir: impl AsRef<Path>, config: TerrainConfig, scheduler: S) -> Result<Self> {
        config.validate()?;
        let dir = dir.as_ref();
        let start = Instant::now();

        let mut store = DensityStore::new(TileIndex::new(config.tiles_per_side), Density::AIR);
        let bytes = io::read_level0(dir, store.level0_bytes().len(), config.chunk_count)?;
        store.copy_level0_from(&bytes);
        store.decode_all(&scheduler);
        store.gather_all_mips(&scheduler);

        let cells = config.biome_cells_per_side();
        let biome_bytes = io::read_biome(dir, (cells * cells * 4) as usize)?;
        let biome = BiomeField::from_bytes(cells, config.biome_cell_size, &biome_bytes);

        info!(
            "Loaded {}x{} terrain tiles from {} in {:.1} ms",
            config.tiles_per_side,
            config.tiles_per_side,
            dir.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Self::from_parts(config, store, biome, scheduler)
    }

    /// Assemble an engine from an existing store and biome field.
    pub fn from_parts(
        config: TerrainConfig,
        store: DensityStore,
        biome: BiomeField,
        scheduler: S,
    ) -> Result<Self> {
        config.validate()?;
        if store.index().tiles_per_side() != config.tiles_per_side {
            return Err(Error::InvalidConfig(format!(
                "store has {} tiles per side, config expects {}",
                store.index().tiles_per_side(),
                config.tiles_per_side
            )));
        }
        if biome.cells_per_side() != config.biome_cells_per_side() {
            return Err(Error::InvalidConfig(format!(
                "biome field has {} cells per side, config expects {}",
                biome.cells_per_side(),
                config.biome_cells_per_side()
            )));
        }

        let cache = TileCache::new(store.index(), config.cache_slots);
        let editor = Editor::new(config.biome_penalty);
        Ok(Self {
            config,
            scheduler,
            store,
            biome,
            cache,
            editor,
            frame: 0,
        })
    }

    /// Engine over a uniform density and biome.
    pub fn new_filled(
        config: TerrainConfig,
        fill: Density,
        biome_fill: BiomeCell,
        scheduler: S,
    ) -> Result<Self> {
        config.validate()?;
        let store = DensityStore::new(TileIndex::new(config.tiles_per_side), fill);
        let biome = BiomeField::new(
            config.biome_cells_per_side(),
            config.biome_cell_size,
            biome_fill,
        );
        Self::from_parts(config, store, biome, scheduler)
    }

    /// Write terrain and biome files into `dir` in the layout
    /// [`TerrainEngine::load`] reads.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let bytes = self.store.encoded_level0(&self.scheduler);
        io::write_level0(dir, &bytes, self.config.chunk_count)?;
        io::write_biome(dir, self.biome.as_bytes())?;
        info!("Saved {} terrain bytes to {}", bytes.len(), dir.display());
        Ok(())
    }

    #[inline]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &DensityStore {
        &self.store
    }

    #[inline]
    pub fn biome(&self) -> &BiomeField {
        &self.biome
    }

    #[inline]
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    #[inline]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Number of frames driven through [`TerrainEngine::update_frame`].
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn sample_coarse(&self, pos: Vec2) -> SdfSample {
        self.store.sample_coarse(pos)
    }

    pub fn sample_fine(&self, pos: Vec2) -> SdfSample {
        self.store.sample_fine(pos)
    }

    /// Fraction of the way from `a` to `b` a disc of `radius` travels before
    /// hitting material denser than `threshold`.
    pub fn raymarch(&self, a: Vec2, b: Vec2, radius: f32, threshold: f32) -> f32 {
        self.store
            .raymarch(a, b, radius, threshold, self.config.raymarch_max_steps)
    }

    pub fn sample_biome(&self, pos: Vec2) -> usize {
        self.biome.sample_biome(pos)
    }

    pub fn sample_biome_weighted(&self, pos: Vec2) -> [f32; 4] {
        self.biome.sample_biome_weighted(pos)
    }

    pub fn dig(&mut self, pos: Vec2, radius: f32) -> EditSummary {
        let summary = self.editor.dig(&mut self.store, &self.scheduler, pos, radius);
        self.refresh_cached(&summary);
        summary
    }

    pub fn edit<B: Brush>(&mut self, pos: Vec2, radius: f32, brush: &B) -> EditSummary {
        let summary = self
            .editor
            .edit(&mut self.store, &self.scheduler, pos, radius, brush);
        self.refresh_cached(&summary);
        summary
    }

    pub fn biome_edit(&mut self, pos: Vec2, radius: f32, target: BiomeCell) -> usize {
        self.editor.biome_edit(&mut self.biome, pos, radius, target)
    }

    /// Re-distance the whole map.
    pub fn rectify(&mut self) -> EditSummary {
        let summary = self.editor.rectify(&mut self.store, &self.scheduler);
        self.refresh_cached(&summary);
        summary
    }

    /// Handles of the tiles at `level` covering `rect` (world units).
    pub fn visible_tiles(&self, rect: Rect, level: u32) -> Vec<TileHandle> {
        self.store.index().tiles_in_rect(rect, level)
    }

    /// Advance one frame and make every tile in `visible` resident.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn update_frame(&mut self, visible: &[TileHandle]) -> CacheStats {
        self.frame += 1;
        self.cache.request_frame(&mut self.store, visible, self.frame)
    }

    /// Allocate the array texture backing the cache, one layer per slot.
    pub fn create_texture<U: TextureUploader>(&self, uploader: &mut U) -> U::Texture {
        uploader.new_texture(self.config.cache_slots as u32)
    }

    /// Push every queued tile upload to `texture`. Returns the layer count.
    pub fn flush_uploads<U: TextureUploader>(&mut self, uploader: &mut U, texture: &U::Texture) -> usize {
        let uploads = self.cache.take_uploads();
        for upload in &uploads {
            uploader.load_texture_layer(texture, upload.slot.0, bytemuck::cast_slice(&upload.texels));
        }
        uploads.len()
    }

    /// Collision segments of a cached level-0 tile.
    pub fn segments(&self, handle: TileHandle) -> &[Segment] {
        self.cache.segments(handle)
    }

    /// Re-request edited tiles that still own a texture slot so their texels
    /// and segments match the new samples without waiting for a frame.
    fn refresh_cached(&mut self, summary: &EditSummary) {
        let mut refreshed = 0;
        for &tile in &summary.tiles {
            if self.cache.texture_of(tile).is_some() {
                self.cache.request(&mut self.store, tile, self.frame);
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            debug!("Refreshed {} cached tiles after edit", refreshed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::{TextureSlot, TileState};
    use delve_sdf::InlineScheduler;

    use crate::brush::AddBrush;

    fn config() -> TerrainConfig {
        TerrainConfig {
            tiles_per_side: 2,
            cache_slots: 8,
            biome_cell_size: 16,
            chunk_count: 3,
            ..Default::default()
        }
    }

    fn solid_engine() -> TerrainEngine<InlineScheduler> {
        TerrainEngine::new_filled(config(), Density::SOLID, [255, 0, 0, 0], InlineScheduler).unwrap()
    }

    #[derive(Default)]
    struct Layers {
        textures: u32,
        writes: Vec<(u32, usize)>,
    }

    impl TextureUploader for Layers {
        type Texture = u32;

        fn new_texture(&mut self, layers: u32) -> u32 {
            self.textures += 1;
            layers
        }

        fn load_texture_layer(&mut self, texture: &u32, layer: u32, texels: &[u8]) {
            assert!(layer < *texture);
            self.writes.push((layer, texels.len()));
        }
    }

    #[test]
    fn mismatched_parts_are_rejected() {
        let store = DensityStore::new(TileIndex::new(4), Density::SOLID);
        let biome = BiomeField::new(4, 16, [0; 4]);
        let err = TerrainEngine::from_parts(config(), store, biome, InlineScheduler).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let bad = TerrainConfig {
            cache_slots: 0,
            ..config()
        };
        assert!(TerrainEngine::new_filled(bad, Density::SOLID, [0; 4], InlineScheduler).is_err());
    }

    #[test]
    fn frames_upload_visible_tiles_once() {
        let mut engine = solid_engine();
        let mut uploader = Layers::default();
        let texture = engine.create_texture(&mut uploader);
        assert_eq!(texture, 8);

        let rect = Rect::new(Vec2::ZERO, Vec2::splat(64.0));
        let mut visible = engine.visible_tiles(rect, 0);
        visible.extend(engine.visible_tiles(rect, 1));
        assert_eq!(visible.len(), 5);

        let stats = engine.update_frame(&visible);
        assert_eq!(stats.misses, 5);
        assert_eq!(engine.flush_uploads(&mut uploader, &texture), 5);
        assert!(uploader.writes.iter().all(|&(_, len)| len == 32 * 32 * 4));

        let stats = engine.update_frame(&visible);
        assert_eq!(stats.hits, 5);
        assert_eq!(engine.flush_uploads(&mut uploader, &texture), 0);
        assert_eq!(engine.frame(), 2);
        assert_eq!(uploader.textures, 1);
    }

    #[test]
    fn dig_refreshes_cached_segments() {
        let mut engine = solid_engine();
        engine.update_frame(&[TileHandle(0)]);
        assert!(engine.segments(TileHandle(0)).is_empty());
        let slot: Option<TextureSlot> = engine.cache().texture_of(TileHandle(0));

        let summary = engine.dig(Vec2::new(16.0, 16.0), 6.0);
        assert!(!summary.is_empty());
        assert!(!engine.sample_coarse(Vec2::new(16.0, 16.0)).is_solid());
        assert!(!engine.segments(TileHandle(0)).is_empty());
        assert_eq!(engine.cache().texture_of(TileHandle(0)), slot);
        assert_eq!(engine.store().state(TileHandle(0)), TileState::Cached);
        // Uncached neighbours are left for their next request.
        assert_eq!(engine.cache().texture_of(TileHandle(1)), None);
    }

    #[test]
    fn brush_edits_go_through_the_engine() {
        let mut engine =
            TerrainEngine::new_filled(config(), Density::AIR, [0; 4], InlineScheduler).unwrap();
        let centre = Vec2::new(32.0, 32.0);
        engine.edit(centre, 5.0, &AddBrush);
        assert!(engine.sample_coarse(centre).is_solid());
        assert!(engine.raymarch(Vec2::new(2.0, 32.0), centre, 0.0, 0.5) < 1.0);
    }

    #[test]
    fn biome_paint_changes_the_winner() {
        let mut engine = solid_engine();
        let pos = Vec2::new(24.0, 24.0);
        assert_eq!(engine.sample_biome(pos), 0);
        for _ in 0..16 {
            engine.biome_edit(pos, 40.0, [0, 0, 255, 0]);
        }
        assert_eq!(engine.sample_biome(pos), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = solid_engine();
        engine.dig(Vec2::new(40.0, 20.0), 9.0);
        engine.biome_edit(Vec2::new(8.0, 8.0), 20.0, [0, 255, 0, 0]);
        engine.save(dir.path()).unwrap();

        let loaded = TerrainEngine::load_with(dir.path(), config(), InlineScheduler).unwrap();
        assert_eq!(loaded.store().level0_bytes(), engine.store().level0_bytes());
        assert_eq!(loaded.biome().as_bytes(), engine.biome().as_bytes());
        let root = TileHandle(4);
        assert_eq!(loaded.store().state(root), TileState::Ready);
    }

    #[test]
    fn loading_a_missing_world_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = TerrainEngine::load_with(dir.path(), config(), InlineScheduler).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
