//! Delve terrain soak benchmark.
//!
//! Builds a synthetic world, pans a camera across it while digging, and logs
//! cache and timing statistics. Set `RUST_LOG` to change verbosity.

use std::time::{Duration, Instant};

use delve_core::{Density, Rect, TileIndex};
use delve_sdf::RayonScheduler;
use delve_world::{BiomeField, DensityStore, TerrainConfig, TerrainEngine, TextureUploader};
use glam::Vec2;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAMES: u64 = 600;
const VIEW_HALF_EXTENT: f32 = 160.0;

/// Counts layer writes without touching a GPU.
#[derive(Default)]
struct NullUploader {
    layers: usize,
    bytes: usize,
}

impl TextureUploader for NullUploader {
    type Texture = u32;

    fn new_texture(&mut self, layers: u32) -> u32 {
        layers
    }

    fn load_texture_layer(&mut self, texture: &u32, layer: u32, texels: &[u8]) {
        debug_assert!(layer < *texture);
        self.layers += 1;
        self.bytes += texels.len();
    }
}

fn build_world(config: TerrainConfig) -> delve_core::Result<TerrainEngine> {
    let side = config.texels_per_side() as f32;
    let store = DensityStore::from_fn(TileIndex::new(config.tiles_per_side), |x, y| {
        let x = x as f32;
        let ground = side * 0.3 + 48.0 * (x * 0.011).sin() + 12.0 * (x * 0.053).cos();
        Density::from_distance(y as f32 - ground)
    });
    let biome = BiomeField::new(
        config.biome_cells_per_side(),
        config.biome_cell_size,
        [255, 0, 0, 0],
    );
    TerrainEngine::from_parts(config, store, biome, RayonScheduler)
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Delve terrain benchmark");

    let config = TerrainConfig {
        tiles_per_side: 32,
        cache_slots: 256,
        ..Default::default()
    };
    let start = Instant::now();
    let mut world = match build_world(config) {
        Ok(world) => world,
        Err(e) => {
            warn!("Failed to build world: {e}");
            std::process::exit(1);
        }
    };
    info!("Built {} texel world in {:.1} ms", world.config().texels_per_side(), ms(start.elapsed()));

    let start = Instant::now();
    let rectified = world.rectify();
    info!(
        "Rectify: {} texels changed in {:.1} ms",
        rectified.changed_texels,
        ms(start.elapsed())
    );

    let mut uploader = NullUploader::default();
    let texture = world.create_texture(&mut uploader);
    let side = world.config().texels_per_side() as f32;

    let mut frame_time = Duration::ZERO;
    let mut dig_time = Duration::ZERO;
    let mut worst_frame = Duration::ZERO;
    let (mut misses, mut evictions, mut starved) = (0, 0, 0);

    for frame in 0..FRAMES {
        let t = frame as f32 / FRAMES as f32;
        let centre = Vec2::new(
            VIEW_HALF_EXTENT + t * (side - 2.0 * VIEW_HALF_EXTENT),
            side * 0.3 + 64.0 * (t * 12.0).sin(),
        );

        if frame % 4 == 0 {
            let start = Instant::now();
            world.dig(centre + Vec2::new(20.0, 30.0), 18.0);
            dig_time += start.elapsed();
        }

        let start = Instant::now();
        let view = Rect::from_center_half_extent(centre, VIEW_HALF_EXTENT);
        let mut visible = world.visible_tiles(view, 0);
        visible.extend(world.visible_tiles(view, 1));
        visible.extend(world.visible_tiles(view, 2));
        let stats = world.update_frame(&visible);
        world.flush_uploads(&mut uploader, &texture);
        let elapsed = start.elapsed();

        frame_time += elapsed;
        worst_frame = worst_frame.max(elapsed);
        misses += stats.misses;
        evictions += stats.evictions;
        starved += stats.starved;
    }

    info!(
        "{} frames: {:.3} ms/frame avg, {:.3} ms worst",
        FRAMES,
        ms(frame_time) / FRAMES as f64,
        ms(worst_frame)
    );
    info!(
        "Digs: {:.3} ms avg over {}",
        ms(dig_time) / (FRAMES / 4) as f64,
        FRAMES / 4
    );
    info!(
        "Cache: {} misses, {} evictions, {} starved; {} layers ({} KiB) uploaded",
        misses,
        evictions,
        starved,
        uploader.layers,
        uploader.bytes / 1024
    );
}
