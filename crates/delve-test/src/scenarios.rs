//! End-to-end scenarios over the public engine surface.

use approx::assert_abs_diff_eq;
use delve_core::constants::{DENSITY_THRESHOLD, MAX_DISTANCE, TILE_TEXELS};
use delve_core::{Density, Rect, TextureSlot, TileHandle, TileState};
use delve_sdf::{cell_segments, CellCorners, InlineScheduler, RayonScheduler};
use delve_world::{BrushMode, NoiseBrush, TerrainEngine};
use glam::Vec2;

use crate::fixtures::{compare_fields, ground_world, solid_world, test_config, FieldTolerance};
use crate::uploader::RecordingUploader;

fn distinct(slots: &[TextureSlot]) -> bool {
    let mut sorted: Vec<_> = slots.iter().map(|s| s.0).collect();
    sorted.sort_unstable();
    sorted.windows(2).all(|w| w[0] != w[1])
}

/// Deterministic positions for randomized edits.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[test]
fn digging_a_solid_world() {
    let mut world = solid_world(16, RayonScheduler).unwrap();
    let centre = Vec2::splat(256.0);
    let before = world.store().level0_bytes().to_vec();

    let summary = world.dig(centre, 40.0);
    assert!(!summary.is_empty());

    let hole = world.sample_coarse(centre);
    assert!(!hole.is_solid());
    assert!(hole.dist < -15.0, "centre distance {}", hole.dist);

    // 10 texels outside the rim the rock is redistanced to the new surface.
    let rim = world.sample_coarse(centre + Vec2::new(50.0, 0.0));
    assert!(rim.is_solid());
    assert_abs_diff_eq!(rim.dist, 10.0, epsilon = 1.5);

    let far = centre - Vec2::new(200.0, 0.0);
    assert_eq!(world.sample_coarse(far).dist, Density::SOLID.distance());
    assert_eq!(world.store().texel(far.x as i32, far.y as i32), Density::SOLID);

    // Tiles well clear of the edit window keep every byte.
    let window = 40.0 + MAX_DISTANCE + 2.0;
    let after = world.store().level0_bytes();
    let index = world.store().index();
    for slot in index.level_range(0) {
        let tile_centre = index.coord(TileHandle(slot as u32)).world_origin() + Vec2::splat(16.0);
        if tile_centre.distance(centre) > window + 24.0 {
            let bytes = slot * TILE_TEXELS..(slot + 1) * TILE_TEXELS;
            assert_eq!(before[bytes.clone()], after[bytes], "tile {slot} changed");
        }
    }
}

#[test]
fn digging_shallow_rock_never_raises_fine_samples() {
    // Rock everywhere, half a tile above the surface threshold.
    let fill = Density(191);
    let mut world =
        TerrainEngine::new_filled(test_config(16), fill, [255, 0, 0, 0], RayonScheduler).unwrap();
    let centre = Vec2::splat(256.0);
    let points: Vec<Vec2> = (0..41)
        .flat_map(|y| (0..41).map(move |x| Vec2::new(x as f32, y as f32) * 12.5 + Vec2::splat(0.25)))
        .collect();
    let before: Vec<f32> = points.iter().map(|&p| world.sample_fine(p).dist).collect();

    world.dig(centre, 40.0);

    assert_abs_diff_eq!(world.sample_fine(centre).dist, -MAX_DISTANCE, epsilon = 0.01);
    let far = centre - Vec2::new(200.0, 0.0);
    assert_abs_diff_eq!(world.sample_fine(far).dist, fill.distance());
    assert_abs_diff_eq!(fill.distance(), 7.9686, epsilon = 1e-3);

    for (&p, &old) in points.iter().zip(&before) {
        let new = world.sample_fine(p).dist;
        assert!(new <= old + 1e-5, "fine sample at {p} rose from {old} to {new}");
    }
}

#[test]
fn digs_never_add_material() {
    let mut world = ground_world(8, InlineScheduler).unwrap();
    let side = world.config().texels_per_side() as f32;
    let mut rng = Lcg(7);

    for _ in 0..12 {
        let pos = Vec2::new(rng.next_f32(), rng.next_f32()) * side;
        let radius = 3.0 + rng.next_f32() * 20.0;
        let before = world.store().level0_bytes().to_vec();
        world.dig(pos, radius);
        for (i, (&b, &a)) in before.iter().zip(world.store().level0_bytes()).enumerate() {
            assert!(a <= b, "sample {i} gained material after dig at {pos} r {radius}: {b} -> {a}");
        }
        assert!(!world.sample_coarse(pos).is_solid());
    }
}

#[test]
fn frames_never_evict_visible_tiles() {
    let mut world = ground_world(16, InlineScheduler).unwrap();
    let mut uploader = RecordingUploader::new();
    let texture = world.create_texture(&mut uploader);
    assert_eq!(uploader.layer_count(texture), 64);

    let mut rng = Lcg(99);
    for frame in 0..60 {
        let centre = Vec2::new(48.0 + frame as f32 * 7.0, 256.0 + (frame % 9) as f32 * 11.0);
        let view = Rect::from_center_half_extent(centre, 48.0);
        let mut visible = world.visible_tiles(view, 0);
        visible.extend(world.visible_tiles(view, 1));
        visible.extend(world.visible_tiles(view, 4));

        if frame % 10 == 5 {
            let pos = centre + (Vec2::new(rng.next_f32(), rng.next_f32()) - 0.5) * 60.0;
            world.dig(pos, 12.0);
        }

        let stats = world.update_frame(&visible);
        assert_eq!(stats.starved, 0, "frame {frame}");
        let slots: Vec<_> = visible
            .iter()
            .map(|&tile| {
                assert_eq!(world.store().state(tile), TileState::Cached);
                world.cache().texture_of(tile).unwrap()
            })
            .collect();
        assert!(distinct(&slots), "frame {frame}: visible tiles share a slot");
        assert!(world.cache().heap().is_valid());

        world.flush_uploads(&mut uploader, &texture);
        assert_eq!(world.cache().pending_uploads(), 0);
    }
    assert!(uploader.writes() > 64, "panning should have forced evictions");
}

#[test]
fn uploaded_layers_match_the_terrain() {
    let mut world = solid_world(4, InlineScheduler).unwrap();
    let mut uploader = RecordingUploader::new();
    let texture = world.create_texture(&mut uploader);

    world.dig(Vec2::new(20.0, 20.0), 8.0);
    let visible = [TileHandle(0), TileHandle(10)];
    world.update_frame(&visible);
    assert_eq!(world.flush_uploads(&mut uploader, &texture), 2);

    let dug = world.cache().texture_of(TileHandle(0)).unwrap();
    let layer = uploader.layer(texture, dug.0);
    assert!(layer.iter().any(|&b| b < DENSITY_THRESHOLD));

    let untouched = world.cache().texture_of(TileHandle(10)).unwrap();
    assert!(uploader.layer(texture, untouched.0).iter().all(|&b| b == u8::MAX));

    // Segments follow the hole's rim.
    let segments = world.segments(TileHandle(0));
    assert!(!segments.is_empty());
    for segment in segments {
        let r = segment.distance_to_point(Vec2::new(20.0, 20.0));
        assert!((r - 8.0).abs() < 1.5, "segment at radius {r}");
    }
}

#[test]
fn saved_worlds_load_identically() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = ground_world(4, InlineScheduler).unwrap();
    world.dig(Vec2::new(60.0, 70.0), 10.0);
    world.edit(
        Vec2::new(20.0, 90.0),
        9.0,
        &NoiseBrush::new(3, BrushMode::Subtract),
    );
    world.biome_edit(Vec2::new(64.0, 64.0), 48.0, [0, 0, 0, 255]);
    world.save(dir.path()).unwrap();

    let config = test_config(4);
    let loaded = TerrainEngine::load(dir.path(), config).unwrap();
    let outliers = compare_fields(
        world.store().level0_bytes(),
        loaded.store().level0_bytes(),
        FieldTolerance::default(),
    )
    .unwrap();
    assert_eq!(outliers, 0);
    assert_eq!(loaded.biome().as_bytes(), world.biome().as_bytes());
    for x in [3.0, 40.0, 77.5, 120.0] {
        let p = Vec2::new(x, 70.0);
        assert_eq!(loaded.sample_fine(p), world.sample_fine(p));
        assert_eq!(loaded.sample_biome(p), world.sample_biome(p));
    }
}

#[test]
fn rectify_restores_true_distances() {
    // A flat floor at y = 100 whose samples are stored at half their true
    // distance.
    let config = test_config(8);
    let store = delve_world::DensityStore::from_fn(
        delve_core::TileIndex::new(8),
        |_, y| Density::from_distance((y as f32 - 100.0) * 0.5),
    );
    let biome = delve_world::BiomeField::new(
        config.biome_cells_per_side(),
        config.biome_cell_size,
        [0; 4],
    );
    let mut world = TerrainEngine::from_parts(config, store, biome, RayonScheduler).unwrap();

    let summary = world.rectify();
    assert_eq!(summary.tiles.len(), 64);
    for offset in [4.0f32, 8.0, 12.0] {
        let below = world.sample_coarse(Vec2::new(130.0, 100.0 + offset));
        assert_abs_diff_eq!(below.dist, offset, epsilon = 1.5);
        let above = world.sample_coarse(Vec2::new(130.0, 100.0 - offset));
        assert_abs_diff_eq!(above.dist, -offset, epsilon = 1.5);
    }
}

#[test]
fn marching_squares_case_table() {
    let mut table = String::new();
    for selector in 0u8..16 {
        let corner = |bit: u8| if selector & bit != 0 { u8::MAX } else { 0 };
        let corners = CellCorners::new(corner(1), corner(2), corner(4), corner(8));
        let segments: Vec<_> = cell_segments(corners, DENSITY_THRESHOLD)
            .map(|(a, b)| format!("({},{})->({},{})", a.x, a.y, b.x, b.y))
            .collect();
        let line = if segments.is_empty() {
            "-".to_string()
        } else {
            segments.join(" ")
        };
        table.push_str(&format!("{selector}: {line}\n"));
    }
    insta::assert_snapshot!(table, @r"
    0: -
    1: (0,4)->(3,8)
    2: (4,8)->(8,4)
    3: (0,4)->(8,4)
    4: (3,0)->(0,3)
    5: (3,0)->(3,8)
    6: -
    7: (3,0)->(8,4)
    8: (8,3)->(4,0)
    9: -
    10: (4,8)->(4,0)
    11: (0,4)->(4,0)
    12: (8,3)->(0,3)
    13: (8,3)->(3,8)
    14: (4,8)->(0,3)
    15: -
    ");
}
