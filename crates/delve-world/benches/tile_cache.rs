use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use delve_core::{Density, Rect, TileIndex};
use delve_sdf::RayonScheduler;
use delve_world::{DensityStore, Editor, TileCache};
use glam::Vec2;

const TILES: u32 = 16;

fn hills() -> DensityStore {
    DensityStore::from_fn(TileIndex::new(TILES), |x, y| {
        let ground = 256.0 + 40.0 * (x as f32 * 0.02).sin() + 25.0 * (x as f32 * 0.07).cos();
        Density::from_distance(y as f32 - ground)
    })
}

fn bench_request_frame(c: &mut Criterion) {
    let store = hills();
    let view = Rect::from_center_half_extent(Vec2::splat(256.0), 128.0);
    let visible = store.index().tiles_in_rect(view, 0);

    c.bench_function("request_frame_cold", |b| {
        b.iter_batched(
            || (store.clone(), TileCache::new(store.index(), 128)),
            |(mut store, mut cache)| {
                let stats = cache.request_frame(&mut store, &visible, 1);
                black_box((stats, cache.take_uploads().len()))
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("request_frame_warm", |b| {
        let mut store = store.clone();
        let mut cache = TileCache::new(store.index(), 128);
        cache.request_frame(&mut store, &visible, 1);
        cache.take_uploads();
        let mut now = 1;
        b.iter(|| {
            now += 1;
            black_box(cache.request_frame(&mut store, &visible, now))
        });
    });
}

fn bench_panning(c: &mut Criterion) {
    // A pool smaller than the map forces steady eviction while panning.
    let store = hills();
    c.bench_function("pan_with_eviction", |b| {
        b.iter_batched(
            || (store.clone(), TileCache::new(store.index(), 48)),
            |(mut store, mut cache)| {
                for step in 0..32u64 {
                    let centre = Vec2::new(96.0 + step as f32 * 10.0, 256.0);
                    let view = Rect::from_center_half_extent(centre, 64.0);
                    let visible = store.index().tiles_in_rect(view, 0);
                    cache.request_frame(&mut store, &visible, step + 1);
                    cache.take_uploads();
                }
                black_box(cache.stats())
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_dig(c: &mut Criterion) {
    let store = hills();
    let editor = Editor::default();
    c.bench_function("dig_r24", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                black_box(editor.dig(&mut store, &RayonScheduler, Vec2::new(256.0, 300.0), 24.0))
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_request_frame, bench_panning, bench_dig);
criterion_main!(benches);
