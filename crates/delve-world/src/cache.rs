//! Fixed-size LRU pool mapping tiles to texture slots.
//!
//! Every request records the frame in `last_used`, which is authoritative.
//! The heap copy of that timestamp is only refreshed when its entry reaches
//! the root during eviction, so requests never touch the heap.

use delve_core::constants::DENSITY_THRESHOLD;
use delve_core::{Segment, TextureSlot, TileHandle, TileIndex, TileState};
use delve_sdf::{extract_tile_segments, CellCorners};
use tracing::{debug, warn};

use crate::lru_heap::LruHeap;
use crate::store::DensityStore;

/// Texels queued for one texture slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureUpload {
    pub slot: TextureSlot,
    pub tile: TileHandle,
    pub texels: Vec<CellCorners>,
}

/// Counters for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests for tiles that were already cached.
    pub hits: usize,
    /// Requests that gathered and queued an upload.
    pub misses: usize,
    /// Slots taken from another tile.
    pub evictions: usize,
    /// Requests left without a slot because the pool was exhausted.
    pub starved: usize,
}

/// LRU texture-slot cache over the tiles of a [`DensityStore`].
#[derive(Debug)]
pub struct TileCache {
    heap: LruHeap,
    last_used: Vec<u64>,
    texture_of: Vec<Option<TextureSlot>>,
    segments: Vec<Vec<Segment>>,
    uploads: Vec<TextureUpload>,
    stats: CacheStats,
}

impl TileCache {
    /// Create a cache with `slots` texture slots for the tiles of `index`.
    pub fn new(index: &TileIndex, slots: usize) -> Self {
        assert!(slots > 0, "tile cache needs at least one slot");
        let level0 = index.level_range(0).len();
        Self {
            heap: LruHeap::new(slots),
            last_used: vec![0; index.tile_count()],
            texture_of: vec![None; index.tile_count()],
            segments: vec![Vec::new(); level0],
            uploads: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn heap(&self) -> &LruHeap {
        &self.heap
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Texture slot currently owned by `handle`.
    #[inline]
    pub fn texture_of(&self, handle: TileHandle) -> Option<TextureSlot> {
        self.texture_of[handle.index()]
    }

    /// Frame `handle` was last requested in.
    #[inline]
    pub fn last_used(&self, handle: TileHandle) -> u64 {
        self.last_used[handle.index()]
    }

    /// Collision segments of a cached level-0 tile.
    pub fn segments(&self, handle: TileHandle) -> &[Segment] {
        self.segments
            .get(handle.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Record that `handle` is in use at frame `now`.
    #[inline]
    pub fn touch(&mut self, handle: TileHandle, now: u64) {
        self.last_used[handle.index()] = now;
    }

    /// Drain the queued texture uploads.
    pub fn take_uploads(&mut self) -> Vec<TextureUpload> {
        std::mem::take(&mut self.uploads)
    }

    #[inline]
    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }

    /// Make every tile in `visible` resident for frame `now`.
    ///
    /// All tiles are touched before the first request so nothing visible this
    /// frame can be chosen for eviction.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn request_frame(
        &mut self,
        store: &mut DensityStore,
        visible: &[TileHandle],
        now: u64,
    ) -> CacheStats {
        self.stats = CacheStats::default();
        for &handle in visible {
            self.touch(handle, now);
        }
        for &handle in visible {
            self.request(store, handle, now);
        }
        if self.stats.starved > 0 {
            warn!(
                "{} of {} visible tiles got no texture slot; the pool has {} slots",
                self.stats.starved,
                visible.len(),
                self.slot_count()
            );
        }
        self.stats
    }

    /// Make `handle` resident, gathering and queueing an upload if needed.
    ///
    /// Returns the tile's slot, or `None` if every slot is in use this frame.
    pub fn request(
        &mut self,
        store: &mut DensityStore,
        handle: TileHandle,
        now: u64,
    ) -> Option<TextureSlot> {
        self.touch(handle, now);
        if store.state(handle) == TileState::Cached {
            self.stats.hits += 1;
            return self.texture_of[handle.index()];
        }
        self.stats.misses += 1;

        if store.state(handle) == TileState::Dirty {
            store.gather_mip(handle);
        }
        let texels = store.gather_texels(handle);

        let slot = match self.texture_of[handle.index()] {
            // Edited while cached: keep the slot and re-upload.
            Some(slot) => slot,
            None => {
                let slot = self.evict_one(store, now)?;
                self.update_cache_entry(0, Some(handle), now);
                slot
            }
        };

        // Segments are only kept for tiles that own a slot.
        let coord = store.index().coord(handle);
        if coord.level == 0 {
            let mut segments = Vec::new();
            extract_tile_segments(
                &texels,
                coord.world_origin(),
                coord.texel_size() as f32,
                DENSITY_THRESHOLD,
                &mut segments,
            );
            self.segments[handle.index()] = segments;
        }

        self.texture_of[handle.index()] = Some(slot);
        store.set_state(handle, TileState::Cached);
        self.uploads.push(TextureUpload {
            slot,
            tile: handle,
            texels,
        });
        Some(slot)
    }

    /// Free the least recently used slot and return it.
    ///
    /// The freed entry stays at the heap root; the caller reassigns it with
    /// [`TileCache::update_cache_entry`] at position 0. Returns `None` when
    /// the least recently used tile was used at frame `now`.
    pub fn evict_one(&mut self, store: &mut DensityStore, now: u64) -> Option<TextureSlot> {
        let mut refreshes = 0;
        loop {
            let root = self.heap.root();
            let Some(tile) = root.tile else {
                return Some(root.texture);
            };

            let used = self.last_used[tile.index()];
            if used != root.timestamp {
                if refreshes < self.heap.len() {
                    refreshes += 1;
                    self.heap.refresh_root(used);
                } else {
                    warn!("LRU heap did not settle after {refreshes} refreshes; rebuilding");
                    let last_used = &self.last_used;
                    self.heap
                        .rebuild(|e| e.tile.map_or(0, |t| last_used[t.index()]));
                }
                continue;
            }

            if used >= now {
                self.stats.starved += 1;
                return None;
            }

            self.texture_of[tile.index()] = None;
            if store.state(tile) == TileState::Cached {
                store.set_state(tile, TileState::Ready);
            }
            if let Some(segments) = self.segments.get_mut(tile.index()) {
                *segments = Vec::new();
            }
            self.stats.evictions += 1;
            debug!(
                "Evicted tile {} (last used {}) from slot {}",
                tile.0, used, root.texture.0
            );
            return Some(root.texture);
        }
    }

    /// Write the heap entry at `pos` and restore the heap property.
    #[inline]
    pub fn update_cache_entry(&mut self, pos: usize, tile: Option<TileHandle>, timestamp: u64) {
        self.heap.update(pos, tile, timestamp);
    }
}
