//! Binary min-heap of texture-slot entries keyed by last-use timestamp.
//!
//! Timestamps stored in the heap may lag behind the authoritative per-tile
//! timestamps kept by the cache; the cache refreshes the root lazily before
//! trusting it.

use delve_core::{TextureSlot, TileHandle};

/// One texture slot and the tile currently occupying it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Last-use frame as of the entry's most recent heap update.
    pub timestamp: u64,
    /// Occupying tile, `None` for a free slot.
    pub tile: Option<TileHandle>,
    pub texture: TextureSlot,
}

/// Min-heap over [`CacheEntry::timestamp`].
#[derive(Clone, Debug)]
pub struct LruHeap {
    entries: Vec<CacheEntry>,
}

impl LruHeap {
    /// Heap of `slots` free entries, one per texture slot.
    pub fn new(slots: usize) -> Self {
        let entries = (0..slots)
            .map(|i| CacheEntry {
                timestamp: 0,
                tile: None,
                texture: TextureSlot(i as u32),
            })
            .collect();
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in heap order.
    #[inline]
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// The entry with the smallest stored timestamp.
    #[inline]
    pub fn root(&self) -> CacheEntry {
        self.entries[0]
    }

    /// Overwrite the entry at heap position `pos` and restore heap order.
    pub fn update(&mut self, pos: usize, tile: Option<TileHandle>, timestamp: u64) {
        let entry = &mut self.entries[pos];
        entry.tile = tile;
        entry.timestamp = timestamp;
        let pos = self.sift_up(pos);
        self.sift_down(pos);
    }

    /// Replace the root's timestamp with a newer one and sift it down.
    pub fn refresh_root(&mut self, timestamp: u64) {
        debug_assert!(timestamp >= self.entries[0].timestamp, "timestamps only grow");
        self.entries[0].timestamp = timestamp;
        self.sift_down(0);
    }

    /// Reset every stored timestamp from `timestamp_of` and re-heapify.
    pub fn rebuild(&mut self, timestamp_of: impl Fn(&CacheEntry) -> u64) {
        for entry in &mut self.entries {
            entry.timestamp = timestamp_of(entry);
        }
        for pos in (0..self.entries.len() / 2).rev() {
            self.sift_down(pos);
        }
    }

    /// Whether every parent's timestamp is at most its children's.
    pub fn is_valid(&self) -> bool {
        (1..self.entries.len()).all(|i| self.entries[(i - 1) / 2].timestamp <= self.entries[i].timestamp)
    }

    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.entries[parent].timestamp <= self.entries[pos].timestamp {
                break;
            }
            self.entries.swap(parent, pos);
            pos = parent;
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.entries[left].timestamp < self.entries[smallest].timestamp {
                smallest = left;
            }
            if right < len && self.entries[right].timestamp < self.entries[smallest].timestamp {
                smallest = right;
            }
            if smallest == pos {
                return;
            }
            self.entries.swap(pos, smallest);
            pos = smallest;
        }
    }
}
