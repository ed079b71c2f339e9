//! Editable terrain for the Delve engine.
//!
//! Level-0 density tiles live in a [`DensityStore`] together with their mip
//! pyramid. The [`Editor`] carves and paints them, the [`TileCache`] streams
//! the tiles a frame needs into a fixed pool of texture slots, and
//! [`TerrainEngine`] ties everything to tile files on disk.

pub mod biome;
pub mod brush;
pub mod cache;
pub mod config;
pub mod editor;
pub mod engine;
pub mod gpu;
pub mod io;
pub mod lru_heap;
pub mod sampler;
pub mod store;

pub use biome::{BiomeCell, BiomeField};
pub use brush::{AddBrush, Brush, BrushMode, NoiseBrush, SubtractBrush};
pub use cache::{CacheStats, TextureUpload, TileCache};
pub use config::TerrainConfig;
pub use editor::{EditSummary, Editor};
pub use engine::TerrainEngine;
pub use gpu::TextureUploader;
pub use lru_heap::{CacheEntry, LruHeap};
pub use sampler::{SdfSample, RAYMARCH_MAX_STEPS};
pub use store::{DensityStore, StoreSample};
