//! Signed distance tile kernels for the Delve terrain engine.
//!
//! - [`tile_codec`]: the reversible delta + XOR transform used by tile files
//! - [`redistance`]: jump-flood distance transform over a scratch grid
//! - [`contour`]: marching-squares collision geometry from packed texels
//! - [`jobs`]: the batch scheduler seam used to fan work out over rows

pub mod contour;
pub mod jobs;
pub mod redistance;
pub mod tile_codec;

pub use contour::{
    cell_segments, extract_tile_segments, selector, CellCorners, MAX_SEGMENTS_PER_TILE,
};
pub use jobs::{InlineScheduler, JobScheduler, RayonScheduler};
pub use redistance::{DistanceGrid, Redistancer};
pub use tile_codec::{decode_tile, encode_tile, TileSamples};
