//! Batch job submission.
//!
//! Terrain kernels never spawn threads themselves. They hand a batch of
//! independent, index-tagged work items to a [`JobScheduler`] and block until
//! the whole batch has completed; partial results are never observed.

use rayon::prelude::*;

/// Runs batches of independent work items.
pub trait JobScheduler: Send + Sync {
    /// Split `items` into chunks of `chunk_len` and run `job(chunk_index, chunk)`
    /// for every chunk. Returns once every chunk has been processed.
    fn run_batch<T, F>(&self, items: &mut [T], chunk_len: usize, job: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync;
}

/// Fans batches out over the global rayon pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayonScheduler;

impl JobScheduler for RayonScheduler {
    fn run_batch<T, F>(&self, items: &mut [T], chunk_len: usize, job: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        assert!(chunk_len > 0, "chunk length must be non-zero");
        items
            .par_chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(i, chunk)| job(i, chunk));
    }
}

/// Runs every item on the calling thread, in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineScheduler;

impl JobScheduler for InlineScheduler {
    fn run_batch<T, F>(&self, items: &mut [T], chunk_len: usize, job: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        assert!(chunk_len > 0, "chunk length must be non-zero");
        for (i, chunk) in items.chunks_mut(chunk_len).enumerate() {
            job(i, chunk);
        }
    }
}
