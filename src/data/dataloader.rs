// ============================================================
// Layer 4 — Sequence Loader
// ============================================================
// Wraps Burn's DataLoader with the batching contract the
// training loop relies on:
//   - fixed batch size
//   - the last partial batch is dropped
//   - optional seeded shuffling (training data)
//
// With more than one worker Burn splits the dataset into one
// contiguous slice per worker, and every worker emits its own
// partial batch in arrival order. Batches are therefore filtered
// by size, and the full-batch count is worked out per slice:
//
//   7 windows, batch 3, 2 workers → slices 3 + 4 → 1 + 1 batches
//
// Workers are capped at the number of full batches so no slice
// is too small to fill one.

use std::sync::Arc;

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};

use crate::data::{
    batcher::{SequenceBatch, SequenceBatcher},
    dataset::SequenceDataset,
};

pub struct SequenceLoader<B: Backend> {
    inner:       Arc<dyn DataLoader<SequenceBatch<B>>>,
    batch_size:  usize,
    num_batches: usize,
}

impl<B: Backend> SequenceLoader<B> {
    /// # Panics
    /// Panics if batch_size is 0
    pub fn new(
        dataset:     SequenceDataset,
        batch_size:  usize,
        shuffle:     Option<u64>,
        num_workers: usize,
        device:      B::Device,
    ) -> Self {
        assert!(batch_size > 0, "batch_size must be at least 1");
        let workers     = num_workers.min(dataset.len() / batch_size).max(1);
        let num_batches = full_batches(dataset.len(), batch_size, workers);

        let mut builder = DataLoaderBuilder::new(SequenceBatcher::<B>::new(device))
            .batch_size(batch_size);
        if let Some(seed) = shuffle {
            builder = builder.shuffle(seed);
        }
        if workers > 1 {
            builder = builder.num_workers(workers);
        }

        Self {
            inner: builder.build(dataset),
            batch_size,
            num_batches,
        }
    }

    /// Number of full batches per pass
    pub fn len(&self) -> usize {
        self.num_batches
    }

    pub fn is_empty(&self) -> bool {
        self.num_batches == 0
    }

    /// One pass over the full batches
    pub fn iter(&self) -> impl Iterator<Item = SequenceBatch<B>> + '_ {
        let batch_size = self.batch_size;
        self.inner.iter().filter(move |b| b.batch_size() == batch_size)
    }
}

/// Full batches produced when `len` items are split into `workers`
/// contiguous slices, the last slice taking the remainder.
fn full_batches(len: usize, batch_size: usize, workers: usize) -> usize {
    let slice = len / workers;
    let last  = len - slice * (workers - 1);
    (workers - 1) * (slice / batch_size) + last / batch_size
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::motion::MotionWindow;
    use burn::backend::NdArray;

    fn dataset(n: usize) -> SequenceDataset {
        SequenceDataset::new(
            (0..n)
                .map(|i| MotionWindow::new(vec![vec![i as f32; 2]; 3], vec![vec![0.0; 2]; 3]))
                .collect(),
        )
    }

    #[test]
    fn test_partial_batch_is_dropped() {
        let loader = SequenceLoader::<NdArray>::new(dataset(7), 3, None, 1, Default::default());
        assert_eq!(loader.len(), 2);

        let sizes: Vec<usize> = loader.iter().map(|b| b.batch_size()).collect();
        assert_eq!(sizes, vec![3, 3]);
    }

    #[test]
    fn test_partial_batches_dropped_with_several_workers() {
        for _ in 0..20 {
            let loader = SequenceLoader::<NdArray>::new(dataset(7), 3, Some(11), 2, Default::default());
            assert_eq!(loader.len(), 2);

            let sizes: Vec<usize> = loader.iter().map(|b| b.batch_size()).collect();
            assert_eq!(sizes, vec![3, 3]);
        }
    }

    #[test]
    fn test_full_batch_count_per_worker_slice() {
        assert_eq!(full_batches(7, 3, 1), 2);
        assert_eq!(full_batches(7, 3, 2), 2);
        // slices 4 + 5
        assert_eq!(full_batches(9, 4, 2), 2);
        // slices 3 + 3 + 4
        assert_eq!(full_batches(10, 3, 3), 3);
        assert_eq!(full_batches(12, 5, 2), 2);
    }

    #[test]
    fn test_workers_capped_by_full_batches() {
        // 3 workers would give slices of 3 and no full batch of 4
        let loader = SequenceLoader::<NdArray>::new(dataset(9), 4, None, 3, Default::default());
        assert_eq!(loader.len(), 2);
        assert_eq!(loader.iter().count(), 2);
    }

    #[test]
    fn test_too_few_windows_is_empty() {
        let loader = SequenceLoader::<NdArray>::new(dataset(2), 32, Some(7), 1, Default::default());
        assert!(loader.is_empty());
        assert_eq!(loader.iter().count(), 0);
    }
}
