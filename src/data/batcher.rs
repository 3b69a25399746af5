// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<MotionWindow>
// into batch-major float tensors.
//
// How batching works here:
//   Input:  Vec of N windows, each L frames of F floats
//   Output: SequenceBatch with tensors of shape [N, L, F]
//
//   All frames are flattened into one long Vec in
//   sample → frame → feature order, then wrapped in a
//   TensorData of the final shape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::motion::MotionWindow;

// ─── SequenceBatch ────────────────────────────────────────────────────────────
/// A batch of motion windows ready for the encoder/decoder.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Encoder input: shape: [batch_size, seq_len_in, feature_dim_in]
    pub inputs: Tensor<B, 3>,

    /// Ground truth: shape: [batch_size, seq_len_out, feature_dim_out]
    pub targets: Tensor<B, 3>,
}

impl<B: Backend> SequenceBatch<B> {
    pub fn new(inputs: Tensor<B, 3>, targets: Tensor<B, 3>) -> Self {
        Self { inputs, targets }
    }

    pub fn batch_size(&self) -> usize {
        self.inputs.dims()[0]
    }
}

impl<B: AutodiffBackend> SequenceBatch<B> {
    /// Same batch on the inner (non-autodiff) backend
    pub fn inner(self) -> SequenceBatch<B::InnerBackend> {
        SequenceBatch {
            inputs:  self.inputs.inner(),
            targets: self.targets.inner(),
        }
    }
}

// ─── SequenceBatcher ──────────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the
/// model lives.
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack a slice of windows; used by the Batcher impl and by
    /// callers that build batches without a DataLoader.
    pub fn stack(&self, items: &[MotionWindow]) -> SequenceBatch<B> {
        let inputs = stack_frames::<B>(items.iter().map(|w| &w.input), items, &self.device);
        let targets = stack_frames::<B>(items.iter().map(|w| &w.target), items, &self.device);
        SequenceBatch { inputs, targets }
    }
}

impl<B: Backend> Batcher<MotionWindow, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<MotionWindow>) -> SequenceBatch<B> {
        self.stack(&items)
    }
}

/// Flatten one channel (input or target) of every window into a
/// [N, L, F] tensor.
fn stack_frames<'a, B: Backend>(
    channel: impl Iterator<Item = &'a Vec<Vec<f32>>>,
    items:   &[MotionWindow],
    device:  &B::Device,
) -> Tensor<B, 3> {
    let mut flat       = Vec::new();
    let mut seq_len    = 0;
    let mut feature_dim = 0;

    for frames in channel {
        seq_len     = frames.len();
        feature_dim = frames.first().map_or(0, Vec::len);
        for frame in frames {
            flat.extend_from_slice(frame);
        }
    }

    Tensor::from_data(
        TensorData::new(flat, [items.len(), seq_len, feature_dim]),
        device,
    )
}
