// ============================================================
// Layer 4 — Frame Windowing
// ============================================================
// Cuts a long recording (a list of frames) into fixed-length
// windows the encoder/decoder can consume.
//
// Windows never overlap and frames that do not fill a whole
// window at the end of a recording are dropped:
//
// Example with seq_length=3:
//   Frames:   f0 f1 f2 f3 f4 f5 f6 f7
//   Window 1: f0 f1 f2
//   Window 2: f3 f4 f5
//   (f6, f7 dropped)

pub struct SequenceWindower {
    /// Number of frames per window
    seq_length: usize,
}

impl SequenceWindower {
    /// Create a new SequenceWindower.
    ///
    /// # Panics
    /// Panics if seq_length is 0, because no window could ever be filled
    pub fn new(seq_length: usize) -> Self {
        assert!(seq_length > 0, "seq_length must be at least 1");
        Self { seq_length }
    }

    /// Split frames into consecutive windows of `seq_length` frames.
    pub fn windows(&self, frames: &[Vec<f32>]) -> Vec<Vec<Vec<f32>>> {
        frames
            .chunks_exact(self.seq_length)
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}

/// Keep every `stride`-th frame, starting with the first.
/// A stride of 0 or 1 keeps every frame.
pub fn downsample(frames: &[Vec<f32>], stride: usize) -> Vec<Vec<f32>> {
    frames.iter().step_by(stride.max(1)).cloned().collect()
}
