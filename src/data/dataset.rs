use burn::data::dataset::Dataset;

use crate::domain::motion::MotionWindow;

/// In-memory collection of motion windows for one split.
pub struct SequenceDataset {
    windows: Vec<MotionWindow>,
}

impl SequenceDataset {
    pub fn new(windows: Vec<MotionWindow>) -> Self { Self { windows } }

    pub fn window_count(&self) -> usize { self.windows.len() }

    /// (input width, target width) of the first window, if any
    pub fn feature_dims(&self) -> Option<(usize, usize)> {
        self.windows.first().map(|w| (w.input_dim(), w.target_dim()))
    }
}

impl Dataset<MotionWindow> for SequenceDataset {
    fn get(&self, index: usize) -> Option<MotionWindow> {
        self.windows.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}
