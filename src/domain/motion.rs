// ============================================================
// Layer 3 — Motion Domain Types
// ============================================================
// A motion recording is a list of frames; each frame is a fixed
// width vector of floats (joint orientations, positions, ...).
//
// Training never sees whole recordings, only windows of
// `seq_length` consecutive frames:
//
//   prediction:  input = frames [i*L, (i+1)*L)
//                target = frames [(i+1)*L, (i+2)*L)
//   conversion:  input and target are two aligned channels of
//                the same frames [i*L, (i+1)*L)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// What the network is trained to do with a window of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Forecast the next window of the same signal
    Prediction,
    /// Map one representation of a motion onto another
    Conversion,
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prediction" => Ok(Task::Prediction),
            "conversion" => Ok(Task::Conversion),
            other => Err(format!(
                "unknown task '{other}'; expected 'prediction' or 'conversion'"
            )),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Prediction => f.write_str("prediction"),
            Task::Conversion => f.write_str("conversion"),
        }
    }
}

/// The three named datasets a run reads from `<data-path>/<split>.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Validation,
    Testing,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Training, Split::Validation, Split::Testing];

    /// File stem used on disk
    pub fn file_stem(&self) -> &'static str {
        match self {
            Split::Training   => "training",
            Split::Validation => "validation",
            Split::Testing    => "testing",
        }
    }

    /// Capitalised name used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Split::Training   => "Training",
            Split::Validation => "Validation",
            Split::Testing    => "Testing",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// One training sample: `seq_length` input frames and the
/// `seq_length` target frames the model should emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionWindow {
    pub input:  Vec<Vec<f32>>,
    pub target: Vec<Vec<f32>>,
}

impl MotionWindow {
    pub fn new(input: Vec<Vec<f32>>, target: Vec<Vec<f32>>) -> Self {
        Self { input, target }
    }

    /// Width of one input frame (0 for an empty window)
    pub fn input_dim(&self) -> usize {
        self.input.first().map_or(0, Vec::len)
    }

    /// Width of one target frame (0 for an empty window)
    pub fn target_dim(&self) -> usize {
        self.target.first().map_or(0, Vec::len)
    }
}
