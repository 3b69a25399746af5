// ============================================================
// Layer 4 — Split Loader
// ============================================================
// Loads one split of a motion dataset from
// `<data-path>/<split>.json` and cuts it into windows.
//
// File format (frames × features, row-major):
//   {
//     "inputs":  [[f32, ...], ...],
//     "targets": [[f32, ...], ...]   // conversion only
//   }
//
// How the frames become (input, target) pairs depends on the task:
//   prediction  → frames are down-sampled by `stride`; the target
//                 of each input window is the window that follows
//   conversion  → inputs[i] maps onto targets[i]; both channels
//                 are windowed identically
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::windowing::{downsample, SequenceWindower};
use crate::domain::motion::{MotionWindow, Split, Task};
use crate::domain::traits::WindowSource;
use crate::error::{Seq2SeqError, Seq2SeqResult};

/// Raw frames of one split as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameFile {
    pub inputs: Vec<Vec<f32>>,
    #[serde(default)]
    pub targets: Option<Vec<Vec<f32>>>,
}

/// Loads splits from a directory of JSON frame files.
/// Implements the WindowSource trait from Layer 3.
pub struct JsonFrameLoader {
    dir:        PathBuf,
    task:       Task,
    seq_length: usize,
    stride:     usize,
}

impl JsonFrameLoader {
    pub fn new(dir: impl AsRef<Path>, task: Task, seq_length: usize, stride: usize) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            task,
            seq_length,
            stride,
        }
    }

    /// `<data-path>/<split>.json`
    pub fn split_path(&self, split: Split) -> PathBuf {
        self.dir.join(format!("{}.json", split.file_stem()))
    }
}

impl WindowSource for JsonFrameLoader {
    fn load_split(&self, split: Split) -> Result<Vec<MotionWindow>> {
        let path = self.split_path(split);

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read {} split from '{}'", split, path.display()))?;
        let file: FrameFile = serde_json::from_str(&json)
            .with_context(|| format!("Malformed frame file '{}'", path.display()))?;

        let (inputs, targets) = read_variables(file, self.task, self.seq_length, self.stride)
            .with_context(|| format!("Invalid {} split in '{}'", split, path.display()))?;

        tracing::info!(
            "{} shapes (X, y): ({}, {}), ({}, {})",
            split,
            inputs.len(),
            inputs.first().map_or(0, Vec::len),
            targets.len(),
            targets.first().map_or(0, Vec::len),
        );

        let windows = into_windows(&inputs, &targets, self.seq_length);

        tracing::info!("Number of {} samples: {}", split, windows.len());
        Ok(windows)
    }
}

/// Turn a frame file into aligned (input frames, target frames)
/// according to the task. Both returned vectors have the same length.
pub fn read_variables(
    file:       FrameFile,
    task:       Task,
    seq_length: usize,
    stride:     usize,
) -> Seq2SeqResult<(Vec<Vec<f32>>, Vec<Vec<f32>>)> {
    check_frame_width(&file.inputs, "inputs")?;

    match task {
        Task::Prediction => {
            let frames = downsample(&file.inputs, stride);
            if frames.len() <= seq_length {
                return Ok((Vec::new(), Vec::new()));
            }
            // Target window i is the window that follows input window i
            let inputs  = frames[..frames.len() - seq_length].to_vec();
            let targets = frames[seq_length..].to_vec();
            Ok((inputs, targets))
        }
        Task::Conversion => {
            let targets = file.targets.ok_or_else(|| {
                Seq2SeqError::Data("conversion task requires a 'targets' array".into())
            })?;
            check_frame_width(&targets, "targets")?;
            if targets.len() != file.inputs.len() {
                return Err(Seq2SeqError::Data(format!(
                    "{} input frames but {} target frames",
                    file.inputs.len(),
                    targets.len()
                )));
            }
            Ok((file.inputs, targets))
        }
    }
}

/// Window both channels identically and pair them up.
pub fn into_windows(
    inputs:     &[Vec<f32>],
    targets:    &[Vec<f32>],
    seq_length: usize,
) -> Vec<MotionWindow> {
    let windower = SequenceWindower::new(seq_length);
    windower
        .windows(inputs)
        .into_iter()
        .zip(windower.windows(targets))
        .map(|(input, target)| MotionWindow::new(input, target))
        .collect()
}

/// Every frame of a channel must have the same, non-zero width.
fn check_frame_width(frames: &[Vec<f32>], channel: &str) -> Seq2SeqResult<()> {
    let Some(width) = frames.first().map(Vec::len) else {
        return Ok(());
    };
    if width == 0 {
        return Err(Seq2SeqError::Data(format!("{channel} frames are empty")));
    }
    if let Some((i, frame)) = frames.iter().enumerate().find(|(_, f)| f.len() != width) {
        return Err(Seq2SeqError::Data(format!(
            "{channel} frame {i} has {} values, expected {width}",
            frame.len()
        )));
    }
    Ok(())
}
