// ============================================================
// Layer 2 — ZeroVelocityUseCase
// ============================================================
// Scores the repeat-last-frame baseline on every split:
//
//   for split in training, validation, testing:
//       load windows → loader → mean batch loss
//
// When a model directory is given, the three numbers are also
// written to <model-file-path>/zero_velocity.json so they sit
// next to the trained model they are compared with.

use anyhow::{Context, Result};
use burn::{
    backend::{wgpu::WgpuDevice, Wgpu},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::data::{dataloader::SequenceLoader, dataset::SequenceDataset, loader::JsonFrameLoader};
use crate::domain::{
    motion::{Split, Task},
    traits::WindowSource,
};
use crate::ml::{baseline::split_loss, loss::Criterion};

pub const RESULTS_FILE: &str = "zero_velocity.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    pub task:            Task,
    pub data_path:       String,
    pub model_file_path: Option<String>,
    pub batch_size:      usize,
    pub seq_length:      usize,
    pub stride:          usize,
    pub loss:            Criterion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitLoss {
    pub split: String,
    pub loss:  f64,
}

pub struct ZeroVelocityUseCase {
    config: BaselineConfig,
}

impl ZeroVelocityUseCase {
    pub fn new(config: BaselineConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<SplitLoss>> {
        let cfg    = &self.config;
        let source = JsonFrameLoader::new(&cfg.data_path, cfg.task, cfg.seq_length, cfg.stride);
        self.evaluate::<Wgpu>(&source, WgpuDevice::default())
    }

    pub fn evaluate<B: Backend>(&self, source: &dyn WindowSource, device: B::Device) -> Result<Vec<SplitLoss>> {
        let cfg = &self.config;
        anyhow::ensure!(cfg.batch_size > 0 && cfg.seq_length > 0, "batch_size and seq_length must be at least 1");

        let mut results = Vec::with_capacity(Split::ALL.len());
        for split in Split::ALL {
            let windows = source.load_split(split)?;
            let loader  = SequenceLoader::<B>::new(
                SequenceDataset::new(windows), cfg.batch_size, None, 1, device.clone(),
            );
            let loss = split_loss(&loader, split, cfg.loss)
                .with_context(|| format!("zero-velocity baseline on the {split} split"))?;
            results.push(SplitLoss { split: split.file_stem().to_string(), loss });
        }

        if let Some(dir) = &cfg.model_file_path {
            let dir = PathBuf::from(dir);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create '{}'", dir.display()))?;
            let path = dir.join(RESULTS_FILE);
            fs::write(&path, serde_json::to_string_pretty(&results)?)
                .with_context(|| format!("Cannot write '{}'", path.display()))?;
        }

        Ok(results)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::domain::motion::MotionWindow;

    /// Training split is static, the others move by `step` per frame.
    struct RampSource {
        step: f32,
    }

    impl WindowSource for RampSource {
        fn load_split(&self, split: Split) -> Result<Vec<MotionWindow>> {
            let step = if split == Split::Training { 0.0 } else { self.step };
            Ok((0..4)
                .map(|_| {
                    let frame = |t: usize| vec![t as f32 * step; 3];
                    MotionWindow::new((0..2).map(frame).collect(), (2..4).map(frame).collect())
                })
                .collect())
        }
    }

    fn config(model_file_path: Option<String>) -> BaselineConfig {
        BaselineConfig {
            task:            Task::Prediction,
            data_path:       "unused".to_string(),
            model_file_path,
            batch_size:      2,
            seq_length:      2,
            stride:          1,
            loss:            Criterion::L1,
        }
    }

    #[test]
    fn test_each_split_is_scored() {
        let results = ZeroVelocityUseCase::new(config(None))
            .evaluate::<NdArray>(&RampSource { step: 1.0 }, Default::default())
            .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.split.as_str()).collect();
        assert_eq!(names, vec!["training", "validation", "testing"]);
        assert_eq!(results[0].loss, 0.0);
        // last input frame 1.0, targets 2.0 and 3.0
        assert!((results[1].loss - 1.5).abs() < 1e-6);
        assert!((results[2].loss - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_results_are_written_next_to_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model");
        ZeroVelocityUseCase::new(config(Some(out.display().to_string())))
            .evaluate::<NdArray>(&RampSource { step: 0.5 }, Default::default())
            .unwrap();

        let json = fs::read_to_string(out.join(RESULTS_FILE)).unwrap();
        let back: Vec<SplitLoss> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 3);
    }
}
