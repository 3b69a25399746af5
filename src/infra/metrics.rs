// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch to <checkpoint dir>/metrics.csv.
//
// Columns:
//   epoch                  1-based epoch number
//   train_loss             mean reported loss over training batches
//   val_loss               mean reported loss over validation batches
//   teacher_forcing_ratio  ratio every batch of the epoch drew from
//   learning_rate          encoder rate used during the epoch
//
// Example:
//   epoch,train_loss,val_loss,teacher_forcing_ratio,learning_rate
//   1,0.412300,0.398100,1.000000,0.001000
//   2,0.301900,0.310400,0.900000,0.001000
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const METRICS_FILE: &str = "metrics.csv";
const HEADER: &str = "epoch,train_loss,val_loss,teacher_forcing_ratio,learning_rate";

/// One row of the loss history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:                 usize,
    pub train_loss:            f64,
    pub val_loss:              f64,
    pub teacher_forcing_ratio: f64,
    pub learning_rate:         f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:                 usize,
        train_loss:            f64,
        val_loss:              f64,
        teacher_forcing_ratio: f64,
        learning_rate:         f64,
    ) -> Self {
        Self { epoch, train_loss, val_loss, teacher_forcing_ratio, learning_rate }
    }

    /// Strictly lower than the best validation loss so far.
    /// Ties do not count.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header if the file doesn't exist yet, so
    /// repeated runs append to one log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.teacher_forcing_ratio,
            m.learning_rate,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
