// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the best-so-far training state with Burn's
// CompactRecorder (named MessagePack, half precision).
//
// Directory layout (--model-file-path):
//   encoder_state.mpk
//   decoder_state.mpk
//   encoder_optimizer_state.mpk
//   decoder_optimizer_state.mpk
//   best_epoch.json        ← { "epoch": 7, "val_loss": 0.0312 }
//   train_config.json      ← full run configuration
//   metrics.csv            ← written by MetricsLogger
//
// Every state entry is recorded into `.staging/` first and then
// renamed into place, so no entry is ever left half written.
// The four renames are not atomic as a set: a crash between them
// can leave entries from two epochs side by side. `best_epoch.json`
// is written only after the last rename, so in that case it still
// names the older snapshot.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, FileRecorder, Record, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::error::{Seq2SeqError, Seq2SeqResult};
use crate::ml::{engine::TrainingState, model::Seq2Seq};

pub const ENCODER_STATE:           &str = "encoder_state";
pub const DECODER_STATE:           &str = "decoder_state";
pub const ENCODER_OPTIMIZER_STATE: &str = "encoder_optimizer_state";
pub const DECODER_OPTIMIZER_STATE: &str = "decoder_optimizer_state";

const ENTRIES: [&str; 4] = [
    ENCODER_STATE,
    DECODER_STATE,
    ENCODER_OPTIMIZER_STATE,
    DECODER_OPTIMIZER_STATE,
];

const STAGING_DIR:     &str = ".staging";
const BEST_EPOCH_FILE: &str = "best_epoch.json";
const CONFIG_FILE:     &str = "train_config.json";

/// Which epoch the persisted snapshot comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestEpoch {
    pub epoch:    usize,
    pub val_loss: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory (and parents) if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Seq2SeqError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of one state entry including the recorder's extension
    pub fn entry_path<B: Backend>(&self, name: &str) -> PathBuf {
        recorded_path::<B>(&self.dir, name)
    }

    /// Overwrite the snapshot with the current models and
    /// optimizer states.
    pub fn save_best<B, E, D, OE, OD>(
        &self,
        state:    &TrainingState<E, D, OE, OD>,
        epoch:    usize,
        val_loss: f64,
    ) -> Result<()>
    where
        B:  AutodiffBackend,
        E:  AutodiffModule<B>,
        D:  AutodiffModule<B>,
        OE: Optimizer<E, B>,
        OD: Optimizer<D, B>,
    {
        let staging = self.dir.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(|e| Seq2SeqError::io(&staging, e))?;

        record::<B, _>(&staging, ENCODER_STATE, state.models.encoder.clone().into_record())?;
        record::<B, _>(&staging, DECODER_STATE, state.models.decoder.clone().into_record())?;
        record::<B, _>(&staging, ENCODER_OPTIMIZER_STATE, state.optimizers.encoder.optim.to_record())?;
        record::<B, _>(&staging, DECODER_OPTIMIZER_STATE, state.optimizers.decoder.optim.to_record())?;

        for name in ENTRIES {
            let from = recorded_path::<B>(&staging, name);
            let to   = self.entry_path::<B>(name);
            fs::rename(&from, &to).map_err(|e| Seq2SeqError::io(&to, e))?;
        }
        fs::remove_dir(&staging).map_err(|e| Seq2SeqError::io(&staging, e))?;

        let best = BestEpoch { epoch, val_loss };
        let path = self.dir.join(BEST_EPOCH_FILE);
        fs::write(&path, serde_json::to_string_pretty(&best)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {} (val_loss={:.6})", epoch, val_loss);
        Ok(())
    }

    /// Load the persisted weights into freshly initialised modules
    /// of the same architecture.
    #[allow(dead_code)]
    pub fn load_models<B, E, D>(&self, models: Seq2Seq<E, D>, device: &B::Device) -> Result<Seq2Seq<E, D>>
    where
        B: Backend,
        E: Module<B>,
        D: Module<B>,
    {
        let encoder: E::Record = load::<B, _>(&self.dir, ENCODER_STATE, device)?;
        let decoder: D::Record = load::<B, _>(&self.dir, DECODER_STATE, device)?;

        Ok(Seq2Seq::new(
            models.encoder.load_record(encoder),
            models.decoder.load_record(decoder),
        ))
    }

    /// `None` until a snapshot has been written.
    pub fn best_epoch(&self) -> Result<Option<BestEpoch>> {
        let path = self.dir.join(BEST_EPOCH_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    #[allow(dead_code)]
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Recorder helpers ─────────────────────────────────────────────────────────
// The recorder appends its own extension to the path it is given.

fn recorded_path<B: Backend>(dir: &Path, name: &str) -> PathBuf {
    let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
    dir.join(format!("{name}.{ext}"))
}

fn record<B: Backend, R: Record<B>>(dir: &Path, name: &str, item: R) -> Seq2SeqResult<()> {
    let path = dir.join(name);
    Recorder::<B>::record(&CompactRecorder::new(), item, path.clone())
        .map_err(|source| Seq2SeqError::Checkpoint { path, source })
}

fn load<B: Backend, R: Record<B>>(dir: &Path, name: &str, device: &B::Device) -> Seq2SeqResult<R> {
    let path = dir.join(name);
    Recorder::<B>::load(&CompactRecorder::new(), path.clone(), device)
        .map_err(|source| Seq2SeqError::Checkpoint { path, source })
}
