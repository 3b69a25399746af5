// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Load training/validation windows  (Layer 4 - data)
//   Step 2: Infer feature widths              (Layer 4 - data)
//   Step 3: Build data loaders                (Layer 4 - data)
//   Step 4: Save config, open metrics log     (Layer 6 - infra)
//   Step 5: Build encoder/decoder + Adam      (Layer 5 - ml)
//   Step 6: Run the epoch loop                (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    module::AutodiffModule,
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{dataloader::SequenceLoader, dataset::SequenceDataset, loader::JsonFrameLoader};
use crate::domain::{
    motion::{Split, Task},
    traits::WindowSource,
};
use crate::error::Seq2SeqError;
use crate::infra::{checkpoint::CheckpointManager, metrics::{EpochMetrics, MetricsLogger}};
use crate::ml::{
    attention::{AttentionMethod, AttnGruDecoderConfig},
    engine::TrainingState,
    loss::Criterion,
    model::{GruDecoderConfig, GruEncoder, GruEncoderConfig, Seq2Seq, SequenceDecoder},
    optim::{ConstantLr, EpochScheduler, ScheduledOptimizer, Seq2SeqOptimizers, StepLr},
    trainer::{fit, FitConfig},
};

type TrainBackend = Autodiff<Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run. Saved as train_config.json next to the
// checkpoint so the architecture can be rebuilt before loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub task:                  Task,
    pub data_path:             String,
    pub model_file_path:       String,
    pub batch_size:            usize,
    pub seq_length:            usize,
    pub stride:                usize,
    pub epochs:                usize,
    pub lr:                    f64,
    pub hidden_size:           usize,
    pub dropout:               f64,
    /// Read both ways over the input; rejected by `validate`
    #[serde(default)]
    pub bidirectional:         bool,
    /// `None` → plain GRU decoder
    pub attention:             Option<AttentionMethod>,
    pub teacher_forcing_ratio: f64,
    pub schedule_rate:         f64,
    pub norm_quaternions:      bool,
    pub auxiliary_acc:         bool,
    pub loss:                  Criterion,
    /// `None` → constant learning rate
    pub lr_step_size:          Option<usize>,
    pub lr_gamma:              f64,
    pub seed:                  u64,
    pub num_workers:           usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            task:                  Task::Prediction,
            data_path:             "data".to_string(),
            model_file_path:       "checkpoints".to_string(),
            batch_size:            32,
            seq_length:            20,
            stride:                3,
            epochs:                10,
            lr:                    1e-3,
            hidden_size:           256,
            dropout:               0.0,
            bidirectional:         false,
            attention:             None,
            teacher_forcing_ratio: 1.0,
            schedule_rate:         1.0,
            norm_quaternions:      false,
            auxiliary_acc:         false,
            loss:                  Criterion::L1,
            lr_step_size:          None,
            lr_gamma:              0.1,
            seed:                  42,
            num_workers:           1,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.seq_length == 0 || self.hidden_size == 0 {
            bail!("batch_size, seq_length and hidden_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.teacher_forcing_ratio) {
            bail!("teacher_forcing_ratio must be in [0, 1], got {}", self.teacher_forcing_ratio);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if self.lr_step_size == Some(0) {
            bail!("lr_step_size must be at least 1");
        }
        if self.bidirectional {
            bail!("bidirectional encoders are not supported; the encoder reads its input forwards only");
        }
        Ok(())
    }

    fn schedule(&self) -> Box<dyn EpochScheduler> {
        match self.lr_step_size {
            Some(step_size) => Box::new(StepLr::new(self.lr, step_size, self.lr_gamma)),
            None            => Box::new(ConstantLr(self.lr)),
        }
    }

    fn fit_config(&self) -> FitConfig {
        FitConfig {
            epochs:                self.epochs,
            criterion:             self.loss,
            teacher_forcing_ratio: self.teacher_forcing_ratio,
            schedule_rate:         self.schedule_rate,
            norm_quaternions:      self.norm_quaternions,
            auxiliary_acc:         self.auxiliary_acc,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train on `<data-path>/{training,validation}.json` with the
    /// WGPU backend.
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg    = &self.config;
        let source = JsonFrameLoader::new(&cfg.data_path, cfg.task, cfg.seq_length, cfg.stride);
        let device = WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        self.train::<TrainBackend>(&source, device)
    }

    /// Backend-independent body of `execute`.
    pub fn train<B: AutodiffBackend>(
        &self,
        source: &dyn WindowSource,
        device: B::Device,
    ) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;
        cfg.validate()?;
        tracing::info!("Run configuration: {}", serde_json::to_string(cfg)?);

        // ── Step 1: Load windows ──────────────────────────────────────────────
        let train_dataset = SequenceDataset::new(source.load_split(Split::Training)?);
        let val_dataset   = SequenceDataset::new(source.load_split(Split::Validation)?);
        tracing::info!(
            "Loaded {} training and {} validation windows",
            train_dataset.window_count(),
            val_dataset.window_count(),
        );

        // ── Step 2: Feature widths ────────────────────────────────────────────
        let (input_dim, output_dim) = train_dataset
            .feature_dims()
            .ok_or_else(|| Seq2SeqError::empty(Split::Training.file_stem()))?;
        if let Some(dims) = val_dataset.feature_dims() {
            if dims != (input_dim, output_dim) {
                return Err(Seq2SeqError::Data(format!(
                    "validation windows have widths {dims:?}, training windows ({input_dim}, {output_dim})"
                ))
                .into());
            }
        }
        tracing::info!("Input width {}, output width {}", input_dim, output_dim);

        // ── Step 3: Data loaders ──────────────────────────────────────────────
        let train_loader = SequenceLoader::<B>::new(
            train_dataset, cfg.batch_size, Some(cfg.seed), cfg.num_workers, device.clone(),
        );
        let val_loader = SequenceLoader::<B>::new(
            val_dataset, cfg.batch_size, None, cfg.num_workers, device.clone(),
        );

        // ── Step 4: Persistence ───────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.model_file_path)
            .with_context(|| format!("Cannot prepare '{}'", cfg.model_file_path))?;
        checkpoints.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.model_file_path)?;

        // ── Step 5 + 6: Models, optimizers, epoch loop ────────────────────────
        let encoder = GruEncoderConfig::new(input_dim, cfg.hidden_size)
            .with_dropout(cfg.dropout)
            .init::<B>(&device);

        let run = Run {
            cfg,
            train_loader: &train_loader,
            val_loader:   &val_loader,
            checkpoints:  &checkpoints,
            metrics:      &metrics,
        };
        match cfg.attention {
            None => {
                let decoder = GruDecoderConfig::new(output_dim, cfg.hidden_size).init::<B>(&device);
                run.fit(encoder, decoder)
            }
            Some(method) => {
                tracing::info!("Using {} attention", method);
                let decoder = AttnGruDecoderConfig::new(output_dim, cfg.hidden_size, method).init::<B>(&device);
                run.fit(encoder, decoder)
            }
        }
    }
}

/// Everything `fit` needs apart from the models.
struct Run<'a, B: AutodiffBackend> {
    cfg:          &'a TrainConfig,
    train_loader: &'a SequenceLoader<B>,
    val_loader:   &'a SequenceLoader<B>,
    checkpoints:  &'a CheckpointManager,
    metrics:      &'a MetricsLogger,
}

impl<B: AutodiffBackend> Run<'_, B> {
    fn fit<D>(self, encoder: GruEncoder<B>, decoder: D) -> Result<Vec<EpochMetrics>>
    where
        D: SequenceDecoder<B> + AutodiffModule<B>,
        D::InnerModule: SequenceDecoder<B::InnerBackend>,
    {
        let optimizers = Seq2SeqOptimizers::new(
            ScheduledOptimizer::new(AdamConfig::new().init::<B, GruEncoder<B>>(), self.cfg.schedule()),
            ScheduledOptimizer::new(AdamConfig::new().init::<B, D>(), self.cfg.schedule()),
        );
        let mut state = TrainingState::new(Seq2Seq::new(encoder, decoder), optimizers);
        let mut rng   = StdRng::seed_from_u64(self.cfg.seed);

        let history = fit(
            &mut state,
            self.train_loader,
            self.val_loader,
            &self.cfg.fit_config(),
            self.checkpoints,
            self.metrics,
            &mut rng,
        )?;

        if let Some(best) = self.checkpoints.best_epoch()? {
            tracing::info!(
                "Best checkpoint: epoch {} (val_loss={:.6}) in '{}'",
                best.epoch, best.val_loss, self.checkpoints.dir().display(),
            );
        }
        tracing::info!("Epoch history in '{}'", self.metrics.csv_path().display());
        Ok(history)
    }
}
