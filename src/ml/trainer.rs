// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop around the batch loss engine.
//
// Per epoch:
//   1. training pass    — Train mode, one optimizer step per batch,
//                         progress logged every ~10% of batches
//   2. validation pass  — Evaluate mode on the inner backend
//   3. mean losses      → metrics.csv and the returned history
//   4. schedules        — both learning-rate schedules advance
//   5. teacher forcing  — ratio *= schedule_rate
//   6. checkpoint       — only on a strict new validation minimum
//
// Every configured epoch runs; there is no early stopping.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{Context, Result};
use std::time::Duration;
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    tensor::backend::AutodiffBackend,
};
use rand::Rng;

use crate::data::dataloader::SequenceLoader;
use crate::domain::motion::Split;
use crate::error::Seq2SeqError;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    timer::Timer,
};
use crate::ml::{
    engine::{DecodeConfig, Mode, TrainingState},
    loss::Criterion,
    model::{SequenceDecoder, SequenceEncoder},
};

#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub epochs:                usize,
    pub criterion:             Criterion,
    /// Ratio used during the first epoch
    pub teacher_forcing_ratio: f64,
    /// Multiplied into the ratio after every epoch
    pub schedule_rate:         f64,
    pub norm_quaternions:      bool,
    pub auxiliary_acc:         bool,
}

impl FitConfig {
    fn decode_config(&self, teacher_forcing_ratio: f64) -> DecodeConfig {
        DecodeConfig {
            teacher_forcing_ratio,
            norm_quaternions: self.norm_quaternions,
            auxiliary_acc:    self.auxiliary_acc,
        }
    }
}

/// Lowest validation loss seen so far.
#[derive(Debug, Clone, Copy)]
pub struct BestTracker {
    best: f64,
}

impl Default for BestTracker {
    fn default() -> Self {
        Self { best: f64::INFINITY }
    }
}

impl BestTracker {
    /// Records `m` if it strictly improves on the best so far.
    pub fn observe(&mut self, m: &EpochMetrics) -> bool {
        let improved = m.is_improvement(self.best);
        if improved {
            self.best = m.val_loss;
        }
        improved
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

/// Progress is logged every `max(1, batches / 10)` batches.
pub fn log_interval(num_batches: usize) -> usize {
    (num_batches / 10).max(1)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn fit<B, E, D, OE, OD, R>(
    state:        &mut TrainingState<E, D, OE, OD>,
    train_loader: &SequenceLoader<B>,
    val_loader:   &SequenceLoader<B>,
    cfg:          &FitConfig,
    checkpoints:  &CheckpointManager,
    metrics:      &MetricsLogger,
    rng:          &mut R,
) -> Result<Vec<EpochMetrics>>
where
    B:  AutodiffBackend,
    E:  SequenceEncoder<B> + AutodiffModule<B>,
    D:  SequenceDecoder<B> + AutodiffModule<B>,
    E::InnerModule: SequenceEncoder<B::InnerBackend>,
    D::InnerModule: SequenceDecoder<B::InnerBackend>,
    OE: Optimizer<E, B>,
    OD: Optimizer<D, B>,
    R:  Rng,
{
    if train_loader.is_empty() {
        return Err(Seq2SeqError::empty(Split::Training.file_stem()).into());
    }
    if val_loader.is_empty() {
        return Err(Seq2SeqError::empty(Split::Validation.file_stem()).into());
    }

    let num_batches  = train_loader.len();
    let log_every    = log_interval(num_batches);
    let mut ratio    = cfg.teacher_forcing_ratio;
    let mut best     = BestTracker::default();
    let mut history  = Vec::with_capacity(cfg.epochs);

    for epoch in 1..=cfg.epochs {
        tracing::info!("Epoch {} / {}", epoch, cfg.epochs);
        let learning_rate = state.optimizers.lr();
        let decode        = cfg.decode_config(ratio);

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_losses = Vec::with_capacity(num_batches);
        let mut total_time   = Duration::ZERO;

        for (index, batch) in train_loader.iter().enumerate() {
            let (loss, elapsed) = Timer::measure(|| {
                state.compute_batch_loss(batch, Mode::Train, cfg.criterion, &decode, rng)
            });
            let loss = loss.with_context(|| format!("epoch {epoch}, training batch {index}"))?;
            total_time += elapsed;
            train_losses.push(loss);

            if index % log_every == 0 {
                tracing::info!(
                    "Total time elapsed: {:.2?} - Batch Number: {} / {} - Training loss: {:.6}",
                    total_time, index, num_batches, loss,
                );
            }
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let eval_decode    = decode.for_evaluation();
        let mut val_losses = Vec::with_capacity(val_loader.len());
        for (index, batch) in val_loader.iter().enumerate() {
            let loss = state
                .compute_batch_loss(batch, Mode::Evaluate, cfg.criterion, &eval_decode, rng)
                .with_context(|| format!("epoch {epoch}, validation batch {index}"))?;
            val_losses.push(loss);
        }

        let row = EpochMetrics::new(epoch, mean(&train_losses), mean(&val_losses), ratio, learning_rate);
        tracing::info!("Training Loss: {:.6} - Val Loss: {:.6}", row.train_loss, row.val_loss);
        metrics.log(&row)?;

        state.optimizers.step_schedulers();
        ratio *= cfg.schedule_rate;

        if best.observe(&row) {
            tracing::info!("Saving model to {}", checkpoints.dir().display());
            checkpoints
                .save_best::<B, _, _, _, _>(state, epoch, row.val_loss)
                .with_context(|| format!("epoch {epoch}, saving checkpoint"))?;
        }
        history.push(row);
    }

    tracing::info!("Training complete! Best validation loss: {:.6}", best.best());
    Ok(history)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig},
    };
    use rand::{rngs::StdRng, SeedableRng};

    use crate::data::dataset::SequenceDataset;
    use crate::domain::motion::MotionWindow;
    use crate::infra::checkpoint::ENCODER_STATE;
    use crate::ml::{
        model::{GruDecoder, GruDecoderConfig, GruEncoder, GruEncoderConfig, Seq2Seq},
        optim::{ScheduledOptimizer, Seq2SeqOptimizers, StepLr},
    };

    type AB = Autodiff<NdArray>;

    type State = TrainingState<
        GruEncoder<AB>,
        GruDecoder<AB>,
        OptimizerAdaptor<Adam, GruEncoder<AB>, AB>,
        OptimizerAdaptor<Adam, GruDecoder<AB>, AB>,
    >;

    fn state_with(models: Seq2Seq<GruEncoder<AB>, GruDecoder<AB>>, schedule: StepLr) -> State {
        TrainingState::new(
            models,
            Seq2SeqOptimizers::new(
                ScheduledOptimizer::new(AdamConfig::new().init::<AB, GruEncoder<AB>>(), schedule.clone()),
                ScheduledOptimizer::new(AdamConfig::new().init::<AB, GruDecoder<AB>>(), schedule),
            ),
        )
    }

    fn models() -> Seq2Seq<GruEncoder<AB>, GruDecoder<AB>> {
        let device = Default::default();
        Seq2Seq::new(
            GruEncoderConfig::new(2, 4).init::<AB>(&device),
            GruDecoderConfig::new(2, 4).init::<AB>(&device),
        )
    }

    fn state() -> State {
        state_with(models(), StepLr::new(1e-2, 1, 0.5))
    }

    fn loader(windows: usize, batch_size: usize) -> SequenceLoader<AB> {
        let windows = (0..windows)
            .map(|i| {
                let frames: Vec<Vec<f32>> = (0..6).map(|t| vec![(i + t) as f32 * 0.1, 0.5]).collect();
                MotionWindow::new(frames[..3].to_vec(), frames[3..].to_vec())
            })
            .collect();
        SequenceLoader::new(SequenceDataset::new(windows), batch_size, None, 1, Default::default())
    }

    fn fit_config(epochs: usize) -> FitConfig {
        FitConfig {
            epochs,
            criterion:             Criterion::L1,
            teacher_forcing_ratio: 1.0,
            schedule_rate:         0.5,
            norm_quaternions:      false,
            auxiliary_acc:         false,
        }
    }

    #[test]
    fn test_log_interval_is_at_least_one() {
        assert_eq!(log_interval(0), 1);
        assert_eq!(log_interval(7), 1);
        assert_eq!(log_interval(25), 2);
        assert_eq!(log_interval(100), 10);
    }

    #[test]
    fn test_ties_do_not_count_as_improvement() {
        let mut best = BestTracker::default();
        assert!(best.observe(&EpochMetrics::new(1, 1.0, 0.5, 1.0, 1e-3)));
        assert!(!best.observe(&EpochMetrics::new(2, 1.0, 0.5, 1.0, 1e-3)));
        assert!(!best.observe(&EpochMetrics::new(3, 1.0, 0.7, 1.0, 1e-3)));
        assert!(best.observe(&EpochMetrics::new(4, 1.0, 0.4, 1.0, 1e-3)));
        assert_eq!(best.best(), 0.4);
    }

    #[test]
    fn test_fit_runs_every_epoch_and_decays_schedules() {
        let dir         = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let metrics     = MetricsLogger::new(dir.path()).unwrap();
        let mut state   = state();
        let mut rng     = StdRng::seed_from_u64(1);

        let history = fit(
            &mut state,
            &loader(6, 2),
            &loader(4, 2),
            &fit_config(3),
            &checkpoints,
            &metrics,
            &mut rng,
        )
        .unwrap();

        assert_eq!(history.len(), 3);
        let ratios: Vec<f64> = history.iter().map(|m| m.teacher_forcing_ratio).collect();
        assert_eq!(ratios, vec![1.0, 0.5, 0.25]);
        let rates: Vec<f64> = history.iter().map(|m| m.learning_rate).collect();
        assert_eq!(rates, vec![1e-2, 5e-3, 2.5e-3]);
        assert!(history.iter().all(|m| m.train_loss.is_finite() && m.val_loss.is_finite()));

        // first epoch always improves on +inf
        let best = checkpoints.best_epoch().unwrap().unwrap();
        let min  = history.iter().map(|m| m.val_loss).fold(f64::INFINITY, f64::min);
        assert!((best.val_loss - min).abs() < 1e-12);
        assert!(checkpoints.entry_path::<AB>(ENCODER_STATE).exists());

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_snapshot_keeps_best_epoch_weights() {
        let dir         = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let metrics     = MetricsLogger::new(dir.path()).unwrap();
        let mut rng     = StdRng::seed_from_u64(3);
        let val         = loader(4, 2);
        let cfg         = fit_config(3);

        // lr 1e-3, then 10, then 1e5: later epochs blow up
        let mut state = state_with(models(), StepLr::new(1e-3, 1, 1e4));
        let history = fit(&mut state, &loader(6, 2), &val, &cfg, &checkpoints, &metrics, &mut rng).unwrap();

        let best = checkpoints.best_epoch().unwrap().unwrap();
        assert!(best.epoch < 3, "last epoch became best: {history:?}");
        let best_loss = history[best.epoch - 1].val_loss;
        assert!((best.val_loss - best_loss).abs() < 1e-12);

        // re-score the validation split with the weights on disk
        let device   = Default::default();
        let restored = checkpoints.load_models::<AB, _, _>(models(), &device).unwrap();
        let mut restored = state_with(restored, StepLr::new(1e-3, 1, 1.0));
        let eval = cfg.decode_config(0.0).for_evaluation();
        let losses: Vec<f64> = val
            .iter()
            .map(|b| restored.compute_batch_loss(b, Mode::Evaluate, cfg.criterion, &eval, &mut rng).unwrap())
            .collect();

        // weights are stored at half precision
        let rescored  = mean(&losses);
        let tolerance = 2e-2 * best_loss.abs().max(1.0);
        assert!(
            (rescored - best_loss).abs() < tolerance,
            "snapshot scores {rescored}, best epoch scored {best_loss}",
        );
    }

    #[test]
    fn test_empty_loader_is_rejected() {
        let dir         = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let metrics     = MetricsLogger::new(dir.path()).unwrap();
        let mut rng     = StdRng::seed_from_u64(1);

        let err = fit(
            &mut state(),
            &loader(1, 2),
            &loader(4, 2),
            &fit_config(1),
            &checkpoints,
            &metrics,
            &mut rng,
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Seq2SeqError>(),
            Some(Seq2SeqError::EmptyDataset { .. })
        ));
        assert!(checkpoints.best_epoch().unwrap().is_none());
    }
}
