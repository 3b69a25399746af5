// ============================================================
// Layer 5 — Optimizers & Epoch Schedules
// ============================================================
// Each half of the model owns one optimizer paired with an
// epoch-level learning-rate schedule. The batch loss engine
// calls `step` once per training batch; the training loop calls
// `step_schedulers` once per epoch, and the new rate applies to
// every step of the following epoch.
//
//   Constant → lr
//   StepLr   → lr · γ^⌊epoch / step_size⌋

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
    LearningRate,
};

// ─── Schedules ────────────────────────────────────────────────────────────────

pub trait EpochScheduler {
    /// Rate used by optimizer steps of the current epoch
    fn current(&self) -> LearningRate;

    /// Move to the next epoch and return its rate
    fn step(&mut self) -> LearningRate;
}

impl<S: EpochScheduler + ?Sized> EpochScheduler for Box<S> {
    fn current(&self) -> LearningRate {
        (**self).current()
    }

    fn step(&mut self) -> LearningRate {
        (**self).step()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantLr(pub LearningRate);

impl EpochScheduler for ConstantLr {
    fn current(&self) -> LearningRate {
        self.0
    }

    fn step(&mut self) -> LearningRate {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct StepLr {
    base:      LearningRate,
    step_size: usize,
    gamma:     f64,
    epoch:     usize,
}

impl StepLr {
    /// # Panics
    /// Panics if step_size is 0
    pub fn new(base: LearningRate, step_size: usize, gamma: f64) -> Self {
        assert!(step_size > 0, "step_size must be at least 1");
        Self { base, step_size, gamma, epoch: 0 }
    }
}

impl EpochScheduler for StepLr {
    fn current(&self) -> LearningRate {
        let decays = (self.epoch / self.step_size) as i32;
        self.base * self.gamma.powi(decays)
    }

    fn step(&mut self) -> LearningRate {
        self.epoch += 1;
        self.current()
    }
}

// ─── ScheduledOptimizer ───────────────────────────────────────────────────────

pub struct ScheduledOptimizer<O> {
    pub optim: O,
    schedule:  Box<dyn EpochScheduler>,
}

impl<O> ScheduledOptimizer<O> {
    pub fn new(optim: O, schedule: impl EpochScheduler + 'static) -> Self {
        Self { optim, schedule: Box::new(schedule) }
    }

    pub fn lr(&self) -> LearningRate {
        self.schedule.current()
    }

    /// One parameter update at the current rate; consumes the gradients.
    pub fn step<B, M>(&mut self, module: M, grads: GradientsParams) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let lr = self.lr();
        self.optim.step(lr, module, grads)
    }

    pub fn step_schedule(&mut self) -> LearningRate {
        self.schedule.step()
    }
}

/// Encoder and decoder optimizers, stepped together.
pub struct Seq2SeqOptimizers<OE, OD> {
    pub encoder: ScheduledOptimizer<OE>,
    pub decoder: ScheduledOptimizer<OD>,
}

impl<OE, OD> Seq2SeqOptimizers<OE, OD> {
    pub fn new(encoder: ScheduledOptimizer<OE>, decoder: ScheduledOptimizer<OD>) -> Self {
        Self { encoder, decoder }
    }

    /// Advance both schedules; returns the encoder's new rate.
    pub fn step_schedulers(&mut self) -> LearningRate {
        self.decoder.step_schedule();
        self.encoder.step_schedule()
    }

    pub fn lr(&self) -> LearningRate {
        self.encoder.lr()
    }
}
