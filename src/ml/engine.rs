// ============================================================
// Layer 5 — Batch Loss Engine
// ============================================================
// Runs one batch through the encoder once, then through the
// decoder one timestep at a time.
//
//   input  [b, L, in]  ──swap──▶ encoder ──▶ outputs [L, b, H]
//                                        └─▶ hidden  [1, b, H]
//
//   x_0 = ones [1, b, out]                    (start token)
//   for t in 0..L:
//       ŷ_t, h_t = decoder(x_t, h_{t-1}, outputs)
//       loss    += criterion(ŷ_t[..main], y_t[..main])
//       aux     += criterion(y_t[main..], ŷ_t[main..])
//       x_{t+1}  = y_t                   if teacher forced
//                = stop                  if ŷ_t is all zeros
//                = detach(ŷ_t)           otherwise
//
// Teacher forcing is one Bernoulli draw per batch, never per
// timestep. The reported loss is the accumulated main loss over
// the nominal sequence length L even when decoding stopped early.
//
// Train mode backpropagates and steps both optimizers. Evaluate
// mode runs the inner (non-autodiff) copy of the models with
// dropout off and leaves the training state untouched.

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use rand::Rng;

use crate::{
    data::batcher::SequenceBatch,
    error::{Seq2SeqError, Seq2SeqResult},
    ml::{
        loss::{normalize_quaternions, Criterion},
        model::{Seq2Seq, SequenceDecoder, SequenceEncoder},
        optim::Seq2SeqOptimizers,
    },
};

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Evaluate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeConfig {
    /// Probability that a batch is decoded with ground-truth inputs
    pub teacher_forcing_ratio: f64,
    /// L2-normalise every group of 4 main-task outputs
    pub norm_quaternions:      bool,
    /// Split the output into a main and an auxiliary task
    pub auxiliary_acc:         bool,
}

impl DecodeConfig {
    pub fn new(teacher_forcing_ratio: f64) -> Self {
        Self { teacher_forcing_ratio, norm_quaternions: false, auxiliary_acc: false }
    }

    /// Validation batches always decode free-running.
    pub fn for_evaluation(self) -> Self {
        Self { teacher_forcing_ratio: 0.0, ..self }
    }
}

/// First channel of the auxiliary task, or the full width when
/// auxiliary accounting is off.
///
/// main_task_idx = output_dim - 3 · ⌊input_dim / 7⌋
pub fn main_task_idx(input_dim: usize, output_dim: usize, auxiliary: bool) -> Seq2SeqResult<usize> {
    if !auxiliary {
        return Ok(output_dim);
    }
    let aux_width = 3 * (input_dim / 7);
    if aux_width == 0 {
        return Err(Seq2SeqError::shape(format!(
            "auxiliary accounting needs at least 7 input features, got {input_dim}"
        )));
    }
    if aux_width >= output_dim {
        return Err(Seq2SeqError::shape(format!(
            "auxiliary width {aux_width} leaves no main task in {output_dim} output features"
        )));
    }
    Ok(output_dim - aux_width)
}

// ─── Shape validation ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct BatchLayout {
    batch_size:    usize,
    seq_len:       usize,
    output_dim:    usize,
    main_task_idx: usize,
}

impl BatchLayout {
    fn of<B: Backend>(batch: &SequenceBatch<B>, config: &DecodeConfig) -> Seq2SeqResult<Self> {
        let [batch_size, seq_len, input_dim]       = batch.inputs.dims();
        let [target_batch, target_len, output_dim] = batch.targets.dims();

        if batch_size == 0 || seq_len == 0 || input_dim == 0 {
            return Err(Seq2SeqError::shape(format!(
                "input batch must be non-empty, got [{batch_size}, {seq_len}, {input_dim}]"
            )));
        }
        if output_dim == 0 {
            return Err(Seq2SeqError::shape("target feature dimension is 0"));
        }
        if target_batch != batch_size {
            return Err(Seq2SeqError::shape(format!(
                "input batch has {batch_size} samples but target batch has {target_batch}"
            )));
        }
        if target_len < seq_len {
            return Err(Seq2SeqError::shape(format!(
                "targets cover {target_len} timesteps, decoding needs {seq_len}"
            )));
        }

        let main_task_idx = main_task_idx(input_dim, output_dim, config.auxiliary_acc)?;
        if config.norm_quaternions && main_task_idx % 4 != 0 {
            return Err(Seq2SeqError::shape(format!(
                "quaternion normalisation needs a main width divisible by 4, got {main_task_idx}"
            )));
        }

        Ok(Self { batch_size, seq_len, output_dim, main_task_idx })
    }

    fn has_auxiliary(&self) -> bool {
        self.main_task_idx < self.output_dim
    }
}

// ─── Sequence decoding ────────────────────────────────────────────────────────

/// Accumulated losses of one decoded batch.
#[derive(Debug, Clone)]
pub struct SequenceLoss<B: Backend> {
    /// Sum of per-timestep main-task losses: shape [1]
    pub main:           Tensor<B, 1>,
    /// Sum of per-timestep auxiliary losses, when enabled
    pub auxiliary:      Option<Tensor<B, 1>>,
    /// Nominal sequence length, the reporting divisor
    pub seq_length:     usize,
    /// Decoder calls actually made (< seq_length after a sentinel)
    pub steps_decoded:  usize,
    pub teacher_forced: bool,
}

impl<B: Backend> SequenceLoss<B> {
    pub fn reported(&self) -> f64 {
        self.main.clone().into_scalar().elem::<f64>() / self.seq_length as f64
    }

    /// Quantity to backpropagate: main, or main + auxiliary.
    pub fn objective(self) -> Tensor<B, 1> {
        match self.auxiliary {
            Some(aux) => self.main + aux,
            None      => self.main,
        }
    }
}

/// A decoder output that is exactly zero everywhere ends emission.
fn is_end_of_sequence<B: Backend>(output: &Tensor<B, 3>) -> bool {
    output.clone().abs().max().into_scalar().elem::<f64>() == 0.0
}

pub fn decode_sequence<B, E, D, R>(
    models:    &Seq2Seq<E, D>,
    batch:     &SequenceBatch<B>,
    criterion: Criterion,
    config:    &DecodeConfig,
    rng:       &mut R,
) -> Seq2SeqResult<SequenceLoss<B>>
where
    B: Backend,
    E: SequenceEncoder<B>,
    D: SequenceDecoder<B>,
    R: Rng,
{
    let layout = BatchLayout::of(batch, config)?;
    let BatchLayout { batch_size, seq_len, output_dim, main_task_idx } = layout;
    let device = batch.inputs.device();

    let encoded = models.encoder.encode(batch.inputs.clone().swap_dims(0, 1));
    let mut hidden        = encoded.hidden;
    let mut decoder_input = Tensor::<B, 3>::ones([1, batch_size, output_dim], &device);

    let teacher_forced = rng.gen::<f64>() < config.teacher_forcing_ratio;

    let mut main_loss     = Tensor::<B, 1>::zeros([1], &device);
    let mut aux_loss      = layout.has_auxiliary().then(|| Tensor::<B, 1>::zeros([1], &device));
    let mut steps_decoded = 0;

    for t in 0..seq_len {
        let step = models.decoder.decode_step(decoder_input, hidden, &encoded.outputs);
        let out_dims = step.output.dims();
        if out_dims != [1, batch_size, output_dim] {
            return Err(Seq2SeqError::shape(format!(
                "decoder produced {out_dims:?} at step {t}, expected [1, {batch_size}, {output_dim}]"
            )));
        }
        hidden = step.hidden;
        steps_decoded += 1;

        let target = batch
            .targets
            .clone()
            .slice([0..batch_size, t..t + 1, 0..output_dim])
            .swap_dims(0, 1);

        let mut main_out = step.output.clone().slice([0..1, 0..batch_size, 0..main_task_idx]);
        if config.norm_quaternions {
            main_out = normalize_quaternions(main_out);
        }
        let main_target = target.clone().slice([0..1, 0..batch_size, 0..main_task_idx]);
        main_loss = main_loss + criterion.forward(main_out.clone(), main_target);

        let candidate = if layout.has_auxiliary() {
            let aux_out    = step.output.clone().slice([0..1, 0..batch_size, main_task_idx..output_dim]);
            let aux_target = target.clone().slice([0..1, 0..batch_size, main_task_idx..output_dim]);
            aux_loss = aux_loss.map(|acc| acc + criterion.forward(aux_target, aux_out.clone()));
            Tensor::cat(vec![main_out, aux_out], 2)
        } else {
            main_out
        };

        if teacher_forced {
            decoder_input = target;
        } else if is_end_of_sequence(&step.output) {
            break;
        } else {
            decoder_input = candidate.detach();
        }
    }

    let loss = SequenceLoss {
        main: main_loss,
        auxiliary: aux_loss,
        seq_length: seq_len,
        steps_decoded,
        teacher_forced,
    };
    tracing::trace!(
        "Decoded {} / {} steps (teacher forced: {})",
        loss.steps_decoded, loss.seq_length, loss.teacher_forced,
    );
    Ok(loss)
}

// ─── TrainingState ────────────────────────────────────────────────────────────
/// Models and their optimizers. Only the Train branch of
/// `compute_batch_loss` replaces the models.
pub struct TrainingState<E, D, OE, OD> {
    pub models:     Seq2Seq<E, D>,
    pub optimizers: Seq2SeqOptimizers<OE, OD>,
}

impl<E, D, OE, OD> TrainingState<E, D, OE, OD> {
    pub fn new(models: Seq2Seq<E, D>, optimizers: Seq2SeqOptimizers<OE, OD>) -> Self {
        Self { models, optimizers }
    }

    /// Decode one batch and return its reported loss.
    pub fn compute_batch_loss<B, R>(
        &mut self,
        batch:     SequenceBatch<B>,
        mode:      Mode,
        criterion: Criterion,
        config:    &DecodeConfig,
        rng:       &mut R,
    ) -> Seq2SeqResult<f64>
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
        match mode {
            Mode::Evaluate => {
                let models = Seq2Seq::new(self.models.encoder.valid(), self.models.decoder.valid());
                let loss   = decode_sequence(&models, &batch.inner(), criterion, config, rng)?;
                Ok(loss.reported())
            }
            Mode::Train => {
                let loss     = decode_sequence(&self.models, &batch, criterion, config, rng)?;
                let reported = loss.reported();

                let mut grads     = loss.objective().backward();
                let encoder_grads = GradientsParams::from_module(&mut grads, &self.models.encoder);
                let decoder_grads = GradientsParams::from_module(&mut grads, &self.models.decoder);

                self.models.encoder = self
                    .optimizers
                    .encoder
                    .step::<B, _>(self.models.encoder.clone(), encoder_grads);
                self.models.decoder = self
                    .optimizers
                    .decoder
                    .step::<B, _>(self.models.decoder.clone(), decoder_grads);

                Ok(reported)
            }
        }
    }
}
