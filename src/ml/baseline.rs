// ============================================================
// Layer 5 — Zero-Velocity Baseline
// ============================================================
// Predicts that nothing moves: the last observed input frame is
// repeated for every target timestep.
//
//   inputs [b, L, F] ──last frame──▶ [b, 1, F] ──expand──▶ [b, L', F]
//
// Any trained model should beat this number on every split.

use burn::{prelude::*, tensor::ElementConversion};

use crate::data::{batcher::SequenceBatch, dataloader::SequenceLoader};
use crate::domain::motion::Split;
use crate::error::{Seq2SeqError, Seq2SeqResult};
use crate::ml::loss::Criterion;

/// Last input frame repeated `horizon` times: [b, horizon, F]
pub fn zero_velocity_prediction<B: Backend>(inputs: Tensor<B, 3>, horizon: usize) -> Tensor<B, 3> {
    let [batch_size, seq_len, width] = inputs.dims();
    inputs
        .slice([0..batch_size, seq_len - 1..seq_len, 0..width])
        .expand([batch_size, horizon, width])
}

pub fn batch_loss<B: Backend>(batch: &SequenceBatch<B>, criterion: Criterion) -> Seq2SeqResult<f64> {
    let [batch_size, seq_len, input_dim]       = batch.inputs.dims();
    let [target_batch, target_len, output_dim] = batch.targets.dims();

    if seq_len == 0 {
        return Err(Seq2SeqError::shape("zero-velocity baseline needs at least one input frame"));
    }
    if target_batch != batch_size || input_dim != output_dim {
        return Err(Seq2SeqError::shape(format!(
            "zero-velocity baseline needs matching widths, got inputs [{batch_size}, _, {input_dim}] \
             and targets [{target_batch}, _, {output_dim}]"
        )));
    }

    let prediction = zero_velocity_prediction(batch.inputs.clone(), target_len);
    let loss       = criterion.forward(batch.targets.clone(), prediction);
    Ok(loss.into_scalar().elem::<f64>())
}

/// Mean batch loss over one split, divided by that split's own
/// batch count.
pub fn split_loss<B: Backend>(
    loader:    &SequenceLoader<B>,
    split:     Split,
    criterion: Criterion,
) -> Seq2SeqResult<f64> {
    if loader.is_empty() {
        return Err(Seq2SeqError::empty(split.file_stem()));
    }

    let mut total = 0.0;
    for batch in loader.iter() {
        total += batch_loss(&batch, criterion)?;
    }
    let average = total / loader.len() as f64;

    tracing::info!("{} average loss {}", split.label(), average);
    Ok(average)
}
