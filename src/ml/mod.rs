// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches burn tensors, modules or optimizers.
//
//   model.rs     — encoder/decoder call contracts, GRU encoder,
//                  plain GRU decoder, Seq2Seq pair
//   attention.rs — Luong attention and the attention decoder
//   loss.rs      — L1 / MSE criteria, quaternion normalisation
//   optim.rs     — optimizers paired with epoch schedules
//   engine.rs    — per-batch decoding: teacher forcing,
//                  auxiliary split, early stop, Train/Evaluate
//   trainer.rs   — epoch loop, validation, checkpointing
//   baseline.rs  — zero-velocity baseline
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning

/// Encoder/decoder contracts and GRU modules
pub mod model;

/// Luong attention decoder
pub mod attention;

/// Regression criteria
pub mod loss;

/// Optimizers and learning-rate schedules
pub mod optim;

/// Batch loss engine
pub mod engine;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Repeat-last-frame baseline
pub mod baseline;
