// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from frame files on disk to tensor batches.
//
// The pipeline flows in this order:
//
//   <data-path>/<split>.json
//       │
//       ▼
//   JsonFrameLoader   → reads frames, pairs inputs with targets
//       │
//       ▼
//   SequenceWindower  → cuts frames into seq_length windows
//       │
//       ▼
//   SequenceDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   SequenceBatcher   → stacks windows into [N, L, F] tensors
//       │
//       ▼
//   SequenceLoader    → fixed-size batches, partial batch dropped
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads `<split>.json` frame files
pub mod loader;

/// Cuts frame lists into fixed-length windows
pub mod windowing;

/// Implements Burn's Dataset trait for motion windows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Fixed-size batch iteration over a dataset
pub mod dataloader;
