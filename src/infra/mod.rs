// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training loop and the
// use cases:
//
//   checkpoint.rs — best-snapshot persistence (weights and
//                   optimizer states via CompactRecorder,
//                   best_epoch.json, train_config.json)
//
//   metrics.rs    — per-epoch loss history appended to
//                   metrics.csv
//
//   timer.rs      — wall-clock stopwatch for batch timing
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model and optimizer checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Batch stopwatch
pub mod timer;
