// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one command. No tensor
// math and no argument parsing here; only workflow.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// The zero-velocity baseline workflow
pub mod baseline_use_case;
