// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing motion data:
// which task is being trained, which split a file belongs to,
// and what one training window looks like.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Tasks, splits and motion windows
pub mod motion;

// Core abstractions (traits) that other layers implement
pub mod traits;
