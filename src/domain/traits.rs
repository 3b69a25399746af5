// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so a
// different on-disk format (or an in-memory source in tests)
// can be swapped in without touching the use cases.

use anyhow::Result;

use crate::domain::motion::{MotionWindow, Split};

// ─── WindowSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the motion windows of a split.
///
/// Implementations:
///   - JsonFrameLoader → reads `<data-path>/<split>.json`
pub trait WindowSource {
    /// Load every window of the given split, already cut to the
    /// configured sequence length.
    fn load_split(&self, split: Split) -> Result<Vec<MotionWindow>>;
}
