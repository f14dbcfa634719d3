//! Monotonic time abstraction shared by firmware and host targets.
//!
//! The node never needs wall-clock time; every deadline is expressed as a
//! duration since some earlier observation. Keeping the instant type generic
//! lets the same debounce and cadence logic run against Embassy's tick
//! counter on the MCU and a hand-advanced counter in tests and the emulator.

use core::time::Duration;

/// Trait implemented by monotonic instant wrappers used across the node.
pub trait MonotonicInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}
