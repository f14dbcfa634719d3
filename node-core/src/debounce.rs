//! Resettable debounce filter for the sampled bitfield.
//!
//! The filter tracks exactly two quantities: the most recent raw sample and
//! the instant it last changed. Any raw transition restarts the settle
//! window, so an input bouncing faster than the window never reaches the
//! stable state. The stable output lags real transitions by at least
//! [`DEFAULT_SETTLE`].

use core::time::Duration;

use crate::sampling::SensorBitfield;
use crate::time::MonotonicInstant;

/// Default settle window before a raw change becomes authoritative.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(50);

/// Two-state debounce machine, generic over the monotonic instant type.
#[derive(Copy, Clone, Debug)]
pub struct DebounceFilter<I> {
    last_raw: SensorBitfield,
    last_change_at: I,
    stable: SensorBitfield,
    settle: Duration,
}

impl<I: MonotonicInstant> DebounceFilter<I> {
    /// Seeds the filter so the boot-time reading is authoritative at once.
    #[must_use]
    pub fn new(initial: SensorBitfield, now: I) -> Self {
        Self::with_settle(initial, now, DEFAULT_SETTLE)
    }

    /// Seeds the filter with an explicit settle window.
    #[must_use]
    pub fn with_settle(initial: SensorBitfield, now: I, settle: Duration) -> Self {
        Self {
            last_raw: initial,
            last_change_at: now,
            stable: initial,
            settle,
        }
    }

    /// Feeds one raw sample and returns the current stable state.
    ///
    /// The stable state only adopts the raw value once the raw value has
    /// held constant for the settle window; the update is idempotent after
    /// that point.
    pub fn update(&mut self, raw: SensorBitfield, now: I) -> SensorBitfield {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_change_at = now;
        }

        if now.saturating_duration_since(self.last_change_at) >= self.settle {
            self.stable = self.last_raw;
        }

        self.stable
    }

    /// Returns the stable state without feeding a sample.
    #[must_use]
    pub const fn stable(&self) -> SensorBitfield {
        self.stable
    }

    /// Returns the configured settle window.
    #[must_use]
    pub const fn settle(&self) -> Duration {
        self.settle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    struct TickInstant(u64);

    impl MonotonicInstant for TickInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }
    }

    fn bits(raw: u16) -> SensorBitfield {
        SensorBitfield::from_raw(raw)
    }

    #[test]
    fn stable_state_waits_for_the_settle_window() {
        let mut filter = DebounceFilter::new(bits(0), TickInstant(0));

        assert_eq!(filter.update(bits(1), TickInstant(10)), bits(0));
        assert_eq!(filter.update(bits(1), TickInstant(40)), bits(0));
        // 50 ms after the change the raw value becomes authoritative.
        assert_eq!(filter.update(bits(1), TickInstant(60)), bits(1));
    }

    #[test]
    fn any_toggle_restarts_the_window() {
        let mut filter = DebounceFilter::new(bits(0), TickInstant(0));

        filter.update(bits(1), TickInstant(10));
        filter.update(bits(0), TickInstant(40));
        filter.update(bits(1), TickInstant(70));
        // Only 30 ms since the last flicker, still the seeded state.
        assert_eq!(filter.update(bits(1), TickInstant(100)), bits(0));
        assert_eq!(filter.update(bits(1), TickInstant(120)), bits(1));
    }

    #[test]
    fn chatter_faster_than_the_window_never_lands() {
        let mut filter = DebounceFilter::new(bits(0), TickInstant(0));

        let mut value = 1u16;
        for tick in 1..=20u64 {
            assert_eq!(filter.update(bits(value), TickInstant(tick * 20)), bits(0));
            value ^= 1;
        }
    }

    #[test]
    fn settled_update_is_idempotent() {
        let mut filter = DebounceFilter::new(bits(0), TickInstant(0));

        filter.update(bits(3), TickInstant(0));
        assert_eq!(filter.update(bits(3), TickInstant(50)), bits(3));
        assert_eq!(filter.update(bits(3), TickInstant(51)), bits(3));
        assert_eq!(filter.stable(), bits(3));
    }
}
