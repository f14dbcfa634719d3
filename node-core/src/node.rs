//! Sampling loop glue.
//!
//! Combines a sensor bank, the debounce filter, and the broadcast scheduler
//! into a single poll step that yields the next status frame when one is
//! due. Frame transmission stays with the caller so a refused send never
//! blocks sampling.

use crate::addressing::NodeAddress;
use crate::broadcast::{BroadcastScheduler, status_frame};
use crate::debounce::DebounceFilter;
use crate::frame::BusFrame;
use crate::sampling::{SensorBank, SensorBitfield};
use crate::time::MonotonicInstant;

/// Periodic sample-debounce-broadcast step.
pub struct SensorLoop<B, I> {
    bank: B,
    filter: DebounceFilter<I>,
    scheduler: BroadcastScheduler<I>,
    address: NodeAddress,
}

impl<B, I> SensorLoop<B, I>
where
    B: SensorBank,
    I: MonotonicInstant,
{
    /// Creates a loop seeded with an initial sample of the bank.
    ///
    /// The first [`poll`] is always due; no frame is emitted before it.
    ///
    /// [`poll`]: SensorLoop::poll
    pub fn new(mut bank: B, address: NodeAddress, now: I) -> Self {
        let initial = bank.sample();
        Self {
            bank,
            filter: DebounceFilter::new(initial, now),
            scheduler: BroadcastScheduler::new(),
            address,
        }
    }

    /// Creates a loop with explicit debounce and broadcast timing.
    pub fn with_timing(
        mut bank: B,
        address: NodeAddress,
        now: I,
        settle: core::time::Duration,
        interval: core::time::Duration,
    ) -> Self {
        let initial = bank.sample();
        Self {
            bank,
            filter: DebounceFilter::with_settle(initial, now, settle),
            scheduler: BroadcastScheduler::with_interval(interval),
            address,
        }
    }

    /// Samples, debounces, and returns the status frame when one is due.
    ///
    /// The broadcast cadence advances whether or not the caller manages to
    /// transmit the returned frame.
    pub fn poll(&mut self, now: I) -> Option<BusFrame> {
        let raw = self.bank.sample();
        let stable = self.filter.update(raw, now);

        if self.scheduler.poll(now) {
            Some(status_frame(stable, self.address))
        } else {
            None
        }
    }

    /// Most recent debounced state.
    #[must_use]
    pub const fn stable(&self) -> SensorBitfield {
        self.filter.stable()
    }

    /// Address the loop stamps onto status frames.
    #[must_use]
    pub const fn address(&self) -> NodeAddress {
        self.address
    }
}
