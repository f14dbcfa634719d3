#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics expose the debounced sensor state, broadcast
//! counters, and provisioning activity without sharing mutable state
//! between tasks.

use node_core::sampling::SensorBitfield;
use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

/// Most recent debounced sensor bitfield.
static STABLE_BITS: AtomicU16 = AtomicU16::new(0);
/// Count of status frames queued for transmission.
static FRAMES_SENT: AtomicU32 = AtomicU32::new(0);
/// Count of status frames the transmit path refused or could not build.
static TX_FAILURES: AtomicU32 = AtomicU32::new(0);
/// Set while a credential transfer is staged.
static TRANSFER_ACTIVE: AtomicBool = AtomicBool::new(false);
/// Set for the duration of an update window; broadcasting is paused.
static UPDATE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Publishes the debounced sensor state.
pub fn record_stable_state(state: SensorBitfield) {
    STABLE_BITS.store(state.raw(), Ordering::Relaxed);
}

/// Returns the last published sensor state.
pub fn stable_state() -> SensorBitfield {
    SensorBitfield::from_raw(STABLE_BITS.load(Ordering::Relaxed))
}

/// Counts one status frame handed to the transmit queue.
pub fn record_frame_sent() {
    FRAMES_SENT.fetch_add(1, Ordering::Relaxed);
}

/// Counts one status frame the transmit path dropped.
pub fn record_tx_failure() {
    TX_FAILURES.fetch_add(1, Ordering::Relaxed);
}

/// Returns `(sent, failed)` broadcast counters.
pub fn broadcast_counters() -> (u32, u32) {
    (
        FRAMES_SENT.load(Ordering::Relaxed),
        TX_FAILURES.load(Ordering::Relaxed),
    )
}

/// Tracks whether a credential transfer is staged.
pub fn set_transfer_active(active: bool) {
    TRANSFER_ACTIVE.store(active, Ordering::Relaxed);
}

/// Returns `true` while a credential transfer is staged.
pub fn transfer_active() -> bool {
    TRANSFER_ACTIVE.load(Ordering::Relaxed)
}

/// Marks the start or end of an update window.
pub fn set_update_active(active: bool) {
    UPDATE_ACTIVE.store(active, Ordering::Relaxed);
}

/// Returns `true` while an update window is open.
pub fn update_active() -> bool {
    UPDATE_ACTIVE.load(Ordering::Relaxed)
}
