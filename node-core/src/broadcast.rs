//! Status frame encoding and broadcast cadence control.
//!
//! The node reports the debounced bitfield periodically rather than on
//! change: every [`DEFAULT_BROADCAST_INTERVAL`] the current state goes out,
//! whether or not it differs from the previous frame. Lost frames therefore
//! self-heal on the next tick without retry machinery.

use core::fmt;
use core::time::Duration;

use crate::addressing::NodeAddress;
use crate::frame::BusFrame;
use crate::sampling::SensorBitfield;
use crate::time::MonotonicInstant;

/// Default spacing between status frames.
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(200);

/// Fixed width of the status payload.
pub const STATUS_PAYLOAD_LEN: usize = 2;

/// Mask of the payload bits byte 1 may carry; the rest are reserved-zero.
const HIGH_BYTE_MASK: u8 = 0x03;

/// Encodes the stable bitfield into the fixed 2-byte status payload.
///
/// Byte 0 carries inputs 0-7, byte 1 carries inputs 8-9 in its low two bits
/// with the remaining six bits reserved as zero.
#[must_use]
pub fn encode_status(state: SensorBitfield) -> [u8; STATUS_PAYLOAD_LEN] {
    let [low, high] = state.raw().to_le_bytes();
    [low, high & HIGH_BYTE_MASK]
}

/// Decodes a status payload, enforcing the reserved-zero bits.
///
/// # Errors
///
/// Returns [`StatusDecodeError`] when the payload length is wrong or a
/// reserved bit is set.
pub fn decode_status(payload: &[u8]) -> Result<SensorBitfield, StatusDecodeError> {
    let [low, high] = payload else {
        return Err(StatusDecodeError::WrongLength(payload.len()));
    };
    if high & !HIGH_BYTE_MASK != 0 {
        return Err(StatusDecodeError::ReservedBitsSet(*high));
    }
    Ok(SensorBitfield::from_raw(
        u16::from(*low) | (u16::from(*high) << 8),
    ))
}

/// Builds the outbound status frame for this node.
#[must_use]
pub fn status_frame(state: SensorBitfield, address: NodeAddress) -> BusFrame {
    let payload = encode_status(state);
    BusFrame::new(address.frame_id(), &payload).expect("status payload fits one frame")
}

/// Errors raised while decoding a status payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusDecodeError {
    /// Payload is not exactly [`STATUS_PAYLOAD_LEN`] bytes.
    WrongLength(usize),
    /// One of the six reserved bits in byte 1 is set.
    ReservedBitsSet(u8),
}

impl fmt::Display for StatusDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusDecodeError::WrongLength(len) => {
                write!(f, "status payload has {len} bytes, expected 2")
            }
            StatusDecodeError::ReservedBitsSet(byte) => {
                write!(f, "reserved status bits set (byte 1 = 0x{byte:02X})")
            }
        }
    }
}

/// Decides when the next status frame is due.
///
/// A frame is due once the interval has elapsed since the previous emission,
/// independent of delivery outcome: a failed transmission does not reset or
/// advance anything beyond the emission timestamp itself.
#[derive(Copy, Clone, Debug)]
pub struct BroadcastScheduler<I> {
    interval: Duration,
    last_sent_at: Option<I>,
}

impl<I: MonotonicInstant> BroadcastScheduler<I> {
    /// Creates a scheduler with the default interval; the first poll is due
    /// immediately.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_interval(DEFAULT_BROADCAST_INTERVAL)
    }

    /// Creates a scheduler with an explicit interval.
    #[must_use]
    pub const fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_sent_at: None,
        }
    }

    /// Returns `true` when a frame is due at `now`, recording the emission.
    pub fn poll(&mut self, now: I) -> bool {
        let due = match self.last_sent_at {
            None => true,
            Some(previous) => now.saturating_duration_since(previous) >= self.interval,
        };
        if due {
            self.last_sent_at = Some(now);
        }
        due
    }

    /// Returns the instant of the most recent emission, if any.
    #[must_use]
    pub const fn last_sent_at(&self) -> Option<I> {
        self.last_sent_at
    }

    /// Returns the configured interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl<I: MonotonicInstant> Default for BroadcastScheduler<I> {
    fn default() -> Self {
        Self::new()
    }
}
