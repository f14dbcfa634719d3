//! Addressed bus frames and the transport seam.
//!
//! A frame is one identifier plus up to eight payload bytes, matching a
//! classic CAN data frame. The transceiver driver itself is a collaborator
//! behind [`FrameSink`]; this module only fixes the identifier map and the
//! payload container the rest of the crate works with.

use core::fmt;

use heapless::Vec;

/// Maximum payload bytes carried by one frame.
pub const MAX_FRAME_PAYLOAD: usize = 8;

/// Inbound identifier reserved for update-trigger notifications.
pub const UPDATE_TRIGGER_ID: u16 = 0x00;

/// Inbound identifier reserved for the credential-provisioning sub-protocol.
pub const PROVISIONING_ID: u16 = 0x01;

/// First outbound identifier of the status block (`STATUS_BASE_ID + address`).
pub const STATUS_BASE_ID: u16 = 0x0A;

/// Number of outbound identifiers reserved for sensor nodes.
pub const STATUS_ID_COUNT: u16 = 8;

/// One addressed unit of data exchanged on the bus.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BusFrame {
    pub id: u16,
    pub payload: Vec<u8, MAX_FRAME_PAYLOAD>,
}

impl BusFrame {
    /// Builds a frame from an identifier and payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLong`] when `payload` exceeds
    /// [`MAX_FRAME_PAYLOAD`] bytes.
    pub fn new(id: u16, payload: &[u8]) -> Result<Self, FrameError> {
        let mut frame = Self {
            id,
            payload: Vec::new(),
        };
        frame
            .payload
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLong)?;
        Ok(frame)
    }

    /// Returns the payload as a plain byte slice.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.payload
    }
}

/// Errors raised while constructing a frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameError {
    /// Payload exceeds [`MAX_FRAME_PAYLOAD`] bytes.
    PayloadTooLong,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::PayloadTooLong => f.write_str("payload exceeds one bus frame"),
        }
    }
}

/// Delivery failure reported by the frame transport.
///
/// The transport is best-effort: a failed transmission is recorded as a
/// diagnostic and the next scheduled broadcast naturally resends the current
/// state, so no retry machinery exists anywhere in this crate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SendError {
    /// Transmit queue had no free slot.
    QueueFull,
    /// The bus did not acknowledge the frame in time.
    Nack,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::QueueFull => f.write_str("transmit queue full"),
            SendError::Nack => f.write_str("frame not acknowledged"),
        }
    }
}

/// Outbound half of the frame transport collaborator.
pub trait FrameSink {
    /// Attempts to queue the frame for transmission.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] describing why delivery could not be started.
    fn send(&mut self, frame: &BusFrame) -> Result<(), SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_oversized_payload() {
        let bytes = [0u8; MAX_FRAME_PAYLOAD + 1];
        assert_eq!(
            BusFrame::new(0x0A, &bytes),
            Err(FrameError::PayloadTooLong)
        );
    }

    #[test]
    fn frame_preserves_identifier_and_bytes() {
        let frame = BusFrame::new(0x0B, &[0xAA, 0x01]).expect("two bytes fit");
        assert_eq!(frame.id, 0x0B);
        assert_eq!(frame.data(), &[0xAA, 0x01]);
    }
}
