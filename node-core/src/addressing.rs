//! Boot-time identity: bus address selection and the hardware hostname.
//!
//! The node derives two immutable identifiers at startup. The bus address
//! comes from three configuration switches sampled once during init, and the
//! textual hostname comes from three hardware-identity bytes. Both feed the
//! frame matching logic: the address selects the outbound status identifier,
//! the hostname decides whether an update trigger is meant for this node.

use core::fmt::{self, Write as _};

use heapless::String;

use crate::frame::STATUS_BASE_ID;

/// Number of address-selection switches wired to the board.
pub const ADDRESS_BIT_COUNT: usize = 3;

/// Longest hostname the identity formatter can produce.
pub const MAX_HOSTNAME_LEN: usize = 16;

/// Prefix the node presents to the provisioning service.
pub const HOSTNAME_PREFIX: &str = "sensor-";

/// Logical level read from an input pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    /// Returns `true` for the low reference level.
    #[must_use]
    pub const fn is_low(self) -> bool {
        matches!(self, PinLevel::Low)
    }

    /// Returns `true` for the high reference level.
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, PinLevel::High)
    }
}

/// Bus address selected by the configuration switches, in `0..=7`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NodeAddress(u8);

impl NodeAddress {
    /// Derives the address from the switch levels, least-significant bit
    /// first. A switch that is on pulls its pin to ground, so a low level
    /// sets the bit; every combination is valid.
    #[must_use]
    pub fn resolve(levels: [PinLevel; ADDRESS_BIT_COUNT]) -> Self {
        let mut addr = 0u8;
        for (bit, level) in levels.iter().enumerate() {
            if level.is_low() {
                addr |= 1 << bit;
            }
        }
        Self(addr)
    }

    /// Returns the raw switch value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Outbound status identifier for this node within the reserved block.
    #[must_use]
    pub const fn frame_id(self) -> u16 {
        STATUS_BASE_ID + self.0 as u16
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr {} (id 0x{:02X})", self.0, self.frame_id())
    }
}

/// Three hardware-identity bytes plus the hostname derived from them.
///
/// Update triggers address a node by carrying the same three bytes; matching
/// is done by formatting the trigger fragment through the identical path and
/// comparing the resulting strings. The per-byte hex formatting is unpadded,
/// so a byte below `0x10` contributes a single digit. That quirk is part of
/// the wire contract and must not be "fixed" to zero-padded output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceIdentity {
    fragment: [u8; 3],
}

impl DeviceIdentity {
    /// Creates an identity from the node's own hardware bytes.
    #[must_use]
    pub const fn new(fragment: [u8; 3]) -> Self {
        Self { fragment }
    }

    /// Returns the raw identity bytes.
    #[must_use]
    pub const fn fragment(self) -> [u8; 3] {
        self.fragment
    }

    /// Formats the hostname this node presents to the provisioning service.
    #[must_use]
    pub fn hostname(self) -> String<MAX_HOSTNAME_LEN> {
        format_hostname(self.fragment)
    }

    /// Returns `true` when an update-trigger fragment addresses this node.
    #[must_use]
    pub fn matches_fragment(self, fragment: [u8; 3]) -> bool {
        self.hostname() == format_hostname(fragment)
    }
}

fn format_hostname(fragment: [u8; 3]) -> String<MAX_HOSTNAME_LEN> {
    let mut hostname = String::new();
    // Prefix plus six hex digits always fits MAX_HOSTNAME_LEN.
    let _ = write!(
        hostname,
        "{HOSTNAME_PREFIX}{:X}{:X}{:X}",
        fragment[0], fragment[1], fragment[2]
    );
    hostname
}
