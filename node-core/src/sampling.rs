//! Raw sensor sampling into a packed bitfield.

use core::fmt;

use crate::addressing::PinLevel;

/// Number of sensor inputs populated on this board revision.
pub const SENSOR_COUNT: usize = 10;

/// Upper bound the 2-byte wire encoding can carry.
pub const SENSOR_CAPACITY: usize = 16;

/// Packed open/closed states with input *i* at bit *i*.
///
/// The inputs are normally-open switches on pull-ups: a high level means the
/// switch is open (asserted), a low level means it is held closed. Bit value
/// `1` therefore reads as "open".
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SensorBitfield(u16);

impl SensorBitfield {
    /// Wraps an already-packed value.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the packed representation.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Packs pin levels into a bitfield; levels beyond
    /// [`SENSOR_CAPACITY`] are ignored. Pure and idempotent.
    #[must_use]
    pub fn from_levels(levels: &[PinLevel]) -> Self {
        let mut bits = 0u16;
        for (index, level) in levels.iter().enumerate().take(SENSOR_CAPACITY) {
            if level.is_high() {
                bits |= 1 << index;
            }
        }
        Self(bits)
    }

    /// Returns `true` when input `index` is open.
    #[must_use]
    pub const fn is_open(self, index: usize) -> bool {
        index < SENSOR_CAPACITY && self.0 & (1 << index) != 0
    }

    /// Sets or clears one input bit.
    pub fn set(&mut self, index: usize, open: bool) {
        if index >= SENSOR_CAPACITY {
            return;
        }
        if open {
            self.0 |= 1 << index;
        } else {
            self.0 &= !(1 << index);
        }
    }
}

impl fmt::Display for SensorBitfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Source of raw sensor levels, implemented over GPIO or a simulation.
pub trait SensorBank {
    /// Samples every input and packs the levels into a bitfield.
    fn sample(&mut self) -> SensorBitfield;
}
