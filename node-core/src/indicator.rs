//! Visual status indication seam.
//!
//! The firmware drives an RGB LED; the emulator prints transitions. The
//! core only decides *when* the indication changes.

/// Indicator states the control flow drives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndicatorColor {
    /// Idle, broadcasting normally.
    Off,
    /// A credential transfer is in progress.
    Blue,
    /// An update transfer is running.
    Green,
    /// The last store write or update attempt failed.
    Red,
}

/// Drives whatever indication hardware the host provides.
pub trait StatusIndicator {
    fn set(&mut self, color: IndicatorColor);
}
