//! Hardware adapters binding `node-core` traits to the STM32 target.

use embassy_stm32::gpio::{Input, Output};
use embassy_time::Instant;

use node_core::addressing::{ADDRESS_BIT_COUNT, NodeAddress, PinLevel};
use node_core::indicator::{IndicatorColor, StatusIndicator};
use node_core::sampling::{SENSOR_COUNT, SensorBank, SensorBitfield};
use node_core::time::MonotonicInstant;

/// Embassy instant wrapper satisfying the core timing trait.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Captures the current monotonic time.
    #[must_use]
    pub fn now() -> Self {
        Self(Instant::now())
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl MonotonicInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> core::time::Duration {
        core::time::Duration::from_micros(
            self.0.as_micros().saturating_sub(earlier.0.as_micros()),
        )
    }
}

fn level_of(pin: &Input<'_>) -> PinLevel {
    if pin.is_high() {
        PinLevel::High
    } else {
        PinLevel::Low
    }
}

/// Reed-switch bank sampled from pulled-up GPIO inputs.
///
/// Switches short the pin to ground when the door is closed; a high level
/// reads as open.
pub struct SwitchBank {
    pins: [Input<'static>; SENSOR_COUNT],
}

impl SwitchBank {
    pub fn new(pins: [Input<'static>; SENSOR_COUNT]) -> Self {
        Self { pins }
    }
}

impl SensorBank for SwitchBank {
    fn sample(&mut self) -> SensorBitfield {
        let mut state = SensorBitfield::from_raw(0);
        for (index, pin) in self.pins.iter().enumerate() {
            state.set(index, pin.is_high());
        }
        state
    }
}

/// Reads the address selector pins once at boot.
///
/// The selectors are strapped to ground to set a bit; floating pins are
/// pulled high and read as zero.
pub fn resolve_address(pins: &[Input<'static>; ADDRESS_BIT_COUNT]) -> NodeAddress {
    NodeAddress::resolve([level_of(&pins[0]), level_of(&pins[1]), level_of(&pins[2])])
}

/// Common-cathode RGB LED driven from three push-pull outputs.
pub struct RgbLed {
    red: Output<'static>,
    green: Output<'static>,
    blue: Output<'static>,
}

impl RgbLed {
    pub fn new(red: Output<'static>, green: Output<'static>, blue: Output<'static>) -> Self {
        Self { red, green, blue }
    }
}

impl StatusIndicator for RgbLed {
    fn set(&mut self, color: IndicatorColor) {
        let (red, green, blue) = match color {
            IndicatorColor::Off => (false, false, false),
            IndicatorColor::Blue => (false, false, true),
            IndicatorColor::Green => (false, true, false),
            IndicatorColor::Red => (true, false, false),
        };
        set_level(&mut self.red, red);
        set_level(&mut self.green, green);
        set_level(&mut self.blue, blue);
    }
}

fn set_level(pin: &mut Output<'static>, on: bool) {
    if on {
        pin.set_high();
    } else {
        pin.set_low();
    }
}
