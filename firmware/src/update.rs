//! Blocking update window for the firmware target.
//!
//! A matched trigger opens a fixed window during which the node stops
//! broadcasting and waits for the update service to push a new image.
//! Image transport and verification live in the bootloader; this gate
//! only keeps the node quiet and reports how the window closed.

use core::convert::Infallible;

use embassy_time::{Duration, Instant};

use node_core::provisioning::StoredCredentials;
use node_core::update::{DEFAULT_UPDATE_WINDOW, UpdateOutcome, UpdateTransfer};

use crate::status;

/// Holds the node in the update window for a fixed duration.
pub struct WindowedUpdateGate {
    window: Duration,
}

impl WindowedUpdateGate {
    /// Gate with the default three-minute window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            window: Duration::from_secs(DEFAULT_UPDATE_WINDOW.as_secs()),
        }
    }
}

impl Default for WindowedUpdateGate {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateTransfer for WindowedUpdateGate {
    type Error = Infallible;

    fn wait_for_update(
        &mut self,
        _credentials: &StoredCredentials,
    ) -> Result<UpdateOutcome, Self::Error> {
        status::set_update_active(true);
        defmt::info!(
            "update: window open for {}s",
            self.window.as_secs()
        );

        let deadline = Instant::now() + self.window;
        while Instant::now() < deadline {
            // The bootloader resets the MCU when an image lands, so the
            // window only ever closes by timing out.
            cortex_m::asm::nop();
        }

        status::set_update_active(false);
        defmt::info!("update: window elapsed without a handoff");
        Ok(UpdateOutcome::TimedOut)
    }
}
