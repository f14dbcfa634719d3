//! Update-transfer collaborator seam.
//!
//! When a trigger frame names this device and credentials are on record,
//! the control handler hands off to an [`UpdateTransfer`]. The transfer
//! blocks the caller for up to the configured window; sensor broadcasting
//! is suspended for its duration.

use core::fmt;
use core::time::Duration;

use crate::provisioning::StoredCredentials;

/// How long an update transfer may block before giving up.
pub const DEFAULT_UPDATE_WINDOW: Duration = Duration::from_secs(180);

/// Terminal states of an update transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UpdateOutcome {
    /// The transfer finished within the window.
    Completed,
    /// The window elapsed without a completed transfer.
    TimedOut,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Completed => f.write_str("completed"),
            UpdateOutcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Transfer mechanism invoked after a matched trigger.
pub trait UpdateTransfer {
    /// Implementation-specific failure type.
    type Error: fmt::Debug;

    /// Runs the transfer to completion or timeout.
    ///
    /// Only called with a complete credential pair; implementations may
    /// assume both halves are non-empty.
    ///
    /// # Errors
    ///
    /// Returns the implementation's error when the transfer aborts for a
    /// reason other than the window elapsing.
    fn wait_for_update(
        &mut self,
        credentials: &StoredCredentials,
    ) -> Result<UpdateOutcome, Self::Error>;
}
