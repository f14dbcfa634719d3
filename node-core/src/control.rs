//! Control-frame dispatch.
//!
//! The handler owns the credential transfer state machine plus the storage
//! and update collaborators, and routes the two control frame ids to them.
//! Every decision is recorded into the caller's diagnostics ring; malformed
//! frames never disturb transfer state or the store.

use crate::addressing::DeviceIdentity;
use crate::diagnostics::{
    DiagnosticEventKind, DiagnosticPayload, DiagnosticsRecorder, RejectionCause,
};
use crate::frame::{BusFrame, PROVISIONING_ID, UPDATE_TRIGGER_ID};
use crate::provisioning::{
    ChunkOutcome, ChunkPolicy, CommitOutcome, CredentialKind, CredentialTransfer,
    wire::{self, ProvisioningMessage},
};
use crate::store::{self, CredentialStore};
use crate::time::MonotonicInstant;
use crate::update::UpdateTransfer;

/// Whether a frame's id belonged to the control surface.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlDisposition {
    /// The frame carried a control id and was processed.
    Handled,
    /// The frame's id is not part of the control surface.
    NotControl,
}

/// Routes control frames to the transfer machine, store, and updater.
pub struct ControlHandler<S, U> {
    identity: DeviceIdentity,
    transfer: CredentialTransfer,
    store: S,
    updater: U,
}

impl<S, U> ControlHandler<S, U>
where
    S: CredentialStore,
    U: UpdateTransfer,
{
    /// Creates a handler with the permissive chunk policy.
    pub fn new(identity: DeviceIdentity, store: S, updater: U) -> Self {
        Self {
            identity,
            transfer: CredentialTransfer::new(),
            store,
            updater,
        }
    }

    /// Creates a handler with an explicit chunk policy.
    pub fn with_policy(identity: DeviceIdentity, store: S, updater: U, policy: ChunkPolicy) -> Self {
        Self {
            identity,
            transfer: CredentialTransfer::with_policy(policy),
            store,
            updater,
        }
    }

    /// Returns `true` while a credential transfer is active.
    #[must_use]
    pub const fn transfer_in_progress(&self) -> bool {
        self.transfer.in_progress()
    }

    /// Identity fragment this node answers to.
    #[must_use]
    pub const fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    /// Read access to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store.
    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Read access to the update collaborator.
    pub const fn updater(&self) -> &U {
        &self.updater
    }

    /// Dispatches one received frame.
    ///
    /// Frames whose id is outside the control surface are returned as
    /// [`ControlDisposition::NotControl`] without side effects. An update
    /// handoff blocks the caller until the transfer reaches a terminal
    /// state.
    pub fn handle_frame<I, const CAP: usize>(
        &mut self,
        frame: &BusFrame,
        now: I,
        diagnostics: &mut DiagnosticsRecorder<I, CAP>,
    ) -> ControlDisposition
    where
        I: MonotonicInstant,
    {
        match frame.id {
            UPDATE_TRIGGER_ID => {
                self.handle_trigger(frame.data(), now, diagnostics);
                ControlDisposition::Handled
            }
            PROVISIONING_ID => {
                self.handle_provisioning(frame.data(), now, diagnostics);
                ControlDisposition::Handled
            }
            _ => ControlDisposition::NotControl,
        }
    }

    fn handle_provisioning<I, const CAP: usize>(
        &mut self,
        payload: &[u8],
        now: I,
        diagnostics: &mut DiagnosticsRecorder<I, CAP>,
    ) where
        I: MonotonicInstant,
    {
        let message = match wire::decode_provisioning(payload) {
            Ok(message) => message,
            Err(_) => {
                diagnostics.record(
                    DiagnosticEventKind::MalformedControlFrame,
                    DiagnosticPayload::none(),
                    now,
                );
                return;
            }
        };

        match message {
            ProvisioningMessage::Start {
                ssid_len,
                password_len,
            } => match self.transfer.begin(ssid_len, password_len) {
                Ok(()) => {
                    diagnostics.record(
                        DiagnosticEventKind::TransferStarted,
                        self.transfer_payload(),
                        now,
                    );
                }
                Err(_) => {
                    diagnostics.record(
                        DiagnosticEventKind::TransferRejected,
                        DiagnosticPayload::none(),
                        now,
                    );
                }
            },
            ProvisioningMessage::SsidChunk(fragment) => {
                self.handle_chunk(CredentialKind::Ssid, fragment, now, diagnostics);
            }
            ProvisioningMessage::PasswordChunk(fragment) => {
                self.handle_chunk(CredentialKind::Password, fragment, now, diagnostics);
            }
            ProvisioningMessage::Commit { checksum } => {
                self.handle_commit(checksum, now, diagnostics);
            }
        }
    }

    fn handle_chunk<I, const CAP: usize>(
        &mut self,
        kind: CredentialKind,
        fragment: &[u8],
        now: I,
        diagnostics: &mut DiagnosticsRecorder<I, CAP>,
    ) where
        I: MonotonicInstant,
    {
        match self.transfer.append(kind, fragment) {
            Ok(ChunkOutcome::Accepted { .. }) => {
                diagnostics.record(
                    DiagnosticEventKind::ChunkAccepted(kind),
                    self.transfer_payload(),
                    now,
                );
            }
            Ok(ChunkOutcome::Dropped(drop)) => {
                diagnostics.record(
                    DiagnosticEventKind::ChunkIgnored(drop),
                    DiagnosticPayload::none(),
                    now,
                );
            }
            Err(_) => {
                diagnostics.record(
                    DiagnosticEventKind::TransferRejected,
                    DiagnosticPayload::none(),
                    now,
                );
            }
        }
    }

    fn handle_commit<I, const CAP: usize>(
        &mut self,
        checksum: u8,
        now: I,
        diagnostics: &mut DiagnosticsRecorder<I, CAP>,
    ) where
        I: MonotonicInstant,
    {
        match self.transfer.commit(checksum) {
            CommitOutcome::Committed(credentials) => {
                match store::save_credentials(&mut self.store, &credentials) {
                    Ok(()) => {
                        diagnostics.record(
                            DiagnosticEventKind::CommitCommitted,
                            DiagnosticPayload::none(),
                            now,
                        );
                    }
                    Err(_) => {
                        diagnostics.record(
                            DiagnosticEventKind::StoreWriteFailed,
                            DiagnosticPayload::none(),
                            now,
                        );
                    }
                }
            }
            CommitOutcome::Rejected(rejection) => {
                diagnostics.record(
                    DiagnosticEventKind::CommitRejected(RejectionCause::from(&rejection)),
                    DiagnosticPayload::none(),
                    now,
                );
            }
            CommitOutcome::Ignored => {
                diagnostics.record(
                    DiagnosticEventKind::CommitIgnored,
                    DiagnosticPayload::none(),
                    now,
                );
            }
        }
    }

    fn handle_trigger<I, const CAP: usize>(
        &mut self,
        payload: &[u8],
        now: I,
        diagnostics: &mut DiagnosticsRecorder<I, CAP>,
    ) where
        I: MonotonicInstant,
    {
        let fragment = match wire::decode_update_trigger(payload) {
            Ok(fragment) => fragment,
            Err(_) => {
                diagnostics.record(
                    DiagnosticEventKind::MalformedControlFrame,
                    DiagnosticPayload::none(),
                    now,
                );
                return;
            }
        };

        if !self.identity.matches_fragment(fragment) {
            diagnostics.record(
                DiagnosticEventKind::TriggerIgnored,
                DiagnosticPayload::none(),
                now,
            );
            return;
        }

        diagnostics.record(
            DiagnosticEventKind::TriggerMatched,
            DiagnosticPayload::none(),
            now,
        );

        let credentials = match store::load_credentials(&mut self.store) {
            Ok(credentials) => credentials,
            Err(_) => {
                diagnostics.record(
                    DiagnosticEventKind::StoreReadFailed,
                    DiagnosticPayload::none(),
                    now,
                );
                return;
            }
        };

        if !credentials.is_complete() {
            diagnostics.record(
                DiagnosticEventKind::UpdateSkippedNoCredentials,
                DiagnosticPayload::none(),
                now,
            );
            return;
        }

        match self.updater.wait_for_update(&credentials) {
            Ok(outcome) => {
                diagnostics.record_update_finished(outcome, None, now);
            }
            Err(_) => {
                diagnostics.record(
                    DiagnosticEventKind::UpdateFailed,
                    DiagnosticPayload::none(),
                    now,
                );
            }
        }
    }

    fn transfer_payload(&self) -> DiagnosticPayload {
        DiagnosticPayload::Transfer {
            ssid_received: saturate(self.transfer.received(CredentialKind::Ssid)),
            password_received: saturate(self.transfer.received(CredentialKind::Password)),
        }
    }
}

fn saturate(count: usize) -> u8 {
    u8::try_from(count).unwrap_or(u8::MAX)
}
