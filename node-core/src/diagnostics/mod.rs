//! Diagnostic event catalog shared by firmware and host targets.
//!
//! Every observable decision the node makes lands here as a strongly typed
//! event. Events carry compact numeric codes so they can travel over
//! constrained diagnostics channels, plus optional payload metadata for the
//! emulator's `diag` listing. The ring-buffer recorder is `no_std` and
//! allocation-free.

use core::time::Duration;

use heapless::{HistoryBuf, OldestOrdered};

use crate::provisioning::{ChunkDrop, CommitRejection, CredentialKind};
use crate::sampling::SensorBitfield;
use crate::time::MonotonicInstant;
use crate::update::UpdateOutcome;

/// Monotonically increasing identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of diagnostic entries retained in memory.
pub const DIAGNOSTICS_RING_CAPACITY: usize = 64;

/// Reason a commit frame was rejected, reduced to a transport code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RejectionCause {
    Checksum,
    SsidLength,
    PasswordLength,
}

impl From<&CommitRejection> for RejectionCause {
    fn from(rejection: &CommitRejection) -> Self {
        match rejection {
            CommitRejection::ChecksumMismatch { .. } => RejectionCause::Checksum,
            CommitRejection::SsidIncomplete { .. } => RejectionCause::SsidLength,
            CommitRejection::PasswordIncomplete { .. } => RejectionCause::PasswordLength,
        }
    }
}

/// Discriminated diagnostic events shared across all node targets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiagnosticEventKind {
    /// A status frame was handed to the bus.
    StatusSent,
    /// The sink refused a status frame; the tick was not retried.
    StatusTxFailed,
    /// A control frame carried an unknown type byte or was truncated.
    MalformedControlFrame,
    /// A start frame opened (or re-opened) a credential transfer.
    TransferStarted,
    /// A start frame declared lengths the buffers cannot hold.
    TransferRejected,
    /// A chunk's bytes were copied into the staging buffer.
    ChunkAccepted(CredentialKind),
    /// A chunk was discarded whole.
    ChunkIgnored(ChunkDrop),
    /// A commit validated and the pair was persisted.
    CommitCommitted,
    /// A commit failed validation and the transfer was discarded.
    CommitRejected(RejectionCause),
    /// A commit arrived with no transfer in progress.
    CommitIgnored,
    /// A trigger named a different device.
    TriggerIgnored,
    /// A trigger named this device.
    TriggerMatched,
    /// A matched trigger found no complete credential pair on record.
    UpdateSkippedNoCredentials,
    /// An update transfer reached a terminal state.
    UpdateFinished(UpdateOutcome),
    /// An update transfer aborted with a collaborator error.
    UpdateFailed,
    /// Persisting a committed pair failed.
    StoreWriteFailed,
    /// Reading credentials back failed.
    StoreReadFailed,
    /// Decoded from an unknown transport code.
    Custom(u16),
}

impl DiagnosticEventKind {
    const STATUS_SENT_CODE: u16 = 0x0000;
    const STATUS_TX_FAILED_CODE: u16 = 0x0001;
    const MALFORMED_CONTROL_CODE: u16 = 0x0002;
    const TRANSFER_STARTED_CODE: u16 = 0x0003;
    const TRANSFER_REJECTED_CODE: u16 = 0x0004;
    const COMMIT_COMMITTED_CODE: u16 = 0x0005;
    const COMMIT_IGNORED_CODE: u16 = 0x0006;
    const TRIGGER_IGNORED_CODE: u16 = 0x0007;
    const TRIGGER_MATCHED_CODE: u16 = 0x0008;
    const UPDATE_SKIPPED_CODE: u16 = 0x0009;
    const UPDATE_FAILED_CODE: u16 = 0x000A;
    const STORE_WRITE_FAILED_CODE: u16 = 0x000B;
    const STORE_READ_FAILED_CODE: u16 = 0x000C;
    const CHUNK_ACCEPTED_BASE: u16 = 0x0010;
    const CHUNK_IGNORED_BASE: u16 = 0x0014;
    const COMMIT_REJECTED_BASE: u16 = 0x0018;
    const UPDATE_FINISHED_BASE: u16 = 0x001C;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            DiagnosticEventKind::StatusSent => Self::STATUS_SENT_CODE,
            DiagnosticEventKind::StatusTxFailed => Self::STATUS_TX_FAILED_CODE,
            DiagnosticEventKind::MalformedControlFrame => Self::MALFORMED_CONTROL_CODE,
            DiagnosticEventKind::TransferStarted => Self::TRANSFER_STARTED_CODE,
            DiagnosticEventKind::TransferRejected => Self::TRANSFER_REJECTED_CODE,
            DiagnosticEventKind::ChunkAccepted(kind) => {
                Self::CHUNK_ACCEPTED_BASE + credential_index(kind)
            }
            DiagnosticEventKind::ChunkIgnored(drop) => Self::CHUNK_IGNORED_BASE + drop_index(drop),
            DiagnosticEventKind::CommitCommitted => Self::COMMIT_COMMITTED_CODE,
            DiagnosticEventKind::CommitRejected(cause) => {
                Self::COMMIT_REJECTED_BASE + rejection_index(cause)
            }
            DiagnosticEventKind::CommitIgnored => Self::COMMIT_IGNORED_CODE,
            DiagnosticEventKind::TriggerIgnored => Self::TRIGGER_IGNORED_CODE,
            DiagnosticEventKind::TriggerMatched => Self::TRIGGER_MATCHED_CODE,
            DiagnosticEventKind::UpdateSkippedNoCredentials => Self::UPDATE_SKIPPED_CODE,
            DiagnosticEventKind::UpdateFinished(outcome) => {
                Self::UPDATE_FINISHED_BASE + outcome_index(outcome)
            }
            DiagnosticEventKind::UpdateFailed => Self::UPDATE_FAILED_CODE,
            DiagnosticEventKind::StoreWriteFailed => Self::STORE_WRITE_FAILED_CODE,
            DiagnosticEventKind::StoreReadFailed => Self::STORE_READ_FAILED_CODE,
            DiagnosticEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`Custom`].
    ///
    /// [`Custom`]: DiagnosticEventKind::Custom
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::STATUS_SENT_CODE => DiagnosticEventKind::StatusSent,
            Self::STATUS_TX_FAILED_CODE => DiagnosticEventKind::StatusTxFailed,
            Self::MALFORMED_CONTROL_CODE => DiagnosticEventKind::MalformedControlFrame,
            Self::TRANSFER_STARTED_CODE => DiagnosticEventKind::TransferStarted,
            Self::TRANSFER_REJECTED_CODE => DiagnosticEventKind::TransferRejected,
            Self::COMMIT_COMMITTED_CODE => DiagnosticEventKind::CommitCommitted,
            Self::COMMIT_IGNORED_CODE => DiagnosticEventKind::CommitIgnored,
            Self::TRIGGER_IGNORED_CODE => DiagnosticEventKind::TriggerIgnored,
            Self::TRIGGER_MATCHED_CODE => DiagnosticEventKind::TriggerMatched,
            Self::UPDATE_SKIPPED_CODE => DiagnosticEventKind::UpdateSkippedNoCredentials,
            Self::UPDATE_FAILED_CODE => DiagnosticEventKind::UpdateFailed,
            Self::STORE_WRITE_FAILED_CODE => DiagnosticEventKind::StoreWriteFailed,
            Self::STORE_READ_FAILED_CODE => DiagnosticEventKind::StoreReadFailed,
            value if (Self::CHUNK_ACCEPTED_BASE..Self::CHUNK_IGNORED_BASE).contains(&value) => {
                credential_from_index(value - Self::CHUNK_ACCEPTED_BASE)
                    .map_or(DiagnosticEventKind::Custom(value), |kind| {
                        DiagnosticEventKind::ChunkAccepted(kind)
                    })
            }
            value if (Self::CHUNK_IGNORED_BASE..Self::COMMIT_REJECTED_BASE).contains(&value) => {
                drop_from_index(value - Self::CHUNK_IGNORED_BASE)
                    .map_or(DiagnosticEventKind::Custom(value), |drop| {
                        DiagnosticEventKind::ChunkIgnored(drop)
                    })
            }
            value if (Self::COMMIT_REJECTED_BASE..Self::UPDATE_FINISHED_BASE).contains(&value) => {
                rejection_from_index(value - Self::COMMIT_REJECTED_BASE)
                    .map_or(DiagnosticEventKind::Custom(value), |cause| {
                        DiagnosticEventKind::CommitRejected(cause)
                    })
            }
            value
                if (Self::UPDATE_FINISHED_BASE..Self::UPDATE_FINISHED_BASE + 2)
                    .contains(&value) =>
            {
                outcome_from_index(value - Self::UPDATE_FINISHED_BASE)
                    .map_or(DiagnosticEventKind::Custom(value), |outcome| {
                        DiagnosticEventKind::UpdateFinished(outcome)
                    })
            }
            other => DiagnosticEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside diagnostic events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiagnosticPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Stable sensor state attached to a broadcast event.
    Status(SensorBitfield),
    /// Staging progress attached to transfer events.
    Transfer {
        ssid_received: u8,
        password_received: u8,
    },
    /// Wall time an update transfer ran before finishing.
    Update { ran_for: Option<Duration> },
}

impl DiagnosticPayload {
    /// Convenience constructor when no payload data is needed.
    #[must_use]
    pub const fn none() -> Self {
        DiagnosticPayload::None
    }
}

/// Diagnostic record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DiagnosticRecord<I>
where
    I: Copy,
{
    pub id: EventId,
    pub timestamp: I,
    pub event: DiagnosticEventKind,
    pub details: DiagnosticPayload,
}

/// Diagnostic ring buffer type alias.
pub type DiagnosticsRing<I, const CAPACITY: usize = DIAGNOSTICS_RING_CAPACITY> =
    HistoryBuf<DiagnosticRecord<I>, CAPACITY>;

/// Records diagnostic events into a fixed-size ring buffer.
pub struct DiagnosticsRecorder<I, const CAPACITY: usize = DIAGNOSTICS_RING_CAPACITY>
where
    I: Copy,
{
    ring: DiagnosticsRing<I, CAPACITY>,
    next_event_id: EventId,
}

impl<I, const CAPACITY: usize> DiagnosticsRecorder<I, CAPACITY>
where
    I: MonotonicInstant,
{
    /// Creates a recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Records an event with the supplied payload, returning its id.
    pub fn record(
        &mut self,
        event: DiagnosticEventKind,
        details: DiagnosticPayload,
        timestamp: I,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(DiagnosticRecord {
            id,
            timestamp,
            event,
            details,
        });

        id
    }

    /// Records a broadcast event with the state it carried.
    pub fn record_status(
        &mut self,
        event: DiagnosticEventKind,
        state: SensorBitfield,
        timestamp: I,
    ) -> EventId {
        self.record(event, DiagnosticPayload::Status(state), timestamp)
    }

    /// Records the terminal state of an update transfer.
    pub fn record_update_finished(
        &mut self,
        outcome: UpdateOutcome,
        started_at: Option<I>,
        timestamp: I,
    ) -> EventId {
        let ran_for = started_at.map(|start| timestamp.saturating_duration_since(start));
        self.record(
            DiagnosticEventKind::UpdateFinished(outcome),
            DiagnosticPayload::Update { ran_for },
            timestamp,
        )
    }

    /// Returns an iterator over the records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, DiagnosticRecord<I>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if any.
    pub fn latest(&self) -> Option<&DiagnosticRecord<I>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<I, const CAPACITY: usize> Default for DiagnosticsRecorder<I, CAPACITY>
where
    I: MonotonicInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

const fn credential_index(kind: CredentialKind) -> u16 {
    match kind {
        CredentialKind::Ssid => 0,
        CredentialKind::Password => 1,
    }
}

fn credential_from_index(index: u16) -> Option<CredentialKind> {
    match index {
        0 => Some(CredentialKind::Ssid),
        1 => Some(CredentialKind::Password),
        _ => None,
    }
}

const fn drop_index(drop: ChunkDrop) -> u16 {
    match drop {
        ChunkDrop::NoTransferInProgress => 0,
        ChunkDrop::WouldOverflow => 1,
    }
}

fn drop_from_index(index: u16) -> Option<ChunkDrop> {
    match index {
        0 => Some(ChunkDrop::NoTransferInProgress),
        1 => Some(ChunkDrop::WouldOverflow),
        _ => None,
    }
}

const fn rejection_index(cause: RejectionCause) -> u16 {
    match cause {
        RejectionCause::Checksum => 0,
        RejectionCause::SsidLength => 1,
        RejectionCause::PasswordLength => 2,
    }
}

fn rejection_from_index(index: u16) -> Option<RejectionCause> {
    match index {
        0 => Some(RejectionCause::Checksum),
        1 => Some(RejectionCause::SsidLength),
        2 => Some(RejectionCause::PasswordLength),
        _ => None,
    }
}

const fn outcome_index(outcome: UpdateOutcome) -> u16 {
    match outcome {
        UpdateOutcome::Completed => 0,
        UpdateOutcome::TimedOut => 1,
    }
}

fn outcome_from_index(index: u16) -> Option<UpdateOutcome> {
    match index {
        0 => Some(UpdateOutcome::Completed),
        1 => Some(UpdateOutcome::TimedOut),
        _ => None,
    }
}
