use core::time::Duration;

use node_core::addressing::DeviceIdentity;
use node_core::control::ControlHandler;
use node_core::diagnostics::{DiagnosticEventKind, DiagnosticsRecorder, RejectionCause};
use node_core::frame::{BusFrame, PROVISIONING_ID};
use node_core::provisioning::wire::{
    TYPE_COMMIT, TYPE_PASSWORD_CHUNK, TYPE_SSID_CHUNK, TYPE_START,
};
use node_core::provisioning::{ChunkDrop, ChunkPolicy, StoredCredentials};
use node_core::store::{MemoryStore, load_credentials, save_credentials};
use node_core::time::MonotonicInstant;
use node_core::update::{UpdateOutcome, UpdateTransfer};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct TickInstant(u64);

impl MonotonicInstant for TickInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

#[derive(Default)]
struct IdleUpdater;

impl UpdateTransfer for IdleUpdater {
    type Error = ();

    fn wait_for_update(
        &mut self,
        _credentials: &StoredCredentials,
    ) -> Result<UpdateOutcome, Self::Error> {
        panic!("provisioning flows must not trigger an update");
    }
}

struct Fixture {
    handler: ControlHandler<MemoryStore, IdleUpdater>,
    diagnostics: DiagnosticsRecorder<TickInstant>,
    clock: u64,
}

impl Fixture {
    fn new() -> Self {
        Self::with_policy(ChunkPolicy::Permissive)
    }

    fn with_policy(policy: ChunkPolicy) -> Self {
        Self {
            handler: ControlHandler::with_policy(
                DeviceIdentity::new([0x12, 0x34, 0x56]),
                MemoryStore::new(),
                IdleUpdater,
                policy,
            ),
            diagnostics: DiagnosticsRecorder::new(),
            clock: 0,
        }
    }

    fn feed(&mut self, payload: &[u8]) -> DiagnosticEventKind {
        self.clock += 10;
        let frame = BusFrame::new(PROVISIONING_ID, payload).expect("payload fits one frame");
        self.handler
            .handle_frame(&frame, TickInstant(self.clock), &mut self.diagnostics);
        self.diagnostics
            .latest()
            .map(|record| record.event)
            .expect("every control frame records an event")
    }

    fn stored(&mut self) -> StoredCredentials {
        load_credentials(self.handler.store_mut()).expect("in-memory load cannot fail")
    }
}

fn checksum(ssid: &[u8], password: &[u8]) -> u8 {
    ssid.iter().chain(password).fold(0u8, |acc, byte| acc ^ byte)
}

#[test]
fn multi_frame_sequence_commits_and_persists() {
    let mut fixture = Fixture::new();

    assert_eq!(
        fixture.feed(&[TYPE_START, 10, 12]),
        DiagnosticEventKind::TransferStarted
    );
    fixture.feed(&[TYPE_SSID_CHUNK, b'H', b'o', b'u', b's', b'e', b'N', b'e']);
    fixture.feed(&[TYPE_SSID_CHUNK, b't', b'9', b'9']);
    fixture.feed(&[TYPE_PASSWORD_CHUNK, b's', b'u', b'p', b'e', b'r', b's', b'e']);
    fixture.feed(&[TYPE_PASSWORD_CHUNK, b'c', b'r', b'e', b't', b'1']);

    let event = fixture.feed(&[TYPE_COMMIT, checksum(b"HouseNet99", b"supersecret1")]);
    assert_eq!(event, DiagnosticEventKind::CommitCommitted);
    assert!(!fixture.handler.transfer_in_progress());

    let stored = fixture.stored();
    assert_eq!(stored.ssid.as_slice(), b"HouseNet99");
    assert_eq!(stored.password.as_slice(), b"supersecret1");
}

#[test]
fn rejected_commit_preserves_previous_credentials() {
    let mut fixture = Fixture::new();
    let previous = StoredCredentials::new(b"OLD", b"oldpass1").expect("values fit");
    save_credentials(fixture.handler.store_mut(), &previous).expect("seed store");

    fixture.feed(&[TYPE_START, 3, 4]);
    fixture.feed(&[TYPE_SSID_CHUNK, b'N', b'E', b'W']);
    // The second fragment never arrives; the declared password is short.
    let event = fixture.feed(&[TYPE_COMMIT, checksum(b"NEW", b"")]);

    assert_eq!(
        event,
        DiagnosticEventKind::CommitRejected(RejectionCause::PasswordLength)
    );
    assert_eq!(fixture.stored(), previous);
}

#[test]
fn checksum_mismatch_discards_the_transfer() {
    let mut fixture = Fixture::new();

    fixture.feed(&[TYPE_START, 3, 3]);
    fixture.feed(&[TYPE_SSID_CHUNK, b'N', b'E', b'T']);
    fixture.feed(&[TYPE_PASSWORD_CHUNK, b'p', b'w', b'1']);

    let event = fixture.feed(&[TYPE_COMMIT, checksum(b"NET", b"pw1") ^ 0x55]);
    assert_eq!(
        event,
        DiagnosticEventKind::CommitRejected(RejectionCause::Checksum)
    );
    assert!(!fixture.handler.transfer_in_progress());

    // A rejected commit requires a full resend, not a corrected commit.
    let event = fixture.feed(&[TYPE_COMMIT, checksum(b"NET", b"pw1")]);
    assert_eq!(event, DiagnosticEventKind::CommitIgnored);
}

#[test]
fn chunk_before_start_is_dropped() {
    let mut fixture = Fixture::new();

    let event = fixture.feed(&[TYPE_SSID_CHUNK, b'N', b'E', b'T']);
    assert_eq!(
        event,
        DiagnosticEventKind::ChunkIgnored(ChunkDrop::NoTransferInProgress)
    );
    assert!(fixture.stored().ssid.is_empty());
}

#[test]
fn repeated_start_reinitializes_the_transfer() {
    let mut fixture = Fixture::new();

    fixture.feed(&[TYPE_START, 5, 5]);
    fixture.feed(&[TYPE_SSID_CHUNK, b'A', b'B', b'C']);

    // A fresh start discards the staged bytes and adopts the new lengths.
    fixture.feed(&[TYPE_START, 2, 3]);
    fixture.feed(&[TYPE_SSID_CHUNK, b'X', b'Y']);
    fixture.feed(&[TYPE_PASSWORD_CHUNK, b'p', b'w', b'd']);

    let event = fixture.feed(&[TYPE_COMMIT, checksum(b"XY", b"pwd")]);
    assert_eq!(event, DiagnosticEventKind::CommitCommitted);
    assert_eq!(fixture.stored().ssid.as_slice(), b"XY");
}

#[test]
fn unknown_type_byte_is_malformed() {
    let mut fixture = Fixture::new();
    fixture.feed(&[TYPE_START, 3, 3]);

    let event = fixture.feed(&[0x09, 1, 2, 3]);
    assert_eq!(event, DiagnosticEventKind::MalformedControlFrame);
    // Garbage frames do not disturb the active transfer.
    assert!(fixture.handler.transfer_in_progress());
}

#[test]
fn truncated_start_is_malformed() {
    let mut fixture = Fixture::new();
    let event = fixture.feed(&[TYPE_START, 3]);
    assert_eq!(event, DiagnosticEventKind::MalformedControlFrame);
    assert!(!fixture.handler.transfer_in_progress());
}

#[test]
fn permissive_overflow_drops_the_chunk_whole() {
    let mut fixture = Fixture::new();
    // Declared ssid length exceeds the 32-byte buffer; permissive begin
    // accepts it and the overflowing chunk is skipped later.
    fixture.feed(&[TYPE_START, 40, 2]);
    for _ in 0..4 {
        let event = fixture.feed(&[TYPE_SSID_CHUNK, b'x', b'x', b'x', b'x', b'x', b'x', b'x']);
        assert!(matches!(event, DiagnosticEventKind::ChunkAccepted(_)));
    }

    let event = fixture.feed(&[TYPE_SSID_CHUNK, b'x', b'x', b'x', b'x', b'x', b'x', b'x']);
    assert_eq!(
        event,
        DiagnosticEventKind::ChunkIgnored(ChunkDrop::WouldOverflow)
    );
    assert!(fixture.handler.transfer_in_progress());
}

#[test]
fn surplus_bytes_past_the_declared_length_are_clamped() {
    let mut fixture = Fixture::new();
    fixture.feed(&[TYPE_START, 2, 3]);
    fixture.feed(&[TYPE_SSID_CHUNK, b'A', b'B', b'C', b'D']);
    fixture.feed(&[TYPE_PASSWORD_CHUNK, b'p', b'w', b'd']);

    let event = fixture.feed(&[TYPE_COMMIT, checksum(b"AB", b"pwd")]);
    assert_eq!(event, DiagnosticEventKind::CommitCommitted);
    assert_eq!(fixture.stored().ssid.as_slice(), b"AB");
}

#[test]
fn strict_policy_rejects_oversized_declarations() {
    let mut fixture = Fixture::with_policy(ChunkPolicy::Strict);

    let event = fixture.feed(&[TYPE_START, 33, 8]);
    assert_eq!(event, DiagnosticEventKind::TransferRejected);
    assert!(!fixture.handler.transfer_in_progress());
}
