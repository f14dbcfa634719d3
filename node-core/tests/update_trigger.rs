use core::time::Duration;

use node_core::addressing::DeviceIdentity;
use node_core::control::{ControlDisposition, ControlHandler};
use node_core::diagnostics::{DiagnosticEventKind, DiagnosticsRecorder};
use node_core::frame::{BusFrame, UPDATE_TRIGGER_ID};
use node_core::provisioning::StoredCredentials;
use node_core::store::{MemoryStore, save_credentials};
use node_core::time::MonotonicInstant;
use node_core::update::{UpdateOutcome, UpdateTransfer};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct TickInstant(u64);

impl MonotonicInstant for TickInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

struct ScriptedUpdater {
    outcome: Result<UpdateOutcome, &'static str>,
    invocations: usize,
}

impl ScriptedUpdater {
    fn completing() -> Self {
        Self {
            outcome: Ok(UpdateOutcome::Completed),
            invocations: 0,
        }
    }

    fn timing_out() -> Self {
        Self {
            outcome: Ok(UpdateOutcome::TimedOut),
            invocations: 0,
        }
    }

    fn failing() -> Self {
        Self {
            outcome: Err("link dropped"),
            invocations: 0,
        }
    }
}

impl UpdateTransfer for ScriptedUpdater {
    type Error = &'static str;

    fn wait_for_update(
        &mut self,
        _credentials: &StoredCredentials,
    ) -> Result<UpdateOutcome, Self::Error> {
        self.invocations += 1;
        self.outcome
    }
}

fn provisioned_handler(
    fragment: [u8; 3],
    updater: ScriptedUpdater,
) -> ControlHandler<MemoryStore, ScriptedUpdater> {
    let mut store = MemoryStore::new();
    let credentials = StoredCredentials::new(b"HouseNet", b"hunter22").expect("values fit");
    save_credentials(&mut store, &credentials).expect("seed store");
    ControlHandler::new(DeviceIdentity::new(fragment), store, updater)
}

fn trigger(fragment: &[u8]) -> BusFrame {
    BusFrame::new(UPDATE_TRIGGER_ID, fragment).expect("payload fits one frame")
}

fn events(diagnostics: &DiagnosticsRecorder<TickInstant>) -> Vec<DiagnosticEventKind> {
    diagnostics
        .oldest_first()
        .map(|record| record.event)
        .collect()
}

#[test]
fn matching_fragment_starts_the_handoff() {
    let mut handler = provisioned_handler([0xAB, 0x01, 0x23], ScriptedUpdater::completing());
    let mut diagnostics = DiagnosticsRecorder::new();

    let disposition =
        handler.handle_frame(&trigger(&[0xAB, 0x01, 0x23]), TickInstant(0), &mut diagnostics);

    assert_eq!(disposition, ControlDisposition::Handled);
    assert_eq!(
        events(&diagnostics),
        vec![
            DiagnosticEventKind::TriggerMatched,
            DiagnosticEventKind::UpdateFinished(UpdateOutcome::Completed),
        ]
    );
}

#[test]
fn foreign_fragment_is_ignored() {
    let mut handler = provisioned_handler([0xAB, 0x01, 0x23], ScriptedUpdater::completing());
    let mut diagnostics = DiagnosticsRecorder::new();

    handler.handle_frame(&trigger(&[0xAB, 0x01, 0x24]), TickInstant(0), &mut diagnostics);

    assert_eq!(events(&diagnostics), vec![DiagnosticEventKind::TriggerIgnored]);
    assert_eq!(handler.updater().invocations, 0);
}

#[test]
fn empty_store_skips_the_handoff() {
    let mut handler = ControlHandler::new(
        DeviceIdentity::new([0x10, 0x20, 0x30]),
        MemoryStore::new(),
        ScriptedUpdater::completing(),
    );
    let mut diagnostics = DiagnosticsRecorder::new();

    handler.handle_frame(&trigger(&[0x10, 0x20, 0x30]), TickInstant(0), &mut diagnostics);

    assert_eq!(
        events(&diagnostics),
        vec![
            DiagnosticEventKind::TriggerMatched,
            DiagnosticEventKind::UpdateSkippedNoCredentials,
        ]
    );
    assert_eq!(handler.updater().invocations, 0);
}

#[test]
fn timeout_is_a_terminal_outcome() {
    let mut handler = provisioned_handler([0x01, 0x02, 0x03], ScriptedUpdater::timing_out());
    let mut diagnostics: DiagnosticsRecorder<TickInstant> = DiagnosticsRecorder::new();

    handler.handle_frame(&trigger(&[0x01, 0x02, 0x03]), TickInstant(0), &mut diagnostics);

    assert_eq!(
        diagnostics.latest().map(|record| record.event),
        Some(DiagnosticEventKind::UpdateFinished(UpdateOutcome::TimedOut))
    );
}

#[test]
fn updater_error_is_recorded() {
    let mut handler = provisioned_handler([0x01, 0x02, 0x03], ScriptedUpdater::failing());
    let mut diagnostics: DiagnosticsRecorder<TickInstant> = DiagnosticsRecorder::new();

    handler.handle_frame(&trigger(&[0x01, 0x02, 0x03]), TickInstant(0), &mut diagnostics);

    assert_eq!(
        diagnostics.latest().map(|record| record.event),
        Some(DiagnosticEventKind::UpdateFailed)
    );
}

#[test]
fn truncated_trigger_is_malformed() {
    let mut handler = provisioned_handler([0x01, 0x02, 0x03], ScriptedUpdater::completing());
    let mut diagnostics = DiagnosticsRecorder::new();

    handler.handle_frame(&trigger(&[0x01, 0x02]), TickInstant(0), &mut diagnostics);

    assert_eq!(
        events(&diagnostics),
        vec![DiagnosticEventKind::MalformedControlFrame]
    );
    assert_eq!(handler.updater().invocations, 0);
}

#[test]
fn padded_trigger_uses_the_leading_bytes() {
    let mut handler = provisioned_handler([0x01, 0x02, 0x03], ScriptedUpdater::completing());
    let mut diagnostics: DiagnosticsRecorder<TickInstant> = DiagnosticsRecorder::new();

    handler.handle_frame(
        &trigger(&[0x01, 0x02, 0x03, 0x00, 0x00]),
        TickInstant(0),
        &mut diagnostics,
    );

    assert_eq!(
        diagnostics.oldest_first().next().map(|record| record.event),
        Some(DiagnosticEventKind::TriggerMatched)
    );
}
