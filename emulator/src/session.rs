use core::time::Duration;
use std::cell::Cell;
use std::rc::Rc;

use node_core::addressing::{DeviceIdentity, NodeAddress, PinLevel};
use node_core::broadcast::decode_status;
use node_core::control::ControlHandler;
use node_core::diagnostics::{DiagnosticEventKind, DiagnosticsRecorder, EventId};
use node_core::frame::{BusFrame, FrameSink, PROVISIONING_ID, SendError, UPDATE_TRIGGER_ID};
use node_core::indicator::{IndicatorColor, StatusIndicator};
use node_core::node::SensorLoop;
use node_core::provisioning::wire::{
    TYPE_COMMIT, TYPE_PASSWORD_CHUNK, TYPE_SSID_CHUNK, TYPE_START,
};
use node_core::provisioning::{StoredCredentials, expected_checksum};
use node_core::sampling::{SENSOR_COUNT, SensorBank, SensorBitfield};
use node_core::store::{MemoryStore, load_credentials};
use node_core::time::MonotonicInstant;
use node_core::update::{UpdateOutcome, UpdateTransfer};

/// Identity fragment baked into the emulated device.
const FRAGMENT: [u8; 3] = [0x12, 0x34, 0x56];

/// Simulation step used when advancing the clock.
const TICK_STEP_MS: u64 = 10;

/// Payload bytes available to a chunk after its type byte.
const CHUNK_CAPACITY: usize = 7;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("status", "status                         - node state and counters"),
    ("open", "open <sensor>                  - open a door switch (0-9)"),
    ("close", "close <sensor>                 - close a door switch (0-9)"),
    ("tick", "tick [ms]                      - advance time (default 200ms)"),
    (
        "provision",
        "provision <ssid> <pw> [corrupt|drop-chunk] - run a credential transfer",
    ),
    ("trigger", "trigger <hex6>                 - send an update trigger"),
    ("store", "store                          - show persisted credentials"),
    ("diag", "diag [n]                       - show recent diagnostic events"),
    ("help", "help                           - this listing"),
];

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct SimInstant(u64);

impl MonotonicInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Sensor bank backed by a shared cell the session can poke.
struct SimBank(Rc<Cell<u16>>);

impl SensorBank for SimBank {
    fn sample(&mut self) -> SensorBitfield {
        SensorBitfield::from_raw(self.0.get())
    }
}

/// Frame transport that renders each delivered frame as an output line.
struct FrameJournal {
    clock: u64,
    lines: Vec<String>,
}

impl FrameSink for FrameJournal {
    fn send(&mut self, frame: &BusFrame) -> Result<(), SendError> {
        self.lines.push(describe_status_frame(self.clock, frame));
        Ok(())
    }
}

/// Indicator stand-in that remembers the last color for `status`.
struct PanelLight {
    current: IndicatorColor,
}

impl StatusIndicator for PanelLight {
    fn set(&mut self, color: IndicatorColor) {
        self.current = color;
    }
}

/// Updater that finishes instantly and remembers what it saw.
#[derive(Default)]
struct EmulatedUpdater {
    completions: usize,
    last_credentials: Option<StoredCredentials>,
}

impl UpdateTransfer for EmulatedUpdater {
    type Error = std::convert::Infallible;

    fn wait_for_update(
        &mut self,
        credentials: &StoredCredentials,
    ) -> Result<UpdateOutcome, Self::Error> {
        self.completions += 1;
        self.last_credentials = Some(credentials.clone());
        Ok(UpdateOutcome::Completed)
    }
}

pub struct Session {
    clock: u64,
    sensors: Rc<Cell<u16>>,
    sensor_loop: SensorLoop<SimBank, SimInstant>,
    handler: ControlHandler<MemoryStore, EmulatedUpdater>,
    diagnostics: DiagnosticsRecorder<SimInstant>,
    led: PanelLight,
    reported_events: EventId,
    frames_sent: usize,
}

impl Session {
    pub fn new(address_bits: u8) -> Self {
        let sensors = Rc::new(Cell::new(0));
        let address = address_from_bits(address_bits);
        let sensor_loop = SensorLoop::new(SimBank(Rc::clone(&sensors)), address, SimInstant(0));
        let handler = ControlHandler::new(
            DeviceIdentity::new(FRAGMENT),
            MemoryStore::new(),
            EmulatedUpdater::default(),
        );

        Self {
            clock: 0,
            sensors,
            sensor_loop,
            handler,
            diagnostics: DiagnosticsRecorder::new(),
            led: PanelLight {
                current: IndicatorColor::Off,
            },
            reported_events: 0,
            frames_sent: 0,
        }
    }

    pub fn handle_command(&mut self, line: &str) -> Vec<String> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Vec::new();
        };
        let args: Vec<&str> = parts.collect();

        match command.to_ascii_lowercase().as_str() {
            "help" => HELP_TOPICS
                .iter()
                .map(|(_, text)| (*text).to_string())
                .collect(),
            "status" => self.handle_status(),
            "open" => self.handle_switch(&args, true),
            "close" => self.handle_switch(&args, false),
            "tick" => self.handle_tick(&args),
            "provision" => self.handle_provision(&args),
            "trigger" => self.handle_trigger(&args),
            "store" => self.handle_store(),
            "diag" => self.handle_diag(&args),
            other => vec![format!("Unknown command `{other}`; try `help`.")],
        }
    }

    fn handle_status(&mut self) -> Vec<String> {
        let address = self.sensor_loop.address();
        let stable = self.sensor_loop.stable();
        let mut lines = vec![
            format!("clock: {}ms", self.clock),
            format!(
                "address: {} (status frame 0x{:03X})",
                address.value(),
                address.frame_id()
            ),
            format!("hostname: {}", self.handler.identity().hostname()),
            format!("frames sent: {}", self.frames_sent),
            format!(
                "transfer in progress: {}",
                self.handler.transfer_in_progress()
            ),
            format!("led: {:?}", self.led.current),
        ];
        let open: Vec<String> = (0..SENSOR_COUNT)
            .filter(|&index| stable.is_open(index))
            .map(|index| index.to_string())
            .collect();
        lines.push(if open.is_empty() {
            "sensors: all closed".to_string()
        } else {
            format!("sensors open: {}", open.join(", "))
        });
        lines
    }

    fn handle_switch(&mut self, args: &[&str], open: bool) -> Vec<String> {
        let Some(index) = args.first().and_then(|arg| arg.parse::<usize>().ok()) else {
            return vec!["Expected a sensor index (0-9).".to_string()];
        };
        if index >= SENSOR_COUNT {
            return vec![format!("Sensor {index} out of range (0-9).")];
        }

        let mut state = SensorBitfield::from_raw(self.sensors.get());
        state.set(index, open);
        self.sensors.set(state.raw());
        vec![format!(
            "sensor {index} {}",
            if open { "opened" } else { "closed" }
        )]
    }

    fn handle_tick(&mut self, args: &[&str]) -> Vec<String> {
        let millis = match args.first() {
            None => 200,
            Some(arg) => match arg.parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => return vec!["Expected a positive millisecond count.".to_string()],
            },
        };

        let mut journal = FrameJournal {
            clock: self.clock,
            lines: Vec::new(),
        };
        let target = self.clock + millis;
        while self.clock < target {
            self.clock = (self.clock + TICK_STEP_MS).min(target);
            if let Some(frame) = self.sensor_loop.poll(SimInstant(self.clock)) {
                journal.clock = self.clock;
                let event = match journal.send(&frame) {
                    Ok(()) => {
                        self.frames_sent += 1;
                        DiagnosticEventKind::StatusSent
                    }
                    Err(_) => DiagnosticEventKind::StatusTxFailed,
                };
                self.diagnostics.record_status(
                    event,
                    self.sensor_loop.stable(),
                    SimInstant(self.clock),
                );
            }
        }
        self.mark_events_reported();

        let mut lines = journal.lines;
        lines.push(format!("clock: {}ms", self.clock));
        lines
    }

    fn handle_provision(&mut self, args: &[&str]) -> Vec<String> {
        let (Some(ssid), Some(password)) = (args.first(), args.get(1)) else {
            return vec!["Usage: provision <ssid> <password> [corrupt|drop-chunk]".to_string()];
        };
        let mode = args.get(2).copied().unwrap_or("");
        let corrupt = mode.eq_ignore_ascii_case("corrupt");
        let drop_chunk = mode.eq_ignore_ascii_case("drop-chunk");

        let ssid = ssid.as_bytes();
        let password = password.as_bytes();
        if ssid.len() > 32 || password.len() > 63 {
            return vec!["ssid is limited to 32 bytes, password to 63.".to_string()];
        }

        let mut frames = Vec::new();
        frames.push(start_frame(ssid.len(), password.len()));
        let mut ssid_chunks = chunk_frames(TYPE_SSID_CHUNK, ssid);
        if drop_chunk {
            // Simulate a lost frame: the last ssid chunk never arrives.
            ssid_chunks.pop();
        }
        frames.extend(ssid_chunks);
        frames.extend(chunk_frames(TYPE_PASSWORD_CHUNK, password));

        let mut checksum = expected_checksum(ssid, password);
        if corrupt {
            checksum ^= 0x55;
        }
        frames.push(
            BusFrame::new(PROVISIONING_ID, &[TYPE_COMMIT, checksum])
                .expect("commit payload fits one frame"),
        );

        for frame in &frames {
            self.feed(frame);
        }
        self.drain_events()
    }

    fn handle_trigger(&mut self, args: &[&str]) -> Vec<String> {
        let Some(fragment) = args.first().and_then(|arg| parse_fragment(arg)) else {
            return vec!["Expected six hex digits, e.g. `trigger 123456`.".to_string()];
        };

        let frame = BusFrame::new(UPDATE_TRIGGER_ID, &fragment)
            .expect("trigger payload fits one frame");
        self.feed(&frame);

        let mut lines = self.drain_events();
        if let Some(credentials) = &self.handler.updater().last_credentials {
            lines.push(format!(
                "update ran with ssid `{}` ({} total)",
                String::from_utf8_lossy(&credentials.ssid),
                self.handler.updater().completions
            ));
        }
        lines
    }

    fn handle_store(&mut self) -> Vec<String> {
        let credentials =
            load_credentials(self.handler.store_mut()).expect("in-memory load cannot fail");
        if credentials.ssid.is_empty() && credentials.password.is_empty() {
            return vec!["store: empty".to_string()];
        }
        vec![
            format!("ssid: {}", String::from_utf8_lossy(&credentials.ssid)),
            format!(
                "password: {} bytes{}",
                credentials.password.len(),
                if credentials.is_complete() {
                    ""
                } else {
                    " (incomplete pair)"
                }
            ),
        ]
    }

    fn handle_diag(&mut self, args: &[&str]) -> Vec<String> {
        let limit = args
            .first()
            .and_then(|arg| arg.parse::<usize>().ok())
            .unwrap_or(usize::MAX);

        let total = self.diagnostics.len();
        let lines: Vec<String> = self
            .diagnostics
            .oldest_first()
            .skip(total.saturating_sub(limit))
            .map(|record| {
                format!(
                    "#{} t={}ms {:?}",
                    record.id,
                    record.timestamp.0,
                    record.event
                )
            })
            .collect();
        if lines.is_empty() {
            return vec!["diag: no events".to_string()];
        }
        lines
    }

    fn feed(&mut self, frame: &BusFrame) {
        self.clock += 1;
        self.handler
            .handle_frame(frame, SimInstant(self.clock), &mut self.diagnostics);
        self.led.set(if self.handler.transfer_in_progress() {
            IndicatorColor::Blue
        } else {
            IndicatorColor::Off
        });
    }

    fn drain_events(&mut self) -> Vec<String> {
        let mark = self.reported_events;
        let lines: Vec<String> = self
            .diagnostics
            .oldest_first()
            .filter(|record| record.id >= mark)
            .map(|record| format!("t={}ms {:?}", record.timestamp.0, record.event))
            .collect();
        self.mark_events_reported();
        lines
    }

    fn mark_events_reported(&mut self) {
        if let Some(latest) = self.diagnostics.latest() {
            self.reported_events = latest.id + 1;
        }
    }
}

fn address_from_bits(bits: u8) -> NodeAddress {
    // Selector pins are active-low, LSB first.
    let level = |bit: u8| {
        if bits & (1 << bit) == 0 {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    };
    NodeAddress::resolve([level(0), level(1), level(2)])
}

fn start_frame(ssid_len: usize, password_len: usize) -> BusFrame {
    #[allow(clippy::cast_possible_truncation)]
    let payload = [TYPE_START, ssid_len as u8, password_len as u8];
    BusFrame::new(PROVISIONING_ID, &payload).expect("start payload fits one frame")
}

fn chunk_frames(kind: u8, value: &[u8]) -> Vec<BusFrame> {
    value
        .chunks(CHUNK_CAPACITY)
        .map(|chunk| {
            let mut payload = vec![kind];
            payload.extend_from_slice(chunk);
            BusFrame::new(PROVISIONING_ID, &payload).expect("chunk payload fits one frame")
        })
        .collect()
}

fn parse_fragment(arg: &str) -> Option<[u8; 3]> {
    if arg.len() != 6 || !arg.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let mut fragment = [0u8; 3];
    for (index, slot) in fragment.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&arg[index * 2..index * 2 + 2], 16).ok()?;
    }
    Some(fragment)
}

fn describe_status_frame(clock: u64, frame: &BusFrame) -> String {
    match decode_status(frame.data()) {
        Ok(state) => {
            let open: Vec<String> = (0..SENSOR_COUNT)
                .filter(|&index| state.is_open(index))
                .map(|index| index.to_string())
                .collect();
            format!(
                "t={clock}ms tx 0x{:03X} raw=0b{:010b} open=[{}]",
                frame.id,
                state.raw(),
                open.join(", ")
            )
        }
        Err(_) => format!("t={clock}ms tx 0x{:03X} (undecodable)", frame.id),
    }
}
