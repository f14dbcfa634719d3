//! The node's main loop: sample, debounce, broadcast, and handle control
//! frames.
//!
//! Control handling happens inline between ticks, so a blocking update
//! window naturally pauses broadcasting; received frames queue up behind
//! it and drain once the window closes.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Ticker};

use node_core::control::ControlHandler;
use node_core::diagnostics::{DiagnosticEventKind, DiagnosticsRecorder};
use node_core::frame::FrameSink;
use node_core::indicator::{IndicatorColor, StatusIndicator};
use node_core::node::SensorLoop;

use crate::hw::{FirmwareInstant, RgbLed, SwitchBank};
use crate::status;
use crate::storage::FlashStore;
use crate::update::WindowedUpdateGate;

use super::{CanSink, RxQueue};

/// Sampling period; well under the debounce settle window.
const SAMPLE_PERIOD: Duration = Duration::from_millis(10);

/// Ticks between heartbeat log lines (30s at the sampling period).
const HEARTBEAT_TICKS: u32 = 3_000;

#[embassy_executor::task]
pub async fn run(
    mut sensor_loop: SensorLoop<SwitchBank, FirmwareInstant>,
    mut handler: ControlHandler<FlashStore<'static>, WindowedUpdateGate>,
    mut led: RgbLed,
    mut sink: CanSink,
    queue: &'static RxQueue,
) -> ! {
    let mut diagnostics = DiagnosticsRecorder::<FirmwareInstant>::new();
    let mut ticker = Ticker::every(SAMPLE_PERIOD);
    let mut ticks: u32 = 0;

    loop {
        match select(ticker.next(), queue.receive()).await {
            Either::First(()) => {
                let now = FirmwareInstant::now();
                if let Some(frame) = sensor_loop.poll(now) {
                    let stable = sensor_loop.stable();
                    status::record_stable_state(stable);
                    match sink.send(&frame) {
                        Ok(()) => {
                            status::record_frame_sent();
                            diagnostics.record_status(
                                DiagnosticEventKind::StatusSent,
                                stable,
                                now,
                            );
                        }
                        Err(_) => {
                            status::record_tx_failure();
                            diagnostics.record_status(
                                DiagnosticEventKind::StatusTxFailed,
                                stable,
                                now,
                            );
                            defmt::warn!("can: tx queue full, status frame dropped");
                        }
                    }
                }
                ticks = ticks.wrapping_add(1);
                if ticks % HEARTBEAT_TICKS == 0 {
                    heartbeat();
                }
            }
            Either::Second(frame) => {
                handler.handle_frame(&frame, FirmwareInstant::now(), &mut diagnostics);
                let staging = handler.transfer_in_progress();
                status::set_transfer_active(staging);
                led.set(if staging {
                    IndicatorColor::Blue
                } else {
                    IndicatorColor::Off
                });
            }
        }
    }
}

fn heartbeat() {
    let (sent, failed) = status::broadcast_counters();
    defmt::info!(
        "node: sensors {=u16:010b}, sent {}, failed {}, transfer {}, update {}",
        status::stable_state().raw(),
        sent,
        failed,
        status::transfer_active(),
        status::update_active(),
    );
}
