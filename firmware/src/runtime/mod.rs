use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::bind_interrupts;
use embassy_stm32::can;
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::peripherals::FDCAN1;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;

use node_core::control::ControlHandler;
use node_core::frame::{BusFrame, FrameSink, SendError};
use node_core::node::SensorLoop;

use crate::hw::{self, FirmwareInstant, RgbLed, SwitchBank};
use crate::storage::FlashStore;
use crate::update::WindowedUpdateGate;

mod node_task;
mod rx_task;
mod tx_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Depth of the received-frame queue between the CAN reader and the node.
pub const RX_QUEUE_DEPTH: usize = 8;

/// Queue carrying received frames; control frames back up here while an
/// update window blocks the node task.
pub type RxQueue = Channel<ThreadModeRawMutex, BusFrame, RX_QUEUE_DEPTH>;

pub(super) static RX_QUEUE: RxQueue = Channel::new();

/// Depth of the outbound frame queue in front of the CAN transmitter.
pub const TX_QUEUE_DEPTH: usize = 4;

/// Queue carrying status frames toward the transmitter task.
pub type TxQueue = Channel<ThreadModeRawMutex, BusFrame, TX_QUEUE_DEPTH>;

pub(super) static TX_QUEUE: TxQueue = Channel::new();

/// Outbound half of the frame transport, backed by the transmit queue.
///
/// Delivery is best-effort: a full queue surfaces as
/// [`SendError::QueueFull`] and the frame is dropped, never retried.
pub struct CanSink {
    queue: &'static TxQueue,
}

impl CanSink {
    pub const fn new(queue: &'static TxQueue) -> Self {
        Self { queue }
    }
}

impl FrameSink for CanSink {
    fn send(&mut self, frame: &BusFrame) -> Result<(), SendError> {
        self.queue
            .try_send(frame.clone())
            .map_err(|_| SendError::QueueFull)
    }
}

bind_interrupts!(struct Irqs {
    TIM16_FDCAN_IT0 => can::IT0InterruptHandler<FDCAN1>;
    TIM17_FDCAN_IT1 => can::IT1InterruptHandler<FDCAN1>;
});

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let peripherals = hal::init(config);

    let pull_up = |pin| Input::new(pin, Pull::Up);
    let sensors = SwitchBank::new([
        pull_up(peripherals.PA0.into()),
        pull_up(peripherals.PA1.into()),
        pull_up(peripherals.PA2.into()),
        pull_up(peripherals.PA3.into()),
        pull_up(peripherals.PA4.into()),
        pull_up(peripherals.PA5.into()),
        pull_up(peripherals.PA6.into()),
        pull_up(peripherals.PA7.into()),
        pull_up(peripherals.PB0.into()),
        pull_up(peripherals.PB1.into()),
    ]);

    // Selector straps are read once; the address cannot change at runtime.
    let selectors = [
        Input::new(peripherals.PB4, Pull::Up),
        Input::new(peripherals.PB5, Pull::Up),
        Input::new(peripherals.PB6, Pull::Up),
    ];
    let address = hw::resolve_address(&selectors);
    defmt::info!(
        "node: address {} -> status frame 0x{:03X}",
        address.value(),
        address.frame_id()
    );

    let led = RgbLed::new(
        Output::new(peripherals.PB2, Level::Low, Speed::Low),
        Output::new(peripherals.PB3, Level::Low, Speed::Low),
        Output::new(peripherals.PB7, Level::Low, Speed::Low),
    );

    let mut configurator =
        can::CanConfigurator::new(peripherals.FDCAN1, peripherals.PA11, peripherals.PA12, Irqs);
    configurator.set_bitrate(250_000);
    let can = configurator.start(can::OperatingMode::NormalOperationMode);
    let (can_tx, can_rx, _properties) = can.split();

    let store = FlashStore::new(Flash::new_blocking(peripherals.FLASH));
    let identity = node_core::addressing::DeviceIdentity::new(device_fragment());
    let handler = ControlHandler::new(identity, store, WindowedUpdateGate::new());

    let sensor_loop = SensorLoop::new(sensors, address, FirmwareInstant::now());

    spawner
        .spawn(rx_task::run(can_rx, &RX_QUEUE))
        .expect("failed to spawn CAN receive task");
    spawner
        .spawn(tx_task::run(can_tx, &TX_QUEUE))
        .expect("failed to spawn CAN transmit task");
    spawner
        .spawn(node_task::run(
            sensor_loop,
            handler,
            led,
            CanSink::new(&TX_QUEUE),
            &RX_QUEUE,
        ))
        .expect("failed to spawn node task");

    core::future::pending::<()>().await;
}

/// Last three bytes of the MCU unique id, the identity update triggers
/// must name.
fn device_fragment() -> [u8; 3] {
    let uid = embassy_stm32::uid::uid();
    [uid[9], uid[10], uid[11]]
}
