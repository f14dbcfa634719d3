//! Drains the CAN peripheral into the shared frame queue.

use embassy_stm32::can::CanRx;
use embedded_can::{Frame as _, Id};

use node_core::frame::BusFrame;

use super::RxQueue;

#[embassy_executor::task]
pub async fn run(mut rx: CanRx<'static>, queue: &'static RxQueue) -> ! {
    loop {
        match rx.read().await {
            Ok(envelope) => {
                let Id::Standard(id) = envelope.frame.id() else {
                    // Extended ids are not part of the protocol.
                    continue;
                };
                let Ok(frame) = BusFrame::new(id.as_raw(), envelope.frame.data()) else {
                    continue;
                };
                if queue.try_send(frame).is_err() {
                    defmt::warn!("can: rx queue full, dropping frame");
                }
            }
            Err(_) => {
                defmt::warn!("can: bus error on receive");
            }
        }
    }
}
