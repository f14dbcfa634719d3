//! Drains queued frames into the CAN transmitter.

use embassy_stm32::can::CanTx;
use embassy_stm32::can::frame::Frame as CanFrame;

use crate::status;

use super::TxQueue;

#[embassy_executor::task]
pub async fn run(mut tx: CanTx<'static>, queue: &'static TxQueue) -> ! {
    loop {
        let frame = queue.receive().await;
        match CanFrame::new_standard(frame.id, frame.data()) {
            Ok(can_frame) => {
                let _ = tx.write(&can_frame).await;
            }
            Err(_) => {
                status::record_tx_failure();
                defmt::warn!("can: could not build frame 0x{:03X}", frame.id);
            }
        }
    }
}
