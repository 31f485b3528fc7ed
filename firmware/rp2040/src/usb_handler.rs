//! Bridges the USB-CDC byte stream to the synchronous command dispatcher.
//!
//! Everything on this side of `read_packet`/`write_packet` is `async`;
//! everything past it — frame decode, ISP sequencing — is plain blocking
//! Rust, run to completion before the next USB packet is awaited.

use defmt::*;
use embassy_usb::class::cdc_acm::CdcAcmClass;
use embassy_usb::driver::Driver;
use embedded_hal::delay::DelayNs;
use isp_bridge_core::host_io::FixedByteSink;
use isp_bridge_core::spi_link::SpiLink;
use isp_bridge_core::Dispatcher;

const PACKET_SIZE: usize = 64;
/// Worst case: INSYNC + up to 256 READ_PAGE data bytes + OK.
const RESPONSE_CAPACITY: usize = 258;

pub struct UsbHandler<'d, D: Driver<'d>, L, Dl> {
    pub class: CdcAcmClass<'d, D>,
    dispatcher: Dispatcher<L, Dl>,
}

impl<'d, D: Driver<'d>, L: SpiLink, Dl: DelayNs> UsbHandler<'d, D, L, Dl> {
    pub fn new(class: CdcAcmClass<'d, D>, dispatcher: Dispatcher<L, Dl>) -> Self {
        Self { class, dispatcher }
    }

    pub async fn handle_commands(&mut self) {
        let mut buf = [0u8; PACKET_SIZE];
        loop {
            match self.class.read_packet(&mut buf).await {
                Ok(n) if n > 0 => self.service(&buf[..n]).await,
                Ok(_) => {}
                Err(_) => {
                    warn!("USB connection lost");
                    break;
                }
            }
        }
    }

    async fn service(&mut self, input: &[u8]) {
        let mut out = FixedByteSink::<RESPONSE_CAPACITY>::new();
        self.dispatcher.service(input, &mut out);
        for chunk in out.as_slice().chunks(PACKET_SIZE) {
            let _ = self.class.write_packet(chunk).await;
        }
    }
}
