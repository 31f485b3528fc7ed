//! RP2040 hardware-SPI back-end for the ISP link.
//!
//! Wraps a blocking `embassy_rp` SPI peripheral plus a RESET GPIO output,
//! implementing `isp_bridge_core::spi_link::SpiLink` the same way the
//! bit-banged back-end does so the dispatcher can't tell them apart.

use embassy_rp::gpio::Output;
use embassy_rp::spi::{Blocking, Spi};
use embassy_time::Delay;
use embedded_hal::delay::DelayNs;
use isp_bridge_core::spi_link::SpiLink;

pub struct HardwareSpiLink<'d, SPI: embassy_rp::spi::Instance> {
    spi: Spi<'d, SPI, Blocking>,
    reset: Output<'d>,
}

impl<'d, SPI: embassy_rp::spi::Instance> HardwareSpiLink<'d, SPI> {
    pub fn new(spi: Spi<'d, SPI, Blocking>, reset: Output<'d>) -> Self {
        Self { spi, reset }
    }
}

impl<'d, SPI: embassy_rp::spi::Instance> SpiLink for HardwareSpiLink<'d, SPI> {
    fn init(&mut self) {
        self.reset.set_high();
    }

    fn transfer(&mut self, tx: [u8; 4]) -> [u8; 4] {
        let mut rx = [0u8; 4];
        let _ = self.spi.blocking_transfer(&mut rx, &tx);
        rx
    }

    fn reset_assert(&mut self) {
        self.reset.set_low();
    }

    fn reset_release(&mut self) {
        self.reset.set_high();
    }

    fn reset_pulse(&mut self) {
        self.reset_assert();
        Delay.delay_ms(20);
        self.reset_release();
        Delay.delay_ms(20);
    }

    // RP2040's SPI clock divider is fixed at construction time; runtime
    // speed changes aren't supported on this back-end.
    fn set_speed(&mut self, _bit_half_period_us: u32) {}

    fn get_speed(&self) -> u32 {
        0
    }
}
