//! STM32F1 hardware-SPI back-end for the ISP link: SPI1 (PA5/PA6/PA7)
//! plus a plain GPIO RESET line into the target's RESET pin.

use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::Spi;
use embassy_time::Delay;
use embedded_hal::delay::DelayNs;
use isp_bridge_core::spi_link::SpiLink;

pub struct HardwareSpiLink<'d, SPI: embassy_stm32::spi::Instance> {
    spi: Spi<'d, SPI, Blocking>,
    reset: Output<'d>,
}

impl<'d, SPI: embassy_stm32::spi::Instance> HardwareSpiLink<'d, SPI> {
    pub fn new(spi: Spi<'d, SPI, Blocking>, reset: Output<'d>) -> Self {
        Self { spi, reset }
    }
}

impl<'d, SPI: embassy_stm32::spi::Instance> SpiLink for HardwareSpiLink<'d, SPI> {
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

    fn set_speed(&mut self, _bit_half_period_us: u32) {}

    fn get_speed(&self) -> u32 {
        0
    }
}
