//! C1 — the SPI/RESET interface the rest of the core depends on.
//!
//! `SpiLink` is the capability object both back-ends implement: a
//! hardware-peripheral variant (board-specific, lives in each firmware
//! crate) and the bit-banged [`SoftSpiLink`] below, which only needs
//! `embedded-hal` digital pins and is portable across any board. Neither
//! the ISP driver nor the dispatcher observes which is in use.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Four-byte full-duplex SPI transaction, mode 0, MSB first, plus RESET
/// control and (for the bit-banged back-end) a runtime-adjustable bit
/// period.
pub trait SpiLink {
    /// Configures MOSI/SCK/RESET as outputs (SCK idle low, RESET released)
    /// and MISO as input.
    fn init(&mut self);

    /// Full-duplex 4-byte exchange. Any underlying hardware error is
    /// swallowed and surfaces as garbage received bytes rather than a
    /// propagated `Result`.
    fn transfer(&mut self, tx: [u8; 4]) -> [u8; 4];

    fn reset_assert(&mut self);
    fn reset_release(&mut self);

    /// 20 ms asserted, 20 ms released.
    fn reset_pulse(&mut self);

    /// No-op on a hardware-peripheral back-end; meaningful only when the
    /// bit period is software-timed.
    fn set_speed(&mut self, bit_half_period_us: u32);
    fn get_speed(&self) -> u32;
}

/// Software-timed, bit-banged mode-0 SPI over plain digital I/O. Produces
/// the same wire behaviour as a hardware peripheral back-end for 4-byte
/// transactions; usable on any board since it is generic over
/// `embedded-hal` pin traits rather than a concrete peripheral.
pub struct SoftSpiLink<MOSI, SCK, MISO, RST, D> {
    mosi: MOSI,
    sck: SCK,
    miso: MISO,
    reset: RST,
    delay: D,
    bit_half_period_us: u32,
}

impl<MOSI, SCK, MISO, RST, D> SoftSpiLink<MOSI, SCK, MISO, RST, D>
where
    MOSI: OutputPin,
    SCK: OutputPin,
    MISO: InputPin,
    RST: OutputPin,
    D: DelayNs,
{
    /// `bit_half_period_us` of 5 gives a ~100 kHz bit clock, well inside
    /// the range AVR targets tolerate during programming.
    pub fn new(mosi: MOSI, sck: SCK, miso: MISO, reset: RST, delay: D) -> Self {
        Self {
            mosi,
            sck,
            miso,
            reset,
            delay,
            bit_half_period_us: 5,
        }
    }

    fn transfer_byte(&mut self, byte: u8) -> u8 {
        let mut result = 0u8;
        for bit in (0..8).rev() {
            let out_bit = (byte >> bit) & 1 == 1;
            let _ = if out_bit {
                self.mosi.set_high()
            } else {
                self.mosi.set_low()
            };
            self.delay.delay_us(self.bit_half_period_us);

            let _ = self.sck.set_high();
            if self.miso.is_high().unwrap_or(false) {
                result |= 1 << bit;
            }
            self.delay.delay_us(self.bit_half_period_us);
            let _ = self.sck.set_low();
        }
        result
    }
}

impl<MOSI, SCK, MISO, RST, D> SpiLink for SoftSpiLink<MOSI, SCK, MISO, RST, D>
where
    MOSI: OutputPin,
    SCK: OutputPin,
    MISO: InputPin,
    RST: OutputPin,
    D: DelayNs,
{
    fn init(&mut self) {
        let _ = self.sck.set_low();
        let _ = self.mosi.set_low();
        let _ = self.reset.set_high();
    }

    fn transfer(&mut self, tx: [u8; 4]) -> [u8; 4] {
        let mut rx = [0u8; 4];
        for (i, &byte) in tx.iter().enumerate() {
            rx[i] = self.transfer_byte(byte);
        }
        rx
    }

    fn reset_assert(&mut self) {
        let _ = self.reset.set_low();
    }

    fn reset_release(&mut self) {
        let _ = self.reset.set_high();
    }

    fn reset_pulse(&mut self) {
        self.reset_assert();
        self.delay.delay_ms(20);
        self.reset_release();
        self.delay.delay_ms(20);
    }

    fn set_speed(&mut self, bit_half_period_us: u32) {
        self.bit_half_period_us = bit_half_period_us;
    }

    fn get_speed(&self) -> u32 {
        self.bit_half_period_us
    }
}
