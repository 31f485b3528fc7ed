//! ISP bridge firmware for RP2040.
//! Translates STK500v1 frames arriving over USB-CDC into AVR
//! serial-programming SPI transactions against a target on the ISP header.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
#[cfg(feature = "hw-spi")]
use embassy_rp::gpio::{Level, Output};
#[cfg(feature = "bitbang-spi")]
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::USB;
#[cfg(feature = "hw-spi")]
use embassy_rp::spi::{Config as SpiConfig, Spi};
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_time::{Delay, Duration, Timer};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config};
use isp_bridge_core::isp::AvrIspDriver;
use isp_bridge_core::Dispatcher;
#[cfg(feature = "bitbang-spi")]
use isp_bridge_core::SoftSpiLink;
use {defmt_rtt as _, panic_probe as _};

mod spi_link;
mod usb_handler;

#[cfg(feature = "hw-spi")]
use spi_link::HardwareSpiLink;
use usb_handler::UsbHandler;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("ISP bridge (RP2040) starting");

    let driver = Driver::new(p.USB, Irqs);

    let mut config = Config::new(0x2e8a, 0x000a);
    config.manufacturer = Some("isp-bridge");
    config.product = Some("AVR ISP Bridge (RP2040)");
    config.serial_number = Some("ISP-RP2040-001");
    config.max_power = 100;
    config.max_packet_size_0 = 64;
    config.composite_with_iads = true;

    let mut device_descriptor = [0; 256];
    let mut config_descriptor = [0; 256];
    let mut bos_descriptor = [0; 256];
    let mut control_buf = [0; 64];
    let mut state = State::new();

    let mut builder = Builder::new(
        driver,
        config,
        &mut device_descriptor,
        &mut config_descriptor,
        &mut bos_descriptor,
        &mut control_buf,
    );

    let class = CdcAcmClass::new(&mut builder, &mut state, 64);
    let usb = builder.build();
    spawner.spawn(usb_task(usb)).unwrap();

    #[cfg(feature = "hw-spi")]
    let link = {
        let reset = Output::new(p.PIN_17, Level::High);
        let spi_cfg = SpiConfig::default();
        let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_cfg);
        HardwareSpiLink::new(spi, reset)
    };

    #[cfg(feature = "bitbang-spi")]
    let link = {
        let mosi = Output::new(p.PIN_19, Level::Low);
        let sck = Output::new(p.PIN_18, Level::Low);
        let miso = Input::new(p.PIN_16, Pull::None);
        let reset = Output::new(p.PIN_17, Level::High);
        SoftSpiLink::new(mosi, sck, miso, reset, Delay)
    };

    let isp = AvrIspDriver::new(link, Delay);
    let dispatcher = Dispatcher::new(isp);
    let mut handler = UsbHandler::new(class, dispatcher);

    info!("USB initialized, waiting for host");

    loop {
        handler.class.wait_connection().await;
        info!("host connected");
        handler.handle_commands().await;
        info!("host disconnected");
        Timer::after(Duration::from_millis(10)).await;
    }
}

#[embassy_executor::task]
async fn usb_task(mut usb: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) -> ! {
    usb.run().await
}
