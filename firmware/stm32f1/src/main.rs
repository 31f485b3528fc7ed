//! ISP bridge firmware for STM32F103 ("Blue Pill").
//! Translates STK500v1 frames arriving over USB-CDC into AVR
//! serial-programming SPI transactions against a target on the ISP header.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::bind_interrupts;
#[cfg(feature = "hw-spi")]
use embassy_stm32::gpio::{Level, Output, Speed};
#[cfg(feature = "bitbang-spi")]
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::peripherals::USB;
#[cfg(feature = "hw-spi")]
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::usb::{Driver, InterruptHandler};
use embassy_time::Delay;
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
    USB_LP_CAN1_RX0 => InterruptHandler<USB>;
});

static mut DEVICE_DESCRIPTOR: [u8; 256] = [0; 256];
static mut CONFIG_DESCRIPTOR: [u8; 256] = [0; 256];
static mut BOS_DESCRIPTOR: [u8; 256] = [0; 256];
static mut CONTROL_BUF: [u8; 64] = [0; 64];
static mut STATE: Option<State> = None;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    info!("ISP bridge (STM32F1) starting");

    // SPI1 on PA5 (SCK), PA6 (MISO), PA7 (MOSI); PA4 drives target RESET.
    #[cfg(feature = "hw-spi")]
    let link = {
        let reset = Output::new(p.PA4, Level::High, Speed::VeryHigh);
        let spi_config = SpiConfig::default();
        let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
        HardwareSpiLink::new(spi, reset)
    };

    #[cfg(feature = "bitbang-spi")]
    let link = {
        let mosi = Output::new(p.PA7, Level::Low, Speed::VeryHigh);
        let sck = Output::new(p.PA5, Level::Low, Speed::VeryHigh);
        let miso = Input::new(p.PA6, Pull::None);
        let reset = Output::new(p.PA4, Level::High, Speed::VeryHigh);
        SoftSpiLink::new(mosi, sck, miso, reset, Delay)
    };

    let driver = Driver::new(p.USB, Irqs, p.PA12, p.PA11);

    let mut config = Config::new(0x2e8a, 0x000a);
    config.manufacturer = Some("isp-bridge");
    config.product = Some("AVR ISP Bridge (STM32F1)");
    config.serial_number = Some("ISP-STM32-001");
    config.max_power = 250;
    config.max_packet_size_0 = 64;
    config.composite_with_iads = true;

    let (device_descriptor, config_descriptor, bos_descriptor, control_buf, state) = unsafe {
        STATE = Some(State::new());
        (
            &mut DEVICE_DESCRIPTOR,
            &mut CONFIG_DESCRIPTOR,
            &mut BOS_DESCRIPTOR,
            &mut CONTROL_BUF,
            STATE.as_mut().unwrap(),
        )
    };

    let mut builder = Builder::new(
        driver,
        config,
        device_descriptor,
        config_descriptor,
        bos_descriptor,
        control_buf,
    );

    let class = CdcAcmClass::new(&mut builder, state, 64);
    let usb = builder.build();
    spawner.spawn(usb_task(usb)).unwrap();

    let isp = AvrIspDriver::new(link, Delay);
    let dispatcher = Dispatcher::new(isp);
    let mut handler = UsbHandler::new(class, dispatcher);

    info!("USB initialized");

    loop {
        handler.class.wait_connection().await;
        info!("host connected");
        handler.handle_commands().await;
        info!("host disconnected");
    }
}

#[embassy_executor::task]
async fn usb_task(mut usb: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) -> ! {
    usb.run().await
}
