#![cfg_attr(not(test), no_std)]

//! Hardware-agnostic core of the USB-to-AVR-ISP programming bridge:
//! STK500v1 frame decode, AVR serial-programming sequencing, and the
//! static device-profile table, all independent of any board's USB or
//! SPI peripherals.

pub mod dispatcher;
pub mod host_io;
pub mod isp;
pub mod parser;
pub mod profile;
pub mod ring_buffer;
pub mod signature;
pub mod spi_link;
pub mod wire;

pub use dispatcher::Dispatcher;
pub use host_io::{ByteSink, FixedByteSink};
pub use isp::AvrIspDriver;
pub use parser::{Frame, FrameParser, ParseEvent};
pub use profile::{DeviceProfile, DEFAULT_PAGE_BYTES};
pub use signature::Signature;
pub use spi_link::{SoftSpiLink, SpiLink};
