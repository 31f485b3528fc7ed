//! C5 — the STK500v1 command dispatcher. Owns the programmer state,
//! drives the frame parser, and turns each decoded frame into one or more
//! AVR ISP operations plus a framed reply.

use crate::host_io::ByteSink;
use crate::isp::AvrIspDriver;
use crate::parser::{FrameParser, ParseEvent};
use crate::profile::{self, DEFAULT_PAGE_BYTES};
use crate::signature::Signature;
use crate::spi_link::SpiLink;
use crate::wire::{cmd, FAILED, INSYNC, NOSYNC, OK};
use embedded_hal::delay::DelayNs;

/// Largest data body PROG_PAGE/READ_PAGE ever carries, independent of the
/// detected device's page size.
const MAX_MEMTYPE_SIZE: usize = 256;

pub struct Dispatcher<L, D> {
    isp: AvrIspDriver<L, D>,
    parser: FrameParser,
    current_word_address: u32,
    in_programming_mode: bool,
    page_bytes: u16,
}

impl<L: SpiLink, D: DelayNs> Dispatcher<L, D> {
    pub fn new(isp: AvrIspDriver<L, D>) -> Self {
        Self {
            isp,
            parser: FrameParser::new(),
            current_word_address: 0,
            in_programming_mode: false,
            page_bytes: DEFAULT_PAGE_BYTES,
        }
    }

    pub fn in_programming_mode(&self) -> bool {
        self.in_programming_mode
    }

    pub fn current_word_address(&self) -> u32 {
        self.current_word_address
    }

    pub fn page_bytes(&self) -> u16 {
        self.page_bytes
    }

    pub fn erase_count(&self) -> u32 {
        self.isp.erase_count()
    }

    /// Feeds `input` to the frame parser, then drains every frame it can
    /// now produce, writing each one's complete response to `out` before
    /// moving on to the next — responses are never interleaved.
    pub fn service(&mut self, input: &[u8], out: &mut impl ByteSink) {
        self.parser.feed(input);
        while let Some(event) = self.parser.try_parse() {
            match event {
                ParseEvent::NoSync => out.write(&[NOSYNC]),
                ParseEvent::Frame(frame) => {
                    let cmd = frame.cmd;
                    let payload = frame.payload();
                    self.dispatch(cmd, payload, out);
                }
            }
        }
    }

    fn reply_ok(&mut self, out: &mut impl ByteSink, payload: &[u8]) {
        out.write(&[INSYNC]);
        if !payload.is_empty() {
            out.write(payload);
        }
        out.write(&[OK]);
    }

    fn reply_failed(&mut self, out: &mut impl ByteSink) {
        out.write(&[INSYNC, FAILED]);
    }

    fn dispatch(&mut self, command: u8, payload: &[u8], out: &mut impl ByteSink) {
        match command {
            cmd::GET_SYNC | cmd::SET_PARAMETER | cmd::SET_DEVICE | cmd::SET_DEVICE_EXT => {
                self.reply_ok(out, &[]);
            }
            cmd::GET_SIGN_ON => {
                self.reply_ok(out, b"AVR ISP");
            }
            cmd::GET_PARAMETER => {
                let value = match payload.first().copied() {
                    Some(0x80) => 0x02,
                    Some(0x81) => 0x01,
                    Some(0x82) => 0x12,
                    _ => 0x00,
                };
                self.reply_ok(out, &[value]);
            }
            cmd::ENTER_PROGMODE => self.handle_enter_progmode(out),
            cmd::LEAVE_PROGMODE => self.handle_leave_progmode(out),
            cmd::CHIP_ERASE => self.handle_chip_erase(out),
            cmd::CHECK_AUTOINC => self.reply_ok(out, &[0x01]),
            cmd::LOAD_ADDRESS => self.handle_load_address(payload, out),
            cmd::READ_SIGN => {
                let mut sig = [0u8; 3];
                self.isp.read_signature(&mut sig);
                self.reply_ok(out, &sig);
            }
            cmd::UNIVERSAL => self.handle_universal(payload, out),
            cmd::PROG_PAGE => self.handle_prog_page(payload, out),
            cmd::READ_PAGE => self.handle_read_page(payload, out),
            _ => self.reply_failed(out),
        }
    }

    fn handle_enter_progmode(&mut self, out: &mut impl ByteSink) {
        if self.isp.enter_programming_mode() {
            let mut sig = [0u8; 3];
            self.isp.read_signature(&mut sig);
            self.page_bytes = profile::lookup(&Signature(sig))
                .map(|p| p.page_bytes)
                .unwrap_or(DEFAULT_PAGE_BYTES);
            self.in_programming_mode = true;
            self.reply_ok(out, &[]);
        } else {
            self.reply_failed(out);
        }
    }

    fn handle_leave_progmode(&mut self, out: &mut impl ByteSink) {
        self.in_programming_mode = false;
        self.isp.leave_programming_mode();
        self.reply_ok(out, &[]);
    }

    /// Refuses to issue the chip-erase SPI command outside programming
    /// mode (invariant 4). `AvrIspDriver::chip_erase` also reports `false`
    /// once the erase ceiling is hit; that case replies FAILED too rather
    /// than a silent OK, so the host learns the session is done rather
    /// than assuming every further erase succeeded.
    fn handle_chip_erase(&mut self, out: &mut impl ByteSink) {
        if !self.in_programming_mode {
            self.reply_failed(out);
            return;
        }
        if self.isp.chip_erase() {
            self.reply_ok(out, &[]);
        } else {
            self.reply_failed(out);
        }
    }

    fn handle_load_address(&mut self, payload: &[u8], out: &mut impl ByteSink) {
        if payload.len() >= 2 {
            let lo = payload[0] as u32;
            let hi = payload[1] as u32;
            self.current_word_address = (hi << 8) | lo;
        }
        self.reply_ok(out, &[]);
    }

    fn handle_universal(&mut self, payload: &[u8], out: &mut impl ByteSink) {
        if payload.len() != 4 {
            self.reply_failed(out);
            return;
        }
        let raw = [payload[0], payload[1], payload[2], payload[3]];
        let result = self.isp.universal(raw);
        self.reply_ok(out, &[result]);
    }

    fn handle_prog_page(&mut self, payload: &[u8], out: &mut impl ByteSink) {
        if !self.in_programming_mode {
            self.reply_failed(out);
            return;
        }
        if payload.len() < 3 {
            self.reply_failed(out);
            return;
        }
        let size = ((payload[0] as usize) << 8) | payload[1] as usize;
        let memtype = payload[2];
        let data = &payload[3..];

        if memtype != b'F' && memtype != b'f' {
            self.reply_failed(out);
            return;
        }
        if size > (self.page_bytes as usize).min(MAX_MEMTYPE_SIZE) {
            self.reply_failed(out);
            return;
        }
        if data.len() != size {
            self.reply_failed(out);
            return;
        }

        let words = size / 2;
        for j in 0..words {
            let word = (data[2 * j + 1] as u16) << 8 | data[2 * j] as u16;
            self.isp.load_page_buffer_word(j as u16, word);
        }
        let commit_addr = (self.current_word_address & 0xFFFF) as u16;
        self.isp.commit_page(commit_addr);
        self.current_word_address = self.current_word_address.wrapping_add(words as u32);
        self.reply_ok(out, &[]);
    }

    fn handle_read_page(&mut self, payload: &[u8], out: &mut impl ByteSink) {
        if !self.in_programming_mode {
            self.reply_failed(out);
            return;
        }
        if payload.len() < 3 {
            self.reply_failed(out);
            return;
        }
        let size = ((payload[0] as usize) << 8) | payload[1] as usize;
        let memtype = payload[2];

        if (memtype != b'F' && memtype != b'f') || size == 0 || size > MAX_MEMTYPE_SIZE {
            self.reply_failed(out);
            return;
        }

        out.write(&[INSYNC]);
        for off in 0..size {
            let word_address = self.current_word_address + (off as u32 / 2);
            let word = self.isp.read_program_word((word_address & 0xFFFF) as u16);
            let byte = if off % 2 == 0 {
                (word & 0xFF) as u8
            } else {
                (word >> 8) as u8
            };
            out.write(&[byte]);
        }
        out.write(&[OK]);
        self.current_word_address = self
            .current_word_address
            .wrapping_add(((size + 1) / 2) as u32);
    }
}
