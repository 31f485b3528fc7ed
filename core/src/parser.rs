//! C4 — the STK500v1 frame parser. Pull-based: bytes are fed in as they
//! arrive, and `try_parse` is called in a loop until it returns `None`
//! (no complete frame is available yet).

use crate::ring_buffer::RxAccum;
use crate::wire::{cmd, fixed_frame_len, EOP};

/// Capacity of the accumulator: comfortably larger than any single frame,
/// including a maximum-size PROG_PAGE.
const RX_CAPACITY: usize = 1024;

/// Largest payload a frame can carry: a PROG_PAGE header (3 bytes) plus up
/// to 256 data bytes.
pub const MAX_PAYLOAD: usize = 3 + 256;

pub struct Frame {
    pub cmd: u8,
    payload: [u8; MAX_PAYLOAD],
    len: usize,
}

impl Frame {
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len]
    }
}

pub enum ParseEvent {
    /// A complete, correctly-terminated frame.
    Frame(Frame),
    /// The frame at the head of the buffer wasn't terminated by `EOP`
    /// where expected; the parser has already resynced.
    NoSync,
}

pub struct FrameParser {
    rx: RxAccum<RX_CAPACITY>,
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            rx: RxAccum::new(),
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.feed(bytes);
    }

    /// Advances the decode loop by (at most) one event. Call repeatedly
    /// until it returns `None` to drain everything currently parseable.
    pub fn try_parse(&mut self) -> Option<ParseEvent> {
        loop {
            if self.rx.is_empty() {
                return None;
            }

            // Step 1: a stray EOP at the head is leftover desync noise.
            if self.rx.peek(0) == Some(EOP) {
                self.rx.drop_front(1);
                continue;
            }

            let command = self.rx.peek(0).unwrap();

            let total = if command == cmd::PROG_PAGE {
                if self.rx.len() < 4 {
                    return None;
                }
                let size_hi = self.rx.peek(1).unwrap() as usize;
                let size_lo = self.rx.peek(2).unwrap() as usize;
                let size = (size_hi << 8) | size_lo;
                if size > 256 {
                    self.rx.drop_front(1);
                    continue;
                }
                1 + 3 + size + 1
            } else {
                match fixed_frame_len(command) {
                    Some(n) => n,
                    None => {
                        // Unknown command byte: drop it silently, no frame
                        // is ever produced for it.
                        self.rx.drop_front(1);
                        continue;
                    }
                }
            };

            if self.rx.len() < total {
                return None;
            }

            if self.rx.peek(total - 1) != Some(EOP) {
                self.resync();
                return Some(ParseEvent::NoSync);
            }

            let payload_len = total - 2;
            let mut frame = Frame {
                cmd: command,
                payload: [0u8; MAX_PAYLOAD],
                len: payload_len,
            };
            for i in 0..payload_len {
                frame.payload[i] = self.rx.peek(1 + i).unwrap();
            }
            self.rx.drop_front(total);
            return Some(ParseEvent::Frame(frame));
        }
    }

    /// Drops up to and including the next EOP in the buffer, or just one
    /// byte if none is found.
    fn resync(&mut self) {
        for i in 0..self.rx.len() {
            if self.rx.peek(i) == Some(EOP) {
                self.rx.drop_front(i + 1);
                return;
            }
        }
        self.rx.drop_front(1);
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain(parser: &mut FrameParser) -> Vec<(u8, Vec<u8>)> {
        let mut frames = Vec::new();
        while let Some(event) = parser.try_parse() {
            if let ParseEvent::Frame(f) = event {
                frames.push((f.cmd, f.payload().to_vec()));
            }
        }
        frames
    }

    #[test]
    fn parses_a_fixed_length_frame() {
        let mut parser = FrameParser::new();
        parser.feed(&[cmd::GET_SYNC, EOP]);
        let frames = drain(&mut parser);
        assert_eq!(frames, vec![(cmd::GET_SYNC, vec![])]);
    }

    #[test]
    fn parses_across_multiple_feeds() {
        let mut parser = FrameParser::new();
        parser.feed(&[cmd::LOAD_ADDRESS, 0x10]);
        assert!(parser.try_parse().is_none());
        parser.feed(&[0x00, EOP]);
        let frames = drain(&mut parser);
        assert_eq!(frames, vec![(cmd::LOAD_ADDRESS, vec![0x10, 0x00])]);
    }

    #[test]
    fn parses_prog_page_with_size_prefix() {
        let mut parser = FrameParser::new();
        parser.feed(&[cmd::PROG_PAGE, 0x00, 0x04, b'F', 0xDE, 0xAD, 0xBE, 0xEF, EOP]);
        let frames = drain(&mut parser);
        assert_eq!(
            frames,
            vec![(
                cmd::PROG_PAGE,
                vec![0x00, 0x04, b'F', 0xDE, 0xAD, 0xBE, 0xEF]
            )]
        );
    }

    #[test]
    fn unknown_command_is_dropped_silently() {
        let mut parser = FrameParser::new();
        parser.feed(&[0xFF, 0xAA, 0xBB, cmd::GET_SYNC, EOP]);
        let frames = drain(&mut parser);
        assert_eq!(frames, vec![(cmd::GET_SYNC, vec![])]);
    }

    #[test]
    fn missing_eop_yields_nosync_and_resyncs() {
        let mut parser = FrameParser::new();
        // GET_SYNC expects total len 2; feeding a non-EOP second byte
        // triggers NOSYNC, then resync should land back on the next EOP.
        parser.feed(&[cmd::GET_SYNC, 0xAA, EOP]);
        let event = parser.try_parse();
        assert!(matches!(event, Some(ParseEvent::NoSync)));
        assert!(parser.try_parse().is_none());
    }

    #[test]
    fn prog_page_oversize_desyncs_by_one_byte() {
        let mut parser = FrameParser::new();
        // size = 0x0101 (257) is rejected; after dropping the cmd byte the
        // remaining bytes no longer start with PROG_PAGE.
        parser.feed(&[cmd::PROG_PAGE, 0x01, 0x01, b'F', EOP]);
        let frames = drain(&mut parser);
        assert!(frames.is_empty());
    }

    #[test]
    fn never_consumes_a_frame_without_trailing_eop_buffered() {
        let mut parser = FrameParser::new();
        parser.feed(&[cmd::GET_SYNC]);
        assert!(parser.try_parse().is_none());
    }

    proptest! {
        #[test]
        fn frame_length_law(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            // For any byte soup, the parser never emits a frame whose
            // last consumed byte isn't EOP — we can't observe the dropped
            // bytes directly, but every emitted Frame's payload plus
            // envelope must have come from a buffer ending in EOP, which
            // try_parse already guarantees structurally. This property
            // instead checks the parser never panics or loops forever on
            // arbitrary input.
            let mut parser = FrameParser::new();
            parser.feed(&bytes);
            let mut iterations = 0;
            while parser.try_parse().is_some() {
                iterations += 1;
                prop_assert!(iterations <= bytes.len() + 8);
            }
        }

        #[test]
        fn resync_eventually_reaches_a_trailing_valid_frame(
            garbage in proptest::collection::vec(
                any::<u8>().prop_filter("not EOP or a known command byte", |b| {
                    *b != EOP && fixed_frame_len(*b).is_none() && *b != cmd::PROG_PAGE
                }),
                0..32,
            ),
        ) {
            // Every garbage byte is neither EOP nor a recognized command,
            // so the decode loop drops each one silently (no frame, no
            // NOSYNC) before it ever reaches the real frame appended
            // below — resync never corrupts or swallows it.
            let mut parser = FrameParser::new();
            let mut stream = garbage;
            stream.push(cmd::GET_SYNC);
            stream.push(EOP);

            parser.feed(&stream);
            let frames = drain(&mut parser);
            prop_assert_eq!(frames, vec![(cmd::GET_SYNC, Vec::new())]);
        }
    }
}
