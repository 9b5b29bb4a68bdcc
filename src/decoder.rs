// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

// Streaming LZSS decoder state machine.
//
// Phase names and shape grounded on the real Rust heatshrink port in
// other_examples/...qsib-cbie-embedded-heatshrink...heatshrink_decoder.rs,
// simplified from its MSB/LSB-split field reads (needed there because a
// single `get_bits` call is limited to 8 bits at a time) to single
// `FieldAccumulator` reads of up to 32 bits, and from its fixed-size
// input buffer to an unbounded `VecDeque<u8>` fed by `sink`.
//
// The format has no end-of-stream sentinel (spec.md §4): the bit
// writer pads only the final partial byte with zero bits, so up to
// `MAX_PAD_BITS` trailing zero bits can transiently look like the
// start of a new tag once the real token stream ends. `is_done` stays
// lenient about this (matching the real heatshrink decoder's own
// `finish()`, which reports done purely on raw-input exhaustion).
// `check_truncation`, run once draining is complete, makes the
// distinction spec.md §7 requires: since no legitimate padding run can
// exceed `MAX_PAD_BITS`, a still-incomplete token that has consumed
// more bits than that cannot be padding and must be a genuinely
// truncated compressed stream, reported as `Error::Data`.

use std::collections::VecDeque;

use log::trace;

use crate::bitio::{BitReader, FieldAccumulator};
use crate::config::Config;
use crate::error::Error;

/// The bit writer pads only the final partial byte, so legitimate
/// trailing padding is never more than 7 bits.
const MAX_PAD_BITS: u32 = 7;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    TagBit,
    Literal,
    BackrefIndex,
    BackrefCount,
    Backref,
}

/// Streaming LZSS decoder. Feed compressed bytes with `sink`, drain
/// decompressed output with `poll`, and call `finish` once the
/// compressed stream is fully sunk.
pub struct Decoder {
    cfg: Config,
    window_size: usize,
    ring: Vec<u8>,
    /// Total bytes emitted so far; indexes into `ring` modulo `window_size`.
    head: usize,
    input: VecDeque<u8>,
    bitreader: BitReader,
    field: FieldAccumulator,
    phase: Phase,
    distance: usize,
    remaining: usize,
    finishing: bool,
    /// Bits consumed so far toward the current, not-yet-complete token
    /// (tag bit plus any fields already finished within it); reset to
    /// 0 whenever a token completes and the phase returns to `TagBit`.
    token_bits: u32,
}

impl Decoder {
    pub fn new(cfg: Config) -> Decoder {
        let window_size = cfg.window_size();
        Decoder {
            cfg,
            window_size,
            ring: vec![0u8; window_size],
            head: 0,
            input: VecDeque::new(),
            bitreader: BitReader::new(),
            field: FieldAccumulator::new(1),
            phase: Phase::TagBit,
            distance: 0,
            remaining: 0,
            finishing: false,
            token_bits: 0,
        }
    }

    /// Append compressed bytes. Never blocks, never rejects input.
    pub fn sink(&mut self, data: &[u8]) -> usize {
        self.input.extend(data.iter().copied());
        data.len()
    }

    /// Advance the state machine, appending any decompressed bytes to
    /// `out`. Returns whether any new output was produced this call.
    pub fn poll(&mut self, out: &mut Vec<u8>) -> bool {
        let before = out.len();
        loop {
            match self.phase {
                Phase::TagBit => match self.field.poll(&mut self.bitreader, &mut self.input) {
                    Some(bit) => {
                        self.token_bits = 1;
                        if bit != 0 {
                            self.phase = Phase::Literal;
                            self.field = FieldAccumulator::new(8);
                        } else {
                            self.phase = Phase::BackrefIndex;
                            self.field = FieldAccumulator::new(self.cfg.window_sz2);
                        }
                    }
                    None => break,
                },
                Phase::Literal => match self.field.poll(&mut self.bitreader, &mut self.input) {
                    Some(v) => {
                        self.emit(out, v as u8);
                        self.phase = Phase::TagBit;
                        self.field = FieldAccumulator::new(1);
                        self.token_bits = 0;
                    }
                    None => break,
                },
                Phase::BackrefIndex => match self.field.poll(&mut self.bitreader, &mut self.input) {
                    Some(v) => {
                        self.distance = v as usize + 1;
                        self.token_bits += self.cfg.window_sz2 as u32;
                        self.phase = Phase::BackrefCount;
                        self.field = FieldAccumulator::new(self.cfg.lookahead_sz2);
                    }
                    None => break,
                },
                Phase::BackrefCount => match self.field.poll(&mut self.bitreader, &mut self.input) {
                    Some(v) => {
                        self.remaining = v as usize + self.cfg.min_match();
                        trace!("decoder: backref distance={} length={}", self.distance, self.remaining);
                        self.token_bits += self.cfg.lookahead_sz2 as u32;
                        self.phase = Phase::Backref;
                    }
                    None => break,
                },
                Phase::Backref => {
                    while self.remaining > 0 {
                        let idx = (self.head + self.window_size - self.distance) % self.window_size;
                        let byte = self.ring[idx];
                        self.emit(out, byte);
                        self.remaining -= 1;
                    }
                    self.phase = Phase::TagBit;
                    self.field = FieldAccumulator::new(1);
                    self.token_bits = 0;
                }
            }
        }
        out.len() != before
    }

    /// Signal that no further compressed bytes are coming.
    pub fn finish(&mut self) {
        self.finishing = true;
    }

    /// True once `finish` has been called and every sunk byte has been
    /// consumed (whether or not it completed a final, truncated field).
    pub fn is_done(&self) -> bool {
        self.finishing && self.input.is_empty()
    }

    /// Once draining is complete, checks whether decoding stalled
    /// mid-token on more bits than trailing zero padding could ever
    /// supply (`MAX_PAD_BITS`). If so the stream was cut off before a
    /// real literal or back-reference field was fully written, which
    /// can only happen from genuine truncation, not padding.
    pub fn check_truncation(&self) -> Result<(), Error> {
        if self.finishing && self.input.is_empty() && self.phase != Phase::TagBit {
            let consumed = self.token_bits as u64 + self.field.bits_read() as u64;
            if consumed > MAX_PAD_BITS as u64 {
                return Err(Error::Data("compressed stream truncated mid-field"));
            }
        }
        Ok(())
    }

    fn emit(&mut self, out: &mut Vec<u8>, byte: u8) {
        out.push(byte);
        self.ring[self.head % self.window_size] = byte;
        self.head += 1;
    }
}
