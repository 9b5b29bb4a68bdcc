// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

// Streaming LZSS encoder state machine.
//
// Phase names and shape grounded on the real Rust heatshrink port in
// other_examples/...qsib-cbie-embedded-heatshrink...heatshrink_encoder.rs,
// adapted from its bounded-output-slice `poll(&mut self, out_buf: &mut
// [u8])` API to an unbounded `Vec<u8>` accumulator (see SPEC_FULL.md
// §4.3), and from its hash-chain match finder to the naive scan in
// `window.rs`. The double-buffer window layout is grounded on
// campross::window::SlidingWindow.

use log::trace;

use crate::bitio::BitWriter;
use crate::config::Config;
use crate::window::find_longest_match;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    NotFull,
    Filled,
    Search,
    YieldTagBit,
    YieldLiteral,
    YieldBrIndex,
    YieldBrLength,
    SaveBacklog,
    FlushBits,
    Done,
}

/// Streaming LZSS encoder. Feed input with `sink`, drain compressed
/// output with `poll`, and call `finish` once to signal end-of-input.
pub struct Encoder {
    cfg: Config,
    window_size: usize,
    /// Double-width sliding window: `[0, window_size)` is the
    /// previously-emitted history, `[window_size, window_size +
    /// input_size)` is the currently-scanned input.
    window: Vec<u8>,
    input_size: usize,
    match_scan_index: usize,
    match_length: usize,
    match_distance: usize,
    finishing: bool,
    phase: Phase,
    bits: BitWriter,
}

impl Encoder {
    pub fn new(cfg: Config) -> Encoder {
        let window_size = cfg.window_size();
        Encoder {
            cfg,
            window_size,
            window: vec![0u8; 2 * window_size],
            input_size: 0,
            match_scan_index: 0,
            match_length: 0,
            match_distance: 0,
            finishing: false,
            phase: Phase::NotFull,
            bits: BitWriter::new(),
        }
    }

    /// Copy as many bytes from `data` as fit into the unfilled half of
    /// the window. Returns the number of bytes actually taken; a
    /// result smaller than `data.len()` means the caller must `poll`
    /// before sinking the remainder.
    pub fn sink(&mut self, data: &[u8]) -> usize {
        if self.phase != Phase::NotFull || data.is_empty() {
            return 0;
        }
        let write_offset = self.window_size + self.input_size;
        let rem = self.window_size - self.input_size;
        let n = rem.min(data.len());
        self.window[write_offset..write_offset + n].copy_from_slice(&data[..n]);
        self.input_size += n;
        if n == rem {
            self.phase = Phase::Filled;
        }
        n
    }

    /// Advance the state machine, appending any produced output to
    /// `out`. Returns `true` if the encoder made progress and might
    /// produce more without further `sink`/`finish` calls, `false` if
    /// it is stuck waiting on more input (or finished).
    pub fn poll(&mut self, out: &mut Vec<u8>) -> bool {
        let before = out.len();
        loop {
            let phase = self.phase;
            match phase {
                Phase::NotFull | Phase::Done => break,
                Phase::Filled => self.phase = Phase::Search,
                Phase::Search => self.step_search(),
                Phase::YieldTagBit => self.step_yield_tag_bit(out),
                Phase::YieldLiteral => self.step_yield_literal(out),
                Phase::YieldBrIndex => self.step_yield_br_index(out),
                Phase::YieldBrLength => self.step_yield_br_length(out),
                Phase::SaveBacklog => self.step_save_backlog(),
                Phase::FlushBits => self.step_flush_bits(out),
            }
            if phase == self.phase {
                // A phase that did not transition (NotFull/Done handled
                // above) would loop forever; every other phase always
                // advances in one step since output is unbounded.
                break;
            }
        }
        out.len() != before
    }

    /// Signal end of input. Returns `true` once the encoder has
    /// nothing further to emit (subsequent `poll` calls are no-ops).
    pub fn finish(&mut self) -> bool {
        self.finishing = true;
        if self.phase == Phase::NotFull {
            self.phase = Phase::Filled;
        }
        self.phase == Phase::Done
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    fn step_search(&mut self) {
        let needed = if self.finishing {
            1
        } else {
            self.cfg.lookahead_size()
        };
        let remaining = self.input_size.saturating_sub(self.match_scan_index);
        if remaining < needed {
            self.phase = if self.finishing {
                Phase::FlushBits
            } else {
                Phase::SaveBacklog
            };
            return;
        }

        let head = self.window_size + self.match_scan_index;
        let end = self.window_size + self.input_size;
        match find_longest_match(&self.window, head, end, &self.cfg) {
            Some(m) => {
                trace!("encoder: match distance={} length={}", m.distance, m.length);
                self.match_distance = m.distance;
                self.match_length = m.length;
            }
            None => self.match_length = 0,
        }
        self.phase = Phase::YieldTagBit;
    }

    fn step_yield_tag_bit(&mut self, out: &mut Vec<u8>) {
        if self.match_length == 0 {
            self.bits.write_bit(out, true);
            self.phase = Phase::YieldLiteral;
        } else {
            self.bits.write_bit(out, false);
            self.phase = Phase::YieldBrIndex;
        }
    }

    fn step_yield_literal(&mut self, out: &mut Vec<u8>) {
        let byte = self.window[self.window_size + self.match_scan_index];
        self.bits.write_bits(out, byte as u32, 8);
        self.match_scan_index += 1;
        self.phase = Phase::Search;
    }

    fn step_yield_br_index(&mut self, out: &mut Vec<u8>) {
        let value = (self.match_distance - 1) as u32;
        self.bits.write_bits(out, value, self.cfg.window_sz2);
        self.phase = Phase::YieldBrLength;
    }

    fn step_yield_br_length(&mut self, out: &mut Vec<u8>) {
        let value = (self.match_length - self.cfg.min_match()) as u32;
        self.bits.write_bits(out, value, self.cfg.lookahead_sz2);
        self.match_scan_index += self.match_length;
        self.match_length = 0;
        self.phase = Phase::Search;
    }

    fn step_save_backlog(&mut self) {
        let msi = self.match_scan_index;
        self.window.copy_within(msi.., 0);
        self.input_size -= msi;
        self.match_scan_index = 0;
        trace!("encoder: save_backlog, {} bytes carried over", self.input_size);
        self.phase = Phase::NotFull;
    }

    fn step_flush_bits(&mut self, out: &mut Vec<u8>) {
        self.bits.flush(out);
        self.phase = Phase::Done;
        trace!("encoder: done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(cfg: Config, data: &[u8]) -> Vec<u8> {
        let mut enc = Encoder::new(cfg);
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let n = enc.sink(&data[offset..]);
            offset += n;
            while enc.poll(&mut out) {}
        }
        enc.finish();
        while enc.poll(&mut out) {}
        out
    }

    #[test]
    fn known_value_vector() {
        let cfg = Config::new(11, 4).unwrap();
        let out = encode_all(cfg, b"abcde");
        assert_eq!(out, vec![0xb0, 0xd8, 0xac, 0x76, 0x4b, 0x28]);
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let cfg = Config::default();
        assert_eq!(encode_all(cfg, b""), Vec::<u8>::new());
    }

    #[test]
    fn repeated_byte_uses_backreference() {
        let cfg = Config::new(11, 4).unwrap();
        let out = encode_all(cfg, b"aaaaaaaaaaaaaaaa");
        // A run this long must be shorter than 16 literal-coded bytes
        // (9 bits each = 18 bytes worth of bits).
        assert!(out.len() < 16);
    }

    #[test]
    fn parameter_sensitivity() {
        let data = b"A string with stuff in it";
        let a = encode_all(Config::new(8, 4).unwrap(), data);
        let b = encode_all(Config::new(11, 4).unwrap(), data);
        assert_ne!(a, b);
        let c = encode_all(Config::new(11, 4).unwrap(), data);
        let d = encode_all(Config::new(11, 8).unwrap(), data);
        assert_ne!(c, d);
    }

    #[test]
    fn streaming_equivalence_across_chunk_boundaries() {
        let cfg = Config::new(11, 4).unwrap();
        let data = b"the quick brown fox jumps over the lazy dog, the quick brown fox.";
        let whole = encode_all(cfg, data);

        let mut enc = Encoder::new(cfg);
        let mut out = Vec::new();
        for chunk in data.chunks(3) {
            let mut offset = 0;
            while offset < chunk.len() {
                let n = enc.sink(&chunk[offset..]);
                offset += n;
                while enc.poll(&mut out) {}
            }
        }
        enc.finish();
        while enc.poll(&mut out) {}
        assert_eq!(whole, out);
    }
}
