// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

// Adapts the non-blocking decoder façade to `std::io::Read` + `Seek`,
// with seeking emulated by rewind-and-redecode since the underlying
// LZSS stream has no random-access structure of its own.
//
// Grounded on original_source/heatshrink/streams.py::DecompressReader
// (offset bookkeeping, rewind-on-backward-seek, read-and-discard to
// skip forward) and on the `Read`-wrapper shape of
// other_examples/...BurntSushi-rust-snappy__src-read.rs (a decoder
// driving `io::Read` by pulling raw chunks from an inner reader and
// buffering surplus decoded output between calls).

use std::io::{self, Read, Seek, SeekFrom};

use log::trace;

use crate::codec::Codec;
use crate::config::Config;
use crate::error::Error;

const CHUNK_SIZE: usize = 8192;

/// Presents a decompressed view of an underlying compressed stream as
/// an ordinary `Read + Seek` reader.
pub struct DecompressReader<R: Read + Seek> {
    inner: R,
    cfg: Config,
    decoder: Codec,
    eof: bool,
    /// Bytes consumed from `inner`.
    src_off: u64,
    /// Bytes emitted from the decoder so far.
    dec_off: u64,
    /// Total decoded size, once known (EOF reached at least once).
    size: Option<u64>,
    /// Decoded bytes produced but not yet returned to the caller.
    pending: Vec<u8>,
    pending_pos: usize,
}

impl<R: Read + Seek> DecompressReader<R> {
    pub fn new(inner: R, cfg: Config) -> DecompressReader<R> {
        DecompressReader {
            inner,
            cfg,
            decoder: Codec::decoder(cfg),
            eof: false,
            src_off: 0,
            dec_off: 0,
            size: None,
            pending: Vec::new(),
            pending_pos: 0,
        }
    }

    /// Discard the decoder state and hand back the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.eof = false;
        self.src_off = 0;
        self.dec_off = 0;
        self.decoder = Codec::decoder(self.cfg);
        self.pending.clear();
        self.pending_pos = 0;
        trace!("reader: rewound to start");
        Ok(())
    }

    /// Pull and decode one more chunk, appending to `pending`. Returns
    /// the number of decoded bytes produced (0 at EOF).
    fn advance(&mut self) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        let mut raw = vec![0u8; CHUNK_SIZE];
        let n = self.inner.read(&mut raw)?;
        let produced = if n > 0 {
            let out = self
                .decoder
                .fill(&raw[..n])
                .map_err(io::Error::from)?;
            self.src_off += n as u64;
            out
        } else {
            self.eof = true;
            let out = self.decoder.finish().map_err(io::Error::from)?;
            self.size = Some(self.dec_off + out.len() as u64);
            out
        };
        self.dec_off += produced.len() as u64;
        let count = produced.len();
        self.pending.extend(produced);
        Ok(count)
    }
}

impl<R: Read + Seek> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || (self.eof && self.pending_pos >= self.pending.len()) {
            return Ok(0);
        }
        while self.pending_pos >= self.pending.len() && !self.eof {
            self.advance()?;
        }
        let available = &self.pending[self.pending_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pending_pos += n;
        if self.pending_pos == self.pending.len() {
            self.pending.clear();
            self.pending_pos = 0;
        }
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for DecompressReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        // Probe seekability up front so a non-seekable inner stream
        // fails predictably rather than mid-rewind.
        self.inner
            .seek(SeekFrom::Current(0))
            .map_err(|_| io::Error::from(Error::Unsupported("underlying stream is not seekable")))?;

        let position = |r: &Self| r.dec_off - (r.pending.len() - r.pending_pos) as u64;

        let target: i64 = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(n) => position(self) as i64 + n,
            SeekFrom::End(n) => {
                if self.size.is_none() {
                    let mut sink = [0u8; CHUNK_SIZE];
                    while self.read(&mut sink)? > 0 {}
                }
                self.size.unwrap_or(0) as i64 + n
            }
        };
        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "negative seek target"));
        }
        let target = target as u64;

        if target < position(self) {
            self.rewind()?;
        }

        let mut current = position(self);
        let mut discard = vec![0u8; CHUNK_SIZE];
        while current < target {
            let want = ((target - current) as usize).min(discard.len());
            let got = self.read(&mut discard[..want])?;
            if got == 0 {
                break;
            }
            current += got as u64;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn compressed(data: &[u8]) -> Vec<u8> {
        crate::encode(data, 11, 4).unwrap()
    }

    #[test]
    fn reads_decompressed_bytes_through_std_read() {
        let cfg = Config::new(11, 4).unwrap();
        let src = Cursor::new(compressed(b"the quick brown fox jumps over the lazy dog"));
        let mut r = DecompressReader::new(src, cfg);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn seek_forward_within_buffer() {
        let cfg = Config::new(11, 4).unwrap();
        let src = Cursor::new(compressed(b"0123456789"));
        let mut r = DecompressReader::new(src, cfg);
        let pos = r.seek(SeekFrom::Start(5)).unwrap();
        assert_eq!(pos, 5);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"56789");
    }

    #[test]
    fn seek_backward_rewinds_and_redecodes() {
        let cfg = Config::new(11, 4).unwrap();
        let src = Cursor::new(compressed(b"0123456789"));
        let mut r = DecompressReader::new(src, cfg);
        let mut head = [0u8; 8];
        r.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"01234567");
        r.seek(SeekFrom::Start(2)).unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"23456789");
    }

    #[test]
    fn seek_from_end_requires_full_decode() {
        let cfg = Config::new(11, 4).unwrap();
        let src = Cursor::new(compressed(b"0123456789"));
        let mut r = DecompressReader::new(src, cfg);
        let pos = r.seek(SeekFrom::End(-3)).unwrap();
        assert_eq!(pos, 7);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"789");
    }
}
