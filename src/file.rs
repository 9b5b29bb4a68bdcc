// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

// Buffered, mode-locked file wrapper composing `DecompressReader` (read
// mode) or a direct `Codec` encoder (write mode) over an owned or
// caller-supplied byte stream.
//
// Grounded on original_source/heatshrink/streams.py::EncodedFile for
// the overall responsibility split (mode checks, `RLock`-guarded
// methods, `peek`/`read1` semantics, write-then-close-encoder
// ordering, and the owned-vs-injected-stream close behavior); the
// `Box<dyn Stream>` type erasure is grounded on
// `other_examples/...Symphonia...media_source_stream.rs`'s `Box<dyn
// MediaSource>`. `from_stream` takes the stream by value (the
// idiomatic Rust way to wrap a reader/writer, see e.g.
// `campross::lzss2::Writer::new`), so a closed-over injected stream
// can't be handed back to the caller; "leave it open" is implemented
// instead as "don't run its `Drop`", by unwrapping it out of the
// buffering layers and `mem::forget`-ing it when `owns` is false (see
// DESIGN.md).

use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::codec::Codec;
use crate::config::Config;
use crate::error::Error;
use crate::reader::DecompressReader;

/// Which direction an [`EncodedFile`] was opened for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

trait Stream: Read + Write + Seek + Send {}
impl<T: Read + Write + Seek + Send> Stream for T {}

enum State {
    Closed,
    Read {
        reader: BufReader<DecompressReader<Box<dyn Stream>>>,
        owns: bool,
    },
    Write {
        encoder: Codec,
        stream: Box<dyn Stream>,
        pos: u64,
        owns: bool,
    },
}

/// A seekable, buffered view over a compressed byte stream: reads
/// transparently decompress, writes transparently compress.
pub struct EncodedFile {
    state: Mutex<State>,
}

impl EncodedFile {
    /// Open `path` in read or write mode, creating/truncating it for
    /// write mode as `std::fs::File::create` does.
    pub fn open_path(path: impl AsRef<Path>, mode: OpenMode, cfg: Config) -> io::Result<EncodedFile> {
        let file = match mode {
            OpenMode::Read => std::fs::File::open(path)?,
            OpenMode::Write => std::fs::File::create(path)?,
        };
        Ok(EncodedFile::new_with_owns(file, mode, cfg, true))
    }

    /// Wrap an already-open stream. The stream must support the
    /// operations the chosen mode will call (read mode drives `Read` +
    /// `Seek`, write mode drives `Write`). The stream is left open
    /// (not dropped) when the returned `EncodedFile` is closed; only
    /// streams opened via `open_path` are closed automatically.
    pub fn from_stream(stream: impl Read + Write + Seek + Send + 'static, mode: OpenMode, cfg: Config) -> EncodedFile {
        EncodedFile::new_with_owns(stream, mode, cfg, false)
    }

    fn new_with_owns(stream: impl Read + Write + Seek + Send + 'static, mode: OpenMode, cfg: Config, owns: bool) -> EncodedFile {
        let boxed: Box<dyn Stream> = Box::new(stream);
        let state = match mode {
            OpenMode::Read => {
                let raw = DecompressReader::new(boxed, cfg);
                State::Read {
                    reader: BufReader::new(raw),
                    owns,
                }
            }
            OpenMode::Write => State::Write {
                encoder: Codec::encoder(cfg),
                stream: boxed,
                pos: 0,
                owns,
            },
        };
        EncodedFile {
            state: Mutex::new(state),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock().unwrap(), State::Closed)
    }

    fn with_read<T>(&self, f: impl FnOnce(&mut BufReader<DecompressReader<Box<dyn Stream>>>) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self.state.lock().unwrap();
        match &mut *guard {
            State::Closed => Err(Error::State("operation on closed file").into()),
            State::Read { reader, .. } => f(reader),
            State::Write { .. } => Err(Error::Unsupported("file not open for reading").into()),
        }
    }

    /// Read up to `n` bytes (all remaining if `n` is `None`).
    pub fn read(&self, n: Option<usize>) -> io::Result<Vec<u8>> {
        self.with_read(|r| match n {
            None => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)?;
                Ok(buf)
            }
            Some(n) => {
                let mut buf = vec![0u8; n];
                let got = r.read(&mut buf)?;
                buf.truncate(got);
                Ok(buf)
            }
        })
    }

    /// Read up to `n` bytes while trying to avoid more than one
    /// underlying read; `None` reads up to one buffer's worth.
    pub fn read1(&self, n: Option<usize>) -> io::Result<Vec<u8>> {
        self.with_read(|r| {
            let avail = r.fill_buf()?;
            let take = n.unwrap_or(avail.len()).min(avail.len());
            let out = avail[..take].to_vec();
            r.consume(take);
            Ok(out)
        })
    }

    /// Return some buffered bytes without advancing the position; at
    /// least one byte unless at EOF. The exact count is unspecified.
    pub fn peek(&self) -> io::Result<Vec<u8>> {
        self.with_read(|r| Ok(r.fill_buf()?.to_vec()))
    }

    pub fn readinto(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.with_read(|r| r.read(buf))
    }

    /// Read one line, including its trailing `\n` if present. `limit`
    /// caps the number of bytes read (the line may come back
    /// incomplete). Returns an empty vector at EOF.
    pub fn readline(&self, limit: Option<usize>) -> io::Result<Vec<u8>> {
        self.with_read(|r| {
            let mut buf = Vec::new();
            loop {
                if let Some(limit) = limit {
                    if buf.len() >= limit {
                        break;
                    }
                }
                let avail = r.fill_buf()?;
                if avail.is_empty() {
                    break;
                }
                let newline_at = avail.iter().position(|&b| b == b'\n');
                let mut take = newline_at.map_or(avail.len(), |i| i + 1);
                if let Some(limit) = limit {
                    take = take.min(limit - buf.len());
                }
                buf.extend_from_slice(&avail[..take]);
                r.consume(take);
                if buf.last() == Some(&b'\n') {
                    break;
                }
            }
            Ok(buf)
        })
    }

    /// Read lines until the total size read reaches `size_hint` (all
    /// lines if `None`).
    pub fn readlines(&self, size_hint: Option<usize>) -> io::Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        let mut total = 0;
        loop {
            let line = self.readline(None)?;
            if line.is_empty() {
                break;
            }
            total += line.len();
            lines.push(line);
            if let Some(hint) = size_hint {
                if total >= hint {
                    break;
                }
            }
        }
        Ok(lines)
    }

    /// Seek within the decoded stream. Read mode only.
    pub fn seek(&self, pos: SeekFrom) -> io::Result<u64> {
        self.with_read(|r| r.seek(pos))
    }

    /// Current position: decoded offset in read mode, bytes written so
    /// far in write mode.
    pub fn tell(&self) -> io::Result<u64> {
        let mut guard = self.state.lock().unwrap();
        match &mut *guard {
            State::Closed => Err(Error::State("operation on closed file").into()),
            State::Read { reader, .. } => reader.stream_position(),
            State::Write { pos, .. } => Ok(*pos),
        }
    }

    /// Compress and write `data`. Write mode only. Returns `data.len()`.
    pub fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut guard = self.state.lock().unwrap();
        match &mut *guard {
            State::Closed => Err(Error::State("operation on closed file").into()),
            State::Read { .. } => Err(Error::Unsupported("file not open for writing").into()),
            State::Write { encoder, stream, pos, .. } => {
                let compressed = encoder.fill(data).map_err(io::Error::from)?;
                stream.write_all(&compressed)?;
                *pos += data.len() as u64;
                Ok(data.len())
            }
        }
    }

    /// Write each element of `seq` with no separator between them.
    /// Returns the total number of uncompressed bytes written.
    pub fn writelines<I>(&self, seq: I) -> io::Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut total = 0;
        for chunk in seq {
            total += self.write(chunk.as_ref())?;
        }
        Ok(total)
    }

    /// Flush and close. In write mode, the encoder's final output is
    /// written first. A stream opened via `open_path` is then dropped
    /// (closing the underlying file); a stream handed to `from_stream`
    /// is left open, surviving in whatever state the last write left
    /// it in. Idempotent: a second call is a no-op.
    pub fn close(&self) -> io::Result<()> {
        let mut guard = self.state.lock().unwrap();
        let prior = std::mem::replace(&mut *guard, State::Closed);
        match prior {
            State::Closed => Ok(()),
            State::Read { reader, owns } => {
                let stream = reader.into_inner().into_inner();
                if !owns {
                    std::mem::forget(stream);
                }
                Ok(())
            }
            State::Write {
                mut encoder,
                mut stream,
                owns,
                ..
            } => {
                let tail = encoder.finish().map_err(io::Error::from)?;
                stream.write_all(&tail)?;
                stream.flush()?;
                if !owns {
                    std::mem::forget(stream);
                }
                Ok(())
            }
        }
    }

    /// Iterate over lines, terminator retained, stopping at EOF.
    pub fn lines(&self) -> Lines<'_> {
        Lines { file: self }
    }
}

impl Drop for EncodedFile {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Iterator over an [`EncodedFile`]'s lines, yielded with their
/// trailing `\n` retained.
pub struct Lines<'a> {
    file: &'a EncodedFile,
}

impl<'a> Iterator for Lines<'a> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<io::Result<Vec<u8>>> {
        match self.file.readline(None) {
            Ok(line) if line.is_empty() => None,
            other => Some(other),
        }
    }
}

/// Mirrors the Python module-level `open()`. For an already-open
/// stream, call [`EncodedFile::from_stream`] directly instead.
pub fn open(path: impl AsRef<Path>, mode: OpenMode, cfg: Config) -> io::Result<EncodedFile> {
    EncodedFile::open_path(path, mode, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream() -> Cursor<Vec<u8>> {
        Cursor::new(Vec::new())
    }

    #[test]
    fn write_then_read_round_trips() {
        let cfg = Config::new(11, 4).unwrap();
        let backing = stream();
        let f = EncodedFile::from_stream(backing, OpenMode::Write, cfg);
        assert_eq!(f.write(b"hello, world").unwrap(), 12);
        assert_eq!(f.tell().unwrap(), 12);
        f.close().unwrap();
    }

    #[test]
    fn read_mode_rejects_write() {
        let cfg = Config::new(11, 4).unwrap();
        let f = EncodedFile::from_stream(stream(), OpenMode::Read, cfg);
        assert!(f.write(b"x").is_err());
    }

    #[test]
    fn write_mode_rejects_read() {
        let cfg = Config::new(11, 4).unwrap();
        let f = EncodedFile::from_stream(stream(), OpenMode::Write, cfg);
        assert!(f.read(Some(1)).is_err());
    }

    #[test]
    fn close_is_idempotent() {
        let cfg = Config::new(11, 4).unwrap();
        let f = EncodedFile::from_stream(stream(), OpenMode::Write, cfg);
        f.close().unwrap();
        f.close().unwrap();
    }

    #[test]
    fn operations_after_close_are_state_errors() {
        let cfg = Config::new(11, 4).unwrap();
        let f = EncodedFile::from_stream(stream(), OpenMode::Write, cfg);
        f.close().unwrap();
        assert!(f.write(b"x").is_err());
    }

    #[test]
    fn read_lines_retains_terminators() {
        let cfg = Config::new(11, 4).unwrap();
        let mut backing = stream();
        {
            let enc = crate::encode(b"one\ntwo\nthree", 11, 4).unwrap();
            backing.get_mut().extend_from_slice(&enc);
        }
        backing.set_position(0);
        let f = EncodedFile::from_stream(backing, OpenMode::Read, cfg);
        let lines: Vec<Vec<u8>> = f.lines().collect::<Result<_, _>>().unwrap();
        assert_eq!(lines, vec![b"one\n".to_vec(), b"two\n".to_vec(), b"three".to_vec()]);
    }

    /// A stream that records whether it was ever dropped, to tell
    /// `close()`'s ownership handling apart from a no-op.
    struct TrackedStream {
        cursor: Cursor<Vec<u8>>,
        dropped: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }

    impl Read for TrackedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.cursor.read(buf)
        }
    }

    impl Write for TrackedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.cursor.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            self.cursor.flush()
        }
    }

    impl Seek for TrackedStream {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.cursor.seek(pos)
        }
    }

    impl Drop for TrackedStream {
        fn drop(&mut self) {
            self.dropped.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn injected_stream_survives_close() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let cfg = Config::new(11, 4).unwrap();
        let dropped = Arc::new(AtomicBool::new(false));
        let tracked = TrackedStream {
            cursor: stream(),
            dropped: dropped.clone(),
        };
        let f = EncodedFile::from_stream(tracked, OpenMode::Write, cfg);
        f.write(b"hello").unwrap();
        f.close().unwrap();
        assert!(!dropped.load(Ordering::SeqCst), "injected stream must not be dropped by close()");
    }

    #[test]
    fn owned_stream_is_dropped_on_close() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let cfg = Config::new(11, 4).unwrap();
        let dropped = Arc::new(AtomicBool::new(false));
        let tracked = TrackedStream {
            cursor: stream(),
            dropped: dropped.clone(),
        };
        let f = EncodedFile::new_with_owns(tracked, OpenMode::Write, cfg, true);
        f.write(b"hello").unwrap();
        f.close().unwrap();
        assert!(dropped.load(Ordering::SeqCst), "owned stream must be dropped by close()");
    }
}
