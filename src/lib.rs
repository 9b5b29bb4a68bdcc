// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! A streaming LZSS-style codec with a Heatshrink-compatible bit-packed
//! byte layout, plus a seekable, file-like wrapper around it.
//!
//! The low-level pieces ([`encoder`], [`decoder`], [`window`],
//! [`bitio`]) are non-blocking state machines driven by `sink`/`poll`;
//! [`codec::Codec`] wraps either one behind a uniform `fill`/`finish`
//! contract, and [`file::EncodedFile`] layers ordinary `Read`/`Write`/
//! `Seek` on top of that for everyday use.

pub mod bitio;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod file;
pub mod reader;
pub mod window;

pub use codec::{Codec, FillInput};
pub use config::Config;
pub use error::Error;
pub use file::{open, EncodedFile, OpenMode};
pub use reader::DecompressReader;

/// Compress `data` in one call with the given `(window_sz2,
/// lookahead_sz2)` parameters.
pub fn encode(data: impl FillInput, window_sz2: u8, lookahead_sz2: u8) -> Result<Vec<u8>, Error> {
    let cfg = Config::new(window_sz2, lookahead_sz2)?;
    let mut codec = Codec::encoder(cfg);
    let mut out = codec.fill(data)?;
    out.extend(codec.finish()?);
    Ok(out)
}

/// Decompress `data` in one call with the given `(window_sz2,
/// lookahead_sz2)` parameters, which must match those used to encode.
pub fn decode(data: impl FillInput, window_sz2: u8, lookahead_sz2: u8) -> Result<Vec<u8>, Error> {
    let cfg = Config::new(window_sz2, lookahead_sz2)?;
    let mut codec = Codec::decoder(cfg);
    let mut out = codec.fill(data)?;
    out.extend(codec.finish()?);
    Ok(out)
}
