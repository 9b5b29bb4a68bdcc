// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

// Incremental codec façade wrapping either an `Encoder` or a `Decoder`
// behind one `fill`/`finish`/`finished` contract.
//
// Grounded on campross's own preference for small enum-dispatch wrappers
// over trait objects where only two concrete implementations ever exist
// (see e.g. `lz77`/`lzss2`'s parallel Writer/Reader pairs); `FillInput` is
// new, grounded on SPEC_FULL.md §4.5's Rust mapping of the Python
// façade's runtime type check into a compile-time one.

use crate::config::Config;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Error;

enum Machine {
    Encoder(Encoder),
    Decoder(Decoder),
}

/// Either an encoder or a decoder behind one `fill`/`finish` contract.
pub struct Codec {
    machine: Machine,
    finished: bool,
}

impl Codec {
    pub fn encoder(cfg: Config) -> Codec {
        Codec {
            machine: Machine::Encoder(Encoder::new(cfg)),
            finished: false,
        }
    }

    pub fn decoder(cfg: Config) -> Codec {
        Codec {
            machine: Machine::Decoder(Decoder::new(cfg)),
            finished: false,
        }
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Feed `data` to the underlying machine and return whatever output
    /// that produces. Fails with `Error::State` if already finished.
    pub fn fill(&mut self, data: impl FillInput) -> Result<Vec<u8>, Error> {
        if self.finished {
            return Err(Error::State("fill called after finish"));
        }
        let bytes = data.into_bytes();
        let mut out = Vec::new();
        let mut offset = 0;
        loop {
            let n = match &mut self.machine {
                Machine::Encoder(e) => e.sink(&bytes[offset..]),
                Machine::Decoder(d) => d.sink(&bytes[offset..]),
            };
            offset += n;
            loop {
                let progressed = match &mut self.machine {
                    Machine::Encoder(e) => e.poll(&mut out),
                    Machine::Decoder(d) => d.poll(&mut out),
                };
                if !progressed {
                    break;
                }
            }
            if offset >= bytes.len() {
                break;
            }
        }
        Ok(out)
    }

    /// Signal end-of-input, drain remaining output, and mark finished.
    /// Fails with `Error::State` if already finished, or `Error::Data`
    /// if a decoder's input was truncated mid-field.
    pub fn finish(&mut self) -> Result<Vec<u8>, Error> {
        if self.finished {
            return Err(Error::State("finish called twice"));
        }
        let mut out = Vec::new();
        let truncation = match &mut self.machine {
            Machine::Encoder(e) => {
                e.finish();
                while e.poll(&mut out) {}
                Ok(())
            }
            Machine::Decoder(d) => {
                d.finish();
                while d.poll(&mut out) {}
                d.check_truncation()
            }
        };
        self.finished = true;
        truncation.map(|()| out)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for &[u8] {}
    impl Sealed for Vec<u8> {}
    impl Sealed for Box<[u8]> {}
    impl<I: IntoIterator<Item = u8>> Sealed for IterInput<I> {}

    /// Wrapper so a blanket `IntoIterator<Item = u8>` impl of `FillInput`
    /// doesn't collide with the concrete byte-slice-like impls.
    pub struct IterInput<I>(pub I);
}

use sealed::{IterInput, Sealed};

/// Byte-like input accepted by [`Codec::fill`]. Implemented only for
/// genuinely byte-shaped types: deliberately *not* for `&str`/`String`,
/// so passing text is a compile error rather than the runtime
/// `TypeError` the Python original raises.
pub trait FillInput: Sealed {
    fn into_bytes(self) -> Vec<u8>;
}

impl FillInput for &[u8] {
    fn into_bytes(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl FillInput for Vec<u8> {
    fn into_bytes(self) -> Vec<u8> {
        self
    }
}

impl FillInput for Box<[u8]> {
    fn into_bytes(self) -> Vec<u8> {
        self.into_vec()
    }
}

impl<I: IntoIterator<Item = u8>> FillInput for IterInput<I> {
    fn into_bytes(self) -> Vec<u8> {
        self.0.into_iter().collect()
    }
}

/// Wrap any `u8` iterable (e.g. a `Vec<u8>` you don't want to move, or a
/// generator-like chain) so it can be passed to [`Codec::fill`].
pub fn iter_input<I: IntoIterator<Item = u8>>(iter: I) -> impl FillInput {
    IterInput(iter)
}
