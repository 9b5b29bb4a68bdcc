// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

use std::error;
use std::fmt;
use std::io;

/// Errors produced by the codec, the façade, and the file wrapper.
#[derive(Debug)]
pub enum Error {
    /// Argument was not an acceptable byte sequence, or not an integer
    /// where one was required (e.g. a unicode/text payload passed to a
    /// dynamic entry point).
    Type(String),
    /// `window_sz2`/`lookahead_sz2` outside the allowed range.
    Range { field: &'static str, value: i64 },
    /// Integer argument does not fit in the expected machine word.
    Overflow { field: &'static str },
    /// Operation invalid for the current lifecycle state: fill/finish
    /// after finish, read in write mode, write in read mode, any
    /// operation after close.
    State(&'static str),
    /// Seek attempted on a non-seekable underlying stream.
    Unsupported(&'static str),
    /// Decoder input was structurally invalid beyond a clean EOF (e.g. a
    /// back-reference field truncated mid-field).
    Data(&'static str),
    /// Propagated I/O failure from an underlying stream.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Type(msg) => write!(f, "type error: {}", msg),
            Error::Range { field, value } => {
                write!(f, "{} out of range: {}", field, value)
            }
            Error::Overflow { field } => write!(f, "{} overflows machine word", field),
            Error::State(msg) => write!(f, "invalid state: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported operation: {}", msg),
            Error::Data(msg) => write!(f, "data error: {}", msg),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            Error::Unsupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            Error::State(msg) => io::Error::new(io::ErrorKind::Other, msg),
            Error::Data(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            other => io::Error::new(io::ErrorKind::InvalidInput, other.to_string()),
        }
    }
}
