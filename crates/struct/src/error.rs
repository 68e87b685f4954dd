//! Error conditions shared by every schema parsed through [`crate::directives`].

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A schema violation at a specific byte offset: wrong default value, a length-bound that
    /// doesn't hold, non-zero padding, or a malformed sub-structure.
    #[snafu(display("parse error at offset {offset}: {reason}"))]
    ParseError { offset: usize, reason: &'static str },

    /// A UID checksum or header CRC disagreed with its recorded value.
    #[snafu(display("checksum mismatch at offset {offset}"))]
    ChecksumMismatch { offset: usize },

    /// An embedded compressed stream was malformed.
    #[snafu(display("malformed stream: {reason}"))]
    MalformedStream { reason: &'static str },

    /// A recognized-but-unimplemented variant (byte-pair compression, a non-ARM CPU target, ...).
    #[snafu(display("unsupported: {reason}"))]
    Unsupported { reason: &'static str },

    /// Attempted to instantiate a generic schema (`Array[T]`, `SISCompressed[T]`) without
    /// resolving its type parameter first. Always an implementation bug.
    #[snafu(display("template parameter not resolved: {reason}"))]
    TemplateNeeded { reason: &'static str },

    /// The input ended before a frame's declared length was satisfied.
    #[snafu(display("truncated input at offset {offset}"))]
    TruncatedInput { offset: usize },
}

impl From<epoc_core::data::Error> for Error {
    fn from(_source: epoc_core::data::Error) -> Self {
        Self::TruncatedInput { offset: 0 }
    }
}

impl From<epoc_huffman::Error> for Error {
    fn from(source: epoc_huffman::Error) -> Self {
        match source {
            epoc_huffman::Error::MalformedStream { reason } => Self::MalformedStream { reason },
            epoc_huffman::Error::TruncatedInput => Self::TruncatedInput { offset: 0 },
            epoc_huffman::Error::Unsupported { reason } => Self::Unsupported { reason },
            epoc_huffman::Error::Io { .. } => {
                Self::MalformedStream { reason: "I/O failure reading compressed stream" }
            }
            _ => Self::MalformedStream { reason: "unrecognized compressed-stream error" },
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
