//! Error conditions for E32 image parsing, relocation, and assembly emission.

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A schema violation at a specific byte offset.
    #[snafu(display("parse error at offset {offset}: {reason}"))]
    ParseError { offset: usize, reason: &'static str },

    /// The UID checksum or header CRC disagreed with its recorded value.
    #[snafu(display("checksum mismatch at offset {offset}"))]
    ChecksumMismatch { offset: usize },

    /// The compressed remainder failed to decode.
    #[snafu(display("malformed stream: {reason}"))]
    MalformedStream { reason: &'static str },

    /// A recognized-but-unimplemented variant: byte-pair compression, or a non-ARM CPU target at
    /// the objcopy-emission stage (emission assumes ARM 4-byte words).
    #[snafu(display("unsupported: {reason}"))]
    Unsupported { reason: &'static str },

    /// The input ended before a frame's declared length was satisfied.
    #[snafu(display("truncated input at offset {offset}"))]
    TruncatedInput { offset: usize },

    /// An ordinal import referenced a DLL absent from the supplied `.def` mapping, or an ordinal
    /// past the end of that DLL's symbol table.
    #[snafu(display("unresolved ordinal import: {dll}@{ordinal}"))]
    UnresolvedImport { dll: String, ordinal: u32 },

    #[snafu(display("I/O error"))]
    Io { source: std::io::Error },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

impl From<epoc_struct::Error> for Error {
    fn from(source: epoc_struct::Error) -> Self {
        match source {
            epoc_struct::Error::ParseError { offset, reason } => Self::ParseError { offset, reason },
            epoc_struct::Error::ChecksumMismatch { offset } => Self::ChecksumMismatch { offset },
            epoc_struct::Error::MalformedStream { reason } => Self::MalformedStream { reason },
            epoc_struct::Error::Unsupported { reason } => Self::Unsupported { reason },
            epoc_struct::Error::TemplateNeeded { reason } => Self::Unsupported { reason },
            epoc_struct::Error::TruncatedInput { offset } => Self::TruncatedInput { offset },
        }
    }
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
