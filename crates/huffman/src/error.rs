//! Error conditions shared by [`crate::inflate`], [`crate::huffman`], and [`crate::zlib`].

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The Huffman tree is ill-formed (an over-subscribed prefix) or a back-reference points
    /// further back than any byte decoded so far.
    #[snafu(display("malformed compressed stream: {reason}"))]
    MalformedStream { reason: &'static str },

    /// The bit source ran out before the frame's declared length was satisfied.
    #[snafu(display("truncated input while decompressing"))]
    TruncatedInput,

    /// A recognized-but-unimplemented compression variant (e.g. byte-pair).
    #[snafu(display("unsupported compression variant: {reason}"))]
    Unsupported { reason: &'static str },

    #[snafu(display("I/O error"))]
    Io { source: std::io::Error },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
