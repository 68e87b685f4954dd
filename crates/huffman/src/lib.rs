//! Bit-level reading and the two decompressors the E32/SIS formats ride on.
//!
//! [`inflate`] implements the non-standard Huffman/LZ77 scheme used by compressed E32 images;
//! [`zlib`] wraps a stock DEFLATE backend behind the byte-at-a-time interface the schema layer
//! expects for standard zlib-compressed SIS payloads.

pub mod bitreader;
pub mod error;
pub mod huffman;
pub mod inflate;
pub mod prelude;
pub mod zlib;

pub use error::Error;
