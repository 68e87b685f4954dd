//! Parses Symbian E32 executable images: header validation, Huffman/LZ77 decompression, import
//! and relocation section consumption, ordinal-import resolution against an external `.def`
//! table, and reassembleable `.s` emission for ARM targets.

pub mod decompress;
pub mod emit;
pub mod error;
pub mod header;
pub mod image;
pub mod ordinal;
pub mod prelude;
pub mod sections;

pub use error::Error;
pub use image::E32Image;
