//! Convenient re-exports, mirroring [`epoc_core::prelude`].
//!
//! ```
//! use epoc_huffman::prelude::*;
//! ```

pub use crate::bitreader::{BitOrder, BitReader};
pub use crate::huffman::HuffmanTable;
pub use crate::inflate::inflate;
pub use crate::zlib::ZlibStream;
pub use crate::Error;
