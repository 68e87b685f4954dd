//! Convenient re-exports, mirroring [`epoc_core::prelude`] and [`epoc_huffman::prelude`].
//!
//! ```
//! use epoc_struct::prelude::*;
//! ```

pub use crate::array::parse_array;
pub use crate::directives::{
    align, array_should_continue, can_be_last, check_payload_length, derive_maxfin,
    expect_default, peek_matches, read_efficient_length, validate_uid_checksum,
};
pub use crate::text::read_utf16_string;
pub use crate::Error;
