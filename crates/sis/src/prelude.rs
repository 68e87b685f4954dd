//! Convenient re-exports, mirroring [`epoc_image::prelude`].
//!
//! ```
//! use epoc_sis::prelude::*;
//! ```

pub use crate::extractor::{extract_sis, parse_controller, ExtractedFile};
pub use crate::field::{parse_field, parse_field_from_bytes, SisField, TField};
pub use crate::header::SymbianFileHeader;
pub use crate::Error;
