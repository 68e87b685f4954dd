//! Convenient re-exports.
//!
//! ```
//! use epoc_image::prelude::*;
//! ```

pub use crate::emit::emit_assembly;
pub use crate::header::{CompressionType, CpuKind, E32ImageHeader};
pub use crate::image::E32Image;
pub use crate::ordinal::OrdinalTable;
pub use crate::sections::{parse_import_section, parse_reloc_section, ImportBlock, Relocation};
pub use crate::Error;
