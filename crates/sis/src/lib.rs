//! Parsing and extraction for Symbian SIS installable packages: the 16-byte `SymbianFileHeader`,
//! the tagged-union `SISField` record schema, and the `Contents -> Controller -> InstallBlock`
//! extraction walk.

pub mod error;
pub mod extractor;
pub mod field;
pub mod header;
pub mod prelude;

pub use error::Error;
pub use extractor::{extract_sis, ExtractedFile};
pub use field::SisField;
pub use header::SymbianFileHeader;
