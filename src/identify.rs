//! Auto-detect mode: try an E32 image header, then a SIS file header, per spec's detection order.
//! A `ParseError` from one attempt just means "try the next format"; anything else (truncated
//! input, a bad checksum, an I/O failure) is a real error and bubbles up.

use anyhow::Result;
use epoc_core::data::{DataCursorRef, Endian};
use epoc_image::prelude::*;

pub(crate) fn identify_file(input: &str) -> Result<()> {
    let data = std::fs::read(input)?;

    match E32ImageHeader::parse(&data) {
        Ok(header) => {
            println!(
                "{input}: Symbian E32 image ({:?} CPU, {:?} compression)",
                header.cpu_kind(),
                header.compression_type()
            );
            return Ok(());
        }
        Err(epoc_image::Error::ParseError { .. }) => {}
        Err(err) => return Err(err.into()),
    }

    let mut cursor = DataCursorRef::new(&data, Endian::Little);
    match epoc_sis::SymbianFileHeader::parse(&mut cursor) {
        Ok(_) => {
            println!("{input}: Symbian SIS installable package");
            return Ok(());
        }
        Err(epoc_sis::Error::ParseError { .. }) => {}
        Err(err) => return Err(err.into()),
    }

    println!("{input}: data");
    Ok(())
}
