//! The variable-length array element loop shared by every `Array[T]`/`SISArray[T]` instantiation.
//!
//! Concrete record types don't get a generic `Array<T>` wrapper type; each call site calls
//! [`parse_array`] directly with a parser closure, per `directives`'s module doc.

use epoc_core::data::DataCursorRef;

use crate::directives::array_should_continue;
use crate::error::Error;

/// Parses elements of `parse_one` until either `max_count` elements have been read, or fewer than
/// `element_alignment` bytes remain before `frame_end`.
///
/// This is the `CountIn`/`LengthIn`-bounded array loop from spec §4.5: `max_count` is `usize::MAX`
/// for a `LengthIn`-only array (no count bound, just byte-range bound), and `frame_end` is the
/// array's own `_maxfin` (derived from the enclosing frame, or a `LengthIn` byte range).
///
/// # Errors
/// Propagates whatever `parse_one` returns.
pub fn parse_array<T>(
    cursor: &mut DataCursorRef,
    max_count: usize,
    frame_end: usize,
    element_alignment: usize,
    mut parse_one: impl FnMut(&mut DataCursorRef) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    use epoc_core::data::DataCursorTrait;

    let mut elements = Vec::new();
    while array_should_continue(elements.len(), max_count, cursor.position(), frame_end, element_alignment)
    {
        elements.push(parse_one(cursor)?);
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use epoc_core::data::{DataCursorTrait, Endian, EndianRead};

    use super::*;

    #[test]
    fn stops_at_max_count() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut cursor = DataCursorRef::new(&data, Endian::Little);
        let values = parse_array(&mut cursor, 3, data.len(), 1, |c| {
            c.read_u8().map_err(Error::from)
        })
        .unwrap();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn stops_at_frame_end_when_uncounted() {
        let data = [1u8, 2, 3, 4];
        let mut cursor = DataCursorRef::new(&data, Endian::Little);
        let values = parse_array(&mut cursor, usize::MAX, 3, 1, |c| {
            c.read_u8().map_err(Error::from)
        })
        .unwrap();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(cursor.position(), 2);
    }
}
