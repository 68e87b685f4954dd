//! The UTF-16 string field type: "a UTF-16 string spanning the remainder of the enclosing frame."

use epoc_core::data::{DataCursorRef, DataCursorTrait};

use crate::error::{Error, ParseErrorSnafu};

/// Reads a little-endian UTF-16 string occupying every byte from the cursor's current position
/// up to `frame_end`.
///
/// # Errors
/// [`Error::TruncatedInput`] if fewer bytes remain than the frame requires;
/// [`Error::ParseError`] if the frame isn't an even number of bytes, or the code units don't
/// decode to valid UTF-16.
pub fn read_utf16_string(cursor: &mut DataCursorRef, frame_end: usize) -> Result<String, Error> {
    let offset = cursor.position();
    if frame_end < offset {
        return ParseErrorSnafu { offset, reason: "UTF-16 string frame ends before it starts" }.fail();
    }
    let byte_len = frame_end - offset;
    if byte_len % 2 != 0 {
        return ParseErrorSnafu { offset, reason: "UTF-16 string frame is not an even byte length" }
            .fail();
    }

    let bytes = cursor
        .get_slice(byte_len)
        .map_err(|_| Error::TruncatedInput { offset })?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units)
        .map_err(|_| Error::ParseError { offset, reason: "invalid UTF-16 string" })
}

#[cfg(test)]
mod tests {
    use epoc_core::data::Endian;

    use super::*;

    #[test]
    fn reads_whole_frame_as_utf16() {
        let text: Vec<u16> = "hi".encode_utf16().collect();
        let mut bytes = Vec::new();
        for unit in text {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let frame_end = bytes.len();
        let mut cursor = DataCursorRef::new(&bytes, Endian::Little);
        assert_eq!(read_utf16_string(&mut cursor, frame_end).unwrap(), "hi");
    }

    #[test]
    fn rejects_odd_length_frame() {
        let bytes = [0u8, 0, 0];
        let mut cursor = DataCursorRef::new(&bytes, Endian::Little);
        let err = read_utf16_string(&mut cursor, 3).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }
}
