//! Composable directive primitives that a declarative schema would apply per-field.
//!
//! Each concrete record in [`epoc_image`](../../epoc_image/index.html) and
//! [`epoc_sis`](../../epoc_sis/index.html) is a hand-written parse function built out of these
//! primitives, rather than a reflection-driven schema engine: with exactly two concrete formats
//! to serve, a generic `(name, type, attributes)` interpreter buys nothing a direct function
//! doesn't already give you, and it's how this codebase's other format readers are built too.

use epoc_core::data::{DataCursorRef, DataCursorTrait, EndianRead};

use crate::error::{Error, ParseErrorSnafu};

/// Reads and discards `(-offset mod alignment)` padding bytes, verifying they're zero.
///
/// # Errors
/// [`Error::ParseError`] if a padding byte is non-zero; [`Error::TruncatedInput`] at EOF.
pub fn align(cursor: &mut DataCursorRef, alignment: usize) -> Result<(), Error> {
    if alignment <= 1 {
        return Ok(());
    }
    let offset = cursor.position();
    let padding = alignment - (offset % alignment);
    let padding = if padding == alignment { 0 } else { padding };
    for _ in 0..padding {
        let byte = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset: cursor.position() })?;
        if byte != 0 {
            return ParseErrorSnafu { offset: cursor.position() - 1, reason: "non-zero alignment padding" }
                .fail();
        }
    }
    Ok(())
}

/// Checks a field's parsed value against its schema-mandated default (e.g. `iSignature ==
/// 'EPOC'`, `UID1 == 0x10201A7A`).
///
/// # Errors
/// [`Error::ParseError`] if `actual != expected`.
pub fn expect_default<T: PartialEq>(
    offset: usize,
    actual: T,
    expected: T,
    reason: &'static str,
) -> Result<(), Error> {
    if actual == expected {
        Ok(())
    } else {
        ParseErrorSnafu { offset, reason }.fail()
    }
}

/// `StructurePayloadLength`: validates that a declared payload length is consistent with the
/// observed payload length, up to `alignment - 1` bytes of trailing zero padding.
///
/// # Errors
/// [`Error::ParseError`] if `declared > actual` or `actual - declared >= alignment`.
pub fn check_payload_length(
    offset: usize,
    declared: usize,
    actual: usize,
    alignment: usize,
) -> Result<(), Error> {
    if declared > actual || actual - declared >= alignment.max(1) {
        return ParseErrorSnafu { offset, reason: "declared payload length out of bounds" }.fail();
    }
    Ok(())
}

/// `CanBeLast`: whether parsing may stop here because the current offset has reached the frame
/// end exactly.
#[must_use]
pub fn can_be_last(position: usize, frame_end: usize) -> bool {
    position == frame_end
}

/// `SkipNextIfByte`: peeks the next byte without consuming it, reporting whether it matches `b`.
///
/// # Errors
/// [`Error::TruncatedInput`] at EOF.
pub fn peek_matches(cursor: &DataCursorRef, b: u8) -> Result<bool, Error> {
    let offset = cursor.position();
    let remaining = cursor.remaining_slice();
    let byte = *remaining.first().ok_or(Error::TruncatedInput { offset })?;
    Ok(byte == b)
}

/// `CountIn`/`LengthIn`: the array element loop, stopping at `max_count` elements or when fewer
/// than `element_alignment` bytes remain before `frame_end`.
#[must_use]
pub fn array_should_continue(
    count: usize,
    max_count: usize,
    position: usize,
    frame_end: usize,
    element_alignment: usize,
) -> bool {
    count < max_count && position + element_alignment <= frame_end
}

/// `ValidateUidChecksum`: recomputes the checksum over a UID triple and compares it to the value
/// recorded in the stream.
///
/// # Errors
/// [`Error::ChecksumMismatch`] on disagreement.
pub fn validate_uid_checksum(
    offset: usize,
    uid1: u32,
    uid2: u32,
    uid3: u32,
    recorded: u32,
) -> Result<(), Error> {
    let computed = epoc_core::crc::uid_checksum(uid1, uid2, uid3);
    if computed == recorded {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch { offset })
    }
}

/// The efficient uint63 length prefix SIS records use: a plain `u32` when the high bit is clear,
/// otherwise that value's low 31 bits form the high half of a 63-bit length whose low half
/// follows in a second `u32`.
///
/// # Errors
/// [`Error::TruncatedInput`] at EOF.
pub fn read_efficient_length(cursor: &mut DataCursorRef) -> Result<u64, Error> {
    let offset = cursor.position();
    let x = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    if x & 0x8000_0000 == 0 {
        return Ok(u64::from(x));
    }
    let y = cursor
        .read_u32()
        .map_err(|_| Error::TruncatedInput { offset: cursor.position() })?;
    Ok((u64::from(x & 0x7fff_ffff) << 32) | u64::from(y))
}

/// Derives `maxfin` (the frame end) from a fixed-width schema's static size when the caller
/// doesn't supply one explicitly.
#[must_use]
pub fn derive_maxfin(start: usize, static_size: usize) -> usize {
    start + static_size
}

#[cfg(test)]
mod tests {
    use epoc_core::data::Endian;

    use super::*;

    #[test]
    fn align_consumes_zero_padding() {
        let data = [0u8, 0, 0, 1, 2, 3];
        let mut cursor = DataCursorRef::new(&data, Endian::Little);
        cursor.set_position(1);
        align(&mut cursor, 4).unwrap();
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn align_rejects_nonzero_padding() {
        let data = [0u8, 1, 0, 0];
        let mut cursor = DataCursorRef::new(&data, Endian::Little);
        cursor.set_position(1);
        let err = align(&mut cursor, 4).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn payload_length_accepts_alignment_slack() {
        check_payload_length(0, 10, 12, 4).unwrap();
        check_payload_length(0, 10, 14, 4).unwrap_err();
        check_payload_length(0, 10, 9, 4).unwrap_err();
    }

    #[test]
    fn efficient_length_reads_four_bytes_when_short() {
        let data = 100u32.to_le_bytes();
        let mut cursor = DataCursorRef::new(&data, Endian::Little);
        assert_eq!(read_efficient_length(&mut cursor).unwrap(), 100);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn efficient_length_reads_eight_bytes_when_high_bit_set() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(0x8000_0001u32).to_le_bytes());
        bytes.extend_from_slice(&(0x0000_0002u32).to_le_bytes());
        let mut cursor = DataCursorRef::new(&bytes, Endian::Little);
        let length = read_efficient_length(&mut cursor).unwrap();
        assert_eq!(length, (1u64 << 32) | 2);
    }
}
