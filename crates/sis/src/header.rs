//! The 16-byte `SymbianFileHeader` prefix every SIS file opens with, per spec §6.

use epoc_core::crc::uid_checksum;
use epoc_core::data::{DataCursorRef, DataCursorTrait, EndianRead};

use crate::error::{Error, ParseErrorSnafu};

pub const UID1_DEFAULT: u32 = 0x1020_1A7A;
pub const UID2_DEFAULT: u32 = 0;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SymbianFileHeader {
    pub uid1: u32,
    pub uid2: u32,
    pub uid3: u32,
    pub uid_checksum: u32,
}

impl SymbianFileHeader {
    /// Reads the 16-byte header, validating `UID1`/`UID2` against their schema defaults and the
    /// recorded UID checksum.
    ///
    /// # Errors
    /// [`Error::ParseError`] if `UID1`/`UID2` don't match their defaults;
    /// [`Error::ChecksumMismatch`] if the checksum disagrees;
    /// [`Error::TruncatedInput`] at EOF.
    pub fn parse(cursor: &mut DataCursorRef) -> Result<Self, Error> {
        let offset = cursor.position();
        let uid1 = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
        let uid2 = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 4 })?;
        let uid3 = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 8 })?;
        let uid_checksum = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 12 })?;

        if uid1 != UID1_DEFAULT {
            return ParseErrorSnafu { offset, reason: "UID1 does not match the SIS file magic" }.fail();
        }
        if uid2 != UID2_DEFAULT {
            return ParseErrorSnafu { offset: offset + 4, reason: "UID2 is not zero" }.fail();
        }

        let computed = uid_checksum_of(uid1, uid2, uid3);
        if computed != uid_checksum {
            return Err(Error::ChecksumMismatch { offset: offset + 12 });
        }

        Ok(Self { uid1, uid2, uid3, uid_checksum })
    }
}

fn uid_checksum_of(uid1: u32, uid2: u32, uid3: u32) -> u32 {
    uid_checksum(uid1, uid2, uid3)
}

#[cfg(test)]
mod tests {
    use epoc_core::data::Endian;

    use super::*;

    #[test]
    fn parses_s1_fixture() {
        // spec §8 S1: `7A 1A 20 10 00 00 00 00`
        let mut bytes = vec![0x7Au8, 0x1A, 0x20, 0x10, 0, 0, 0, 0];
        let checksum = uid_checksum_of(UID1_DEFAULT, UID2_DEFAULT, 0);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&checksum.to_le_bytes());

        let mut cursor = DataCursorRef::new(&bytes, Endian::Little);
        let header = SymbianFileHeader::parse(&mut cursor).unwrap();
        assert_eq!(header.uid1, UID1_DEFAULT);
        assert_eq!(header.uid2, UID2_DEFAULT);
    }

    #[test]
    fn rejects_wrong_uid1() {
        let mut bytes = vec![0u8; 16];
        bytes[0..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let mut cursor = DataCursorRef::new(&bytes, Endian::Little);
        let err = SymbianFileHeader::parse(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }
}
