//! The E32 image header: a 155-byte fixed prefix (spec §6) followed by a variable-length export
//! descriptor. Grounded on `orthrus-windows::pe`'s `MZHeader`/`COFFHeader` style: a
//! `zerocopy`-derived, `#[repr(C)] Unaligned` struct read by reference straight out of the file
//! bytes, no intermediate copy.

use epoc_core::crc::uid_checksum;
use num_enum::FromPrimitive;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U16, U32, U64};

use crate::error::{ChecksumMismatchSnafu, Error, ParseErrorSnafu};

/// `iCompressionType`: selects how the bytes after `iCodeOffset` are encoded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompressionType {
    NotCompressed,
    Deflate,
    BytePair,
    Unknown(u32),
}

impl From<u32> for CompressionType {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::NotCompressed,
            0x101F_7AFC => Self::Deflate,
            0x1028_22AA => Self::BytePair,
            other => Self::Unknown(other),
        }
    }
}

/// `iCpuIdentifier`: only ARM targets are supported by the objcopy-emission stage, which assumes
/// ARM `.text`/`.data` 4-byte words throughout.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, FromPrimitive)]
#[repr(u16)]
pub enum CpuKind {
    #[default]
    Unknown = 0,
    X86 = 0x1000,
    ArmV4 = 0x2000,
    ArmV5 = 0x2001,
    ArmV6 = 0x2002,
    MCore = 0x4000,
}

impl CpuKind {
    #[must_use]
    pub fn is_arm(self) -> bool {
        matches!(self, Self::ArmV4 | Self::ArmV5 | Self::ArmV6)
    }
}

/// `iToolsVersion`: the version of the tools that generated the image.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct ToolsVersion {
    pub major: u8,
    pub minor: u8,
    pub build: U16<LittleEndian>,
}

/// The fixed-offset prefix of an E32 image, per spec §6. Every field is read via
/// [`FromBytes`]/[`Unaligned`] directly out of the backing file slice, matching the teacher's
/// `MZHeader`/`PEHeader` treatment of fixed wire layouts.
#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct E32ImageHeader {
    pub i_uid1: U32<LittleEndian>,
    pub i_uid2: U32<LittleEndian>,
    pub i_uid3: U32<LittleEndian>,
    pub i_uid_checksum: U32<LittleEndian>,
    pub i_signature: U32<LittleEndian>,
    pub i_header_crc: U32<LittleEndian>,
    pub i_module_version: U32<LittleEndian>,
    pub i_compression_type: U32<LittleEndian>,
    pub i_tools_version: ToolsVersion,
    pub i_time: U64<LittleEndian>,
    pub i_flags: U32<LittleEndian>,
    pub i_code_size: U32<LittleEndian>,
    pub i_data_size: U32<LittleEndian>,
    pub i_heap_size_min: U32<LittleEndian>,
    pub i_heap_size_max: U32<LittleEndian>,
    pub i_stack_size: U32<LittleEndian>,
    pub i_bss_size: U32<LittleEndian>,
    pub i_entry_point: U32<LittleEndian>,
    pub i_code_base: U32<LittleEndian>,
    pub i_data_base: U32<LittleEndian>,
    pub i_dll_ref_table_count: U32<LittleEndian>,
    pub i_export_dir_offset: U32<LittleEndian>,
    pub i_export_dir_count: U32<LittleEndian>,
    pub i_text_size: U32<LittleEndian>,
    pub i_code_offset: U32<LittleEndian>,
    pub i_data_offset: U32<LittleEndian>,
    pub i_import_offset: U32<LittleEndian>,
    pub i_code_reloc_offset: U32<LittleEndian>,
    pub i_data_reloc_offset: U32<LittleEndian>,
    pub i_process_priority: U16<LittleEndian>,
    pub i_cpu_identifier: U16<LittleEndian>,
    pub i_uncompressed_size: U32<LittleEndian>,
    pub i_secure_id: U32<LittleEndian>,
    pub i_vendor_id: U32<LittleEndian>,
    pub i_caps1: U32<LittleEndian>,
    pub i_caps2: U32<LittleEndian>,
    pub i_exception_descriptor: U32<LittleEndian>,
    pub i_spare2: U32<LittleEndian>,
    pub i_export_desc_size: U16<LittleEndian>,
    pub i_export_desc_type: u8,
}

const EPOC_SIGNATURE: u32 = u32::from_le_bytes(*b"EPOC");
/// Size of the fixed-offset portion of the header, ending right after `iExportDescType`. The
/// variable-length `iExportDesc[iExportDescSize]` array immediately follows.
pub const FIXED_HEADER_SIZE: usize = 155;

impl E32ImageHeader {
    /// Reads the fixed-offset header out of `data` and validates its schema-mandated defaults
    /// and UID checksum (CRC-32 `iHeaderCrc` is computed but only warned on, per spec §9's Open
    /// Question treatment).
    ///
    /// # Errors
    /// [`Error::TruncatedInput`] if `data` is shorter than [`FIXED_HEADER_SIZE`];
    /// [`Error::ParseError`] if `iSignature` isn't `'EPOC'`;
    /// [`Error::ChecksumMismatch`] if the UID checksum disagrees.
    pub fn parse(data: &[u8]) -> Result<&Self, Error> {
        if data.len() < FIXED_HEADER_SIZE {
            return Err(Error::TruncatedInput { offset: data.len() });
        }
        // SAFETY net: Unaligned + exact-size slice makes this infallible.
        let header = Self::ref_from_bytes(&data[..FIXED_HEADER_SIZE])
            .expect("E32ImageHeader is Unaligned and the slice is exactly its size");

        if header.i_signature.get() != EPOC_SIGNATURE {
            return ParseErrorSnafu { offset: 16, reason: "iSignature is not 'EPOC'" }.fail();
        }

        let computed =
            uid_checksum(header.i_uid1.get(), header.i_uid2.get(), header.i_uid3.get());
        if computed != header.i_uid_checksum.get() {
            return ChecksumMismatchSnafu { offset: 12 }.fail();
        }

        Ok(header)
    }

    #[must_use]
    pub fn compression_type(&self) -> CompressionType {
        CompressionType::from(self.i_compression_type.get())
    }

    #[must_use]
    pub fn cpu_kind(&self) -> CpuKind {
        CpuKind::from_primitive(self.i_cpu_identifier.get())
    }

    /// Checks `iHeaderCrc` against a freshly computed CRC-32 of the header, returning whether
    /// they agree. Per spec §9, a mismatch here is non-fatal; callers should `log::warn!` rather
    /// than abort.
    #[must_use]
    pub fn header_crc_matches(&self, full_header_bytes: &[u8]) -> bool {
        let mut scratch = full_header_bytes.to_vec();
        scratch[20..24].fill(0);
        epoc_core::crc::crc32_ieee(&scratch) == self.i_header_crc.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header_bytes() -> Vec<u8> {
        // S1/S2: UIDs (0x10000079, 0x1000008D, 0x10004A7C) with their checksum embedded.
        let mut bytes = vec![0u8; FIXED_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&0x1000_0079u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&0x1000_008Du32.to_le_bytes());
        bytes[8..12].copy_from_slice(&0x1000_4A7Cu32.to_le_bytes());
        let checksum = uid_checksum(0x1000_0079, 0x1000_008D, 0x1000_4A7C);
        bytes[12..16].copy_from_slice(&checksum.to_le_bytes());
        bytes[16..20].copy_from_slice(b"EPOC");
        bytes
    }

    #[test]
    fn parses_valid_header_and_checks_uid_checksum() {
        let bytes = sample_header_bytes();
        let header = E32ImageHeader::parse(&bytes).unwrap();
        assert_eq!(header.i_uid3.get(), 0x1000_4A7C);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = sample_header_bytes();
        bytes[16..20].copy_from_slice(b"NOPE");
        let err = E32ImageHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn rejects_bad_uid_checksum() {
        let mut bytes = sample_header_bytes();
        bytes[12..16].copy_from_slice(&0u32.to_le_bytes());
        let err = E32ImageHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn compression_type_recognizes_deflate() {
        let mut bytes = sample_header_bytes();
        bytes[28..32].copy_from_slice(&0x101F_7AFCu32.to_le_bytes());
        let header = E32ImageHeader::parse(&bytes).unwrap();
        assert_eq!(header.compression_type(), CompressionType::Deflate);
    }
}
