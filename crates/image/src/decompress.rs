//! Expands the compressed remainder of an E32 image into its raw code+data+export-descriptor
//! image, per `iCompressionType`.
//!
//! Per spec §4.6: "Concatenate the raw header bytes (first `iCodeOffset` bytes) with the
//! decompressed remainder" — the uncompressed prefix carried forward is `iCodeOffset` bytes, not
//! just the fixed 155-byte header; it includes the export descriptor tail too.

use crate::error::{Error, UnsupportedSnafu};
use crate::header::{CompressionType, E32ImageHeader};

/// Returns the fully expanded image, addressable by the offsets stored in `header`.
///
/// # Errors
/// [`Error::Unsupported`] for `BytePair` (spec Non-goal); propagates `epoc-huffman`'s
/// `E32Inflate` failures for `Deflate`.
pub fn expand(data: &[u8], header: &E32ImageHeader) -> Result<Vec<u8>, Error> {
    let code_offset = header.i_code_offset.get() as usize;
    if data.len() < code_offset {
        return Err(Error::TruncatedInput { offset: data.len() });
    }
    let prefix = &data[..code_offset];
    let rest = &data[code_offset..];

    let tail = match header.compression_type() {
        CompressionType::NotCompressed => rest.to_vec(),
        CompressionType::Deflate => epoc_huffman::inflate(rest)?,
        CompressionType::BytePair => {
            return UnsupportedSnafu { reason: "byte-pair compression is not implemented" }.fail()
        }
        CompressionType::Unknown(_) => {
            return UnsupportedSnafu { reason: "unrecognized compression type" }.fail()
        }
    };

    let mut image = Vec::with_capacity(prefix.len() + tail.len());
    image.extend_from_slice(prefix);
    image.extend_from_slice(&tail);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FIXED_HEADER_SIZE;

    fn header_with(compression: u32, code_offset: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; FIXED_HEADER_SIZE];
        bytes[16..20].copy_from_slice(b"EPOC");
        let checksum = epoc_core::crc::uid_checksum(0, 0, 0);
        bytes[12..16].copy_from_slice(&checksum.to_le_bytes());
        bytes[28..32].copy_from_slice(&compression.to_le_bytes());
        bytes[100..104].copy_from_slice(&code_offset.to_le_bytes());
        bytes
    }

    #[test]
    fn passthrough_when_not_compressed() {
        let mut data = header_with(0, FIXED_HEADER_SIZE as u32);
        data.extend_from_slice(&[1, 2, 3, 4]);
        let header = E32ImageHeader::parse(&data).unwrap();
        let expanded = expand(&data, header).unwrap();
        assert_eq!(&expanded[FIXED_HEADER_SIZE..], &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_byte_pair_compression() {
        let data = header_with(0x1028_22AA, FIXED_HEADER_SIZE as u32);
        let header = E32ImageHeader::parse(&data).unwrap();
        let err = expand(&data, header).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
