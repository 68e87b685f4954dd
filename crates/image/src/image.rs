//! `E32Image::load`: the top-level orchestration of header parse, decompression, section
//! consumption, ordinal resolution, and assembly emission. Mirrors the teacher's
//! `BinaryAsset::load` pattern — one driver function that walks a fixed sequence of phases and
//! surfaces a structured result.

use crate::decompress::expand;
use crate::emit::{emit_assembly, relocation_word_map, WordRef};
use crate::error::Error;
use crate::header::{CompressionType, CpuKind, E32ImageHeader};
use crate::ordinal::OrdinalTable;
use crate::sections::{parse_import_section, parse_reloc_section, ImportBlock, Relocation};

/// The fully parsed, decompressed view of an E32 image: sections addressable by the header's
/// own offsets, plus the resolved import and relocation maps.
pub struct E32Image {
    pub compression: CompressionType,
    pub cpu: CpuKind,
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    pub imports: Vec<ImportBlock>,
    pub code_relocs: Vec<Relocation>,
    pub data_relocs: Vec<Relocation>,
    expanded: Vec<u8>,
    code_offset: usize,
    data_offset: usize,
}

impl E32Image {
    /// Loads and fully expands an E32 image from `data`.
    ///
    /// # Errors
    /// See [`E32ImageHeader::parse`] and [`expand`].
    pub fn load(data: &[u8]) -> Result<Self, Error> {
        let header = E32ImageHeader::parse(data)?;
        let compression = header.compression_type();
        let cpu = header.cpu_kind();

        if !header.header_crc_matches(&data[..crate::header::FIXED_HEADER_SIZE]) {
            log::warn!("iHeaderCrc does not match the computed header checksum");
        }

        let expanded = expand(data, header)?;
        let header = E32ImageHeader::parse(&expanded)?;

        let code_offset = header.i_code_offset.get() as usize;
        let code_size = header.i_code_size.get() as usize;
        let data_offset = header.i_data_offset.get() as usize;
        let data_size = header.i_data_size.get() as usize;

        let code = slice_checked(&expanded, code_offset, code_size)?;
        let data = if data_size > 0 {
            slice_checked(&expanded, data_offset, data_size)?
        } else {
            Vec::new()
        };

        let imports = parse_import_section(
            &expanded,
            header.i_import_offset.get() as usize,
            header.i_dll_ref_table_count.get() as usize,
        )?;

        let code_relocs = parse_reloc_section(&expanded, header.i_code_reloc_offset.get() as usize)?;
        let data_relocs = if data_size > 0 {
            parse_reloc_section(&expanded, header.i_data_reloc_offset.get() as usize)?
        } else {
            Vec::new()
        };

        Ok(Self {
            compression,
            cpu,
            code,
            data,
            imports,
            code_relocs,
            data_relocs,
            expanded,
            code_offset,
            data_offset,
        })
    }

    /// Resolves every import entry against `ordinals`, folds relocations and resolved imports
    /// into a single word map, and emits the reassembleable `.s` listing.
    ///
    /// Entries whose DLL/ordinal can't be resolved are left as plain relocation-less literal
    /// words rather than aborting the whole emission, since an unresolved import is common when
    /// `ordinals` wasn't built from a complete `.def` corpus; callers that want strict behavior
    /// should check [`Self::imports`] against `ordinals` themselves first.
    pub fn emit_assembly(&self, ordinals: &OrdinalTable) -> Result<String, Error> {
        let header = E32ImageHeader::parse(&self.expanded)?;

        let mut words = relocation_word_map(&self.code_relocs);
        words.extend(relocation_word_map(&self.data_relocs));

        let mut address = header.i_import_offset.get();
        for block in &self.imports {
            // Each block's own two u32 header words precede its ordinal entries.
            address += 8;
            for &entry in &block.entries {
                let ordinal = entry % 0x1000;
                let addend = entry / 0x1000;
                match ordinals.resolve(&block.dll_name, ordinal) {
                    Ok(symbol) => {
                        words.insert(address, WordRef::Symbol { symbol: symbol.to_string(), addend });
                    }
                    Err(_) => log::debug!(
                        "no ordinal table entry for {}@{ordinal}, emitting literal word",
                        block.dll_name
                    ),
                }
                address += 4;
            }
        }

        emit_assembly(
            self.cpu,
            header,
            &self.code,
            &self.data,
            self.code_offset as u32,
            self.data_offset as u32,
            &words,
        )
    }
}

fn slice_checked(data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, Error> {
    data.get(offset..offset + len)
        .map(<[u8]>::to_vec)
        .ok_or(Error::TruncatedInput { offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FIXED_HEADER_SIZE;

    fn minimal_image() -> Vec<u8> {
        let mut bytes = vec![0u8; FIXED_HEADER_SIZE];
        bytes[16..20].copy_from_slice(b"EPOC");
        let checksum = epoc_core::crc::uid_checksum(0, 0, 0);
        bytes[12..16].copy_from_slice(&checksum.to_le_bytes());

        let code_offset = FIXED_HEADER_SIZE as u32;
        bytes[100..104].copy_from_slice(&code_offset.to_le_bytes()); // iCodeOffset
        bytes[48..52].copy_from_slice(&4u32.to_le_bytes()); // iCodeSize

        // iDllRefTableCount stays 0, so the import section is never actually read.
        let code_reloc_offset = code_offset + 4;
        bytes[112..116].copy_from_slice(&code_reloc_offset.to_le_bytes());

        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]); // code bytes
        bytes.extend_from_slice(&8u32.to_le_bytes()); // reloc section iSize (header only)
        bytes.extend_from_slice(&0u32.to_le_bytes()); // iNumberOfRelocs
        bytes
    }

    #[test]
    fn loads_minimal_uncompressed_image() {
        let bytes = minimal_image();
        let image = E32Image::load(&bytes).unwrap();
        assert_eq!(image.code, vec![0xAA, 0xBB, 0xCC, 0xDD]);
        assert!(image.imports.is_empty());
        assert!(image.code_relocs.is_empty());
    }
}
