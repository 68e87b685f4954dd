//! The top-level SIS extraction walk: `Contents -> Controller -> InstallBlock -> Files`, paired
//! against `Contents -> Data -> DataUnits[0] -> FileData[FileIndex]` for each file's bytes.

use std::fs;
use std::path::{Path, PathBuf};

use epoc_core::data::{DataCursorRef, Endian};

use crate::error::Error;
use crate::field::{parse_field, parse_field_from_bytes, SisController, SisField, SisFileDescription};
use crate::header::SymbianFileHeader;

/// One extracted file: the path it was written to, and the install metadata it came from.
#[derive(Debug)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub descriptor: SisFileDescription,
}

/// Parses a complete SIS package and writes every installable file under `output_dir`.
///
/// Embedded SIS packages (`SISInstallBlock::EmbeddedSISFiles`) and conditional install blocks
/// (`SISIf`/`SISElseIf`) are walked only to the extent their files appear in the controller's
/// top-level `Files` array — nested installers are not recursively extracted (spec Non-goal).
///
/// # Errors
/// [`Error::ParseError`] if the package doesn't follow the `Contents -> Controller ->
/// InstallBlock` shape; [`Error::Io`] if a file can't be written.
pub fn extract_sis(data: &[u8], output_dir: &Path) -> Result<Vec<ExtractedFile>, Error> {
    let mut cursor = DataCursorRef::new(data, Endian::Little);
    SymbianFileHeader::parse(&mut cursor)?;

    let contents = match parse_field(&mut cursor)? {
        SisField::Contents(contents) => contents,
        _ => {
            return Err(Error::ParseError {
                offset: 0,
                reason: "SIS package root record is not SISContents",
            })
        }
    };

    let controller = match parse_field_from_bytes(&contents.controller.data)? {
        SisField::Controller(controller) => controller,
        _ => {
            return Err(Error::ParseError {
                offset: 0,
                reason: "decompressed controller payload is not SISController",
            })
        }
    };

    let data_unit = contents
        .data
        .data_units
        .first()
        .ok_or(Error::ParseError { offset: 0, reason: "SISData has no SISDataUnit entries" })?;

    fs::create_dir_all(output_dir)?;

    let mut extracted = Vec::with_capacity(controller.install_block.files.len());
    for descriptor in &controller.install_block.files {
        let index = descriptor.file_index as usize;
        let file_data = data_unit.file_data.get(index).ok_or(Error::ParseError {
            offset: 0,
            reason: "SISFileDescription.FileIndex has no matching SISFileData entry",
        })?;

        let name = target_file_name(&descriptor.target, descriptor.file_index);
        let path = output_dir.join(name);
        fs::write(&path, &file_data.file_data.data)?;

        extracted.push(ExtractedFile { path, descriptor: descriptor.clone() });
    }

    log::info!("extracted {} file(s) to {}", extracted.len(), output_dir.display());
    Ok(extracted)
}

/// Parses just the `SISController`, given the raw (still-compressed) `Controller` bytes lifted
/// out of a `Contents` record — useful for `identify`-style summaries that don't need the data
/// section.
///
/// # Errors
/// Propagates [`parse_field_from_bytes`]'s errors; [`Error::ParseError`] if the decompressed
/// payload isn't a `SISController`.
pub fn parse_controller(controller_bytes: &[u8]) -> Result<SisController, Error> {
    match parse_field_from_bytes(controller_bytes)? {
        SisField::Controller(controller) => Ok(controller),
        _ => Err(Error::ParseError { offset: 0, reason: "decompressed controller payload is not SISController" }),
    }
}

/// Mirrors the original extractor's `target.split('\\')[-1] or "%d" % file_index` fallback: a
/// target path with no usable basename is named after its index instead.
fn target_file_name(target: &str, file_index: u32) -> String {
    let basename = target.rsplit('\\').next().unwrap_or(target).trim();
    if basename.is_empty() {
        file_index.to_string()
    } else {
        basename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::TField;

    fn write_header(buf: &mut Vec<u8>, tag: TField, payload: &[u8]) {
        buf.extend_from_slice(&(tag as u32).to_le_bytes());
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(payload);
    }

    fn string_field(text: &str) -> Vec<u8> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut payload = Vec::new();
        for unit in units {
            payload.extend_from_slice(&unit.to_le_bytes());
        }
        let mut field = Vec::new();
        write_header(&mut field, TField::SisString, &payload);
        field
    }

    fn array_field(tag: TField, elements: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(tag as u32).to_le_bytes());
        for element in elements {
            // Element = Length + body, Type omitted (inherited from the array's own tag).
            payload.extend_from_slice(&(element.len() as u32).to_le_bytes());
            payload.extend_from_slice(element);
        }
        let mut field = Vec::new();
        write_header(&mut field, TField::SisArray, &payload);
        field
    }

    fn uid_field(uid1: u32) -> Vec<u8> {
        let mut field = Vec::new();
        write_header(&mut field, TField::SisUid, &uid1.to_le_bytes());
        field
    }

    fn version_field(major: u32, minor: u32, build: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&major.to_le_bytes());
        payload.extend_from_slice(&minor.to_le_bytes());
        payload.extend_from_slice(&build.to_le_bytes());
        let mut field = Vec::new();
        write_header(&mut field, TField::SisVersion, &payload);
        field
    }

    fn date_time_field() -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2010u16.to_le_bytes());
        payload.push(1);
        payload.push(1);
        payload.extend_from_slice(&[0, 0, 0]);
        let mut field = Vec::new();
        write_header(&mut field, TField::SisDateTime, &payload);
        field
    }

    fn hash_field() -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes());
        let mut blob = Vec::new();
        write_header(&mut blob, TField::SisBlob, &[]);
        payload.extend_from_slice(&blob);
        let mut field = Vec::new();
        write_header(&mut field, TField::SisHash, &payload);
        field
    }

    fn checksum_field(tag: TField, value: u16) -> Vec<u8> {
        let mut field = Vec::new();
        write_header(&mut field, tag, &value.to_le_bytes());
        field
    }

    fn file_description_field(target: &str, mime: &str, file_index: u32, length: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&string_field(target));
        payload.extend_from_slice(&string_field(mime));
        payload.extend_from_slice(&hash_field());
        payload.extend_from_slice(&0u32.to_le_bytes()); // Operation
        payload.extend_from_slice(&0u32.to_le_bytes()); // OperationOptions
        payload.extend_from_slice(&u64::from(length).to_le_bytes()); // FileLength
        payload.extend_from_slice(&u64::from(length).to_le_bytes()); // UncompressedLength
        payload.extend_from_slice(&file_index.to_le_bytes());
        let mut field = Vec::new();
        write_header(&mut field, TField::SisFileDescription, &payload);
        field
    }

    fn compressed_none_field(tag: TField, raw: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes()); // Algorithm = None
        payload.extend_from_slice(&(raw.len() as u64).to_le_bytes());
        payload.extend_from_slice(raw);
        let mut field = Vec::new();
        write_header(&mut field, tag, &payload);
        field
    }

    fn minimal_controller_bytes() -> Vec<u8> {
        let file_desc = file_description_field("\\data\\hello.txt", "text/plain", 0, 5);

        let info_payload = {
            let mut p = Vec::new();
            p.extend_from_slice(&uid_field(0x1000_4A7C));
            p.extend_from_slice(&string_field("vendor"));
            p.extend_from_slice(&array_field(TField::SisString, &[]));
            p.extend_from_slice(&array_field(TField::SisString, &[]));
            p.extend_from_slice(&version_field(1, 0, 0));
            p.extend_from_slice(&date_time_field());
            p.push(0); // InstallType
            p.push(0); // InstallFlags
            p
        };
        let mut info = Vec::new();
        write_header(&mut info, TField::SisInfo, &info_payload);

        let options = array_field(TField::SisSupportedOption, &[]);
        let mut supported_options = Vec::new();
        write_header(&mut supported_options, TField::SisSupportedOptions, &options);

        let languages = array_field(TField::SisLanguage, &[]);
        let mut supported_languages = Vec::new();
        write_header(&mut supported_languages, TField::SisSupportedLanguages, &languages);

        let mut prerequisites_payload = Vec::new();
        prerequisites_payload.extend_from_slice(&array_field(TField::SisDependency, &[]));
        prerequisites_payload.extend_from_slice(&array_field(TField::SisDependency, &[]));
        let mut prerequisites = Vec::new();
        write_header(&mut prerequisites, TField::SisPrerequisites, &prerequisites_payload);

        let properties_payload = array_field(TField::SisProperty, &[]);
        let mut properties = Vec::new();
        write_header(&mut properties, TField::SisProperties, &properties_payload);

        // Peek-byte marker: next record's low byte must equal TField::SisInstallBlock to skip
        // the optional Logo per `parse_controller`'s `peek_matches` check.
        let install_block_payload = {
            let mut p = Vec::new();
            p.extend_from_slice(&array_field(TField::SisFileDescription, &[file_desc]));
            p.extend_from_slice(&array_field(TField::SisInstallBlock, &[]));
            p.extend_from_slice(&array_field(TField::SisIf, &[]));
            p
        };
        let mut install_block = Vec::new();
        write_header(&mut install_block, TField::SisInstallBlock, &install_block_payload);

        let signatures_payload = {
            let mut p = Vec::new();
            p.extend_from_slice(&array_field(TField::SisSignature, &[]));
            let mut chain = Vec::new();
            let mut blob = Vec::new();
            write_header(&mut blob, TField::SisBlob, &[]);
            write_header(&mut chain, TField::SisCertificateChain, &blob);
            p.extend_from_slice(&chain);
            p
        };
        let mut signature0 = Vec::new();
        write_header(&mut signature0, TField::SisSignatureCertificateChain, &signatures_payload);

        let mut data_index = Vec::new();
        write_header(&mut data_index, TField::SisDataIndex, &0u32.to_le_bytes());

        let mut controller_payload = Vec::new();
        controller_payload.extend_from_slice(&info);
        controller_payload.extend_from_slice(&supported_options);
        controller_payload.extend_from_slice(&supported_languages);
        controller_payload.extend_from_slice(&prerequisites);
        controller_payload.extend_from_slice(&properties);
        controller_payload.extend_from_slice(&install_block);
        controller_payload.extend_from_slice(&signature0);
        controller_payload.extend_from_slice(&data_index);

        let mut controller = Vec::new();
        write_header(&mut controller, TField::SisController, &controller_payload);
        controller
    }

    fn minimal_sis_bytes() -> Vec<u8> {
        let controller_bytes = minimal_controller_bytes();
        let controller = compressed_none_field(TField::SisCompressed, &controller_bytes);

        let file_data = compressed_none_field(TField::SisCompressed, b"hello");
        let file_data_array = array_field(TField::SisFileData, &[file_data]);
        let mut data_unit = Vec::new();
        write_header(&mut data_unit, TField::SisDataUnit, &file_data_array);
        let data_units = array_field(TField::SisDataUnit, &[data_unit]);
        let mut data = Vec::new();
        write_header(&mut data, TField::SisData, &data_units);

        let mut contents_payload = Vec::new();
        contents_payload.extend_from_slice(&checksum_field(TField::SisControllerChecksum, 0));
        contents_payload.extend_from_slice(&checksum_field(TField::SisDataChecksum, 0));
        contents_payload.extend_from_slice(&controller);
        contents_payload.extend_from_slice(&data);
        let mut contents = Vec::new();
        write_header(&mut contents, TField::SisContents, &contents_payload);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&crate::header::UID1_DEFAULT.to_le_bytes());
        bytes.extend_from_slice(&crate::header::UID2_DEFAULT.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // UID3: any app UID is accepted
        let checksum = epoc_core::crc::uid_checksum(crate::header::UID1_DEFAULT, crate::header::UID2_DEFAULT, 0);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes.extend_from_slice(&contents);
        bytes
    }

    #[test]
    fn extracts_single_file_to_output_dir() {
        let bytes = minimal_sis_bytes();
        let output_dir = std::env::temp_dir().join(format!("epoc-sis-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&output_dir);

        let extracted = extract_sis(&bytes, &output_dir).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].path.file_name().unwrap(), "hello.txt");

        let written = fs::read(&extracted[0].path).unwrap();
        assert_eq!(written, b"hello");

        fs::remove_dir_all(&output_dir).unwrap();
    }

    #[test]
    fn rejects_root_record_that_is_not_contents() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&crate::header::UID1_DEFAULT.to_le_bytes());
        bytes.extend_from_slice(&crate::header::UID2_DEFAULT.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        let checksum = epoc_core::crc::uid_checksum(crate::header::UID1_DEFAULT, crate::header::UID2_DEFAULT, 0);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes.extend_from_slice(&uid_field(0));

        let output_dir = std::env::temp_dir().join("epoc-sis-test-rejects");
        let err = extract_sis(&bytes, &output_dir).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }
}
