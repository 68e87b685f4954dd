//! The SIS tagged-union field schema: `TField`, the `SISField` sum type, and a hand-written
//! `parse` function per concrete record built out of [`epoc_struct`]'s primitives — following
//! `epoc_struct::directives`'s module-doc decision against a generic schema interpreter.

use epoc_core::data::{DataCursorRef, DataCursorTrait, Endian, EndianRead};
use epoc_struct::prelude::*;
use num_enum::TryFromPrimitive;

use crate::error::{Error, ParseErrorSnafu};

/// SIS record alignment: every record starts on a 4-byte boundary (spec §4.3).
const ALIGNMENT: usize = 4;

/// `TField`: the 32-bit tag every `SISField` record opens with, 0..41.
#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum TField {
    Invalid = 0,
    SisString = 1,
    SisArray = 2,
    SisCompressed = 3,
    SisVersion = 4,
    SisVersionRange = 5,
    SisDate = 6,
    SisTime = 7,
    SisDateTime = 8,
    SisUid = 9,
    Unused = 10,
    SisLanguage = 11,
    SisContents = 12,
    SisController = 13,
    SisInfo = 14,
    SisSupportedLanguages = 15,
    SisSupportedOptions = 16,
    SisPrerequisites = 17,
    SisDependency = 18,
    SisProperties = 19,
    SisProperty = 20,
    SisSignatures = 21,
    SisCertificateChain = 22,
    SisLogo = 23,
    SisFileDescription = 24,
    SisHash = 25,
    SisIf = 26,
    SisElseIf = 27,
    SisInstallBlock = 28,
    SisExpression = 29,
    SisData = 30,
    SisDataUnit = 31,
    SisFileData = 32,
    SisSupportedOption = 33,
    SisControllerChecksum = 34,
    SisDataChecksum = 35,
    SisSignature = 36,
    SisBlob = 37,
    SisSignatureAlgorithm = 38,
    SisSignatureCertificateChain = 39,
    SisDataIndex = 40,
    SisCapabilities = 41,
}

/// `TCompressionAlgorithm`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum CompressionAlgorithm {
    None = 0,
    Deflate = 1,
}

#[derive(Debug, Clone, Default)]
pub struct SisVersion {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
}

#[derive(Debug, Clone, Default)]
pub struct SisVersionRange {
    pub from: SisVersion,
    pub to: SisVersion,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SisDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SisTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SisDateTime {
    pub date: SisDate,
    pub time: SisTime,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SisUid {
    pub uid1: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SisLanguage {
    pub language: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SisProperty {
    pub key: i32,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SisDataIndex {
    pub data_index: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SisChecksum {
    pub checksum: u16,
}

#[derive(Debug, Clone, Default)]
pub struct SisInfo {
    pub uid: SisUid,
    pub vendor_unique_name: String,
    pub names: Vec<String>,
    pub vendor_names: Vec<String>,
    pub version: SisVersion,
    pub creation_time: SisDateTime,
    pub install_type: u8,
    pub install_flags: u8,
}

#[derive(Debug, Clone, Default)]
pub struct SisSupportedLanguages {
    pub languages: Vec<SisLanguage>,
}

#[derive(Debug, Clone, Default)]
pub struct SisSupportedOption {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SisSupportedOptions {
    pub options: Vec<SisSupportedOption>,
}

#[derive(Debug, Clone, Default)]
pub struct SisDependency {
    pub uid: SisUid,
    pub version_range: SisVersionRange,
    pub dependency_names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SisPrerequisites {
    pub target_devices: Vec<SisDependency>,
    pub dependencies: Vec<SisDependency>,
}

#[derive(Debug, Clone, Default)]
pub struct SisProperties {
    pub properties: Vec<SisProperty>,
}

#[derive(Debug, Clone, Default)]
pub struct SisCapabilities {
    pub capabilities: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct SisBlob {
    pub blob: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SisHash {
    pub hash_algorithm: u32,
    pub hash_data: SisBlob,
}

/// `SISCompressed[T]`: `Algorithm`/`UncompressedDataSize` plus the decompressed payload, stored
/// as raw bytes rather than templated over a Rust type — callers re-parse it as whatever `T`
/// their call site expects (a nested `SISController`, or a raw file's contents).
#[derive(Debug, Clone, Default)]
pub struct SisCompressed {
    pub algorithm: u32,
    pub uncompressed_data_size: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SisFileDescription {
    pub target: String,
    pub mime_type: String,
    pub capabilities: Option<SisCapabilities>,
    pub hash: SisHash,
    pub operation: u32,
    pub operation_options: u32,
    pub file_length: u64,
    pub uncompressed_length: u64,
    pub file_index: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SisLogo {
    pub logo_file: SisFileDescription,
}

#[derive(Debug, Clone, Default)]
pub struct SisInstallBlock {
    pub files: Vec<SisFileDescription>,
    pub embedded_sis_files: Vec<SisField>,
    pub if_blocks: Vec<SisField>,
}

#[derive(Debug, Clone, Default)]
pub struct SisCertificateChain {
    pub certificate_data: SisBlob,
}

#[derive(Debug, Clone, Default)]
pub struct SisSignatureAlgorithm {
    pub algorithm_identifier: String,
}

#[derive(Debug, Clone, Default)]
pub struct SisSignature {
    pub signature_algorithm: SisSignatureAlgorithm,
    pub signature_data: SisBlob,
}

#[derive(Debug, Clone, Default)]
pub struct SisSignatureCertificateChain {
    pub signatures: Vec<SisSignature>,
    pub certificate_chain: SisCertificateChain,
}

#[derive(Debug, Clone, Default)]
pub struct SisController {
    pub info: SisInfo,
    pub options: SisSupportedOptions,
    pub languages: SisSupportedLanguages,
    pub prerequisites: SisPrerequisites,
    pub properties: SisProperties,
    pub logo: Option<SisLogo>,
    pub install_block: SisInstallBlock,
    pub signature0: SisSignatureCertificateChain,
    pub data_index: SisDataIndex,
}

#[derive(Debug, Clone, Default)]
pub struct SisFileData {
    pub file_data: SisCompressed,
}

#[derive(Debug, Clone, Default)]
pub struct SisDataUnit {
    pub file_data: Vec<SisFileData>,
}

#[derive(Debug, Clone, Default)]
pub struct SisData {
    pub data_units: Vec<SisDataUnit>,
}

#[derive(Debug, Clone, Default)]
pub struct SisContents {
    pub controller_checksum: SisChecksum,
    pub data_checksum: SisChecksum,
    /// `SISCompressed[SISController]`'s raw decompressed bytes, re-parsed by the extractor.
    pub controller: SisCompressed,
    pub data: SisData,
}

/// `SISExpression`/`SISIf`/`SISElseIf`: parsed but never evaluated (spec §9 Open Question).
#[derive(Debug, Clone, Default)]
pub struct SisExpression {
    pub operator: u32,
    pub integer_value: i32,
    pub string_value: Option<String>,
    pub left_expression: Option<Box<SisField>>,
    pub right_expression: Box<SisField>,
}

#[derive(Debug, Clone, Default)]
pub struct SisElseIf {
    pub expression: SisExpression,
    pub install_block: SisInstallBlock,
}

#[derive(Debug, Clone, Default)]
pub struct SisIf {
    pub expression: SisExpression,
    pub install_block: SisInstallBlock,
    pub else_ifs: Vec<SisElseIf>,
}

/// The tagged-union sum type every `SISField` record parses into, discriminated on [`TField`].
#[derive(Debug, Clone, Default)]
pub enum SisField {
    #[default]
    Invalid,
    String(String),
    Array(Vec<SisField>),
    Compressed(SisCompressed),
    Version(SisVersion),
    VersionRange(SisVersionRange),
    Date(SisDate),
    Time(SisTime),
    DateTime(SisDateTime),
    Uid(SisUid),
    Unused,
    Language(SisLanguage),
    Contents(SisContents),
    Controller(SisController),
    Info(SisInfo),
    SupportedLanguages(SisSupportedLanguages),
    SupportedOptions(SisSupportedOptions),
    Prerequisites(SisPrerequisites),
    Dependency(SisDependency),
    Properties(SisProperties),
    Property(SisProperty),
    /// No concrete record is ever defined for this tag in the original schema; carried as an
    /// opaque, unevaluated payload so a well-formed SIS that declares one doesn't abort.
    Signatures(Vec<u8>),
    CertificateChain(SisCertificateChain),
    Logo(SisLogo),
    FileDescription(SisFileDescription),
    Hash(SisHash),
    If(SisIf),
    ElseIf(SisElseIf),
    InstallBlock(SisInstallBlock),
    Expression(SisExpression),
    Data(SisData),
    DataUnit(SisDataUnit),
    FileData(SisFileData),
    SupportedOption(SisSupportedOption),
    ControllerChecksum(SisChecksum),
    DataChecksum(SisChecksum),
    Signature(SisSignature),
    Blob(SisBlob),
    SignatureAlgorithm(SisSignatureAlgorithm),
    SignatureCertificateChain(SisSignatureCertificateChain),
    DataIndex(SisDataIndex),
    Capabilities(SisCapabilities),
}

/// Parses one full `SISField` record: `{Type, Length}` followed by the subclass's own fields,
/// re-typed by `Type` per spec §4.7.
///
/// # Errors
/// [`Error::Unsupported`] for an out-of-range tag; propagates whatever the dispatched parser
/// returns.
pub fn parse_field(cursor: &mut DataCursorRef) -> Result<SisField, Error> {
    align(cursor, ALIGNMENT)?;
    let offset = cursor.position();
    let tag_value = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    let tag = TField::try_from_primitive(tag_value)
        .map_err(|_| Error::Unsupported { reason: "unrecognized TField tag" })?;
    parse_field_body(cursor, tag)
}

/// Parses a record's body given an already-known `tag` — used both by [`parse_field`] (tag read
/// fresh from the stream) and by array elements (tag inherited from the array's `SISFieldType`,
/// never re-read per element).
fn parse_field_body(cursor: &mut DataCursorRef, tag: TField) -> Result<SisField, Error> {
    let offset = cursor.position();
    let declared_length = read_efficient_length(cursor)? as usize;
    let payload_start = cursor.position();
    let frame_end = payload_start + declared_length;

    let value = match tag {
        TField::Invalid => SisField::Invalid,
        TField::Unused => SisField::Unused,
        TField::SisString => SisField::String(read_utf16_string(cursor, frame_end)?),
        TField::SisArray => SisField::Array(parse_array_field(cursor, frame_end)?),
        TField::SisCompressed => SisField::Compressed(parse_compressed(cursor, frame_end)?),
        TField::SisVersion => SisField::Version(parse_version(cursor)?),
        TField::SisVersionRange => SisField::VersionRange(parse_version_range(cursor)?),
        TField::SisDate => SisField::Date(parse_date(cursor)?),
        TField::SisTime => SisField::Time(parse_time(cursor)?),
        TField::SisDateTime => SisField::DateTime(parse_date_time(cursor)?),
        TField::SisUid => SisField::Uid(parse_uid(cursor)?),
        TField::SisLanguage => SisField::Language(parse_language(cursor)?),
        TField::SisContents => SisField::Contents(parse_contents(cursor)?),
        TField::SisController => SisField::Controller(parse_controller(cursor)?),
        TField::SisInfo => SisField::Info(parse_info(cursor)?),
        TField::SisSupportedLanguages => {
            SisField::SupportedLanguages(parse_supported_languages(cursor, frame_end)?)
        }
        TField::SisSupportedOptions => {
            SisField::SupportedOptions(parse_supported_options(cursor, frame_end)?)
        }
        TField::SisPrerequisites => SisField::Prerequisites(parse_prerequisites(cursor, frame_end)?),
        TField::SisDependency => SisField::Dependency(parse_dependency(cursor, frame_end)?),
        TField::SisProperties => SisField::Properties(parse_properties(cursor, frame_end)?),
        TField::SisProperty => SisField::Property(parse_property(cursor)?),
        TField::SisSignatures => {
            let bytes = cursor
                .get_slice(frame_end - cursor.position())
                .map_err(|_| Error::TruncatedInput { offset })?;
            SisField::Signatures(bytes.to_vec())
        }
        TField::SisCertificateChain => SisField::CertificateChain(parse_certificate_chain(cursor)?),
        TField::SisLogo => SisField::Logo(parse_logo(cursor)?),
        TField::SisFileDescription => SisField::FileDescription(parse_file_description(cursor, frame_end)?),
        TField::SisHash => SisField::Hash(parse_hash(cursor)?),
        TField::SisIf => SisField::If(parse_if(cursor, frame_end)?),
        TField::SisElseIf => SisField::ElseIf(parse_else_if(cursor)?),
        TField::SisInstallBlock => SisField::InstallBlock(parse_install_block(cursor, frame_end)?),
        TField::SisExpression => SisField::Expression(parse_expression(cursor, frame_end)?),
        TField::SisData => SisField::Data(parse_data(cursor, frame_end)?),
        TField::SisDataUnit => SisField::DataUnit(parse_data_unit(cursor, frame_end)?),
        TField::SisFileData => SisField::FileData(parse_file_data(cursor)?),
        TField::SisSupportedOption => SisField::SupportedOption(parse_supported_option(cursor, frame_end)?),
        TField::SisControllerChecksum => SisField::ControllerChecksum(parse_checksum(cursor)?),
        TField::SisDataChecksum => SisField::DataChecksum(parse_checksum(cursor)?),
        TField::SisSignature => SisField::Signature(parse_signature(cursor)?),
        TField::SisBlob => SisField::Blob(parse_blob(cursor, frame_end)?),
        TField::SisSignatureAlgorithm => SisField::SignatureAlgorithm(parse_signature_algorithm(cursor, frame_end)?),
        TField::SisSignatureCertificateChain => {
            SisField::SignatureCertificateChain(parse_signature_certificate_chain(cursor, frame_end)?)
        }
        TField::SisDataIndex => SisField::DataIndex(parse_data_index(cursor)?),
        TField::SisCapabilities => SisField::Capabilities(parse_capabilities(cursor, frame_end)?),
    };

    let actual = cursor.position() - payload_start;
    check_payload_length(offset, declared_length, actual, ALIGNMENT)?;
    while cursor.position() < frame_end {
        let byte = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset: cursor.position() })?;
        if byte != 0 {
            return ParseErrorSnafu { offset: cursor.position() - 1, reason: "non-zero trailing padding" }
                .fail();
        }
    }

    Ok(value)
}

/// Parses an array's own frame: `SISFieldType: u32` then `Contents: Array['_tp']`, every element
/// sharing the array's declared tag (never re-reading a per-element `Type`).
///
/// Doesn't go through [`epoc_struct::array::parse_array`]: that helper's element closure is
/// pinned to `epoc_struct::Error`, but an element here is a full `SISField` record that can
/// itself fail with any `epoc_sis` error (an unresolved compression algorithm, say) — so the loop
/// is reimplemented directly against [`array_should_continue`].
fn parse_array_field(cursor: &mut DataCursorRef, frame_end: usize) -> Result<Vec<SisField>, Error> {
    let offset = cursor.position();
    let element_tag_value = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    let element_tag = TField::try_from_primitive(element_tag_value)
        .map_err(|_| Error::Unsupported { reason: "unrecognized SISFieldType tag" })?;

    let mut elements = Vec::new();
    while array_should_continue(elements.len(), usize::MAX, cursor.position(), frame_end, ALIGNMENT) {
        align(cursor, ALIGNMENT)?;
        elements.push(parse_field_body(cursor, element_tag)?);
    }
    Ok(elements)
}

fn parse_compressed(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisCompressed, Error> {
    let offset = cursor.position();
    let algorithm = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    let uncompressed_data_size = read_u64(cursor)?;

    let algo = CompressionAlgorithm::try_from_primitive(algorithm)
        .map_err(|_| Error::Unsupported { reason: "unrecognized SIS compression algorithm" })?;

    let data = match algo {
        CompressionAlgorithm::None => cursor
            .get_slice(uncompressed_data_size as usize)
            .map_err(|_| Error::TruncatedInput { offset: cursor.position() })?
            .to_vec(),
        CompressionAlgorithm::Deflate => {
            let remaining = cursor
                .get_slice(frame_end - cursor.position())
                .map_err(|_| Error::TruncatedInput { offset: cursor.position() })?;
            inflate_zlib(remaining, uncompressed_data_size as usize)?
        }
    };

    Ok(SisCompressed { algorithm, uncompressed_data_size, data })
}

fn inflate_zlib(compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, Error> {
    use epoc_huffman::prelude::ZlibStream;

    let mut stream = ZlibStream::new(compressed);
    Ok(stream.read(uncompressed_size)?)
}

fn read_u64(cursor: &mut DataCursorRef) -> Result<u64, Error> {
    let offset = cursor.position();
    let low = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    let high = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 4 })?;
    Ok(u64::from(low) | (u64::from(high) << 32))
}

fn parse_version(cursor: &mut DataCursorRef) -> Result<SisVersion, Error> {
    let offset = cursor.position();
    let major = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })? as i32;
    let minor = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 4 })? as i32;
    let build = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 8 })? as i32;
    Ok(SisVersion { major, minor, build })
}

fn parse_version_range(cursor: &mut DataCursorRef) -> Result<SisVersionRange, Error> {
    let from = parse_version(cursor)?;
    let to = parse_version(cursor)?;
    Ok(SisVersionRange { from, to })
}

fn parse_date(cursor: &mut DataCursorRef) -> Result<SisDate, Error> {
    let offset = cursor.position();
    let year = cursor.read_u16().map_err(|_| Error::TruncatedInput { offset })?;
    let month = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset: offset + 2 })?;
    let day = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset: offset + 3 })?;
    Ok(SisDate { year, month, day })
}

fn parse_time(cursor: &mut DataCursorRef) -> Result<SisTime, Error> {
    let offset = cursor.position();
    let hours = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset })?;
    let minutes = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset: offset + 1 })?;
    let seconds = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset: offset + 2 })?;
    Ok(SisTime { hours, minutes, seconds })
}

fn parse_date_time(cursor: &mut DataCursorRef) -> Result<SisDateTime, Error> {
    let date = parse_date(cursor)?;
    let time = parse_time(cursor)?;
    Ok(SisDateTime { date, time })
}

fn parse_uid(cursor: &mut DataCursorRef) -> Result<SisUid, Error> {
    let offset = cursor.position();
    let uid1 = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })? as i32;
    Ok(SisUid { uid1 })
}

fn parse_language(cursor: &mut DataCursorRef) -> Result<SisLanguage, Error> {
    let offset = cursor.position();
    let language = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    Ok(SisLanguage { language })
}

fn parse_property(cursor: &mut DataCursorRef) -> Result<SisProperty, Error> {
    let offset = cursor.position();
    let key = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })? as i32;
    let value = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 4 })? as i32;
    Ok(SisProperty { key, value })
}

fn parse_data_index(cursor: &mut DataCursorRef) -> Result<SisDataIndex, Error> {
    let offset = cursor.position();
    let data_index = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    Ok(SisDataIndex { data_index })
}

fn parse_checksum(cursor: &mut DataCursorRef) -> Result<SisChecksum, Error> {
    let offset = cursor.position();
    let checksum = cursor.read_u16().map_err(|_| Error::TruncatedInput { offset })?;
    Ok(SisChecksum { checksum })
}

fn parse_blob(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisBlob, Error> {
    let offset = cursor.position();
    let blob = cursor
        .get_slice(frame_end - offset)
        .map_err(|_| Error::TruncatedInput { offset })?
        .to_vec();
    Ok(SisBlob { blob })
}

fn parse_hash(cursor: &mut DataCursorRef) -> Result<SisHash, Error> {
    let offset = cursor.position();
    let hash_algorithm = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    let hash_data = expect_blob(cursor)?;
    Ok(SisHash { hash_algorithm, hash_data })
}

fn parse_capabilities(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisCapabilities, Error> {
    let mut capabilities = Vec::new();
    while frame_end.saturating_sub(cursor.position()) >= 4 {
        let offset = cursor.position();
        capabilities.push(cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?);
    }
    Ok(SisCapabilities { capabilities })
}

fn parse_info(cursor: &mut DataCursorRef) -> Result<SisInfo, Error> {
    let uid = expect_uid(cursor)?;
    let vendor_unique_name = expect_string(cursor)?;
    let names = expect_string_array(cursor)?;
    let vendor_names = expect_string_array(cursor)?;
    let version = expect_version(cursor)?;
    let creation_time = expect_date_time(cursor)?;
    let offset = cursor.position();
    let install_type = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset })?;
    let install_flags = cursor.read_u8().map_err(|_| Error::TruncatedInput { offset: offset + 1 })?;
    Ok(SisInfo {
        uid,
        vendor_unique_name,
        names,
        vendor_names,
        version,
        creation_time,
        install_type,
        install_flags,
    })
}

fn parse_supported_languages(
    cursor: &mut DataCursorRef,
    frame_end: usize,
) -> Result<SisSupportedLanguages, Error> {
    let _ = frame_end;
    let languages = expect_array(cursor, |v| match v {
        SisField::Language(language) => Some(language),
        _ => None,
    })?;
    Ok(SisSupportedLanguages { languages })
}

fn parse_supported_option(
    cursor: &mut DataCursorRef,
    frame_end: usize,
) -> Result<SisSupportedOption, Error> {
    let _ = frame_end;
    let names = expect_string_array(cursor)?;
    Ok(SisSupportedOption { names })
}

fn parse_supported_options(
    cursor: &mut DataCursorRef,
    frame_end: usize,
) -> Result<SisSupportedOptions, Error> {
    let _ = frame_end;
    let options = expect_array(cursor, |v| match v {
        SisField::SupportedOption(option) => Some(option),
        _ => None,
    })?;
    Ok(SisSupportedOptions { options })
}

fn parse_dependency(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisDependency, Error> {
    let _ = frame_end;
    let uid = expect_uid(cursor)?;
    let version_range = expect_version_range(cursor)?;
    let dependency_names = expect_string_array(cursor)?;
    Ok(SisDependency { uid, version_range, dependency_names })
}

fn parse_prerequisites(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisPrerequisites, Error> {
    let _ = frame_end;
    let target_devices = expect_array(cursor, |v| match v {
        SisField::Dependency(dep) => Some(dep),
        _ => None,
    })?;
    let dependencies = expect_array(cursor, |v| match v {
        SisField::Dependency(dep) => Some(dep),
        _ => None,
    })?;
    Ok(SisPrerequisites { target_devices, dependencies })
}

fn parse_properties(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisProperties, Error> {
    let _ = frame_end;
    let properties = expect_array(cursor, |v| match v {
        SisField::Property(property) => Some(property),
        _ => None,
    })?;
    Ok(SisProperties { properties })
}

fn parse_certificate_chain(cursor: &mut DataCursorRef) -> Result<SisCertificateChain, Error> {
    let certificate_data = expect_blob(cursor)?;
    Ok(SisCertificateChain { certificate_data })
}

fn parse_signature_algorithm(
    cursor: &mut DataCursorRef,
    frame_end: usize,
) -> Result<SisSignatureAlgorithm, Error> {
    let _ = frame_end;
    let algorithm_identifier = expect_string(cursor)?;
    Ok(SisSignatureAlgorithm { algorithm_identifier })
}

fn parse_signature(cursor: &mut DataCursorRef) -> Result<SisSignature, Error> {
    let signature_algorithm = expect(cursor, |v| match v {
        SisField::SignatureAlgorithm(algorithm) => Some(algorithm),
        _ => None,
    })?;
    let signature_data = expect_blob(cursor)?;
    Ok(SisSignature { signature_algorithm, signature_data })
}

fn parse_signature_certificate_chain(
    cursor: &mut DataCursorRef,
    frame_end: usize,
) -> Result<SisSignatureCertificateChain, Error> {
    let _ = frame_end;
    let signatures = expect_array(cursor, |v| match v {
        SisField::Signature(signature) => Some(signature),
        _ => None,
    })?;
    let certificate_chain = expect(cursor, |v| match v {
        SisField::CertificateChain(chain) => Some(chain),
        _ => None,
    })?;
    Ok(SisSignatureCertificateChain { signatures, certificate_chain })
}

fn parse_logo(cursor: &mut DataCursorRef) -> Result<SisLogo, Error> {
    let logo_file = expect(cursor, |v| match v {
        SisField::FileDescription(description) => Some(description),
        _ => None,
    })?;
    Ok(SisLogo { logo_file })
}

fn parse_file_description(
    cursor: &mut DataCursorRef,
    frame_end: usize,
) -> Result<SisFileDescription, Error> {
    let target = expect_string(cursor)?;
    let mime_type = expect_string(cursor)?;

    // `MIMEType: SkipNextIfByte('Capabilities', TField.SISCapabilities & 255)` — Capabilities is
    // optional; present only if the next record's tag is actually SISCapabilities, not merely
    // "enough bytes remain" (Hash, the mandatory next field, is itself more than 8 bytes).
    let _ = frame_end;
    let capabilities = if peek_matches(cursor, TField::SisCapabilities as u8)? {
        Some(expect(cursor, |v| match v {
            SisField::Capabilities(capabilities) => Some(capabilities),
            _ => None,
        })?)
    } else {
        None
    };

    let hash = expect(cursor, |v| match v {
        SisField::Hash(hash) => Some(hash),
        _ => None,
    })?;

    let offset = cursor.position();
    let operation = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    let operation_options = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 4 })?;
    let file_length = read_u64(cursor)?;
    let uncompressed_length = read_u64(cursor)?;
    let file_index_offset = cursor.position();
    let file_index = cursor
        .read_u32()
        .map_err(|_| Error::TruncatedInput { offset: file_index_offset })?;

    Ok(SisFileDescription {
        target,
        mime_type,
        capabilities,
        hash,
        operation,
        operation_options,
        file_length,
        uncompressed_length,
        file_index,
    })
}

fn parse_install_block(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisInstallBlock, Error> {
    let _ = frame_end;
    let files = expect_array(cursor, |v| match v {
        SisField::FileDescription(description) => Some(description),
        _ => None,
    })?;
    let embedded_sis_files = expect_array(cursor, Some)?;
    let if_blocks = expect_array(cursor, Some)?;
    Ok(SisInstallBlock { files, embedded_sis_files, if_blocks })
}

fn parse_expression(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisExpression, Error> {
    let offset = cursor.position();
    let operator = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset })?;
    let integer_value = cursor.read_u32().map_err(|_| Error::TruncatedInput { offset: offset + 4 })? as i32;

    // `StringValue: CanBeLast` / `LeftExpression: CanBeLast`: both are optional trailers.
    let string_value = if can_be_last(cursor.position(), frame_end) {
        None
    } else {
        Some(expect_string(cursor)?)
    };
    let left_expression = if can_be_last(cursor.position(), frame_end) {
        None
    } else {
        Some(Box::new(parse_field(cursor)?))
    };
    let right_expression = Box::new(parse_field(cursor)?);

    Ok(SisExpression { operator, integer_value, string_value, left_expression, right_expression })
}

fn parse_else_if(cursor: &mut DataCursorRef) -> Result<SisElseIf, Error> {
    let expression = expect(cursor, |v| match v {
        SisField::Expression(expression) => Some(expression),
        _ => None,
    })?;
    let install_block = expect(cursor, |v| match v {
        SisField::InstallBlock(block) => Some(block),
        _ => None,
    })?;
    Ok(SisElseIf { expression, install_block })
}

fn parse_if(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisIf, Error> {
    let expression = expect(cursor, |v| match v {
        SisField::Expression(expression) => Some(expression),
        _ => None,
    })?;
    let install_block = expect(cursor, |v| match v {
        SisField::InstallBlock(block) => Some(block),
        _ => None,
    })?;
    let else_ifs = expect_array(cursor, |v| match v {
        SisField::ElseIf(else_if) => Some(else_if),
        _ => None,
    })?;
    let _ = frame_end;
    Ok(SisIf { expression, install_block, else_ifs })
}

fn parse_file_data(cursor: &mut DataCursorRef) -> Result<SisFileData, Error> {
    let file_data = expect(cursor, |v| match v {
        SisField::Compressed(compressed) => Some(compressed),
        _ => None,
    })?;
    Ok(SisFileData { file_data })
}

fn parse_data_unit(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisDataUnit, Error> {
    let _ = frame_end;
    let file_data = expect_array(cursor, |v| match v {
        SisField::FileData(data) => Some(data),
        _ => None,
    })?;
    Ok(SisDataUnit { file_data })
}

fn parse_data(cursor: &mut DataCursorRef, frame_end: usize) -> Result<SisData, Error> {
    let _ = frame_end;
    let data_units = expect_array(cursor, |v| match v {
        SisField::DataUnit(unit) => Some(unit),
        _ => None,
    })?;
    Ok(SisData { data_units })
}

fn parse_contents(cursor: &mut DataCursorRef) -> Result<SisContents, Error> {
    let controller_checksum = expect(cursor, |v| match v {
        SisField::ControllerChecksum(checksum) => Some(checksum),
        _ => None,
    })?;
    let data_checksum = expect(cursor, |v| match v {
        SisField::DataChecksum(checksum) => Some(checksum),
        _ => None,
    })?;
    let controller = expect(cursor, |v| match v {
        SisField::Compressed(compressed) => Some(compressed),
        _ => None,
    })?;
    let data = expect(cursor, |v| match v {
        SisField::Data(data) => Some(data),
        _ => None,
    })?;
    Ok(SisContents { controller_checksum, data_checksum, controller, data })
}

fn parse_controller(cursor: &mut DataCursorRef) -> Result<SisController, Error> {
    let info = expect(cursor, |v| match v {
        SisField::Info(info) => Some(info),
        _ => None,
    })?;
    let options = expect(cursor, |v| match v {
        SisField::SupportedOptions(options) => Some(options),
        _ => None,
    })?;
    let languages = expect(cursor, |v| match v {
        SisField::SupportedLanguages(languages) => Some(languages),
        _ => None,
    })?;
    let prerequisites = expect(cursor, |v| match v {
        SisField::Prerequisites(prerequisites) => Some(prerequisites),
        _ => None,
    })?;
    let properties = expect(cursor, |v| match v {
        SisField::Properties(properties) => Some(properties),
        _ => None,
    })?;

    // `Properties: SkipNextIfByte('Logo', TField.SISInstallBlock & 255)` — Logo is optional.
    let logo = if peek_matches(cursor, TField::SisInstallBlock as u8)? {
        None
    } else {
        Some(expect(cursor, |v| match v {
            SisField::Logo(logo) => Some(logo),
            _ => None,
        })?)
    };

    let install_block = expect(cursor, |v| match v {
        SisField::InstallBlock(block) => Some(block),
        _ => None,
    })?;
    let signature0 = expect(cursor, |v| match v {
        SisField::SignatureCertificateChain(chain) => Some(chain),
        _ => None,
    })?;
    let data_index = expect(cursor, |v| match v {
        SisField::DataIndex(index) => Some(index),
        _ => None,
    })?;

    Ok(SisController {
        info,
        options,
        languages,
        prerequisites,
        properties,
        logo,
        install_block,
        signature0,
        data_index,
    })
}

fn expect<T>(cursor: &mut DataCursorRef, project: impl FnOnce(SisField) -> Option<T>) -> Result<T, Error> {
    let offset = cursor.position();
    let field = parse_field(cursor)?;
    project(field).ok_or(Error::ParseError { offset, reason: "unexpected SISField variant" })
}

fn expect_array<T>(
    cursor: &mut DataCursorRef,
    project: impl Fn(SisField) -> Option<T>,
) -> Result<Vec<T>, Error> {
    let offset = cursor.position();
    match expect(cursor, |v| match v {
        SisField::Array(elements) => Some(elements),
        _ => None,
    })? {
        elements => elements
            .into_iter()
            .map(|e| project(e).ok_or(Error::ParseError { offset, reason: "array element had unexpected tag" }))
            .collect(),
    }
}

fn expect_string(cursor: &mut DataCursorRef) -> Result<String, Error> {
    expect(cursor, |v| match v {
        SisField::String(string) => Some(string),
        _ => None,
    })
}

fn expect_string_array(cursor: &mut DataCursorRef) -> Result<Vec<String>, Error> {
    expect_array(cursor, |v| match v {
        SisField::String(string) => Some(string),
        _ => None,
    })
}

fn expect_uid(cursor: &mut DataCursorRef) -> Result<SisUid, Error> {
    expect(cursor, |v| match v {
        SisField::Uid(uid) => Some(uid),
        _ => None,
    })
}

fn expect_version(cursor: &mut DataCursorRef) -> Result<SisVersion, Error> {
    expect(cursor, |v| match v {
        SisField::Version(version) => Some(version),
        _ => None,
    })
}

fn expect_version_range(cursor: &mut DataCursorRef) -> Result<SisVersionRange, Error> {
    expect(cursor, |v| match v {
        SisField::VersionRange(range) => Some(range),
        _ => None,
    })
}

fn expect_date_time(cursor: &mut DataCursorRef) -> Result<SisDateTime, Error> {
    expect(cursor, |v| match v {
        SisField::DateTime(date_time) => Some(date_time),
        _ => None,
    })
}

fn expect_blob(cursor: &mut DataCursorRef) -> Result<SisBlob, Error> {
    expect(cursor, |v| match v {
        SisField::Blob(blob) => Some(blob),
        _ => None,
    })
}

/// Parses the top-level record out of a complete byte buffer (a convenience entry point for
/// already-decompressed controller/contents bytes).
///
/// # Errors
/// Same as [`parse_field`].
pub fn parse_field_from_bytes(bytes: &[u8]) -> Result<SisField, Error> {
    let mut cursor = DataCursorRef::new(bytes, Endian::Little);
    parse_field(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_field_header(buf: &mut Vec<u8>, tag: TField, length: u32) {
        buf.extend_from_slice(&(tag as u32).to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
    }

    #[test]
    fn parses_sis_uid() {
        let mut bytes = Vec::new();
        write_field_header(&mut bytes, TField::SisUid, 4);
        bytes.extend_from_slice(&0x1000_4A7Cu32.to_le_bytes());

        let field = parse_field_from_bytes(&bytes).unwrap();
        assert!(matches!(field, SisField::Uid(SisUid { uid1 }) if uid1 == 0x1000_4A7Cu32 as i32));
    }

    #[test]
    fn parses_sis_array_of_languages() {
        let mut bytes = Vec::new();
        let mut element = Vec::new();
        element.extend_from_slice(&4u32.to_le_bytes()); // Length (no Type re-read)
        element.extend_from_slice(&1u32.to_le_bytes()); // Language = EN

        let mut array_payload = Vec::new();
        array_payload.extend_from_slice(&(TField::SisLanguage as u32).to_le_bytes());
        array_payload.extend_from_slice(&element);

        write_field_header(&mut bytes, TField::SisArray, array_payload.len() as u32);
        bytes.extend_from_slice(&array_payload);

        let field = parse_field_from_bytes(&bytes).unwrap();
        match field {
            SisField::Array(elements) => {
                assert_eq!(elements.len(), 1);
                assert!(matches!(elements[0], SisField::Language(SisLanguage { language: 1 })));
            }
            other => panic!("expected Array, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unrecognized_tag() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&999u32.to_le_bytes());
        let err = parse_field_from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
