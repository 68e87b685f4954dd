//! Relocatable assembly emission: turns the expanded `.text`/`.data` sections, the relocation
//! map, and resolved ordinal imports into a `.s` file an ARM assembler can reassemble, per
//! spec §4.6.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{Error, UnsupportedSnafu};
use crate::header::{CpuKind, E32ImageHeader};
use crate::sections::{Relocation, RelocKind};

/// One resolved word-sized reference, recorded at its absolute address within the expanded image.
#[derive(Debug, Clone)]
pub enum WordRef {
    /// `hexword + textmv`
    TextRebase,
    /// `hexword + datamv`
    DataRebase,
    /// `symbol + addend`
    Symbol { symbol: String, addend: u32 },
}

/// Folds a relocation list into `{address: WordRef}` entries, dropping filler/inferred entries
/// that carry no rebase instruction of their own.
pub fn relocation_word_map(relocs: &[Relocation]) -> BTreeMap<u32, WordRef> {
    let mut map = BTreeMap::new();
    for reloc in relocs {
        let word_ref = match reloc.kind {
            RelocKind::CodeRelative => WordRef::TextRebase,
            RelocKind::DataRelative => WordRef::DataRebase,
            RelocKind::Inferred | RelocKind::Filler => continue,
        };
        map.insert(reloc.address, word_ref);
    }
    map
}

/// Emits the `.s` assembly listing for an expanded image.
///
/// `words` is the merged relocation/import word map (see [`relocation_word_map`]); entries from
/// import resolution take precedence over a plain relocation at the same address.
///
/// # Errors
/// [`Error::Unsupported`] if `cpu` isn't an ARM variant — the word-emission loop assumes ARM's
/// 4-byte-aligned `.text`/`.data`.
pub fn emit_assembly(
    cpu: CpuKind,
    header: &E32ImageHeader,
    text: &[u8],
    data: &[u8],
    text_start: u32,
    data_start: u32,
    words: &BTreeMap<u32, WordRef>,
) -> Result<String, Error> {
    if !cpu.is_arm() {
        return UnsupportedSnafu { reason: "assembly emission only supports ARM targets" }.fail();
    }

    let textmv = text_start.wrapping_sub(header.i_code_base.get());
    let datamv = data_start.wrapping_sub(header.i_data_base.get());

    let mut out = String::new();
    writeln!(out, ".arch armv5te").unwrap();
    writeln!(out, ".global _start").unwrap();
    writeln!(out, "_start = {:#x} + textmv", header.i_entry_point.get()).unwrap();
    writeln!(out, "textmv = {textmv:#x}").unwrap();
    writeln!(out, "datamv = {datamv:#x}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, ".section .text").unwrap();
    emit_words(&mut out, text, text_start, words);

    writeln!(out).unwrap();
    writeln!(out, ".section .data").unwrap();
    emit_words(&mut out, data, data_start, words);

    Ok(out)
}

fn emit_words(out: &mut String, section: &[u8], base_address: u32, words: &BTreeMap<u32, WordRef>) {
    for (index, chunk) in section.chunks(4).enumerate() {
        let address = base_address + (index as u32) * 4;
        let mut word_bytes = [0u8; 4];
        word_bytes[..chunk.len()].copy_from_slice(chunk);
        let word = u32::from_le_bytes(word_bytes);

        match words.get(&address) {
            Some(WordRef::TextRebase) => {
                writeln!(out, "    .4byte {word:#x} + textmv").unwrap();
            }
            Some(WordRef::DataRebase) => {
                writeln!(out, "    .4byte {word:#x} + datamv").unwrap();
            }
            Some(WordRef::Symbol { symbol, addend }) => {
                if *addend == 0 {
                    writeln!(out, "    .4byte {symbol}").unwrap();
                } else {
                    writeln!(out, "    .4byte {symbol} + {addend:#x}").unwrap();
                }
            }
            None => {
                writeln!(out, "    .4byte {word:#x}").unwrap();
            }
        }
    }
}
