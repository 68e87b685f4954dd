//! `E32Inflate`: the non-standard Huffman-coded LZ77 scheme used by compressed E32 images.
//!
//! This is not stock DEFLATE - the code-length header uses a fixed 28-symbol meta-alphabet with
//! move-to-front permuted indices, and the length/distance alphabets are combined into one
//! literal/length table plus a separately-numbered distance table, each sharing the same
//! extra-bits extraction formula.

use std::sync::OnceLock;

use crate::bitreader::{BitOrder, BitReader};
use crate::error::{Error, MalformedStreamSnafu};
use crate::huffman::HuffmanTable;

const K_DEFLATE_LENGTH_MAG: u32 = 8;
const K_DEFLATE_DISTANCE_MAG: u32 = 12;
const E_LITERALS: u32 = 256;
const E_LENGTHS: u32 = 28;
const E_DISTANCES: u32 = 44;
const E_LIT_LENS: u32 = E_LITERALS + E_LENGTHS + 1; // 285, includes EEos
const K_DEFLATION_CODES: u32 = E_LIT_LENS + E_DISTANCES; // 329
const E_EOS: u32 = E_LITERALS + E_LENGTHS; // 284
const K_DEFLATE_DIST_CODE_BASE: u32 = 0x200;
const K_DEFLATE_MIN_LENGTH: u32 = 3;

const META_ALPHABET_SIZE: usize = 28;

/// Code lengths for the fixed 28-symbol meta-alphabet (`HuffmanDecoding`) that the code-length
/// header is itself Huffman-coded with. Symbols 0 and 1 are run-length continuations of the
/// previous code length and get the shortest codes; symbols 2..27 are move-to-front indices.
#[rustfmt::skip]
const META_LENGTHS: [u8; META_ALPHABET_SIZE] = [
    3, 3,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
];

fn meta_table() -> &'static HuffmanTable {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        HuffmanTable::build(&META_LENGTHS, 0).expect("meta-alphabet lengths are a valid code")
    })
}

/// Reads the combined extra-bits-encoded length/distance value that `symbol` names.
///
/// `symbol & 0xff` carries the code proper; codes `>= 8` additionally have `(code >> 2) - 1`
/// extra bits, read least-significant-bit first, appended to a pre-shifted base.
fn decode_extra(symbol: u32, bits: &mut BitReader) -> Result<u32, Error> {
    let mut code = symbol & 0xff;
    if code < 8 {
        return Ok(code);
    }
    let extra_bit_count = (code >> 2) - 1;
    code -= extra_bit_count << 2;
    code <<= extra_bit_count;
    code |= (1u32 << extra_bit_count) - 1;
    let extra = bits
        .next_bits(extra_bit_count, BitOrder::Lsb)
        .ok_or(Error::TruncatedInput)?;
    Ok(code + extra)
}

/// Decodes the move-to-front/run-length code-length header into `target` lengths.
///
/// Consecutive run symbols (meta-values 0 and 1) build up a run length as a bijective base-2
/// number - the position-th run symbol contributes `(value + 1) * 2^position` - which is flushed
/// as that many repeats of the previous length either when a non-run symbol terminates the run,
/// or as soon as the accumulated run would reach `target` on its own.
fn decode_code_lengths(bits: &mut BitReader, target: u32) -> Result<Vec<u8>, Error> {
    let meta = meta_table();
    let mut mtf: Vec<u8> = (0..META_ALPHABET_SIZE as u8).collect();
    let mut last: u8 = 0;
    let mut pending = Vec::with_capacity(target as usize);
    let mut run_total: u32 = 0;
    let mut run_weight: u32 = 1;

    while (pending.len() as u32) < target {
        let symbol = meta.decode(bits)?;

        if symbol == 0 || symbol == 1 {
            run_total += (symbol + 1) * run_weight;
            run_weight *= 2;
            if (pending.len() as u32) + run_total >= target {
                let remaining = target - pending.len() as u32;
                pending.extend(std::iter::repeat(last).take(remaining as usize));
                run_total = 0;
                run_weight = 1;
            }
            continue;
        }

        if run_total > 0 {
            pending.extend(std::iter::repeat(last).take(run_total as usize));
            run_total = 0;
            run_weight = 1;
        }

        let index = symbol as usize;
        mtf.insert(1, last);
        if index >= mtf.len() {
            return MalformedStreamSnafu { reason: "move-to-front index out of range" }.fail();
        }
        let value = mtf.remove(index);
        last = value;
        pending.push(value);
    }

    Ok(pending)
}

/// Runs the copy-from-history step of an LZ77 back-reference.
fn copy_backref(output: &mut Vec<u8>, distance: usize, run_length: usize) -> Result<(), Error> {
    if distance == 0 || distance > output.len() {
        return MalformedStreamSnafu {
            reason: "back-reference distance exceeds emitted length",
        }
        .fail();
    }
    let start = output.len() - distance;
    for i in 0..run_length {
        let byte = output[start + i];
        output.push(byte);
    }
    Ok(())
}

/// Decompresses a complete `E32Inflate` stream. `data` is the compressed byte source; the
/// function reads exactly as many bytes as the stream declares via its embedded EOS symbol.
///
/// # Errors
/// [`Error::MalformedStream`] on an ill-formed Huffman tree or an out-of-range back-reference;
/// [`Error::TruncatedInput`] if the input ends before the EOS symbol is reached.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, Error> {
    log::debug!("Starting E32Inflate decompression of {} compressed bytes", data.len());
    let mut bits = BitReader::new(data.to_vec());
    let lengths = decode_code_lengths(&mut bits, K_DEFLATION_CODES)?;

    let lit_len_lengths = &lengths[0..E_LIT_LENS as usize];
    let dist_lengths = &lengths[E_LIT_LENS as usize..K_DEFLATION_CODES as usize];

    let lit_len_table = HuffmanTable::build(lit_len_lengths, 0)?;
    let dist_table = HuffmanTable::build(dist_lengths, K_DEFLATE_DIST_CODE_BASE)?;

    let mut output = Vec::new();
    loop {
        let symbol = lit_len_table.decode(&mut bits)?;
        if symbol < E_LITERALS {
            output.push(symbol as u8);
            continue;
        }
        if symbol == E_EOS {
            break;
        }

        let code = decode_extra(symbol, &mut bits)?;
        let run_length = (code + K_DEFLATE_MIN_LENGTH) as usize;

        let distance_symbol = dist_table.decode(&mut bits)?;
        let distance_code = decode_extra(distance_symbol, &mut bits)?;
        let distance = (distance_code + 1) as usize;

        copy_backref(&mut output, distance, run_length)?;
    }

    let _ = (K_DEFLATE_LENGTH_MAG, K_DEFLATE_DISTANCE_MAG, E_DISTANCES);
    Ok(output)
}
