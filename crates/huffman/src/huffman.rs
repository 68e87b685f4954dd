//! Canonical Huffman code construction and decoding.

use hashbrown::HashMap;

use crate::bitreader::BitReader;
use crate::error::{Error, MalformedStreamSnafu};

/// A canonical prefix-code decoder built from a per-symbol code-length array.
///
/// Decoded symbol values are `base + index`, where `index` is the symbol's position in the
/// `lengths` array passed to [`HuffmanTable::build`]. The distance alphabet uses a non-zero
/// `base` (`KDeflateDistCodeBase = 0x200`) so that literal/length and distance symbols never
/// collide in the unified length/distance extra-bit decoding the inflate loop performs.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Maps a bit accumulator (leading sentinel `1`, followed by the code bits) to a symbol.
    codes: HashMap<u32, u32>,
    max_accumulator: u32,
}

impl HuffmanTable {
    /// Builds a canonical Huffman table from `lengths` (one entry per symbol, `0` meaning
    /// "unused"), with decoded symbol values offset by `base`.
    ///
    /// # Errors
    /// Returns [`Error::MalformedStream`] if the code is over-subscribed (a length bucket
    /// receives more codes than it has room for).
    pub fn build(lengths: &[u8], base: u32) -> Result<Self, Error> {
        let max_len = lengths.iter().copied().max().unwrap_or(0);

        let nonzero: Vec<usize> =
            (0..lengths.len()).filter(|&i| lengths[i] != 0).collect();

        let mut codes = HashMap::new();
        let mut max_accumulator = 1u32;

        if nonzero.len() == 1 {
            // Degenerate single-symbol tree: the scheme under-represents this case, so both
            // possible values of the lone bit decode to the same symbol.
            let symbol = base + nonzero[0] as u32;
            codes.insert(0b10, symbol);
            codes.insert(0b11, symbol);
            max_accumulator = 0b11;
            return Ok(Self { codes, max_accumulator });
        }

        let mut code: u32 = 0;
        for len in 1..=max_len {
            for &index in &nonzero {
                if lengths[index] != len {
                    continue;
                }
                if code >= (1u32 << len) {
                    return MalformedStreamSnafu {
                        reason: "over-subscribed Huffman code",
                    }
                    .fail();
                }
                let accumulator = (1u32 << len) | code;
                codes.insert(accumulator, base + index as u32);
                max_accumulator = max_accumulator.max(accumulator);
                code += 1;
            }
            code <<= 1;
        }

        Ok(Self { codes, max_accumulator })
    }

    /// Decodes a single symbol, reading one bit at a time from `bits` MSB-first.
    ///
    /// # Errors
    /// [`Error::MalformedStream`] if the accumulator overruns every assigned code without ever
    /// matching one; [`Error::TruncatedInput`] if the bit source runs out mid-symbol.
    pub fn decode(&self, bits: &mut BitReader) -> Result<u32, Error> {
        let mut accumulator: u32 = 1;
        loop {
            let bit = bits.next_bit().ok_or(Error::TruncatedInput)?;
            accumulator = (accumulator << 1) | u32::from(bit);
            if let Some(&symbol) = self.codes.get(&accumulator) {
                return Ok(symbol);
            }
            if accumulator > self.max_accumulator {
                return MalformedStreamSnafu { reason: "Huffman accumulator overran every code" }
                    .fail();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_single_symbol_decodes_both_bits() {
        let mut lengths = vec![0u8; 8];
        lengths[0] = 1;
        let table = HuffmanTable::build(&lengths, 0).unwrap();

        let mut ones = BitReader::new(vec![0b1000_0000]);
        assert_eq!(table.decode(&mut ones).unwrap(), 0);

        let mut zeros = BitReader::new(vec![0b0000_0000]);
        assert_eq!(table.decode(&mut zeros).unwrap(), 0);
    }

    #[test]
    fn canonical_two_symbol_table() {
        // Two one-bit codes: code 0 -> symbol 0, code 1 -> symbol 1.
        let table = HuffmanTable::build(&[1, 1], 0).unwrap();
        let mut zero_bit = BitReader::new(vec![0b0000_0000]);
        assert_eq!(table.decode(&mut zero_bit).unwrap(), 0);
        let mut one_bit = BitReader::new(vec![0b1000_0000]);
        assert_eq!(table.decode(&mut one_bit).unwrap(), 1);
    }

    #[test]
    fn distance_table_offsets_symbols_by_base() {
        let table = HuffmanTable::build(&[1, 1], 0x200).unwrap();
        let mut reader = BitReader::new(vec![0b0000_0000]);
        assert_eq!(table.decode(&mut reader).unwrap(), 0x200);
    }
}
