#![forbid(unsafe_code)]

use std::io::Read;
use std::iter::repeat;

use log::trace;

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::huffman_table::{Alphabet, Completeness, Entry, HuffmanTable};

////////////////////////////////////////////////////////////////////////////////

pub const LITLEN_LOOKUP_BITS: u8 = 9;
pub const DISTANCE_LOOKUP_BITS: u8 = 6;
const CODE_LENGTH_LOOKUP_BITS: u8 = 7;

const MAX_LITLEN_CODES: usize = 286;
const MAX_DISTANCE_CODES: usize = 30;

const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227, 258,
];
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];
const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
const DISTANCE_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12,
    13, 13,
];

/// Order in which code length code lengths are stored.
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

const LITLEN_ALPHABET: Alphabet<'static> = Alphabet {
    simple: 257,
    base: &LENGTH_BASE,
    extra: &LENGTH_EXTRA,
};
const DISTANCE_ALPHABET: Alphabet<'static> = Alphabet {
    simple: 0,
    base: &DISTANCE_BASE,
    extra: &DISTANCE_EXTRA,
};
const CODE_LENGTH_ALPHABET: Alphabet<'static> = Alphabet {
    simple: 19,
    base: &[],
    extra: &[],
};

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LitLenToken {
    Literal(u8),
    EndOfBlock,
    Length { base: u16, extra_bits: u8 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistanceToken {
    pub base: u16,
    pub extra_bits: u8,
}

/// Literal/length and distance tables used by one block.
pub struct CodeTables {
    litlen: HuffmanTable,
    distance: HuffmanTable,
}

impl CodeTables {
    /// Tables of the fixed-Huffman block type.
    ///
    /// The distance code assigns only 30 of the 32 five-bit patterns, so it
    /// is built incomplete on purpose.
    pub fn fixed() -> Result<Self> {
        let litlen_lengths: Vec<u8> = repeat(8)
            .take(144)
            .chain(repeat(9).take(112))
            .chain(repeat(7).take(24))
            .chain(repeat(8).take(8))
            .collect();
        let distance_lengths = [5u8; MAX_DISTANCE_CODES];

        let (litlen, _) = HuffmanTable::build(&litlen_lengths, LITLEN_ALPHABET, LITLEN_LOOKUP_BITS)?;
        let (distance, _) =
            HuffmanTable::build(&distance_lengths, DISTANCE_ALPHABET, DISTANCE_LOOKUP_BITS)?;
        Ok(Self { litlen, distance })
    }

    pub fn read_litlen<R: Read>(&self, reader: &mut BitReader<R>) -> Result<LitLenToken> {
        match self.litlen.decode(reader)? {
            Entry::Literal(byte) => Ok(LitLenToken::Literal(byte as u8)),
            Entry::EndOfBlock => Ok(LitLenToken::EndOfBlock),
            Entry::Base { base, extra } => Ok(LitLenToken::Length {
                base,
                extra_bits: extra,
            }),
            _ => Err(Error::BadHuffmanTable("invalid literal/length code")),
        }
    }

    pub fn read_distance<R: Read>(&self, reader: &mut BitReader<R>) -> Result<DistanceToken> {
        match self.distance.decode(reader)? {
            Entry::Base { base, extra } => Ok(DistanceToken {
                base,
                extra_bits: extra,
            }),
            _ => Err(Error::BadHuffmanTable("invalid distance code")),
        }
    }
}

fn require_complete(completeness: Completeness, what: &'static str) -> Result<()> {
    match completeness {
        Completeness::Complete => Ok(()),
        Completeness::Incomplete => Err(Error::BadHuffmanTable(what)),
    }
}

/// Reads the header of a dynamic-Huffman block and builds its tables.
pub fn decode_litlen_distance_trees<R: Read>(reader: &mut BitReader<R>) -> Result<CodeTables> {
    let litlen_count = reader.read_bits(5)?.bits() as usize + 257;
    let distance_count = reader.read_bits(5)?.bits() as usize + 1;
    let code_length_count = reader.read_bits(4)?.bits() as usize + 4;
    if litlen_count > MAX_LITLEN_CODES || distance_count > MAX_DISTANCE_CODES {
        return Err(Error::BadHuffmanTable("too many length or distance codes"));
    }
    trace!(
        "dynamic tables: {} litlen, {} distance, {} code length codes",
        litlen_count,
        distance_count,
        code_length_count
    );

    let mut code_length_lengths = [0u8; 19];
    for &symbol in CODE_LENGTH_ORDER.iter().take(code_length_count) {
        code_length_lengths[symbol] = reader.read_bits(3)?.bits() as u8;
    }
    let (code_length_table, completeness) = HuffmanTable::build(
        &code_length_lengths,
        CODE_LENGTH_ALPHABET,
        CODE_LENGTH_LOOKUP_BITS,
    )?;
    require_complete(completeness, "incomplete code length code")?;

    let total = litlen_count + distance_count;
    let mut lengths = [0u8; MAX_LITLEN_CODES + MAX_DISTANCE_CODES];
    let mut previous = 0u8;
    let mut i = 0;
    while i < total {
        let (value, repeat) = match code_length_table.decode(reader)? {
            Entry::Literal(len @ 0..=15) => {
                previous = len as u8;
                (previous, 1)
            }
            Entry::Literal(16) => (previous, 3 + reader.read_bits(2)?.bits() as usize),
            Entry::Literal(17) => {
                previous = 0;
                (0, 3 + reader.read_bits(3)?.bits() as usize)
            }
            Entry::Literal(18) => {
                previous = 0;
                (0, 11 + reader.read_bits(7)?.bits() as usize)
            }
            _ => return Err(Error::BadHuffmanTable("invalid code length code")),
        };
        if i + repeat > total {
            return Err(Error::BadHuffmanTable("code lengths overflow the table"));
        }
        lengths[i..i + repeat].fill(value);
        i += repeat;
    }

    let (litlen, completeness) = HuffmanTable::build(
        &lengths[..litlen_count],
        LITLEN_ALPHABET,
        LITLEN_LOOKUP_BITS,
    )?;
    require_complete(completeness, "incomplete literal/length code")?;

    let (distance, completeness) = HuffmanTable::build(
        &lengths[litlen_count..total],
        DISTANCE_ALPHABET,
        DISTANCE_LOOKUP_BITS,
    )?;
    require_complete(completeness, "incomplete distance code")?;

    Ok(CodeTables { litlen, distance })
}

////////////////////////////////////////////////////////////////////////////////
