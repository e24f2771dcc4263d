#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::io::Read;

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};

////////////////////////////////////////////////////////////////////////////////

pub const MAX_BITS: u8 = 15;

/// What a decoded code stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entry {
    /// A symbol that maps to itself.
    Literal(u16),
    EndOfBlock,
    /// A length or distance: `base` plus `extra` literal bits that follow.
    Base { base: u16, extra: u8 },
    /// Continue in the table level with this arena index.
    Link(u32),
    Invalid,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    entry: Entry,
    /// Bits consumed at this level.
    len: u8,
}

struct Level {
    bits: u8,
    slots: Vec<Slot>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// Some bit patterns decode to nothing.
    Incomplete,
}

/// How symbols of an alphabet translate into entries.
///
/// Symbols below `simple` map to themselves (256 meaning end of block); the
/// rest index `base` and `extra`. Symbols outside the tables are invalid.
#[derive(Clone, Copy, Debug)]
pub struct Alphabet<'a> {
    pub simple: usize,
    pub base: &'a [u16],
    pub extra: &'a [u8],
}

impl Alphabet<'_> {
    fn entry(&self, symbol: usize) -> Entry {
        if symbol < self.simple {
            if symbol < 256 {
                Entry::Literal(symbol as u16)
            } else {
                Entry::EndOfBlock
            }
        } else {
            let index = symbol - self.simple;
            match (self.base.get(index), self.extra.get(index)) {
                (Some(&base), Some(&extra)) => Entry::Base { base, extra },
                _ => Entry::Invalid,
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Multi-level canonical Huffman decoding table.
///
/// Levels live in one arena; level 0 is the root and resolves up to its own
/// width in bits, longer codes continue through [`Entry::Link`] indices.
pub struct HuffmanTable {
    levels: Vec<Level>,
}

struct Code {
    /// Code bits in stream order, first bit lowest.
    reversed: u16,
    len: u8,
    entry: Entry,
}

impl HuffmanTable {
    /// Builds a table from per-symbol code lengths (0 means unused).
    ///
    /// `lookup_bits` is the preferred width of every level; the root is
    /// clamped to the shortest and longest code present.
    pub fn build(
        lengths: &[u8],
        alphabet: Alphabet<'_>,
        lookup_bits: u8,
    ) -> Result<(Self, Completeness)> {
        let mut count = [0u16; MAX_BITS as usize + 1];
        for &len in lengths {
            if len > MAX_BITS {
                return Err(Error::BadHuffmanTable("code length too long"));
            }
            count[len as usize] += 1;
        }
        count[0] = 0;

        let max_len = match (1..=MAX_BITS).rev().find(|&l| count[l as usize] != 0) {
            Some(len) => len,
            None => return Ok((Self::empty()?, Completeness::Complete)),
        };
        let min_len = (1..=MAX_BITS)
            .find(|&l| count[l as usize] != 0)
            .unwrap_or(max_len);

        let mut left: i32 = 1;
        for len in 1..=MAX_BITS as usize {
            left <<= 1;
            left -= count[len] as i32;
            if left < 0 {
                return Err(Error::BadHuffmanTable("over-subscribed code lengths"));
            }
        }
        // A lone one-bit code leaves half of the space unused but is fine.
        let completeness = if left > 0 && max_len > 1 {
            Completeness::Incomplete
        } else {
            Completeness::Complete
        };

        let mut next_code = [0u16; MAX_BITS as usize + 1];
        let mut code = 0u16;
        for len in 1..=MAX_BITS as usize {
            code = (code + count[len - 1]) << 1;
            next_code[len] = code;
        }

        let mut codes = Vec::new();
        codes.try_reserve_exact(lengths.len())?;
        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let code = next_code[len as usize];
            next_code[len as usize] += 1;
            codes.push(Code {
                reversed: reverse_bits(code, len),
                len,
                entry: alphabet.entry(symbol),
            });
        }

        let root_bits = lookup_bits.clamp(min_len, max_len);
        let mut table = Self { levels: Vec::new() };
        table.fill_level(codes, root_bits, lookup_bits.max(1))?;
        Ok((table, completeness))
    }

    fn empty() -> Result<Self> {
        let mut levels = Vec::new();
        levels.try_reserve_exact(1)?;
        levels.push(Level {
            bits: 0,
            slots: vec![Slot {
                entry: Entry::Invalid,
                len: 0,
            }],
        });
        Ok(Self { levels })
    }

    /// Lays `codes` out in a new level `bits` wide and returns its index.
    fn fill_level(&mut self, codes: Vec<Code>, bits: u8, step: u8) -> Result<u32> {
        let size = 1usize << bits;
        let mut slots = Vec::new();
        slots.try_reserve_exact(size)?;
        slots.resize(
            size,
            Slot {
                entry: Entry::Invalid,
                len: bits,
            },
        );

        self.levels.try_reserve(1)?;
        let index = self.levels.len();
        self.levels.push(Level { bits, slots: Vec::new() });

        let mask = (size - 1) as u16;
        let mut deeper: BTreeMap<u16, Vec<Code>> = BTreeMap::new();
        for code in codes {
            if code.len <= bits {
                let slot = Slot {
                    entry: code.entry,
                    len: code.len,
                };
                for i in (code.reversed as usize..size).step_by(1 << code.len) {
                    slots[i] = slot;
                }
            } else {
                deeper.entry(code.reversed & mask).or_default().push(Code {
                    reversed: code.reversed >> bits,
                    len: code.len - bits,
                    entry: code.entry,
                });
            }
        }

        for (prefix, codes) in deeper {
            let longest = codes.iter().map(|c| c.len).max().unwrap_or(1);
            let child = self.fill_level(codes, longest.min(step), step)?;
            slots[prefix as usize] = Slot {
                entry: Entry::Link(child),
                len: bits,
            };
        }

        self.levels[index].slots = slots;
        Ok(index as u32)
    }

    /// Decodes one code from `reader`, following links between levels.
    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<Entry> {
        let mut level = &self.levels[0];
        loop {
            let (index, available) = reader.peek_bits(level.bits)?;
            let slot = level.slots[index as usize];
            if slot.len > available {
                return Err(Error::TruncatedInput);
            }
            match slot.entry {
                Entry::Invalid => return Err(Error::BadHuffmanTable("invalid code")),
                Entry::Link(next) => {
                    reader.consume(slot.len);
                    level = &self.levels[next as usize];
                }
                entry => {
                    reader.consume(slot.len);
                    return Ok(entry);
                }
            }
        }
    }
}

fn reverse_bits(code: u16, len: u8) -> u16 {
    code.reverse_bits() >> (16 - len as u32)
}

////////////////////////////////////////////////////////////////////////////////
