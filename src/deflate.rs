#![forbid(unsafe_code)]

use std::convert::TryFrom;
use std::io::Read;
use std::ops::Range;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::huffman_coding::{decode_litlen_distance_trees, CodeTables, LitLenToken};
use crate::window::SlidingWindow;

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
pub struct BlockHeader {
    pub is_final: bool,
    pub compression_type: CompressionType,
}

#[derive(Debug)]
pub enum CompressionType {
    Uncompressed = 0,
    FixedTree = 1,
    DynamicTree = 2,
    Reserved = 3,
}

impl TryFrom<u16> for CompressionType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Ok(match value {
            0 => CompressionType::Uncompressed,
            1 => CompressionType::FixedTree,
            2 => CompressionType::DynamicTree,
            3 => CompressionType::Reserved,
            _ => return Err(Error::InvalidBlockType),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Where the decoder stopped. Everything needed to continue lives here or in
/// the other [`Inflater`] fields, so decoding can pause whenever the window
/// is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    BlockHeader,
    /// Raw bytes left in a stored block (or a stored zip entry).
    Stored { remaining: u64 },
    Symbols { fixed: bool },
    /// A match whose copy was cut short by a full window.
    Copy {
        distance: usize,
        remaining: usize,
        fixed: bool,
    },
    Done,
}

/// Resumable DEFLATE decoder.
///
/// Each call to [`Inflater::resume`] runs until the window fills or the
/// stream ends and reports where the bytes produced since the previous call
/// lie in the window. They stay readable through [`Inflater::output`] until
/// the next call.
pub struct Inflater<R> {
    bit_reader: BitReader<R>,
    window: SlidingWindow,
    phase: Phase,
    last_block: bool,
    fixed_tables: Option<CodeTables>,
    dynamic_tables: Option<CodeTables>,
}

impl<R: Read> Inflater<R> {
    pub fn new(bit_reader: BitReader<R>) -> Result<Self> {
        Ok(Self {
            bit_reader,
            window: SlidingWindow::new()?,
            phase: Phase::BlockHeader,
            last_block: false,
            fixed_tables: None,
            dynamic_tables: None,
        })
    }

    /// Switches to copying `len` raw bytes and nothing else, for entries that
    /// were stored without compression.
    pub fn set_stored_entry(&mut self, len: u64) {
        self.phase = Phase::Stored { remaining: len };
        self.last_block = true;
    }

    /// Decodes until the window fills or the stream ends.
    ///
    /// Returns the window range of the freshly decoded bytes, or `None` once
    /// everything was handed out.
    pub fn resume(&mut self) -> Result<Option<Range<usize>>> {
        loop {
            if self.window.is_full() {
                return Ok(Some(self.window.flush()));
            }
            match self.phase {
                Phase::BlockHeader => {
                    self.phase = self.read_block_header()?;
                }
                Phase::Stored { remaining } => {
                    if remaining == 0 {
                        self.phase = self.after_block();
                        continue;
                    }
                    let len = remaining.min(self.window.space() as u64) as usize;
                    let input = self.bit_reader.borrow_reader_from_boundary();
                    input.read_exact(self.window.spare(len))?;
                    self.window.advance(len);
                    self.phase = Phase::Stored {
                        remaining: remaining - len as u64,
                    };
                }
                Phase::Symbols { fixed } => {
                    self.phase = self.read_symbol(fixed)?;
                }
                Phase::Copy {
                    distance,
                    remaining,
                    fixed,
                } => {
                    let len = remaining.min(self.window.space());
                    self.window.copy_match(distance, len)?;
                    self.phase = if len == remaining {
                        Phase::Symbols { fixed }
                    } else {
                        Phase::Copy {
                            distance,
                            remaining: remaining - len,
                            fixed,
                        }
                    };
                }
                Phase::Done => {
                    if self.window.pending() == 0 {
                        return Ok(None);
                    }
                    return Ok(Some(self.window.flush()));
                }
            }
        }
    }

    fn after_block(&self) -> Phase {
        if self.last_block {
            Phase::Done
        } else {
            Phase::BlockHeader
        }
    }

    fn read_block_header(&mut self) -> Result<Phase> {
        let header = BlockHeader {
            is_final: self.bit_reader.read_bits(1)?.bits() == 1,
            compression_type: CompressionType::try_from(self.bit_reader.read_bits(2)?.bits())?,
        };
        debug!("block: {:?}", header);
        self.last_block = header.is_final;

        match header.compression_type {
            CompressionType::Uncompressed => {
                let rdr = self.bit_reader.borrow_reader_from_boundary();
                let len = rdr.read_u16::<LittleEndian>()?;
                let not_len = rdr.read_u16::<LittleEndian>()?;
                if len != !not_len {
                    return Err(Error::LengthMismatch {
                        expected: !not_len as u64,
                        actual: len as u64,
                    });
                }
                Ok(Phase::Stored {
                    remaining: len as u64,
                })
            }
            CompressionType::FixedTree => {
                if self.fixed_tables.is_none() {
                    self.fixed_tables = Some(CodeTables::fixed()?);
                }
                Ok(Phase::Symbols { fixed: true })
            }
            CompressionType::DynamicTree => {
                self.dynamic_tables = Some(decode_litlen_distance_trees(&mut self.bit_reader)?);
                Ok(Phase::Symbols { fixed: false })
            }
            CompressionType::Reserved => Err(Error::InvalidBlockType),
        }
    }

    fn read_symbol(&mut self, fixed: bool) -> Result<Phase> {
        let tables = match (fixed, &self.fixed_tables, &self.dynamic_tables) {
            (true, Some(tables), _) | (false, _, Some(tables)) => tables,
            _ => return Err(Error::BadHuffmanTable("block has no code tables")),
        };

        match tables.read_litlen(&mut self.bit_reader)? {
            LitLenToken::Literal(byte) => {
                self.window.push(byte);
                Ok(Phase::Symbols { fixed })
            }
            LitLenToken::EndOfBlock => {
                if !fixed {
                    self.dynamic_tables = None;
                }
                Ok(self.after_block())
            }
            LitLenToken::Length {
                base: length_base,
                extra_bits: length_extra_bits,
            } => {
                let length = length_base as usize
                    + self.bit_reader.read_bits(length_extra_bits)?.bits() as usize;
                let distance_token = tables.read_distance(&mut self.bit_reader)?;
                let distance = distance_token.base as usize
                    + self.bit_reader.read_bits(distance_token.extra_bits)?.bits() as usize;
                self.window.check_distance(distance)?;
                Ok(Phase::Copy {
                    distance,
                    remaining: length,
                    fixed,
                })
            }
        }
    }

    pub fn output(&self, range: Range<usize>) -> &[u8] {
        self.window.bytes(range)
    }

    pub fn crc32(&self) -> u32 {
        self.window.crc32()
    }

    pub fn total_out(&self) -> u64 {
        self.window.total_out()
    }

    pub fn bit_reader_mut(&mut self) -> &mut BitReader<R> {
        &mut self.bit_reader
    }
}

////////////////////////////////////////////////////////////////////////////////
