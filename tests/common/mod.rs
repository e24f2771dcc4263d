#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::io::{Read, Write};

use crc::{Crc, CRC_32_ISO_HDLC};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

use gzread::{GzReader, Result};

////////////////////////////////////////////////////////////////////////////////

pub fn crc32(data: &[u8]) -> u32 {
    Crc::<u32>::new(&CRC_32_ISO_HDLC).checksum(data)
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Wraps a raw DEFLATE stream into a minimal gzip member.
pub fn gzip_member(deflated: &[u8], plain: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x1f, 0x8b, 8, 0, 0, 0, 0, 0, 0, 255];
    bytes.extend_from_slice(deflated);
    bytes.extend_from_slice(&crc32(plain).to_le_bytes());
    bytes.extend_from_slice(&(plain.len() as u32).to_le_bytes());
    bytes
}

/// Text with enough repetition for the encoder to emit matches and dynamic
/// blocks.
pub fn sample_text(len: usize) -> Vec<u8> {
    let words = [
        "elevation", "dem", "tile", "north", "south", "grid", "meters", "void",
    ];
    let mut state = 12345u32;
    let mut text = Vec::with_capacity(len + 16);
    while text.len() < len {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
        let word = words[(state >> 16) as usize % words.len()];
        text.extend_from_slice(word.as_bytes());
        text.push(if (state >> 8) % 7 == 0 { b'\n' } else { b' ' });
    }
    text.truncate(len);
    text
}

/// Drains `reader` with reads of the given sizes, cycling through them.
pub fn read_all<R: Read>(reader: &mut GzReader<R>, sizes: &[usize]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; sizes.iter().copied().max().unwrap_or(1)];
    for &size in sizes.iter().cycle() {
        let len = reader.read(&mut buf[..size])?;
        if len == 0 {
            break;
        }
        assert!(len == size || reader.read(&mut buf[..1])? == 0);
        out.extend_from_slice(&buf[..len]);
    }
    Ok(out)
}

////////////////////////////////////////////////////////////////////////////////

/// LSB-first bit writer for hand-made DEFLATE streams.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u8,
    count: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_bit(&mut self, bit: u32) {
        self.acc |= ((bit & 1) as u8) << self.count;
        self.count += 1;
        if self.count == 8 {
            self.bytes.push(self.acc);
            self.acc = 0;
            self.count = 0;
        }
    }

    /// Plain field, least significant bit first.
    pub fn write_bits(&mut self, value: u32, len: u8) {
        for i in 0..len {
            self.push_bit(value >> i);
        }
    }

    /// Huffman code, most significant bit first.
    pub fn write_code(&mut self, code: u32, len: u8) {
        for i in (0..len).rev() {
            self.push_bit(code >> i);
        }
    }

    pub fn fixed_block_header(&mut self, is_final: bool) {
        self.write_bits(is_final as u32, 1);
        self.write_bits(1, 2);
    }

    /// Literal/length symbol in the fixed code.
    pub fn fixed_symbol(&mut self, symbol: u32) {
        match symbol {
            0..=143 => self.write_code(0x30 + symbol, 8),
            144..=255 => self.write_code(0x190 + symbol - 144, 9),
            256..=279 => self.write_code(symbol - 256, 7),
            _ => self.write_code(0xc0 + symbol - 280, 8),
        }
    }

    pub fn fixed_distance(&mut self, symbol: u32) {
        self.write_code(symbol, 5);
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.count > 0 {
            self.bytes.push(self.acc);
        }
        self.bytes
    }
}
