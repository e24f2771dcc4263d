#![forbid(unsafe_code)]

use std::io::Read;

use crate::error::{Error, Result};
use crate::input_buffer::InputBuffer;

////////////////////////////////////////////////////////////////////////////////

/// Up to 16 bits taken from the stream; bits above the requested length are
/// always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitSequence {
    bits: u16,
}

impl BitSequence {
    pub fn new(bits: u16, len: u8) -> Self {
        assert!(len <= 16);
        let bits = if len == 16 { bits } else { bits & ((1 << len) - 1) };
        Self { bits }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }
}

////////////////////////////////////////////////////////////////////////////////

/// LSB-first bit reader on top of [`InputBuffer`].
///
/// Bytes are pulled into the accumulator one at a time and only when a request
/// needs more bits than it holds. Bits above `count` are always zero.
pub struct BitReader<R> {
    input: InputBuffer<R>,
    bits: u64,
    count: u8,
}

impl<R: Read> BitReader<R> {
    pub fn new(input: InputBuffer<R>) -> Self {
        Self {
            input,
            bits: 0,
            count: 0,
        }
    }

    /// Pulls bytes until at least `len` bits are held or the input ends.
    fn fill(&mut self, len: u8) -> Result<()> {
        while self.count < len {
            match self.input.next_byte()? {
                Some(byte) => {
                    self.bits |= (byte as u64) << self.count;
                    self.count += 8;
                }
                None => break,
            }
        }
        Ok(())
    }

    pub fn read_bits(&mut self, len: u8) -> Result<BitSequence> {
        assert!(len <= 16, "cannot read {} bits at once", len);
        self.fill(len)?;
        if self.count < len {
            return Err(Error::TruncatedInput);
        }
        let value = (self.bits & ((1u64 << len) - 1)) as u16;
        self.consume(len);
        Ok(BitSequence::new(value, len))
    }

    /// Looks at the next `len` bits without consuming them.
    ///
    /// Near the end of input fewer bits may exist; the missing high bits read as
    /// zero and the second value tells how many are real.
    pub fn peek_bits(&mut self, len: u8) -> Result<(u16, u8)> {
        assert!(len <= 16, "cannot peek {} bits at once", len);
        self.fill(len)?;
        let value = (self.bits & ((1u64 << len) - 1)) as u16;
        Ok((value, self.count.min(len)))
    }

    pub fn consume(&mut self, len: u8) {
        debug_assert!(len <= self.count);
        self.bits >>= len;
        self.count -= len;
    }

    /// Drops the rest of the partially consumed byte and returns any whole
    /// prefetched bytes to the input buffer.
    pub fn align_to_byte(&mut self) {
        let whole = self.count / 8;
        self.input.unread(whole as usize);
        self.bits = 0;
        self.count = 0;
    }

    pub fn borrow_reader_from_boundary(&mut self) -> &mut InputBuffer<R> {
        self.align_to_byte();
        &mut self.input
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;

    fn reader(data: &[u8]) -> Result<BitReader<&[u8]>> {
        Ok(BitReader::new(InputBuffer::new(data)?))
    }

    #[test]
    fn read_bits() -> Result<()> {
        let data: &[u8] = &[0b01100011, 0b11011011, 0b10101111];
        let mut reader = reader(data)?;
        assert_eq!(reader.read_bits(1)?, BitSequence::new(0b1, 1));
        assert_eq!(reader.read_bits(2)?, BitSequence::new(0b01, 2));
        assert_eq!(reader.read_bits(3)?, BitSequence::new(0b100, 3));
        assert_eq!(reader.read_bits(4)?, BitSequence::new(0b1101, 4));
        assert_eq!(reader.read_bits(5)?, BitSequence::new(0b10110, 5));
        assert_eq!(reader.read_bits(8)?, BitSequence::new(0b01011111, 8));
        assert!(matches!(reader.read_bits(2), Err(Error::TruncatedInput)));
        Ok(())
    }

    #[test]
    fn sixteen_bits() -> Result<()> {
        let mut reader = reader(&[0xff, 0x00, 0x12, 0x34])?;
        assert_eq!(reader.read_bits(4)?.bits(), 0xf);
        assert_eq!(reader.read_bits(16)?.bits(), 0x200f);
        assert_eq!(reader.read_bits(12)?.bits(), 0x341);
        Ok(())
    }

    #[test]
    fn peek_near_end() -> Result<()> {
        let mut reader = reader(&[0b1010_1100])?;
        assert_eq!(reader.peek_bits(9)?, (0b1010_1100, 8));
        reader.consume(3);
        assert_eq!(reader.peek_bits(9)?, (0b10101, 5));
        Ok(())
    }

    #[test]
    fn borrow_reader_from_boundary() -> Result<()> {
        let data: &[u8] = &[0x99, 0xaa, 0xbb, 0xcc, 0xdd];
        let mut reader = reader(data)?;
        assert_eq!(reader.read_bits(2)?.bits(), 0b01);
        // Prefetch two more bytes than were consumed.
        assert_eq!(reader.peek_bits(16)?, (0xeaa6, 16));
        let inner = reader.borrow_reader_from_boundary();
        assert_eq!(inner.read_u8()?, 0xaa);
        assert_eq!(inner.read_u8()?, 0xbb);
        assert_eq!(reader.read_bits(8)?.bits(), 0xcc);
        Ok(())
    }
}
