#![forbid(unsafe_code)]

use std::ops::Range;

use crc::{Crc, Digest, CRC_32_ISO_HDLC};
use log::trace;

use crate::error::{zeroed, Error, Result};

////////////////////////////////////////////////////////////////////////////////

pub const WINDOW_SIZE: usize = 32768;
static CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// 32 KiB circular history that doubles as the output buffer.
///
/// Bytes between `start` and `pos` are decoded but not yet flushed. The write
/// position only wraps to zero inside [`SlidingWindow::flush`].
pub struct SlidingWindow {
    buf: Vec<u8>,
    pos: usize,
    start: usize,
    wrapped: bool,
    digest: Digest<'static, u32>,
    flushed: u64,
}

impl SlidingWindow {
    pub fn new() -> Result<Self> {
        Ok(Self {
            buf: zeroed(WINDOW_SIZE)?,
            pos: 0,
            start: 0,
            wrapped: false,
            digest: CRC.digest(),
            flushed: 0,
        })
    }

    pub fn is_full(&self) -> bool {
        self.pos == WINDOW_SIZE
    }

    pub fn space(&self) -> usize {
        WINDOW_SIZE - self.pos
    }

    pub fn pending(&self) -> usize {
        self.pos - self.start
    }

    /// How far back a match may reach.
    pub fn history(&self) -> usize {
        if self.wrapped {
            WINDOW_SIZE
        } else {
            self.pos
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos += 1;
    }

    /// Free space for `len` raw bytes; commit them with [`SlidingWindow::advance`].
    pub fn spare(&mut self, len: usize) -> &mut [u8] {
        &mut self.buf[self.pos..self.pos + len]
    }

    pub fn advance(&mut self, len: usize) {
        assert!(len <= self.space());
        self.pos += len;
    }

    pub fn check_distance(&self, distance: usize) -> Result<()> {
        let available = self.history();
        if distance == 0 || distance > available {
            return Err(Error::InvalidDistance {
                distance,
                available,
            });
        }
        Ok(())
    }

    /// Appends `len` bytes starting `distance` bytes back. `len` must fit in
    /// the free space; the source may overlap the bytes being written.
    pub fn copy_match(&mut self, distance: usize, len: usize) -> Result<()> {
        assert!(len <= self.space());
        self.check_distance(distance)?;

        let dst = self.pos;
        let src = (dst + WINDOW_SIZE - distance) % WINDOW_SIZE;
        if src + len <= WINDOW_SIZE && (src + len <= dst || src >= dst + len) {
            self.buf.copy_within(src..src + len, dst);
        } else {
            for i in 0..len {
                self.buf[dst + i] = self.buf[(src + i) % WINDOW_SIZE];
            }
        }
        self.pos += len;
        Ok(())
    }

    /// Folds the unflushed bytes into the CRC and returns where they lie.
    ///
    /// They stay readable through [`SlidingWindow::bytes`] until the next
    /// write.
    pub fn flush(&mut self) -> Range<usize> {
        let (from, to) = (self.start, self.pos);
        self.digest.update(&self.buf[from..to]);
        self.flushed += (to - from) as u64;
        trace!("window flush: {} bytes, {} total", to - from, self.flushed);

        if to == WINDOW_SIZE {
            self.pos = 0;
            self.start = 0;
            self.wrapped = true;
        } else {
            self.start = to;
        }
        from..to
    }

    pub fn bytes(&self, range: Range<usize>) -> &[u8] {
        &self.buf[range]
    }

    /// CRC-32 of everything flushed so far.
    pub fn crc32(&self) -> u32 {
        self.digest.clone().finalize()
    }

    /// Bytes decoded so far, flushed or not.
    pub fn total_out(&self) -> u64 {
        self.flushed + self.pending() as u64
    }
}

////////////////////////////////////////////////////////////////////////////////
