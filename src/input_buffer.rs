#![forbid(unsafe_code)]

use std::io::{self, BufRead, Read};

use log::trace;

use crate::error::{zeroed, Result};

////////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_CAPACITY: usize = 0x8000;
pub const MIN_CAPACITY: usize = 64;

/// Bytes kept in front of the buffer on refill so that whole bytes prefetched
/// by the bit reader can still be pushed back.
const LOOKBEHIND: usize = 8;

/// Fixed-size read buffer over the underlying file.
///
/// Invariant: `cursor <= valid_len <= buf.len()`.
pub struct InputBuffer<R> {
    inner: R,
    buf: Vec<u8>,
    valid_len: usize,
    cursor: usize,
}

impl<R: Read> InputBuffer<R> {
    pub fn new(inner: R) -> Result<Self> {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Result<Self> {
        let capacity = capacity.max(MIN_CAPACITY) + LOOKBEHIND;
        Ok(Self {
            inner,
            buf: zeroed(capacity)?,
            valid_len: 0,
            cursor: 0,
        })
    }

    /// Refills the buffer if everything in it was consumed.
    /// Returns the number of unread bytes afterwards; zero means end of file.
    fn refill(&mut self) -> io::Result<usize> {
        if self.cursor < self.valid_len {
            return Ok(self.valid_len - self.cursor);
        }

        let keep = self.cursor.min(LOOKBEHIND);
        self.buf.copy_within(self.cursor - keep..self.cursor, 0);
        self.cursor = keep;
        self.valid_len = keep;

        let read = loop {
            match self.inner.read(&mut self.buf[keep..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };
        self.valid_len += read;
        trace!("input refill: {} bytes", read);
        Ok(read)
    }

    /// Next byte of the stream, or `None` at end of file.
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        if self.refill()? == 0 {
            return Ok(None);
        }
        let byte = self.buf[self.cursor];
        self.cursor += 1;
        Ok(Some(byte))
    }

    /// Steps back over `count` bytes that were already handed out.
    pub fn unread(&mut self, count: usize) {
        assert!(count <= self.cursor, "cannot push back {} bytes", count);
        self.cursor -= count;
    }
}

impl<R: Read> Read for InputBuffer<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for InputBuffer<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.refill()?;
        Ok(&self.buf[self.cursor..self.valid_len])
    }

    fn consume(&mut self, amt: usize) {
        self.cursor = (self.cursor + amt).min(self.valid_len);
    }
}

////////////////////////////////////////////////////////////////////////////////
