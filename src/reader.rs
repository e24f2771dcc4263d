#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;
use std::path::Path;

use log::debug;

use crate::bit_reader::BitReader;
use crate::deflate::Inflater;
use crate::error::{Error, Result};
use crate::gzip::{Member, MemberReader};
use crate::input_buffer::InputBuffer;

////////////////////////////////////////////////////////////////////////////////

enum State {
    Header,
    Body,
    Finished,
    Failed(Error),
}

/// Pull-style decompressor for one gzip member or PKZIP entry.
///
/// Decoded bytes arrive from the inflater a window at a time. `ready` marks
/// the part of the window that `read` calls have not drained yet, whatever
/// size those calls ask for; the inflater only resumes once it is empty.
pub struct GzReader<R> {
    inflater: Inflater<R>,
    member: Option<Member>,
    ready: Range<usize>,
    state: State,
}

impl GzReader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!("opened {}", path.display());
        Self::new(file)
    }
}

impl<R: Read> GzReader<R> {
    pub fn new(inner: R) -> Result<Self> {
        Self::from_input(InputBuffer::new(inner)?)
    }

    /// Like [`GzReader::new`], with an input buffer of `capacity` bytes
    /// (at least 64).
    pub fn with_capacity(inner: R, capacity: usize) -> Result<Self> {
        Self::from_input(InputBuffer::with_capacity(inner, capacity)?)
    }

    fn from_input(input: InputBuffer<R>) -> Result<Self> {
        Ok(Self {
            inflater: Inflater::new(BitReader::new(input))?,
            member: None,
            ready: 0..0,
            state: State::Header,
        })
    }

    /// Fills `buf` completely unless the stream ends first. Returns 0 once
    /// everything was read and verified.
    ///
    /// After an error the stream is dead: every later call fails the same way.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let State::Failed(err) = &self.state {
            return Err(err.duplicate());
        }
        match self.fill(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                debug!("stream failed: {}", err);
                self.state = State::Failed(err.duplicate());
                Err(err)
            }
        }
    }

    /// Reads up to and including the next newline, stopping early when `buf`
    /// is full or the stream ends.
    pub fn read_line(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut len = 0;
        while len < buf.len() {
            if self.read(&mut buf[len..len + 1])? == 0 {
                break;
            }
            len += 1;
            if buf[len - 1] == b'\n' {
                break;
            }
        }
        Ok(len)
    }

    pub fn close(self) {
        debug!("closing stream after {} bytes", self.total_out());
    }

    /// The parsed entry header, available after the first read.
    pub fn header(&self) -> Option<&Member> {
        self.member.as_ref()
    }

    pub fn total_out(&self) -> u64 {
        self.inflater.total_out()
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut done = 0;
        while done < buf.len() {
            if self.ready.is_empty() && !self.refill()? {
                break;
            }
            let available = self.inflater.output(self.ready.clone());
            let n = available.len().min(buf.len() - done);
            buf[done..done + n].copy_from_slice(&available[..n]);
            self.ready.start += n;
            done += n;
        }
        Ok(done)
    }

    /// Decodes the next chunk once the previous one was drained. Returns false
    /// at the end of the stream.
    fn refill(&mut self) -> Result<bool> {
        if let State::Header = self.state {
            self.start()?;
        }
        if !matches!(self.state, State::Body) {
            return Ok(false);
        }

        match self.inflater.resume()? {
            Some(range) => {
                self.ready = range;
                Ok(true)
            }
            None => {
                self.finish()?;
                Ok(false)
            }
        }
    }

    fn start(&mut self) -> Result<()> {
        let input = self.inflater.bit_reader_mut().borrow_reader_from_boundary();
        let member = MemberReader::new(input).read_header()?;
        if let Some(len) = member.stored_len() {
            self.inflater.set_stored_entry(len);
        }
        self.member = Some(member);
        self.state = State::Body;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let crc = self.inflater.crc32();
        let total = self.inflater.total_out();
        if let Some(member) = &self.member {
            let input = self.inflater.bit_reader_mut().borrow_reader_from_boundary();
            let footer = MemberReader::new(input).read_footer(member)?;

            let size = total & 0xffff_ffff;
            if size != footer.data_size as u64 {
                return Err(Error::LengthMismatch {
                    expected: footer.data_size as u64,
                    actual: size,
                });
            }
            if crc != footer.data_crc32 {
                return Err(Error::CrcMismatch {
                    expected: footer.data_crc32,
                    actual: crc,
                });
            }
            debug!("verified {} bytes, crc32 {:#010x}", total, crc);
        }
        self.state = State::Finished;
        Ok(())
    }
}

impl<R: Read> Read for GzReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        GzReader::read(self, buf).map_err(io::Error::from)
    }
}

////////////////////////////////////////////////////////////////////////////////
