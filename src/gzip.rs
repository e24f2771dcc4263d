#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::io::BufRead;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use crate::error::{Error, Result};
use crate::zip::{self, LocalHeader};

////////////////////////////////////////////////////////////////////////////////

const ID1: u8 = 0x1f;
const ID2: u8 = 0x8b;
const ID2_OLD: u8 = 0x9e;
const ID2_LZW: u8 = 0x9d;
const ID2_PACK: u8 = 0x1e;
const ID2_LZH: u8 = 0xa0;

const CM_LZW: u8 = 1;
const CM_PACK: u8 = 2;
const CM_LZH: u8 = 3;
const CM_DEFLATE: u8 = 8;

const FTEXT_OFFSET: u8 = 0;
const FCONTINUATION_OFFSET: u8 = 1;
const FEXTRA_OFFSET: u8 = 2;
const FNAME_OFFSET: u8 = 3;
const FCOMMENT_OFFSET: u8 = 4;
const FENCRYPTED_OFFSET: u8 = 5;
const RESERVED_MASK: u8 = 0xc0;

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct MemberHeader {
    pub compression_method: CompressionMethod,
    pub flags: MemberFlags,
    pub modification_time: u32,
    pub extra: Option<Vec<u8>>,
    pub name: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    pub extra_flags: u8,
    pub os: u8,
}

impl MemberHeader {
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    pub fn name_lossy(&self) -> Option<Cow<'_, str>> {
        self.name.as_deref().map(String::from_utf8_lossy)
    }

    pub fn comment_lossy(&self) -> Option<Cow<'_, str>> {
        self.comment.as_deref().map(String::from_utf8_lossy)
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Ord, PartialOrd, Eq)]
pub enum CompressionMethod {
    Deflate,
    Unknown(u8),
}

impl From<u8> for CompressionMethod {
    fn from(value: u8) -> Self {
        match value {
            CM_DEFLATE => Self::Deflate,
            x => Self::Unknown(x),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberFlags(pub u8);

impl MemberFlags {
    fn bit(&self, n: u8) -> bool {
        (self.0 >> n) & 1 != 0
    }

    pub fn is_text(&self) -> bool {
        self.bit(FTEXT_OFFSET)
    }

    pub fn is_continuation(&self) -> bool {
        self.bit(FCONTINUATION_OFFSET)
    }

    pub fn has_extra(&self) -> bool {
        self.bit(FEXTRA_OFFSET)
    }

    pub fn has_name(&self) -> bool {
        self.bit(FNAME_OFFSET)
    }

    pub fn has_comment(&self) -> bool {
        self.bit(FCOMMENT_OFFSET)
    }

    pub fn is_encrypted(&self) -> bool {
        self.bit(FENCRYPTED_OFFSET)
    }

    pub fn reserved(&self) -> u8 {
        self.0 & RESERVED_MASK
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberFooter {
    pub data_crc32: u32,
    pub data_size: u32,
}

/// The compressed entry a stream starts with.
#[derive(Debug, Clone)]
pub enum Member {
    Gzip(MemberHeader),
    Zip(LocalHeader),
}

impl Member {
    /// Payload length when the entry holds raw bytes instead of DEFLATE data.
    pub fn stored_len(&self) -> Option<u64> {
        match self {
            Member::Gzip(_) => None,
            Member::Zip(local) => local.stored_len(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

pub struct MemberReader<T> {
    inner: T,
}

impl<T: BufRead> MemberReader<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Identifies the container by its magic and parses the entry header,
    /// leaving `inner` at the first byte of the payload.
    pub fn read_header(&mut self) -> Result<Member> {
        let id1 = self.inner.read_u8()?;
        let id2 = self.inner.read_u8()?;
        match (id1, id2) {
            (ID1, ID2) | (ID1, ID2_OLD) => Ok(Member::Gzip(self.read_gzip_header()?)),
            (ID1, ID2_LZW) => Err(Error::UnsupportedMethod(CM_LZW as u16)),
            (ID1, ID2_PACK) => Err(Error::UnsupportedMethod(CM_PACK as u16)),
            (ID1, ID2_LZH) => Err(Error::UnsupportedMethod(CM_LZH as u16)),
            (zip::SIG1, zip::SIG2) => Ok(Member::Zip(zip::read_local_header(&mut self.inner)?)),
            _ => Err(Error::BadMagic),
        }
    }

    fn read_gzip_header(&mut self) -> Result<MemberHeader> {
        let cm: CompressionMethod = self.inner.read_u8()?.into();
        if let CompressionMethod::Unknown(method) = cm {
            return Err(Error::UnsupportedMethod(method as u16));
        }
        let flags = MemberFlags(self.inner.read_u8()?);
        if flags.is_encrypted() {
            return Err(Error::Encrypted);
        }
        if flags.is_continuation() {
            return Err(Error::MultiPartUnsupported);
        }
        if flags.reserved() != 0 {
            return Err(Error::ReservedFlags(flags.0));
        }
        let mtime = self.inner.read_u32::<LittleEndian>()?;
        let xfl = self.inner.read_u8()?;
        let os = self.inner.read_u8()?;

        let extra = if flags.has_extra() {
            let len = self.inner.read_u16::<LittleEndian>()?;
            let mut extra = vec![0u8; len as usize];
            self.inner.read_exact(&mut extra)?;
            Some(extra)
        } else {
            None
        };
        let name = if flags.has_name() {
            Some(self.read_zero_terminated()?)
        } else {
            None
        };
        let comment = if flags.has_comment() {
            Some(self.read_zero_terminated()?)
        } else {
            None
        };

        let header = MemberHeader {
            compression_method: cm,
            flags,
            modification_time: mtime,
            extra,
            name,
            comment,
            extra_flags: xfl,
            os,
        };
        debug!(
            "gzip member: name {:?}, mtime {}, os {}",
            header.name_lossy(),
            header.modification_time,
            header.os
        );
        Ok(header)
    }

    fn read_zero_terminated(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.inner.read_until(0, &mut bytes)?;
        if bytes.pop() != Some(0) {
            return Err(Error::TruncatedInput);
        }
        Ok(bytes)
    }

    /// Reads the CRC-32 and length that follow the payload of `member`.
    pub fn read_footer(&mut self, member: &Member) -> Result<MemberFooter> {
        match member {
            Member::Gzip(_) => {
                let crc = self.inner.read_u32::<LittleEndian>()?;
                let isize = self.inner.read_u32::<LittleEndian>()?;
                Ok(MemberFooter {
                    data_crc32: crc,
                    data_size: isize,
                })
            }
            Member::Zip(local) if local.has_data_descriptor() => {
                zip::read_data_descriptor(&mut self.inner)
            }
            Member::Zip(local) => Ok(local.footer()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn header(bytes: &[u8]) -> Result<Member> {
        MemberReader::new(bytes).read_header()
    }

    #[test]
    fn plain_header() -> Result<()> {
        let bytes = [0x1f, 0x8b, 8, 0, 1, 2, 3, 4, 0, 3, 0xaa];
        let mut rdr = MemberReader::new(&bytes[..]);
        match rdr.read_header()? {
            Member::Gzip(h) => {
                assert_eq!(h.compression_method, CompressionMethod::Deflate);
                assert_eq!(h.modification_time, 0x04030201);
                assert_eq!(h.os, 3);
                assert!(h.name.is_none() && h.extra.is_none() && h.comment.is_none());
            }
            other => panic!("unexpected member {:?}", other),
        }
        assert_eq!(rdr.inner, &[0xaa]);
        Ok(())
    }

    #[test]
    fn optional_fields() -> Result<()> {
        let mut bytes = vec![0x1f, 0x8b, 8, 0b11100, 0, 0, 0, 0, 2, 255];
        bytes.extend_from_slice(&[3, 0, b'x', b'y', b'z']);
        bytes.extend_from_slice(b"dem.txt\0");
        bytes.extend_from_slice(b"elevations\0");
        bytes.push(0x55);

        let mut rdr = MemberReader::new(&bytes[..]);
        let h = match rdr.read_header()? {
            Member::Gzip(h) => h,
            other => panic!("unexpected member {:?}", other),
        };
        assert_eq!(h.extra.as_deref(), Some(&b"xyz"[..]));
        assert_eq!(h.name_lossy().as_deref(), Some("dem.txt"));
        assert_eq!(h.comment_lossy().as_deref(), Some("elevations"));
        assert_eq!(rdr.inner, &[0x55]);
        Ok(())
    }

    #[test]
    fn old_magic() -> Result<()> {
        assert!(matches!(
            header(&[0x1f, 0x9e, 8, 0, 0, 0, 0, 0, 0, 0])?,
            Member::Gzip(_)
        ));
        Ok(())
    }

    #[test]
    fn rejected_headers() {
        assert!(matches!(header(b"hello world"), Err(Error::BadMagic)));
        assert!(matches!(
            header(&[0x1f, 0x9d, 0x90]),
            Err(Error::UnsupportedMethod(1))
        ));
        assert!(matches!(
            header(&[0x1f, 0x8b, 7, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::UnsupportedMethod(7))
        ));
        assert!(matches!(
            header(&[0x1f, 0x8b, 8, 0x20, 0, 0, 0, 0, 0, 0]),
            Err(Error::Encrypted)
        ));
        assert!(matches!(
            header(&[0x1f, 0x8b, 8, 0x02, 0, 0, 0, 0, 0, 0]),
            Err(Error::MultiPartUnsupported)
        ));
        assert!(matches!(
            header(&[0x1f, 0x8b, 8, 0x40, 0, 0, 0, 0, 0, 0]),
            Err(Error::ReservedFlags(0x40))
        ));
    }

    #[test]
    fn truncated_header() {
        assert!(matches!(header(&[]), Err(Error::TruncatedInput)));
        assert!(matches!(
            header(&[0x1f, 0x8b, 8, 0, 0, 0]),
            Err(Error::TruncatedInput)
        ));
        assert!(matches!(
            header(&[0x1f, 0x8b, 8, 0x08, 0, 0, 0, 0, 0, 0, b'a', b'b']),
            Err(Error::TruncatedInput)
        ));
    }

    #[test]
    fn gzip_footer() -> Result<()> {
        let bytes = [0x1f, 0x8b, 8, 0, 0, 0, 0, 0, 0, 0];
        let member = header(&bytes)?;
        let trailer = [0x78, 0x56, 0x34, 0x12, 14, 0, 0, 0, 0xde, 0xad];
        let footer = MemberReader::new(&trailer[..]).read_footer(&member)?;
        assert_eq!(
            footer,
            MemberFooter {
                data_crc32: 0x12345678,
                data_size: 14
            }
        );
        Ok(())
    }
}
