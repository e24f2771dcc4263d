#![forbid(unsafe_code)]

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use crate::error::{Error, Result};
use crate::gzip::MemberFooter;

////////////////////////////////////////////////////////////////////////////////

pub const SIG1: u8 = b'P';
pub const SIG2: u8 = b'K';
const LOCAL_SIG_TAIL: [u8; 2] = [3, 4];
const DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

const FLAG_ENCRYPTED: u16 = 1 << 0;
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZipMethod {
    Stored,
    Deflated,
}

/// PKZIP local file header of the first (and only supported) entry.
#[derive(Debug, Clone)]
pub struct LocalHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: ZipMethod,
    pub modification_time: u16,
    pub modification_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
}

impl LocalHeader {
    /// CRC and sizes follow the payload instead of living in this header.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn stored_len(&self) -> Option<u64> {
        match self.method {
            ZipMethod::Stored => Some(self.uncompressed_size as u64),
            ZipMethod::Deflated => None,
        }
    }

    pub fn footer(&self) -> MemberFooter {
        MemberFooter {
            data_crc32: self.crc32,
            data_size: self.uncompressed_size,
        }
    }
}

/// Parses a local file header whose first two signature bytes were already
/// consumed.
pub fn read_local_header<T: Read>(rdr: &mut T) -> Result<LocalHeader> {
    let mut sig_tail = [0u8; 2];
    rdr.read_exact(&mut sig_tail)?;
    if sig_tail != LOCAL_SIG_TAIL {
        return Err(Error::BadMagic);
    }

    let version_needed = rdr.read_u16::<LittleEndian>()?;
    let flags = rdr.read_u16::<LittleEndian>()?;
    let method = rdr.read_u16::<LittleEndian>()?;
    let modification_time = rdr.read_u16::<LittleEndian>()?;
    let modification_date = rdr.read_u16::<LittleEndian>()?;
    let crc32 = rdr.read_u32::<LittleEndian>()?;
    let compressed_size = rdr.read_u32::<LittleEndian>()?;
    let uncompressed_size = rdr.read_u32::<LittleEndian>()?;
    let name_len = rdr.read_u16::<LittleEndian>()?;
    let extra_len = rdr.read_u16::<LittleEndian>()?;

    let mut name = vec![0u8; name_len as usize];
    rdr.read_exact(&mut name)?;
    let mut extra = vec![0u8; extra_len as usize];
    rdr.read_exact(&mut extra)?;

    if flags & FLAG_ENCRYPTED != 0 {
        return Err(Error::Encrypted);
    }
    let method = match method {
        METHOD_STORED => ZipMethod::Stored,
        METHOD_DEFLATED => ZipMethod::Deflated,
        other => return Err(Error::UnsupportedMethod(other)),
    };
    if method == ZipMethod::Stored && compressed_size != uncompressed_size {
        return Err(Error::LengthMismatch {
            expected: uncompressed_size as u64,
            actual: compressed_size as u64,
        });
    }

    let header = LocalHeader {
        version_needed,
        flags,
        method,
        modification_time,
        modification_date,
        crc32,
        compressed_size,
        uncompressed_size,
        name,
        extra,
    };
    debug!(
        "zip entry: {:?}, {:?}, {} -> {} bytes",
        String::from_utf8_lossy(&header.name),
        header.method,
        header.compressed_size,
        header.uncompressed_size
    );
    Ok(header)
}

/// Reads the data descriptor written after a streamed entry. The leading
/// signature is optional in the wild.
pub fn read_data_descriptor<T: Read>(rdr: &mut T) -> Result<MemberFooter> {
    let mut crc = rdr.read_u32::<LittleEndian>()?;
    if crc == DESCRIPTOR_SIGNATURE {
        crc = rdr.read_u32::<LittleEndian>()?;
    }
    let _compressed_size = rdr.read_u32::<LittleEndian>()?;
    let uncompressed_size = rdr.read_u32::<LittleEndian>()?;
    Ok(MemberFooter {
        data_crc32: crc,
        data_size: uncompressed_size,
    })
}

////////////////////////////////////////////////////////////////////////////////
