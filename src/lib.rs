#![forbid(unsafe_code)]

//! Pull-style decompression of gzip members and single-entry PKZIP archives.
//!
//! ```no_run
//! let mut reader = gzread::GzReader::open("dem.txt.gz")?;
//! let mut line = [0u8; 256];
//! let len = reader.read_line(&mut line)?;
//! # Ok::<(), gzread::Error>(())
//! ```

use std::io::{Read, Write};

mod bit_reader;
mod deflate;
mod error;
mod gzip;
mod huffman_coding;
mod huffman_table;
mod input_buffer;
mod reader;
mod window;
mod zip;

pub use error::{Error, Result};
pub use gzip::{CompressionMethod, Member, MemberFlags, MemberHeader};
pub use input_buffer::MIN_CAPACITY;
pub use reader::GzReader;
pub use zip::{LocalHeader, ZipMethod};

/// Decompresses the stream in `input` into `output` `chunk_size` bytes at a
/// time. Returns the number of bytes written.
pub fn decompress<R: Read, W: Write>(input: R, mut output: W, chunk_size: usize) -> Result<u64> {
    let mut reader = GzReader::new(input)?;
    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        let len = reader.read(&mut chunk)?;
        if len == 0 {
            break;
        }
        output.write_all(&chunk[..len])?;
    }
    output.flush()?;
    let total = reader.total_out();
    reader.close();
    Ok(total)
}
