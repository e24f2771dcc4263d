#![forbid(unsafe_code)]

mod common;

use gzread::{GzReader, Result};

use common::{gzip, gzip_member, read_all, BitWriter};

////////////////////////////////////////////////////////////////////////////////

const PERIOD: usize = 300;
const WINDOW: usize = 32768;

/// A fixed-Huffman stream: `PERIOD` literals, then `matches` copies of 258
/// bytes from `PERIOD` back, then one 10 byte copy. Returns it with the
/// plaintext it encodes.
fn periodic_stream(matches: usize) -> (Vec<u8>, Vec<u8>) {
    let pattern: Vec<u8> = (0..PERIOD).map(|i| ((i * 7 + i / 3) % 256) as u8).collect();
    let mut writer = BitWriter::new();
    writer.fixed_block_header(true);
    for &byte in &pattern {
        writer.fixed_symbol(byte as u32);
    }
    // Distance 300 is symbol 16 (base 257) with 7 extra bits.
    let copy = |writer: &mut BitWriter, length_symbol: u32| {
        writer.fixed_symbol(length_symbol);
        writer.fixed_distance(16);
        writer.write_bits((PERIOD - 257) as u32, 7);
    };
    for _ in 0..matches {
        copy(&mut writer, 285);
    }
    copy(&mut writer, 264);
    writer.fixed_symbol(256);

    let len = PERIOD + 258 * matches + 10;
    let plain = (0..len).map(|i| pattern[i % PERIOD]).collect();
    (writer.finish(), plain)
}

#[test]
fn match_straddles_window_boundary() -> Result<()> {
    let (deflated, plain) = periodic_stream(260);
    assert!(plain.len() > 2 * WINDOW);
    // The window boundary falls inside one of the copies.
    assert_ne!((WINDOW - PERIOD) % 258, 0);

    let data = gzip_member(&deflated, &plain);
    let plans: [&[usize]; 4] = [&[1], &[WINDOW], &[WINDOW - 1, 2], &[plain.len() + 1]];
    for sizes in plans {
        let out = read_all(&mut GzReader::new(&data[..])?, sizes)?;
        assert!(out == plain, "chunk sizes {:?}", sizes);
    }
    Ok(())
}

#[test]
fn large_random_stream() -> Result<()> {
    let mut state = 0x2545_f491u32;
    let mut plain = Vec::new();
    while plain.len() < 200_000 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        // Mix fresh bytes with copies from up to the whole window back.
        if state % 3 == 0 && plain.len() > WINDOW {
            let back = 1 + (state >> 8) as usize % WINDOW;
            let len = 3 + (state >> 24) as usize % 200;
            let from = plain.len() - back;
            for i in 0..len {
                let byte = plain[from + i];
                plain.push(byte);
            }
        } else {
            plain.push((state >> 11) as u8);
        }
    }

    let data = gzip(&plain);
    let out = read_all(&mut GzReader::new(&data[..])?, &[4093])?;
    assert!(out == plain);
    Ok(())
}
