//! Primitive big-endian codecs and zlib framing
//!
//! Every performance-data blob is a zlib stream over a fixed big-endian
//! layout. The encode/decode helpers here work cursor-style: each call reads
//! or writes at the given offset and returns the offset just past the field,
//! so a codec walks a buffer by threading the offset through.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

fn check_remaining(buf: &[u8], offset: usize, needed: usize) -> Result<()> {
    if offset + needed > buf.len() {
        return Err(Error::MalformedBlob(format!(
            "need {} bytes at offset {}, buffer has {}",
            needed,
            offset,
            buf.len()
        )));
    }
    Ok(())
}

pub fn encode_u8(value: u8, buf: &mut [u8], offset: usize) -> usize {
    buf[offset] = value;
    offset + 1
}

pub fn decode_u8(buf: &[u8], offset: usize) -> Result<(u8, usize)> {
    check_remaining(buf, offset, 1)?;
    Ok((buf[offset], offset + 1))
}

pub fn encode_i32_be(value: i32, buf: &mut [u8], offset: usize) -> usize {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    offset + 4
}

pub fn decode_i32_be(buf: &[u8], offset: usize) -> Result<(i32, usize)> {
    check_remaining(buf, offset, 4)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    Ok((i32::from_be_bytes(bytes), offset + 4))
}

pub fn encode_i64_be(value: i64, buf: &mut [u8], offset: usize) -> usize {
    buf[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
    offset + 8
}

pub fn decode_i64_be(buf: &[u8], offset: usize) -> Result<(i64, usize)> {
    check_remaining(buf, offset, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    Ok((i64::from_be_bytes(bytes), offset + 8))
}

pub fn encode_f64_be(value: f64, buf: &mut [u8], offset: usize) -> usize {
    buf[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
    offset + 8
}

pub fn decode_f64_be(buf: &[u8], offset: usize) -> Result<(f64, usize)> {
    check_remaining(buf, offset, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    Ok((f64::from_be_bytes(bytes), offset + 8))
}

pub fn encode_bytes(value: &[u8], buf: &mut [u8], offset: usize) -> usize {
    buf[offset..offset + value.len()].copy_from_slice(value);
    offset + value.len()
}

pub fn decode_bytes(buf: &[u8], offset: usize, len: usize) -> Result<(Vec<u8>, usize)> {
    check_remaining(buf, offset, len)?;
    Ok((buf[offset..offset + len].to_vec(), offset + len))
}

/// Compress a raw payload with default zlib settings.
pub fn zlib_compress(uncompressed: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(uncompressed)?;
    Ok(encoder.finish()?)
}

/// Decompress a zlib stream. A truncated or corrupt stream is reported as a
/// malformed blob rather than a bare IO error, since the bytes came from a
/// database column.
pub fn zlib_uncompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut uncompressed = Vec::new();
    decoder
        .read_to_end(&mut uncompressed)
        .map_err(|e| Error::MalformedBlob(format!("zlib stream: {e}")))?;
    Ok(uncompressed)
}
