// Copyright (c) 2025 TRUSTEDGE LABS LLC
// MPL-2.0: https://mozilla.org/MPL/2.0/
// Project: trustedge — Privacy and trust at the edge.

//! Little-endian primitive readers/writers and the two length-prefix
//! conventions used throughout the wire formats: an 8-bit length where a
//! stored `0` means `256`, and a 16-bit length where a stored `0` means
//! `65536`. Neither convention can represent a zero-length string; none of
//! the fields that use them need to.

use std::io::{self, Read, Write};

use crate::error::{MauError, Result};

pub fn read_u8(r: &mut impl Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16(r: &mut impl Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_i64(r: &mut impl Read) -> Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub fn read_exact_vec(r: &mut impl Read, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn write_u8(w: &mut impl Write, v: u8) -> Result<()> {
    w.write_all(&[v])?;
    Ok(())
}

pub fn write_u16(w: &mut impl Write, v: u16) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_i64(w: &mut impl Write, v: i64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Maximum byte-string length representable by an 8-bit length prefix
/// (stored `0` denotes this value).
pub const MAX_LEN_U8: usize = 256;
/// Maximum byte-string length representable by a 16-bit length prefix
/// (stored `0` denotes this value).
pub const MAX_LEN_U16: usize = 65536;

/// Read a byte string prefixed by an 8-bit length where `0` means 256.
pub fn read_len8_bytes(r: &mut impl Read) -> Result<Vec<u8>> {
    let raw = read_u8(r)?;
    let len = if raw == 0 { MAX_LEN_U8 } else { raw as usize };
    read_exact_vec(r, len)
}

/// Write a byte string with an 8-bit length prefix (`0` denotes 256 bytes).
pub fn write_len8_bytes(w: &mut impl Write, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() || bytes.len() > MAX_LEN_U8 {
        return Err(MauError::invalid_data(format!(
            "length-8 byte string must be 1..={MAX_LEN_U8} bytes, got {}",
            bytes.len()
        )));
    }
    let stored = if bytes.len() == MAX_LEN_U8 {
        0
    } else {
        bytes.len() as u8
    };
    write_u8(w, stored)?;
    w.write_all(bytes)?;
    Ok(())
}

/// Read a byte string prefixed by a 16-bit length where `0` means 65536.
pub fn read_len16_bytes(r: &mut impl Read) -> Result<Vec<u8>> {
    let raw = read_u16(r)?;
    let len = if raw == 0 { MAX_LEN_U16 } else { raw as usize };
    read_exact_vec(r, len)
}

/// Write a byte string with a 16-bit length prefix (`0` denotes 65536 bytes).
pub fn write_len16_bytes(w: &mut impl Write, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() || bytes.len() > MAX_LEN_U16 {
        return Err(MauError::invalid_data(format!(
            "length-16 byte string must be 1..={MAX_LEN_U16} bytes, got {}",
            bytes.len()
        )));
    }
    let stored = if bytes.len() == MAX_LEN_U16 {
        0
    } else {
        bytes.len() as u16
    };
    write_u16(w, stored)?;
    w.write_all(bytes)?;
    Ok(())
}

/// A UTF-8 string prefixed by an 8-bit length (as used by filenames and
/// archive paths in `MauZEntryRecord`/`OffsetRecord`).
pub fn read_len8_string(r: &mut impl Read) -> Result<String> {
    let bytes = read_len8_bytes(r)?;
    String::from_utf8(bytes).map_err(|e| MauError::invalid_data(format!("non-UTF-8 string: {e}")))
}

pub fn write_len8_string(w: &mut impl Write, s: &str) -> Result<()> {
    write_len8_bytes(w, s.as_bytes())
}

/// In-memory writer that buffers a whole envelope so its length can be
/// backfilled into earlier framing before the bytes are committed to the
/// real sink.
pub fn buffer_writer() -> io::Cursor<Vec<u8>> {
    io::Cursor::new(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn len8_zero_means_256() {
        let bytes = vec![0x41u8; 256];
        let mut buf = Vec::new();
        write_len8_bytes(&mut buf, &bytes).unwrap();
        assert_eq!(buf[0], 0);
        let mut cur = Cursor::new(buf);
        let round = read_len8_bytes(&mut cur).unwrap();
        assert_eq!(round, bytes);
    }

    #[test]
    fn len16_zero_means_65536() {
        let bytes = vec![0x5au8; 65536];
        let mut buf = Vec::new();
        write_len16_bytes(&mut buf, &bytes).unwrap();
        assert_eq!(&buf[..2], &[0, 0]);
        let mut cur = Cursor::new(buf);
        let round = read_len16_bytes(&mut cur).unwrap();
        assert_eq!(round, bytes);
    }

    #[test]
    fn len8_rejects_empty_and_oversized() {
        let mut buf = Vec::new();
        assert!(write_len8_bytes(&mut buf, &[]).is_err());
        let too_big = vec![0u8; MAX_LEN_U8 + 1];
        assert!(write_len8_bytes(&mut buf, &too_big).is_err());
    }

    #[test]
    fn i64_round_trips_negative_and_positive() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let mut buf = Vec::new();
            write_i64(&mut buf, v).unwrap();
            let mut cur = Cursor::new(buf);
            assert_eq!(read_i64(&mut cur).unwrap(), v);
        }
    }
}
