//! Internal decoding helpers
//!
//! Fixed-width integer reads over byte slices, and the NUL-delimited
//! string scanner used by the MIME table and directory entries.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Result, ZimError};
use crate::source::ByteSource;

fn check_len(buf: &[u8], want: usize) -> Result<()> {
    if buf.len() < want {
        return Err(ZimError::malformed(format!(
            "short slice: need {want} bytes, have {}",
            buf.len()
        )));
    }
    Ok(())
}

pub(crate) fn read_u16_le(buf: &[u8]) -> Result<u16> {
    check_len(buf, 2)?;
    Ok(LittleEndian::read_u16(buf))
}

pub(crate) fn read_u32_le(buf: &[u8]) -> Result<u32> {
    check_len(buf, 4)?;
    Ok(LittleEndian::read_u32(buf))
}

pub(crate) fn read_u64_le(buf: &[u8]) -> Result<u64> {
    check_len(buf, 8)?;
    Ok(LittleEndian::read_u64(buf))
}

pub(crate) fn read_u16_be(buf: &[u8]) -> Result<u16> {
    check_len(buf, 2)?;
    Ok(BigEndian::read_u16(buf))
}

pub(crate) fn read_u32_be(buf: &[u8]) -> Result<u32> {
    check_len(buf, 4)?;
    Ok(BigEndian::read_u32(buf))
}

/// Scan forward from `offset`, splitting on NUL bytes, reading the source
/// in chunks of `chunk` bytes.
///
/// Returns the collected strings and the number of bytes consumed. The
/// scan stops when `max_count` strings have been produced, when two
/// consecutive NULs are seen (the empty string is appended so callers can
/// observe the terminator), or at end of file.
pub(crate) fn read_strings_at(
    source: &dyn ByteSource,
    offset: u64,
    max_count: usize,
    chunk: usize,
) -> Result<(Vec<String>, u64)> {
    let mut values = Vec::new();
    let mut current = Vec::new();
    let mut consumed = 0u64;
    let mut was_null = false;
    let mut buf = vec![0u8; chunk];

    loop {
        let n = source.read_at(offset + consumed, &mut buf)?;
        if n == 0 {
            return Ok((values, consumed));
        }

        for &b in &buf[..n] {
            consumed += 1;

            if b != 0 {
                was_null = false;
                current.push(b);
                continue;
            }

            if was_null {
                // Two consecutive NULs terminate the sequence; the empty
                // string marks the terminator for the caller.
                values.push(String::new());
                return Ok((values, consumed));
            }
            was_null = true;

            values.push(String::from_utf8_lossy(&current).into_owned());
            current.clear();

            if values.len() == max_count {
                return Ok((values, consumed));
            }
        }
    }
}
