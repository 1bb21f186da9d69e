//! Blob readers
//!
//! A blob reader is a bounded random-access byte stream over a single
//! blob. The uncompressed variant serves a window of the archive file
//! directly; the compressed variant decodes its whole cluster once, on
//! first use, and serves slices of the decoded payload. Readers are not
//! shared between threads; each holds its own position.

pub(crate) mod codec;
pub(crate) mod compressed;
pub(crate) mod uncompressed;

use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;

pub use compressed::CompressedBlobReader;
pub use uncompressed::UncompressedBlobReader;

/// Random-access reader over one blob's bytes.
pub enum BlobReader<'a> {
    Uncompressed(UncompressedBlobReader<'a>),
    Compressed(CompressedBlobReader<'a>),
}

impl BlobReader<'_> {
    /// Blob size in bytes. For a compressed blob this triggers the
    /// one-time cluster decode.
    pub fn size(&mut self) -> Result<u64> {
        match self {
            BlobReader::Uncompressed(r) => Ok(r.size()),
            BlobReader::Compressed(r) => r.size(),
        }
    }

    /// Read the remaining bytes from the current position.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        match self {
            BlobReader::Uncompressed(r) => r.read_all(),
            BlobReader::Compressed(r) => r.read_all(),
        }
    }
}

impl Read for BlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            BlobReader::Uncompressed(r) => r.read(buf),
            BlobReader::Compressed(r) => r.read(buf),
        }
    }
}

impl Seek for BlobReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            BlobReader::Uncompressed(r) => r.seek(pos),
            BlobReader::Compressed(r) => r.seek(pos),
        }
    }
}

/// Shared seek arithmetic over a known size.
pub(crate) fn resolve_seek(pos: u64, size: u64, target: SeekFrom) -> std::io::Result<u64> {
    let new_pos = match target {
        SeekFrom::Start(offset) => Some(offset),
        SeekFrom::Current(delta) => pos.checked_add_signed(delta),
        SeekFrom::End(delta) => size.checked_add_signed(delta),
    };

    new_pos.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "invalid seek to a negative position",
        )
    })
}

/// Copy from `data[pos..]` into `buf`, returning the count.
pub(crate) fn read_from_slice(data: &[u8], pos: u64, buf: &mut [u8]) -> usize {
    if pos >= data.len() as u64 {
        return 0;
    }

    let start = pos as usize;
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

pub(crate) fn to_io_error(err: crate::error::ZimError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}
