//! Cluster and blob addressing
//!
//! A cluster starts with a single header byte: the low nibble selects the
//! codec, bit 4 selects 64-bit intra-cluster offsets. The blob offset
//! table follows the header (in the file for uncompressed clusters, in
//! the decoded payload otherwise).

use tracing::trace;

use crate::blob::codec::{XzClusterDecoder, ZstdClusterDecoder};
use crate::blob::compressed::CompressedBlobReader;
use crate::blob::uncompressed::UncompressedBlobReader;
use crate::blob::BlobReader;
use crate::error::{Result, ZimError};
use crate::ioutil::{read_u32_le, read_u64_le};
use crate::reader::Zim;

/// Cluster codec identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Legacy "no compression" marker (Zeno era)
    Zeno = 0,
    /// No compression
    None = 1,
    /// Deprecated, recognized but rejected
    Zlib = 2,
    /// Deprecated, recognized but rejected
    Bzip2 = 3,
    Xz = 4,
    Zstd = 5,
}

impl Compression {
    pub fn from_byte(byte: u8) -> Option<Compression> {
        match byte {
            0 => Some(Compression::Zeno),
            1 => Some(Compression::None),
            2 => Some(Compression::Zlib),
            3 => Some(Compression::Bzip2),
            4 => Some(Compression::Xz),
            5 => Some(Compression::Zstd),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn is_uncompressed(&self) -> bool {
        matches!(self, Compression::Zeno | Compression::None)
    }
}

/// Decoded cluster header byte.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClusterHeader {
    pub compression_byte: u8,
    pub extended: bool,
}

impl ClusterHeader {
    fn from_byte(byte: u8) -> Self {
        Self {
            compression_byte: byte & 0x0F,
            extended: (byte >> 4) & 1 == 1,
        }
    }

    /// Width of one intra-cluster offset in bytes.
    pub fn offset_width(&self) -> usize {
        if self.extended {
            8
        } else {
            4
        }
    }
}

/// Byte range of a cluster: `(start, end)` with `end` inclusive, bounded
/// by the next cluster pointer.
pub(crate) fn cluster_bounds(zim: &Zim, cluster_index: u32) -> Result<(u64, u64)> {
    let ptrs = zim.cluster_ptrs();
    let index = cluster_index as usize;

    if index + 1 >= ptrs.len() {
        return Err(ZimError::InvalidIndex {
            index: cluster_index as u64,
            limit: ptrs.len().saturating_sub(1) as u64,
        });
    }

    Ok((ptrs[index], ptrs[index + 1] - 1))
}

fn read_cluster_header(zim: &Zim, cluster_start: u64) -> Result<ClusterHeader> {
    let mut byte = [0u8; 1];
    zim.read_exact_at(cluster_start, &mut byte)?;
    Ok(ClusterHeader::from_byte(byte[0]))
}

/// The codec of a cluster, without touching its payload.
pub(crate) fn cluster_compression(zim: &Zim, cluster_index: u32) -> Result<Compression> {
    let (start, _) = cluster_bounds(zim, cluster_index)?;
    let header = read_cluster_header(zim, start)?;

    Compression::from_byte(header.compression_byte)
        .ok_or(ZimError::CompressionUnsupported(header.compression_byte))
}

/// Open a reader over blob `blob_index` of cluster `cluster_index`.
pub(crate) fn open_blob<'a>(
    zim: &'a Zim,
    cluster_index: u32,
    blob_index: u32,
) -> Result<BlobReader<'a>> {
    let (cluster_start, cluster_end) = cluster_bounds(zim, cluster_index)?;
    let header = read_cluster_header(zim, cluster_start)?;
    let width = header.offset_width();

    trace!(
        cluster_index,
        blob_index,
        compression = header.compression_byte,
        extended = header.extended,
        "opening blob"
    );

    match Compression::from_byte(header.compression_byte) {
        Some(c) if c.is_uncompressed() => {
            // The offset table sits right after the header byte and its
            // values are relative to the table start.
            let table_start = cluster_start + 1;
            let mut buf = vec![0u8; 2 * width];
            zim.read_exact_at(table_start + blob_index as u64 * width as u64, &mut buf)?;

            let (blob_start, blob_end) = decode_offset_pair(&buf, width)?;
            if blob_end < blob_start {
                return Err(ZimError::malformed(format!(
                    "blob range inverted: {blob_start}..{blob_end}"
                )));
            }

            Ok(BlobReader::Uncompressed(UncompressedBlobReader::new(
                zim,
                table_start + blob_start,
                table_start + blob_end,
            )))
        }
        Some(Compression::Xz) => Ok(BlobReader::Compressed(CompressedBlobReader::new(
            zim,
            cluster_start,
            cluster_end,
            blob_index,
            width,
            Box::new(XzClusterDecoder),
        ))),
        Some(Compression::Zstd) => Ok(BlobReader::Compressed(CompressedBlobReader::new(
            zim,
            cluster_start,
            cluster_end,
            blob_index,
            width,
            Box::new(ZstdClusterDecoder),
        ))),
        _ => Err(ZimError::CompressionUnsupported(header.compression_byte)),
    }
}

/// Decode two consecutive little-endian offsets of the given width.
pub(crate) fn decode_offset_pair(buf: &[u8], width: usize) -> Result<(u64, u64)> {
    if width == 8 {
        Ok((read_u64_le(&buf[0..8])?, read_u64_le(&buf[8..16])?))
    } else {
        Ok((
            read_u32_le(&buf[0..4])? as u64,
            read_u32_le(&buf[4..8])? as u64,
        ))
    }
}
