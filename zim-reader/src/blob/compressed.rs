//! Reader over a blob inside a compressed cluster
//!
//! The whole cluster is decoded at most once, on the first of
//! `read`/`seek`/`size`, behind a once-cell. A loading failure is sticky:
//! every later operation returns the cached error.

use std::io::{Read, Seek, SeekFrom};

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::blob::codec::ClusterDecoder;
use crate::blob::{read_from_slice, resolve_seek, to_io_error};
use crate::cluster::decode_offset_pair;
use crate::error::{Result, ZimError};
use crate::reader::Zim;

pub struct CompressedBlobReader<'a> {
    zim: &'a Zim,
    cluster_start: u64,
    cluster_end: u64,
    blob_index: u32,
    offset_width: usize,
    decoder: Box<dyn ClusterDecoder>,
    blob: OnceCell<std::result::Result<Vec<u8>, ZimError>>,
    pos: u64,
}

impl<'a> CompressedBlobReader<'a> {
    pub(crate) fn new(
        zim: &'a Zim,
        cluster_start: u64,
        cluster_end: u64,
        blob_index: u32,
        offset_width: usize,
        decoder: Box<dyn ClusterDecoder>,
    ) -> Self {
        Self {
            zim,
            cluster_start,
            cluster_end,
            blob_index,
            offset_width,
            decoder,
            blob: OnceCell::new(),
            pos: 0,
        }
    }

    pub fn size(&mut self) -> Result<u64> {
        Ok(self.load()?.len() as u64)
    }

    fn load(&self) -> Result<&[u8]> {
        let result = self.blob.get_or_init(|| self.load_cluster());

        match result {
            Ok(data) => Ok(data.as_slice()),
            Err(err) => Err(err.clone()),
        }
    }

    fn load_cluster(&self) -> std::result::Result<Vec<u8>, ZimError> {
        // Compressed payload spans (cluster_start, cluster_end], right
        // after the header byte.
        let mut compressed = vec![0u8; (self.cluster_end - self.cluster_start) as usize];
        self.zim.read_exact_at(self.cluster_start + 1, &mut compressed)?;

        let decoded = self.decoder.decode(&compressed)?;

        let width = self.offset_width;
        let table_offset = self.blob_index as usize * width;
        let table_end = table_offset + 2 * width;
        if decoded.len() < table_end {
            return Err(ZimError::malformed(format!(
                "decoded cluster too short for blob {} offsets: {} < {table_end}",
                self.blob_index,
                decoded.len()
            )));
        }

        let (blob_start, blob_end) = decode_offset_pair(&decoded[table_offset..table_end], width)?;
        if blob_end < blob_start || blob_end > decoded.len() as u64 {
            return Err(ZimError::malformed(format!(
                "blob range {blob_start}..{blob_end} outside decoded cluster of {} bytes",
                decoded.len()
            )));
        }

        trace!(
            blob_index = self.blob_index,
            blob_start,
            blob_end,
            "materialized blob from decoded cluster"
        );

        Ok(decoded[blob_start as usize..blob_end as usize].to_vec())
    }

    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let data = self.load()?;
        let len = data.len() as u64;
        let out = data[self.pos.min(len) as usize..].to_vec();
        self.pos = len;
        Ok(out)
    }
}

impl Read for CompressedBlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let data = self.load().map_err(to_io_error)?;
        let n = read_from_slice(data, self.pos, buf);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for CompressedBlobReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let size = self.load().map_err(to_io_error)?.len() as u64;
        self.pos = resolve_seek(self.pos, size, pos)?;
        Ok(self.pos)
    }
}
