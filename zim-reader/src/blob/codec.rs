//! Cluster payload decoders
//!
//! One implementation per supported codec. The trait seam exists so the
//! compressed blob reader can be exercised with an instrumented decoder.

use std::io::Read;

use tracing::debug;

use crate::error::Result;

/// Decodes a full compressed cluster payload to memory.
pub(crate) trait ClusterDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// xz (`.xz` stream format, LZMA2)
pub(crate) struct XzClusterDecoder;

impl ClusterDecoder for XzClusterDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = xz2::read::XzDecoder::new(data);
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded)?;

        debug!(
            compressed = data.len(),
            decoded = decoded.len(),
            "decoded xz cluster"
        );

        Ok(decoded)
    }
}

/// zstd
pub(crate) struct ZstdClusterDecoder;

impl ClusterDecoder for ZstdClusterDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let decoded = zstd::stream::decode_all(data)?;

        debug!(
            compressed = data.len(),
            decoded = decoded.len(),
            "decoded zstd cluster"
        );

        Ok(decoded)
    }
}
