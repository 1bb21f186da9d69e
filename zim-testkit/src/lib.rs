//! Test utilities for the ZIM reader
//!
//! Provides a builder producing byte-exact synthetic ZIM archives for
//! tests, plus discovery of real archives through the `ZIM_TEST_DATA`
//! environment variable.

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

/// Cluster codec selection for built archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterCompression {
    /// Stored without compression (codec byte 1)
    None,
    Xz,
    Zstd,
}

impl ClusterCompression {
    fn code(&self) -> u8 {
        match self {
            ClusterCompression::None => 1,
            ClusterCompression::Xz => 4,
            ClusterCompression::Zstd => 5,
        }
    }
}

enum BuildEntry {
    Content {
        namespace: u8,
        url: String,
        title: String,
        mime_index: u16,
        cluster: u32,
        blob: u32,
    },
    Redirect {
        namespace: u8,
        url: String,
        title: String,
        target: u32,
    },
}

enum BuildCluster {
    Blobs {
        compression: ClusterCompression,
        extended: bool,
        blobs: Vec<Vec<u8>>,
    },
    /// Verbatim codec byte and payload, for unsupported-codec tests.
    Raw { codec: u8, payload: Vec<u8> },
}

/// Builds a complete ZIM archive in memory.
///
/// Entries keep their insertion order; redirect targets and the main
/// page reference entries by that order. Clusters are indexed in
/// insertion order as well.
pub struct ZimBuilder {
    uuid: [u8; 16],
    major_version: u16,
    minor_version: u16,
    main_page: Option<u32>,
    mime_types: Vec<String>,
    entries: Vec<BuildEntry>,
    clusters: Vec<BuildCluster>,
}

impl Default for ZimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZimBuilder {
    pub fn new() -> Self {
        Self {
            uuid: *b"\x01\x23\x45\x67\x89\xab\xcd\xef\x01\x23\x45\x67\x89\xab\xcd\xef",
            major_version: 5,
            minor_version: 0,
            main_page: None,
            mime_types: Vec::new(),
            entries: Vec::new(),
            clusters: Vec::new(),
        }
    }

    pub fn uuid(&mut self, uuid: [u8; 16]) -> &mut Self {
        self.uuid = uuid;
        self
    }

    /// Designate an entry (by insertion index) as the main page.
    pub fn main_page(&mut self, entry_index: u32) -> &mut Self {
        self.main_page = Some(entry_index);
        self
    }

    fn mime_index(&mut self, mime: &str) -> u16 {
        if let Some(pos) = self.mime_types.iter().position(|m| m == mime) {
            return pos as u16;
        }

        self.mime_types.push(mime.to_owned());
        (self.mime_types.len() - 1) as u16
    }

    /// Add a content entry pointing at `(cluster, blob)`. Returns the
    /// entry index.
    pub fn content_entry(
        &mut self,
        namespace: char,
        url: &str,
        title: &str,
        mime: &str,
        cluster: u32,
        blob: u32,
    ) -> u32 {
        let mime_index = self.mime_index(mime);
        self.entries.push(BuildEntry::Content {
            namespace: namespace as u8,
            url: url.to_owned(),
            title: title.to_owned(),
            mime_index,
            cluster,
            blob,
        });

        (self.entries.len() - 1) as u32
    }

    /// Add a redirect entry targeting another entry by index.
    pub fn redirect_entry(&mut self, namespace: char, url: &str, title: &str, target: u32) -> u32 {
        self.entries.push(BuildEntry::Redirect {
            namespace: namespace as u8,
            url: url.to_owned(),
            title: title.to_owned(),
            target,
        });

        (self.entries.len() - 1) as u32
    }

    /// Add a cluster holding the given blobs. Returns the cluster index.
    pub fn cluster(&mut self, compression: ClusterCompression, blobs: Vec<Vec<u8>>) -> u32 {
        self.clusters.push(BuildCluster::Blobs {
            compression,
            extended: false,
            blobs,
        });

        (self.clusters.len() - 1) as u32
    }

    /// Add a cluster using 64-bit intra-cluster offsets.
    pub fn extended_cluster(&mut self, compression: ClusterCompression, blobs: Vec<Vec<u8>>) -> u32 {
        self.clusters.push(BuildCluster::Blobs {
            compression,
            extended: true,
            blobs,
        });

        (self.clusters.len() - 1) as u32
    }

    /// Add a cluster with a verbatim codec byte and payload, e.g. to
    /// exercise rejection of zlib (2) or bzip2 (3) clusters.
    pub fn raw_cluster(&mut self, codec: u8, payload: Vec<u8>) -> u32 {
        self.clusters.push(BuildCluster::Raw { codec, payload });

        (self.clusters.len() - 1) as u32
    }

    /// Serialize the archive.
    pub fn build(&self) -> Vec<u8> {
        const HEADER_LEN: usize = 80;

        // MIME table: NUL-terminated strings plus an empty terminator.
        let mut mime_table = Vec::new();
        for mime in &self.mime_types {
            mime_table.extend_from_slice(mime.as_bytes());
            mime_table.push(0);
        }
        mime_table.push(0);

        let encoded_entries: Vec<Vec<u8>> = self.entries.iter().map(encode_entry).collect();
        let encoded_clusters: Vec<Vec<u8>> = self.clusters.iter().map(encode_cluster).collect();

        let entry_count = self.entries.len() as u32;
        let cluster_count = self.clusters.len() as u32;

        let mime_list_pos = HEADER_LEN as u64;
        let url_ptr_pos = mime_list_pos + mime_table.len() as u64;
        let title_ptr_pos = url_ptr_pos + 8 * entry_count as u64;
        let cluster_ptr_pos = title_ptr_pos + 4 * entry_count as u64;
        let entries_pos = cluster_ptr_pos + 8 * (cluster_count as u64 + 1);

        let mut entry_offsets = Vec::with_capacity(encoded_entries.len());
        let mut cursor = entries_pos;
        for encoded in &encoded_entries {
            entry_offsets.push(cursor);
            cursor += encoded.len() as u64;
        }

        let mut cluster_offsets = Vec::with_capacity(encoded_clusters.len() + 1);
        for encoded in &encoded_clusters {
            cluster_offsets.push(cursor);
            cursor += encoded.len() as u64;
        }
        // Trailing sentinel bounding the last cluster.
        cluster_offsets.push(cursor);

        let checksum_pos = cursor;

        let mut out = Vec::with_capacity(checksum_pos as usize + 16);
        out.extend_from_slice(&0x044D_495Au32.to_le_bytes());
        out.extend_from_slice(&self.major_version.to_le_bytes());
        out.extend_from_slice(&self.minor_version.to_le_bytes());
        out.extend_from_slice(&self.uuid);
        out.extend_from_slice(&entry_count.to_le_bytes());
        out.extend_from_slice(&cluster_count.to_le_bytes());
        out.extend_from_slice(&url_ptr_pos.to_le_bytes());
        out.extend_from_slice(&title_ptr_pos.to_le_bytes());
        out.extend_from_slice(&cluster_ptr_pos.to_le_bytes());
        out.extend_from_slice(&mime_list_pos.to_le_bytes());
        out.extend_from_slice(&self.main_page.unwrap_or(0xFFFF_FFFF).to_le_bytes());
        out.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        out.extend_from_slice(&checksum_pos.to_le_bytes());
        debug_assert_eq!(out.len(), HEADER_LEN);

        out.extend_from_slice(&mime_table);

        for offset in &entry_offsets {
            out.extend_from_slice(&offset.to_le_bytes());
        }

        // Title pointers: identity order. The reader parses the header
        // field but never walks this table.
        for index in 0..entry_count {
            out.extend_from_slice(&index.to_le_bytes());
        }

        for offset in &cluster_offsets {
            out.extend_from_slice(&offset.to_le_bytes());
        }

        for encoded in &encoded_entries {
            out.extend_from_slice(encoded);
        }

        for encoded in &encoded_clusters {
            out.extend_from_slice(encoded);
        }

        // Zeroed md5 placeholder; the reader never validates it.
        out.extend_from_slice(&[0u8; 16]);

        out
    }

    /// Serialize to a temporary file.
    pub fn build_file(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp archive");
        file.write_all(&self.build()).expect("write temp archive");
        file.flush().expect("flush temp archive");
        file
    }
}

fn encode_entry(entry: &BuildEntry) -> Vec<u8> {
    let mut out = Vec::new();

    match entry {
        BuildEntry::Content {
            namespace,
            url,
            title,
            mime_index,
            cluster,
            blob,
        } => {
            out.extend_from_slice(&mime_index.to_le_bytes());
            out.push(0); // parameter length
            out.push(*namespace);
            out.extend_from_slice(&0u32.to_le_bytes()); // revision
            out.extend_from_slice(&cluster.to_le_bytes());
            out.extend_from_slice(&blob.to_le_bytes());
            out.extend_from_slice(url.as_bytes());
            out.push(0);
            out.extend_from_slice(title.as_bytes());
            out.push(0);
        }
        BuildEntry::Redirect {
            namespace,
            url,
            title,
            target,
        } => {
            out.extend_from_slice(&0xFFFFu16.to_le_bytes());
            out.push(0); // parameter length
            out.push(*namespace);
            out.extend_from_slice(&0u32.to_le_bytes()); // revision
            out.extend_from_slice(&target.to_le_bytes());
            out.extend_from_slice(url.as_bytes());
            out.push(0);
            out.extend_from_slice(title.as_bytes());
            out.push(0);
        }
    }

    out
}

fn encode_cluster(cluster: &BuildCluster) -> Vec<u8> {
    match cluster {
        BuildCluster::Raw { codec, payload } => {
            let mut out = vec![*codec];
            out.extend_from_slice(payload);
            out
        }
        BuildCluster::Blobs {
            compression,
            extended,
            blobs,
        } => {
            let width: u64 = if *extended { 8 } else { 4 };

            // Offset table: N+1 entries relative to the table start; the
            // first points just past the table.
            let table_len = width * (blobs.len() as u64 + 1);
            let mut payload = Vec::new();
            let mut offset = table_len;
            push_offset(&mut payload, offset, *extended);
            for blob in blobs {
                offset += blob.len() as u64;
                push_offset(&mut payload, offset, *extended);
            }
            for blob in blobs {
                payload.extend_from_slice(blob);
            }

            let header = compression.code() | ((*extended as u8) << 4);
            let mut out = vec![header];
            match compression {
                ClusterCompression::None => out.extend_from_slice(&payload),
                ClusterCompression::Xz => {
                    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
                    encoder.write_all(&payload).expect("xz encode");
                    out.extend_from_slice(&encoder.finish().expect("xz finish"));
                }
                ClusterCompression::Zstd => {
                    let compressed =
                        zstd::stream::encode_all(&payload[..], 3).expect("zstd encode");
                    out.extend_from_slice(&compressed);
                }
            }

            out
        }
    }
}

fn push_offset(out: &mut Vec<u8>, offset: u64, extended: bool) {
    if extended {
        out.extend_from_slice(&offset.to_le_bytes());
    } else {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
    }
}

/// Locate real ZIM archives for integration tests via the
/// `ZIM_TEST_DATA` environment variable (a directory of `.zim` files).
pub fn find_zim_data() -> Option<Vec<PathBuf>> {
    let dir = std::env::var_os("ZIM_TEST_DATA")?;
    let entries = std::fs::read_dir(dir).ok()?;

    let mut archives: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("zim"))
        .collect();
    archives.sort();

    if archives.is_empty() {
        None
    } else {
        Some(archives)
    }
}

/// Skip a test when no real archive data is available.
#[macro_export]
macro_rules! skip_test_if_no_zim_data {
    () => {
        if $crate::find_zim_data().is_none() {
            println!("Skipping test - set ZIM_TEST_DATA to a directory of .zim files");
            return;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut builder = ZimBuilder::new();
        let cluster = builder.cluster(ClusterCompression::None, vec![b"hello".to_vec()]);
        builder.content_entry('A', "Page", "A Page", "text/html", cluster, 0);

        let bytes = builder.build();

        assert_eq!(&bytes[0..4], &[0x5A, 0x49, 0x4D, 0x04]);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 1);

        // No main page by default
        assert_eq!(
            u32::from_le_bytes(bytes[64..68].try_into().unwrap()),
            0xFFFF_FFFF
        );

        // Checksum placeholder trails the file
        let checksum_pos = u64::from_le_bytes(bytes[72..80].try_into().unwrap());
        assert_eq!(checksum_pos as usize + 16, bytes.len());
    }

    #[test]
    fn uncompressed_cluster_offsets() {
        let mut builder = ZimBuilder::new();
        builder.cluster(
            ClusterCompression::None,
            vec![b"ab".to_vec(), b"cdef".to_vec()],
        );
        builder.content_entry('A', "x", "", "text/plain", 0, 0);

        let bytes = builder.build();
        let cluster_ptr_pos =
            u64::from_le_bytes(bytes[48..56].try_into().unwrap()) as usize;
        let cluster_start =
            u64::from_le_bytes(bytes[cluster_ptr_pos..cluster_ptr_pos + 8].try_into().unwrap())
                as usize;
        let cluster_end =
            u64::from_le_bytes(bytes[cluster_ptr_pos + 8..cluster_ptr_pos + 16].try_into().unwrap())
                as usize;

        // Header byte: codec 1, not extended
        assert_eq!(bytes[cluster_start], 1);

        // Offset table: 3 u32 entries, then "abcdef"
        let table = &bytes[cluster_start + 1..];
        assert_eq!(u32::from_le_bytes(table[0..4].try_into().unwrap()), 12);
        assert_eq!(u32::from_le_bytes(table[4..8].try_into().unwrap()), 14);
        assert_eq!(u32::from_le_bytes(table[8..12].try_into().unwrap()), 18);
        assert_eq!(&table[12..18], b"abcdef");
        assert_eq!(cluster_end, cluster_start + 19);
    }

    #[test]
    fn mime_types_are_deduplicated() {
        let mut builder = ZimBuilder::new();
        let cluster = builder.cluster(ClusterCompression::None, vec![vec![1], vec![2], vec![3]]);
        builder.content_entry('A', "a", "", "text/html", cluster, 0);
        builder.content_entry('A', "b", "", "text/css", cluster, 1);
        builder.content_entry('A', "c", "", "text/html", cluster, 2);

        assert_eq!(builder.mime_types, vec!["text/html", "text/css"]);
    }
}
