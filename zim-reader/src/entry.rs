//! Directory entries
//!
//! An entry record at a file offset is either a redirect (MIME index
//! 0xFFFF, carrying a target URL index) or a content pointer (MIME index,
//! cluster index, blob index). Both carry a namespace byte, a URL, and an
//! optional title.

use tracing::trace;

use crate::cluster;
use crate::error::{Result, ZimError};
use crate::ioutil::{read_strings_at, read_u16_le, read_u32_le};
use crate::namespace::Namespace;
use crate::reader::Zim;
use crate::{BlobReader, Compression};

/// MIME index sentinel marking a redirect record.
pub(crate) const REDIRECT_MIME: u16 = 0xFFFF;

/// Redirect chains longer than this are rejected as cyclic.
const MAX_REDIRECT_DEPTH: usize = 16;

/// Owned parsed entry record, independent of the archive borrow. This is
/// what the entry cache stores.
#[derive(Debug, Clone)]
pub(crate) struct EntryData {
    pub namespace: Namespace,
    pub url: String,
    pub title: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone)]
pub(crate) enum EntryKind {
    Content {
        mime_type: String,
        cluster_index: u32,
        blob_index: u32,
    },
    Redirect {
        target: u32,
    },
}

impl EntryData {
    pub fn full_url(&self) -> String {
        self.namespace.full_url(&self.url)
    }

    pub fn title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

/// Parse the entry record at `offset`.
pub(crate) fn parse_entry_at(zim: &Zim, offset: u64) -> Result<EntryData> {
    let mut buf = [0u8; 16];
    let n = zim.source().read_at(offset, &mut buf)?;
    if n < 12 {
        return Err(ZimError::malformed(format!(
            "truncated entry record at offset {offset}"
        )));
    }

    let mime_index = read_u16_le(&buf[0..2])?;

    if mime_index == REDIRECT_MIME {
        let namespace = Namespace::from_byte(buf[2]);
        let target = read_u32_le(&buf[8..12])?;
        let (strings, _) = read_strings_at(zim.source(), offset + 12, 2, 1024)?;

        let mut strings = strings.into_iter();
        let url = strings.next().unwrap_or_default();
        let title = strings.next().unwrap_or_default();

        trace!(offset, target, url = %url, "parsed redirect entry");

        return Ok(EntryData {
            namespace,
            url,
            title,
            kind: EntryKind::Redirect { target },
        });
    }

    if n < 16 {
        return Err(ZimError::malformed(format!(
            "truncated content entry at offset {offset}"
        )));
    }

    let mime_types = zim.mime_types();
    if mime_index as usize >= mime_types.len() {
        return Err(ZimError::malformed(format!(
            "MIME type index {mime_index} out of range ({} types)",
            mime_types.len()
        )));
    }

    let mime_type = mime_types[mime_index as usize].clone();
    let namespace = Namespace::from_byte(buf[3]);
    let cluster_index = read_u32_le(&buf[8..12])?;
    let blob_index = read_u32_le(&buf[12..16])?;

    let (strings, _) = read_strings_at(zim.source(), offset + 16, 2, 1024)?;
    let mut strings = strings.into_iter();
    let url = strings.next().unwrap_or_default();
    let title = strings.next().unwrap_or_default();

    trace!(offset, cluster_index, blob_index, url = %url, "parsed content entry");

    Ok(EntryData {
        namespace,
        url,
        title,
        kind: EntryKind::Content {
            mime_type,
            cluster_index,
            blob_index,
        },
    })
}

/// A directory entry borrowed from an open archive; either content or a
/// redirect.
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    zim: &'a Zim,
    data: EntryData,
}

impl<'a> Entry<'a> {
    pub(crate) fn new(zim: &'a Zim, data: EntryData) -> Self {
        Self { zim, data }
    }

    pub fn namespace(&self) -> Namespace {
        self.data.namespace
    }

    pub fn url(&self) -> &str {
        &self.data.url
    }

    /// The entry title, falling back to the URL when empty.
    pub fn title(&self) -> &str {
        self.data.title()
    }

    pub fn full_url(&self) -> String {
        self.data.full_url()
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.data.kind, EntryKind::Redirect { .. })
    }

    /// The redirect target URL index, if this entry is a redirect.
    pub fn redirect_target(&self) -> Option<u32> {
        match self.data.kind {
            EntryKind::Redirect { target } => Some(target),
            EntryKind::Content { .. } => None,
        }
    }

    /// View this entry as content without following redirects.
    pub fn as_content(&self) -> Option<ContentEntry<'a>> {
        match &self.data.kind {
            EntryKind::Content {
                mime_type,
                cluster_index,
                blob_index,
            } => Some(ContentEntry {
                zim: self.zim,
                namespace: self.data.namespace,
                url: self.data.url.clone(),
                title: self.data.title.clone(),
                mime_type: mime_type.clone(),
                cluster_index: *cluster_index,
                blob_index: *blob_index,
            }),
            EntryKind::Redirect { .. } => None,
        }
    }

    /// Follow redirects until a content entry is reached. A content entry
    /// resolves to itself. Chains longer than the depth bound are
    /// rejected as cyclic.
    pub fn resolve(&self) -> Result<ContentEntry<'a>> {
        let mut data = self.data.clone();
        for _ in 0..MAX_REDIRECT_DEPTH {
            let EntryData {
                namespace,
                url,
                title,
                kind,
            } = data;

            match kind {
                EntryKind::Content {
                    mime_type,
                    cluster_index,
                    blob_index,
                } => {
                    return Ok(ContentEntry {
                        zim: self.zim,
                        namespace,
                        url,
                        title,
                        mime_type,
                        cluster_index,
                        blob_index,
                    });
                }
                EntryKind::Redirect { target } => {
                    data = self.zim.entry_data_at(target)?;
                }
            }
        }

        Err(ZimError::InvalidRedirect(format!(
            "redirect chain exceeds {MAX_REDIRECT_DEPTH} hops"
        )))
    }
}

/// An entry pointing at a blob in the content store.
#[derive(Debug, Clone)]
pub struct ContentEntry<'a> {
    zim: &'a Zim,
    namespace: Namespace,
    url: String,
    title: String,
    mime_type: String,
    cluster_index: u32,
    blob_index: u32,
}

impl<'a> ContentEntry<'a> {
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }

    pub fn full_url(&self) -> String {
        self.namespace.full_url(&self.url)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn cluster_index(&self) -> u32 {
        self.cluster_index
    }

    pub fn blob_index(&self) -> u32 {
        self.blob_index
    }

    /// The codec of the cluster holding this entry's blob.
    pub fn compression(&self) -> Result<Compression> {
        cluster::cluster_compression(self.zim, self.cluster_index)
    }

    /// Open a reader over this entry's blob.
    pub fn reader(&self) -> Result<BlobReader<'a>> {
        cluster::open_blob(self.zim, self.cluster_index, self.blob_index)
    }
}
