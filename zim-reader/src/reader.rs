//! Top-level archive reader

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::cache::{self, CacheStats, EntryCache};
use crate::config::ZimConfig;
use crate::entry::{parse_entry_at, Entry, EntryData};
use crate::error::{Result, ZimError};
use crate::header::{read_mime_table, Header, NO_PAGE};
use crate::ioutil::read_u64_le;
use crate::iter::Entries;
use crate::namespace::Namespace;
use crate::source::{ByteSource, FileSource, MmapSource};

/// An open ZIM archive.
///
/// Owns the byte source, the parsed tables, the URL map, and the entry
/// cache. All lookup operations are read-only and safe to call from
/// multiple threads.
pub struct Zim {
    source: Box<dyn ByteSource>,
    header: Header,
    mime_types: Vec<String>,
    url_ptrs: Vec<u64>,
    cluster_ptrs: Vec<u64>,
    urls: HashMap<String, u32>,
    cache: EntryCache,
    closed: AtomicBool,
}

impl Zim {
    /// Open an archive file with default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Zim> {
        Self::open_with(path, ZimConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: ZimConfig) -> Result<Zim> {
        let source = FileSource::open(path.as_ref())?;
        Self::from_source(Box::new(source), config)
    }

    /// Open an archive through a memory map instead of file reads.
    pub fn open_mapped(path: impl AsRef<Path>, config: ZimConfig) -> Result<Zim> {
        let source = MmapSource::open(path.as_ref())?;
        Self::from_source(Box::new(source), config)
    }

    /// Construct a reader over an arbitrary byte source. Parses the
    /// header and tables and preloads the URL map before returning.
    pub fn from_source(source: Box<dyn ByteSource>, config: ZimConfig) -> Result<Zim> {
        let header = Header::parse(source.as_ref())?;
        let mime_types = read_mime_table(source.as_ref(), header.mime_list_pos)?;

        let url_ptrs = parse_pointer_index(
            source.as_ref(),
            header.url_ptr_pos,
            header.entry_count as usize,
            "URL",
        )?;
        let cluster_ptrs = parse_pointer_index(
            source.as_ref(),
            header.cluster_ptr_pos,
            header.cluster_count as usize + 1,
            "cluster",
        )?;

        for pair in cluster_ptrs.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ZimError::malformed(format!(
                    "cluster pointers not increasing: {} then {}",
                    pair[0], pair[1]
                )));
            }
        }

        let mut zim = Zim {
            source,
            header,
            mime_types,
            url_ptrs,
            cluster_ptrs,
            urls: HashMap::new(),
            cache: EntryCache::new(config.cache_size),
            closed: AtomicBool::new(false),
        };

        zim.preload()?;

        info!(
            uuid = %zim.header.uuid,
            entries = zim.header.entry_count,
            clusters = zim.header.cluster_count,
            "opened archive"
        );

        Ok(zim)
    }

    /// Build the full-URL map over every entry index.
    fn preload(&mut self) -> Result<()> {
        let mut urls = HashMap::with_capacity(self.header.entry_count as usize);

        for index in 0..self.header.entry_count {
            let data = parse_entry_at(self, self.url_ptrs[index as usize])?;
            self.cache_entry(&data);
            urls.insert(data.full_url(), index);
        }

        debug!(urls = urls.len(), "preloaded URL map");

        self.urls = urls;
        Ok(())
    }

    /// Archive format version as (major, minor).
    pub fn version(&self) -> (u16, u16) {
        (self.header.major_version, self.header.minor_version)
    }

    pub fn uuid(&self) -> &str {
        &self.header.uuid
    }

    pub fn entry_count(&self) -> u32 {
        self.header.entry_count
    }

    pub fn cluster_count(&self) -> u32 {
        self.header.cluster_count
    }

    /// Close the underlying byte source. The first call succeeds; later
    /// calls and any operation on derived readers fail with `Closed`.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ZimError::Closed);
        }

        self.source.close()
    }

    /// The archive's designated entry point, if any.
    pub fn main_page(&self) -> Result<Entry<'_>> {
        if self.header.main_page == NO_PAGE {
            return Err(ZimError::NotFound);
        }

        self.entry_at(self.header.main_page)
            .map_err(|_| ZimError::NotFound)
    }

    /// The entry at a URL-pointer index.
    pub fn entry_at(&self, index: u32) -> Result<Entry<'_>> {
        Ok(Entry::new(self, self.entry_data_at(index)?))
    }

    pub(crate) fn entry_data_at(&self, index: u32) -> Result<EntryData> {
        let idx = index as usize;
        if idx >= self.url_ptrs.len() {
            return Err(ZimError::InvalidIndex {
                index: index as u64,
                limit: self.url_ptrs.len() as u64,
            });
        }

        let data = parse_entry_at(self, self.url_ptrs[idx])?;
        self.cache_entry(&data);

        Ok(data)
    }

    /// O(1) lookup through the preloaded URL map.
    pub fn entry_with_full_url(&self, full_url: &str) -> Result<Entry<'_>> {
        let index = *self.urls.get(full_url).ok_or(ZimError::NotFound)?;
        self.entry_at(index)
    }

    pub fn entry_with_url(&self, namespace: Namespace, url: &str) -> Result<Entry<'_>> {
        self.entry_with_full_url(&namespace.full_url(url))
    }

    /// Title lookup: the cache first, then a linear scan.
    pub fn entry_with_title(&self, namespace: Namespace, title: &str) -> Result<Entry<'_>> {
        if let Some(data) = self.cache.get(&cache::title_key(namespace, title)) {
            debug!(full_url = %data.full_url(), "found entry with title in cache");
            return Ok(Entry::new(self, data));
        }

        for entry in self.entries() {
            let entry = entry?;
            if entry.title() == title && entry.namespace() == namespace {
                return Ok(entry);
            }
        }

        Err(ZimError::NotFound)
    }

    /// A fresh linear scan over the directory.
    pub fn entries(&self) -> Entries<'_> {
        Entries::new(self)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn cache_entry(&self, data: &EntryData) {
        let url_key = cache::url_key(&data.full_url());
        let title_key = cache::title_key(data.namespace, data.title());

        if self.cache.contains(&url_key) && self.cache.contains(&title_key) {
            return;
        }

        self.cache.insert(url_key, data.clone());
        self.cache.insert(title_key, data.clone());
    }

    pub(crate) fn source(&self) -> &dyn ByteSource {
        self.source.as_ref()
    }

    pub(crate) fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    pub(crate) fn cluster_ptrs(&self) -> &[u64] {
        &self.cluster_ptrs
    }

    /// Fill `buf` exactly or fail; a short read means the range runs off
    /// the end of the source.
    pub(crate) fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let n = self.source.read_at(offset, buf)?;
        if n < buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read at offset {offset}: {n} of {} bytes", buf.len()),
            )
            .into());
        }

        Ok(())
    }
}

impl fmt::Debug for Zim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zim")
            .field("uuid", &self.header.uuid)
            .field("entries", &self.header.entry_count)
            .field("clusters", &self.header.cluster_count)
            .finish_non_exhaustive()
    }
}

fn parse_pointer_index(
    source: &dyn ByteSource,
    start: u64,
    count: usize,
    what: &str,
) -> Result<Vec<u64>> {
    let mut buf = vec![0u8; count * 8];
    let n = source.read_at(start, &mut buf)?;
    if n < buf.len() {
        return Err(ZimError::malformed(format!(
            "truncated {what} pointer table: {n} of {} bytes",
            buf.len()
        )));
    }

    buf.chunks_exact(8).map(read_u64_le).collect()
}
