//! File-tree adapter over ZIM archives
//!
//! Maps path names onto archive entries: `"."` is an (empty) directory
//! listing, `"index.html"` serves the archive's main page, and any other
//! name resolves through the full-URL map with fallbacks across the
//! content namespaces and finally a linear scan. Thin glue over
//! [`zim_reader::Zim`]; all format work happens there.

use std::io::{Read, Seek, SeekFrom};

use thiserror::Error;
use tracing::debug;

use zim_reader::{BlobReader, Entry, Namespace, Zim, ZimError};

/// Result type for VFS operations
pub type Result<T> = std::result::Result<T, VfsError>;

#[derive(Error, Debug)]
pub enum VfsError {
    /// No entry maps to the requested name
    #[error("file not found")]
    NotFound,

    /// The underlying archive failed
    #[error("archive error: {0}")]
    Archive(#[from] ZimError),
}

/// Namespaces probed, in order, when a bare name misses the URL map.
const FALLBACK_NAMESPACES: [Namespace; 5] = [
    Namespace::CONTENT,
    Namespace::METADATA,
    Namespace::LAYOUT,
    Namespace::ARTICLE,
    Namespace::IMAGE_FILE,
];

/// A file-tree view over an open archive.
pub struct ZimVfs<'a> {
    zim: &'a Zim,
}

impl<'a> ZimVfs<'a> {
    pub fn new(zim: &'a Zim) -> Self {
        Self { zim }
    }

    /// Resolve a path name to a node.
    pub fn open(&self, name: &str) -> Result<VfsNode<'a>> {
        match name {
            "." => Ok(VfsNode::Directory(DirectoryNode {
                name: name.to_owned(),
            })),
            "index.html" => self.serve_index(),
            _ => self.serve_entry(name),
        }
    }

    fn serve_index(&self) -> Result<VfsNode<'a>> {
        let main = self.zim.main_page().map_err(not_found)?;
        let full_url = main.full_url();

        debug!(full_url = %full_url, "serving main page as index.html");

        self.serve_entry(&full_url)
    }

    fn serve_entry(&self, name: &str) -> Result<VfsNode<'a>> {
        let entry = self.search(name)?;
        let content = entry.resolve()?;

        let mut reader = content.reader()?;
        let size = reader.size()?;

        let file_name = name.rsplit('/').next().unwrap_or(name).to_owned();

        Ok(VfsNode::File(FileNode {
            name: file_name,
            size,
            mime_type: content.mime_type().to_owned(),
            reader,
        }))
    }

    /// Full-URL lookup, then the namespace fallbacks, then a last-resort
    /// linear scan matching either form of the URL.
    fn search(&self, name: &str) -> Result<Entry<'a>> {
        match self.zim.entry_with_full_url(name) {
            Ok(entry) => return Ok(entry),
            Err(ZimError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        for ns in FALLBACK_NAMESPACES {
            match self.zim.entry_with_url(ns, name) {
                Ok(entry) => {
                    debug!(namespace = %ns, name, "resolved through namespace fallback");
                    return Ok(entry);
                }
                Err(ZimError::NotFound) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        for entry in self.zim.entries() {
            let entry = entry.map_err(VfsError::Archive)?;
            if entry.full_url() == name || entry.url() == name {
                return Ok(entry);
            }
        }

        Err(VfsError::NotFound)
    }
}

fn not_found(_: ZimError) -> VfsError {
    VfsError::NotFound
}

/// A resolved node: a directory or a readable file.
pub enum VfsNode<'a> {
    Directory(DirectoryNode),
    File(FileNode<'a>),
}

impl<'a> VfsNode<'a> {
    pub fn is_dir(&self) -> bool {
        matches!(self, VfsNode::Directory(_))
    }

    pub fn into_file(self) -> Option<FileNode<'a>> {
        match self {
            VfsNode::File(file) => Some(file),
            VfsNode::Directory(_) => None,
        }
    }
}

/// An (empty) directory listing.
pub struct DirectoryNode {
    name: String,
}

impl DirectoryNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory listings are not materialized; always empty.
    pub fn entries(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A file handle over one entry's blob.
pub struct FileNode<'a> {
    name: String,
    size: u64,
    mime_type: String,
    reader: BlobReader<'a>,
}

impl FileNode<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

impl Read for FileNode<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for FileNode<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.reader.seek(pos)
    }
}
