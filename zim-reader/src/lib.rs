//! Random-access reader for ZIM offline content archives
//!
//! A ZIM file is a single binary artifact holding a directory of entries
//! (content pointers or redirects) and a content store partitioned into
//! independently compressed clusters, so retrieving one blob decodes at
//! most one cluster. This crate parses the on-disk format, builds the
//! in-memory indices for O(1) URL lookup, and exposes lazy,
//! decompression-aware readers over individual blobs.
//!
//! ```no_run
//! use zim_reader::{Namespace, Zim};
//!
//! # fn main() -> zim_reader::Result<()> {
//! let zim = Zim::open("wikipedia.zim")?;
//! let entry = zim.entry_with_url(Namespace::CONTENT, "Main_Page")?;
//! let content = entry.resolve()?;
//! let html = content.reader()?.read_all()?;
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod source;

mod cache;
mod cluster;
mod config;
mod entry;
mod error;
mod favicon;
mod header;
mod ioutil;
mod iter;
mod metadata;
mod namespace;
mod reader;

pub use blob::BlobReader;
pub use cache::CacheStats;
pub use cluster::Compression;
pub use config::ZimConfig;
pub use entry::{ContentEntry, Entry};
pub use error::{Result, ZimError};
pub use iter::Entries;
pub use metadata::MetadataKey;
pub use namespace::Namespace;
pub use reader::Zim;
