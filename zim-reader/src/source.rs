//! Positional byte sources backing an archive
//!
//! A [`ByteSource`] answers positional reads and can be closed exactly
//! once. Two implementations are provided: a plain file handle and a
//! memory map. Callers may supply their own (e.g. a network-backed
//! source) with equivalent semantics.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, ZimError};

/// A closable object answering positional reads.
///
/// `read_at` must fill `buf` fully when the range lies within bounds; a
/// short count signals end-of-file. Implementations must support
/// concurrent positional reads.
pub trait ByteSource: Send + Sync {
    /// Read up to `buf.len()` bytes starting at `offset`. Returns the
    /// number of bytes read; fewer than requested means EOF was hit.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Total size of the source in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retire the source. Later reads fail with [`ZimError::Closed`];
    /// closing twice also fails with [`ZimError::Closed`].
    fn close(&self) -> Result<()>;
}

/// File-backed source using positional reads, no shared cursor.
pub struct FileSource {
    file: RwLock<Option<File>>,
    size: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        debug!(path = %path.display(), size, "opened archive file");

        Ok(Self {
            file: RwLock::new(Some(file)),
            size,
        })
    }
}

#[cfg(unix)]
fn read_at_impl(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at_impl(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

impl ByteSource for FileSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let guard = self.file.read();
        let file = guard.as_ref().ok_or(ZimError::Closed)?;

        let mut total = 0;
        while total < buf.len() {
            let n = read_at_impl(file, offset + total as u64, &mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }

        Ok(total)
    }

    fn len(&self) -> u64 {
        self.size
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.file.write();
        if guard.take().is_none() {
            return Err(ZimError::Closed);
        }
        Ok(())
    }
}

/// Memory-mapped source. Reads are plain slice copies.
pub struct MmapSource {
    mmap: RwLock<Option<Mmap>>,
    size: u64,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let size = mmap.len() as u64;

        debug!(path = %path.display(), size, "memory-mapped archive file");

        Ok(Self {
            mmap: RwLock::new(Some(mmap)),
            size,
        })
    }
}

impl ByteSource for MmapSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let guard = self.mmap.read();
        let mmap = guard.as_ref().ok_or(ZimError::Closed)?;

        if offset >= self.size {
            return Ok(0);
        }

        let start = offset as usize;
        let end = (start + buf.len()).min(mmap.len());
        let n = end - start;
        buf[..n].copy_from_slice(&mmap[start..end]);

        Ok(n)
    }

    fn len(&self) -> u64 {
        self.size
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.mmap.write();
        if guard.take().is_none() {
            return Err(ZimError::Closed);
        }
        Ok(())
    }
}

/// In-memory source, used by tests and by callers that already hold the
/// whole archive as bytes.
pub struct VecSource {
    data: RwLock<Option<Vec<u8>>>,
    size: u64,
}

impl VecSource {
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            data: RwLock::new(Some(data)),
            size,
        }
    }
}

impl ByteSource for VecSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let guard = self.data.read();
        let data = guard.as_ref().ok_or(ZimError::Closed)?;

        if offset >= self.size {
            return Ok(0);
        }

        let start = offset as usize;
        let end = (start + buf.len()).min(data.len());
        let n = end - start;
        buf[..n].copy_from_slice(&data[start..end]);

        Ok(n)
    }

    fn len(&self) -> u64 {
        self.size
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.data.write();
        if guard.take().is_none() {
            return Err(ZimError::Closed);
        }
        Ok(())
    }
}
