//! Reader over a blob stored without cluster compression

use std::io::{Read, Seek, SeekFrom};

use once_cell::sync::OnceCell;

use crate::blob::{read_from_slice, resolve_seek, to_io_error};
use crate::error::{Result, ZimError};
use crate::reader::Zim;

/// Serves the file range `[start, end)` of the archive. The window is
/// read into memory on first use; `size()` needs no I/O.
pub struct UncompressedBlobReader<'a> {
    zim: &'a Zim,
    start: u64,
    end: u64,
    pos: u64,
    blob: OnceCell<std::result::Result<Vec<u8>, ZimError>>,
}

impl<'a> UncompressedBlobReader<'a> {
    pub(crate) fn new(zim: &'a Zim, start: u64, end: u64) -> Self {
        Self {
            zim,
            start,
            end,
            pos: 0,
            blob: OnceCell::new(),
        }
    }

    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    fn load(&self) -> Result<&[u8]> {
        let result = self.blob.get_or_init(|| {
            let mut data = vec![0u8; (self.end - self.start) as usize];
            self.zim.read_exact_at(self.start, &mut data)?;
            Ok(data)
        });

        match result {
            Ok(data) => Ok(data.as_slice()),
            Err(err) => Err(err.clone()),
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let data = self.load()?;
        let len = data.len() as u64;
        let out = data[self.pos.min(len) as usize..].to_vec();
        self.pos = len;
        Ok(out)
    }
}

impl Read for UncompressedBlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let data = self.load().map_err(to_io_error)?;
        let n = read_from_slice(data, self.pos, buf);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for UncompressedBlobReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.pos = resolve_seek(self.pos, self.size(), pos)?;
        Ok(self.pos)
    }
}
