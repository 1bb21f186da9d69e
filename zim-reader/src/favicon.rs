//! Favicon lookup

use tracing::debug;

use crate::entry::ContentEntry;
use crate::error::{Result, ZimError};
use crate::metadata::MetadataKey;
use crate::namespace::Namespace;
use crate::reader::Zim;

impl Zim {
    /// Locate the archive's favicon.
    ///
    /// Prefers the metadata illustrations (96x96@2, then 48x48@1) and
    /// falls back to the `-` and `I` namespaces under the names `favicon`
    /// and `favicon.png`.
    pub fn favicon(&self) -> Result<ContentEntry<'_>> {
        match self.metadata_illustration() {
            Ok(entry) => return Ok(entry),
            Err(ZimError::NotFound) => {}
            Err(err) => return Err(err),
        }

        let namespaces = [Namespace::LAYOUT, Namespace::IMAGE_FILE];
        let urls = ["favicon", "favicon.png"];

        for ns in namespaces {
            for url in urls {
                match self.entry_with_url(ns, url) {
                    Ok(entry) => {
                        debug!(namespace = %ns, url, "found favicon entry");
                        return entry.resolve();
                    }
                    Err(ZimError::NotFound) => continue,
                    Err(err) => return Err(err),
                }
            }
        }

        Err(ZimError::NotFound)
    }

    fn metadata_illustration(&self) -> Result<ContentEntry<'_>> {
        let keys = [MetadataKey::Illustration96x96, MetadataKey::Illustration48x48];

        let metadata = self.metadata(&keys)?;

        for key in keys {
            if !metadata.contains_key(&key) {
                continue;
            }

            let entry = self.entry_with_url(Namespace::METADATA, key.as_str())?;
            return entry.resolve();
        }

        Err(ZimError::NotFound)
    }
}
