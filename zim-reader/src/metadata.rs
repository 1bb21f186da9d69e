//! Archive metadata
//!
//! Metadata lives as ordinary entries in the `M` namespace, one per key.
//! See <https://wiki.openzim.org/wiki/Metadata> for the key registry.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{Result, ZimError};
use crate::namespace::Namespace;
use crate::reader::Zim;

/// Well-known metadata keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    Name,
    Title,
    Description,
    LongDescription,
    Creator,
    Publisher,
    Language,
    Tags,
    Date,
    Flavour,
    Source,
    Illustration48x48,
    Illustration96x96,
}

impl MetadataKey {
    pub const ALL: [MetadataKey; 13] = [
        MetadataKey::Name,
        MetadataKey::Title,
        MetadataKey::Description,
        MetadataKey::LongDescription,
        MetadataKey::Creator,
        MetadataKey::Publisher,
        MetadataKey::Language,
        MetadataKey::Tags,
        MetadataKey::Date,
        MetadataKey::Flavour,
        MetadataKey::Source,
        MetadataKey::Illustration48x48,
        MetadataKey::Illustration96x96,
    ];

    /// The entry URL for this key in the metadata namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Name => "Name",
            MetadataKey::Title => "Title",
            MetadataKey::Description => "Description",
            MetadataKey::LongDescription => "LongDescription",
            MetadataKey::Creator => "Creator",
            MetadataKey::Publisher => "Publisher",
            MetadataKey::Language => "Language",
            MetadataKey::Tags => "Tags",
            MetadataKey::Date => "Date",
            MetadataKey::Flavour => "Flavour",
            MetadataKey::Source => "Source",
            MetadataKey::Illustration48x48 => "Illustration_48x48@1",
            MetadataKey::Illustration96x96 => "Illustration_96x96@2",
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Zim {
    /// Fetch metadata values for the requested keys; an empty slice means
    /// all known keys. Absent keys are skipped, not errors.
    pub fn metadata(&self, keys: &[MetadataKey]) -> Result<HashMap<MetadataKey, String>> {
        let keys = if keys.is_empty() { &MetadataKey::ALL[..] } else { keys };

        let mut metadata = HashMap::new();

        for &key in keys {
            let entry = match self.entry_with_url(Namespace::METADATA, key.as_str()) {
                Ok(entry) => entry,
                Err(ZimError::NotFound) => continue,
                Err(err) => return Err(err),
            };

            let content = entry.resolve()?;
            let mut reader = content.reader()?;
            let data = reader.read_all()?;

            debug!(key = %key, bytes = data.len(), "read metadata value");

            metadata.insert(key, String::from_utf8_lossy(&data).into_owned());
        }

        Ok(metadata)
    }
}
