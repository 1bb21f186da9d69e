//! Archive header and MIME table parsing

use tracing::debug;

use crate::error::{Result, ZimError};
use crate::ioutil::{read_strings_at, read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_le};
use crate::source::ByteSource;

/// Magic number at offset 0, the little-endian u32 over `Z I M 0x04`.
pub(crate) const MAGIC: u32 = 0x044D_495A;

/// Size of the fixed header in bytes.
pub(crate) const HEADER_LEN: usize = 80;

/// Sentinel main/layout page index meaning "absent".
pub(crate) const NO_PAGE: u32 = 0xFFFF_FFFF;

/// Parsed fixed header. Immutable after parsing.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub major_version: u16,
    pub minor_version: u16,
    pub uuid: String,
    pub entry_count: u32,
    pub cluster_count: u32,
    pub url_ptr_pos: u64,
    pub title_ptr_pos: u64,
    pub cluster_ptr_pos: u64,
    pub mime_list_pos: u64,
    pub main_page: u32,
    pub layout_page: u32,
    pub checksum_pos: u64,
}

impl Header {
    pub fn parse(source: &dyn ByteSource) -> Result<Header> {
        let mut buf = [0u8; HEADER_LEN];
        let n = source.read_at(0, &mut buf)?;
        if n < HEADER_LEN {
            return Err(ZimError::malformed(format!(
                "truncated header: {n} of {HEADER_LEN} bytes"
            )));
        }

        let magic = read_u32_le(&buf[0..4])?;
        if magic != MAGIC {
            return Err(ZimError::malformed(format!(
                "invalid magic number {magic:#010x}"
            )));
        }

        let header = Header {
            major_version: read_u16_le(&buf[4..6])?,
            minor_version: read_u16_le(&buf[6..8])?,
            uuid: format_uuid(&buf[8..24])?,
            entry_count: read_u32_le(&buf[24..28])?,
            cluster_count: read_u32_le(&buf[28..32])?,
            url_ptr_pos: read_u64_le(&buf[32..40])?,
            title_ptr_pos: read_u64_le(&buf[40..48])?,
            cluster_ptr_pos: read_u64_le(&buf[48..56])?,
            mime_list_pos: read_u64_le(&buf[56..64])?,
            main_page: read_u32_le(&buf[64..68])?,
            layout_page: read_u32_le(&buf[68..72])?,
            checksum_pos: read_u64_le(&buf[72..80])?,
        };

        debug!(
            version = format_args!("{}.{}", header.major_version, header.minor_version),
            uuid = %header.uuid,
            entries = header.entry_count,
            clusters = header.cluster_count,
            "parsed header"
        );

        Ok(header)
    }
}

/// Render the 16 UUID bytes as five hyphen-separated hex groups.
///
/// The first four groups are zero-padded big-endian reads; the fifth is
/// the concatenation of a u32 and a u16 without zero padding. This is not
/// strictly canonical RFC 4122 output, but it is what existing archive
/// fixtures expect.
fn format_uuid(data: &[u8]) -> Result<String> {
    let g1 = read_u32_be(&data[0..4])?;
    let g2 = read_u16_be(&data[4..6])?;
    let g3 = read_u16_be(&data[6..8])?;
    let g4 = read_u16_be(&data[8..10])?;
    let g5a = read_u32_be(&data[10..14])?;
    let g5b = read_u16_be(&data[14..16])?;

    Ok(format!("{g1:08x}-{g2:04x}-{g3:04x}-{g4:04x}-{g5a:x}{g5b:x}"))
}

/// Read the MIME type table: NUL-terminated strings ending at an empty
/// string (two consecutive NULs).
pub(crate) fn read_mime_table(source: &dyn ByteSource, pos: u64) -> Result<Vec<String>> {
    let mut mime_types = Vec::new();
    let mut consumed = 0u64;

    loop {
        let (found, read) = read_strings_at(source, pos + consumed, 64, 1024)?;
        consumed += read;

        if found.is_empty() {
            break;
        }

        let terminated = found.last().is_some_and(String::is_empty);
        mime_types.extend(found.into_iter().filter(|s| !s.is_empty()));

        if terminated {
            break;
        }
    }

    debug!(count = mime_types.len(), "parsed MIME table");

    Ok(mime_types)
}
