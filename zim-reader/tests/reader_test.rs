//! Integration tests driving whole archives through the public API

use std::io::{Read, Seek, SeekFrom};

use zim_reader::source::VecSource;
use zim_reader::{Compression, Namespace, Zim, ZimConfig, ZimError};
use zim_testkit::{skip_test_if_no_zim_data, ClusterCompression, ZimBuilder};

fn open_bytes(bytes: Vec<u8>) -> zim_reader::Result<Zim> {
    Zim::from_source(Box::new(VecSource::new(bytes)), ZimConfig::default())
}

/// A small wiki-like archive exercising every entry shape.
fn wiki_builder() -> ZimBuilder {
    let mut builder = ZimBuilder::new();
    builder.uuid([
        0xde, 0xad, 0xbe, 0xef, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x12, 0x34, 0x56,
        0x78,
    ]);

    let stored = builder.cluster(
        ClusterCompression::None,
        vec![b"<html>Main page body</html>".to_vec(), b"img-bytes".to_vec()],
    );
    let xz = builder.cluster(
        ClusterCompression::Xz,
        vec![b"xz compressed article text, repeated enough to shrink".to_vec()],
    );
    let zstd = builder.cluster(
        ClusterCompression::Zstd,
        vec![b"zstd blob one".to_vec(), b"zstd blob two".to_vec()],
    );

    let main = builder.content_entry('A', "Main_Page", "Main Page", "text/html", stored, 0);
    builder.content_entry('A', "Article", "An Article", "text/html", xz, 0);
    builder.content_entry('I', "logo.png", "", "image/png", stored, 1);
    builder.content_entry('A', "First", "", "text/plain", zstd, 0);
    builder.content_entry('A', "Second", "", "text/plain", zstd, 1);
    builder.redirect_entry('A', "Old_Main", "Old Main", main);
    builder.content_entry('M', "Name", "", "text/plain", stored, 0);
    builder.main_page(main);

    builder
}

#[test]
fn header_fields_round_trip() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    assert_eq!(zim.version(), (5, 0));
    assert_eq!(zim.uuid(), "deadbeef-1234-5678-9abc-def012345678");
    assert_eq!(zim.entry_count(), 7);
    assert_eq!(zim.cluster_count(), 3);
}

#[test]
fn uuid_rendering_is_pinned() {
    // Fifth group with zero high bits renders unpadded.
    let mut builder = ZimBuilder::new();
    builder.uuid([
        0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x00, 0x00, 0x05, 0x00,
        0x06,
    ]);
    let cluster = builder.cluster(ClusterCompression::None, vec![b"x".to_vec()]);
    builder.content_entry('A', "x", "", "text/plain", cluster, 0);

    let zim = open_bytes(builder.build()).unwrap();
    assert_eq!(zim.uuid(), "00000001-0002-0003-0004-56");
}

#[test]
fn open_from_file_path() {
    let file = wiki_builder().build_file();
    let zim = Zim::open(file.path()).unwrap();
    assert_eq!(zim.entry_count(), 7);

    let mapped = Zim::open_mapped(file.path(), ZimConfig::default()).unwrap();
    assert_eq!(mapped.uuid(), zim.uuid());
}

#[test]
fn content_lookup_by_url() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let entry = zim.entry_with_url(Namespace::ARTICLE, "Main_Page").unwrap();
    assert_eq!(entry.title(), "Main Page");
    assert_eq!(entry.full_url(), "A/Main_Page");
    assert!(!entry.is_redirect());

    let content = entry.resolve().unwrap();
    assert_eq!(content.mime_type(), "text/html");
    assert_eq!(content.compression().unwrap(), Compression::None);

    let mut reader = content.reader().unwrap();
    assert_eq!(reader.size().unwrap(), 27);
    assert_eq!(reader.read_all().unwrap(), b"<html>Main page body</html>");
}

#[test]
fn xz_cluster_round_trip() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let content = zim
        .entry_with_url(Namespace::ARTICLE, "Article")
        .unwrap()
        .resolve()
        .unwrap();
    assert_eq!(content.compression().unwrap(), Compression::Xz);
    assert_eq!(content.compression().unwrap().code(), 4);

    let mut reader = content.reader().unwrap();
    let expected = b"xz compressed article text, repeated enough to shrink";
    assert_eq!(reader.size().unwrap(), expected.len() as u64);
    assert_eq!(reader.read_all().unwrap(), expected);
}

#[test]
fn zstd_cluster_blobs_are_independent() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let first = zim
        .entry_with_url(Namespace::ARTICLE, "First")
        .unwrap()
        .resolve()
        .unwrap();
    let second = zim
        .entry_with_url(Namespace::ARTICLE, "Second")
        .unwrap()
        .resolve()
        .unwrap();
    assert_eq!(first.compression().unwrap(), Compression::Zstd);

    // Two readers over the same cluster decode independently.
    let mut r1 = first.reader().unwrap();
    let mut r2 = second.reader().unwrap();
    assert_eq!(r2.read_all().unwrap(), b"zstd blob two");
    assert_eq!(r1.read_all().unwrap(), b"zstd blob one");
}

#[test]
fn blob_readers_support_seeking() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let content = zim
        .entry_with_url(Namespace::ARTICLE, "Main_Page")
        .unwrap()
        .resolve()
        .unwrap();
    let mut reader = content.reader().unwrap();

    reader.seek(SeekFrom::Start(6)).unwrap();
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"Main");

    reader.seek(SeekFrom::End(-7)).unwrap();
    let mut tail = Vec::new();
    reader.read_to_end(&mut tail).unwrap();
    assert_eq!(tail, b"</html>");

    // Reads past the end yield nothing.
    reader.seek(SeekFrom::Start(1000)).unwrap();
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
}

#[test]
fn extended_offsets() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.extended_cluster(
        ClusterCompression::Zstd,
        vec![b"wide one".to_vec(), b"wide two".to_vec()],
    );
    builder.content_entry('A', "one", "", "text/plain", cluster, 0);
    builder.content_entry('A', "two", "", "text/plain", cluster, 1);

    let zim = open_bytes(builder.build()).unwrap();
    let content = zim
        .entry_with_url(Namespace::ARTICLE, "two")
        .unwrap()
        .resolve()
        .unwrap();
    assert_eq!(content.reader().unwrap().read_all().unwrap(), b"wide two");
}

#[test]
fn extended_offsets_uncompressed() {
    let mut builder = ZimBuilder::new();
    let cluster =
        builder.extended_cluster(ClusterCompression::None, vec![b"stored wide".to_vec()]);
    builder.content_entry('A', "w", "", "text/plain", cluster, 0);

    let zim = open_bytes(builder.build()).unwrap();
    let content = zim
        .entry_with_url(Namespace::ARTICLE, "w")
        .unwrap()
        .resolve()
        .unwrap();

    let mut reader = content.reader().unwrap();
    assert_eq!(reader.size().unwrap(), 11);
    assert_eq!(reader.read_all().unwrap(), b"stored wide");
}

#[test]
fn redirect_resolves_to_content() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let entry = zim.entry_with_full_url("Old_Main").unwrap();
    assert!(entry.is_redirect());
    assert_eq!(entry.title(), "Old Main");

    let content = entry.resolve().unwrap();
    assert_eq!(content.url(), "Main_Page");
    assert_ne!(content.url(), entry.url());
    assert_eq!(content.mime_type(), "text/html");

    // Redirect records carry their namespace in the padding byte, which
    // is zero in on-disk archives; their full URL is therefore bare.
    assert_eq!(entry.namespace(), Namespace::from_byte(0));
    assert_eq!(entry.full_url(), "Old_Main");
}

#[test]
fn mime_index_out_of_range_is_malformed() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(ClusterCompression::None, vec![b"x".to_vec()]);
    builder.content_entry('A', "x", "", "text/plain", cluster, 0);

    let mut bytes = builder.build();

    // Point the single entry's MIME index past the one-element table.
    // The URL map preload parses every entry, so open itself fails.
    let url_ptr_pos = u64::from_le_bytes(bytes[32..40].try_into().unwrap()) as usize;
    let entry_pos =
        u64::from_le_bytes(bytes[url_ptr_pos..url_ptr_pos + 8].try_into().unwrap()) as usize;
    bytes[entry_pos..entry_pos + 2].copy_from_slice(&5u16.to_le_bytes());

    assert!(matches!(open_bytes(bytes), Err(ZimError::Malformed(_))));
}

#[test]
fn redirect_chains_terminate() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(ClusterCompression::None, vec![b"target".to_vec()]);
    let target = builder.content_entry('A', "Target", "", "text/plain", cluster, 0);
    let hop = builder.redirect_entry('A', "Hop", "", target);
    builder.redirect_entry('A', "Hop2", "", hop);

    let zim = open_bytes(builder.build()).unwrap();
    let content = zim
        .entry_with_full_url("Hop2")
        .unwrap()
        .resolve()
        .unwrap();
    assert_eq!(content.url(), "Target");
}

#[test]
fn redirect_cycles_are_rejected() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(ClusterCompression::None, vec![b"x".to_vec()]);
    builder.content_entry('A', "real", "", "text/plain", cluster, 0);
    // Entries 1 and 2 point at each other.
    builder.redirect_entry('A', "loop_a", "", 2);
    builder.redirect_entry('A', "loop_b", "", 1);

    let zim = open_bytes(builder.build()).unwrap();
    let entry = zim.entry_with_full_url("loop_a").unwrap();
    assert!(matches!(entry.resolve(), Err(ZimError::InvalidRedirect(_))));
}

#[test]
fn redirect_target_out_of_bounds() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(ClusterCompression::None, vec![b"x".to_vec()]);
    builder.content_entry('A', "real", "", "text/plain", cluster, 0);
    builder.redirect_entry('A', "dangling", "", 99);

    let zim = open_bytes(builder.build()).unwrap();
    let entry = zim.entry_with_full_url("dangling").unwrap();
    assert!(matches!(
        entry.resolve(),
        Err(ZimError::InvalidIndex { .. })
    ));
}

#[test]
fn main_page_lookup() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let main = zim.main_page().unwrap();
    assert_eq!(main.full_url(), "A/Main_Page");
}

#[test]
fn missing_main_page_is_not_found() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(ClusterCompression::None, vec![b"x".to_vec()]);
    builder.content_entry('A', "x", "", "text/plain", cluster, 0);

    let zim = open_bytes(builder.build()).unwrap();
    assert!(matches!(zim.main_page(), Err(ZimError::NotFound)));
}

#[test]
fn title_lookup_and_fallback() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let entry = zim
        .entry_with_title(Namespace::ARTICLE, "An Article")
        .unwrap();
    assert_eq!(entry.url(), "Article");

    // Empty titles fall back to the URL, for display and for lookup.
    let entry = zim
        .entry_with_title(Namespace::IMAGE_FILE, "logo.png")
        .unwrap();
    assert_eq!(entry.title(), "logo.png");

    assert!(matches!(
        zim.entry_with_title(Namespace::ARTICLE, "No Such Title"),
        Err(ZimError::NotFound)
    ));
}

#[test]
fn lookup_misses_are_not_found() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    assert!(matches!(
        zim.entry_with_url(Namespace::METADATA, "NonexistentKey"),
        Err(ZimError::NotFound)
    ));
    assert!(matches!(
        zim.entry_with_full_url("Z/nothing"),
        Err(ZimError::NotFound)
    ));
}

#[test]
fn invalid_entry_index() {
    let zim = open_bytes(wiki_builder().build()).unwrap();
    assert!(matches!(
        zim.entry_at(9999),
        Err(ZimError::InvalidIndex { .. })
    ));
}

#[test]
fn url_map_covers_every_entry() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    for index in 0..zim.entry_count() {
        let entry = zim.entry_at(index).unwrap();
        let via_map = zim.entry_with_full_url(&entry.full_url()).unwrap();
        assert_eq!(via_map.url(), entry.url());
        assert_eq!(via_map.namespace(), entry.namespace());
    }
}

#[test]
fn iterator_skips_final_entry() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let urls: Vec<String> = zim
        .entries()
        .map(|entry| entry.map(|e| e.full_url()))
        .collect::<zim_reader::Result<_>>()
        .unwrap();

    // The last index is deliberately not emitted.
    assert_eq!(urls.len() as u32, zim.entry_count() - 1);
    assert_eq!(urls[0], "A/Main_Page");
    assert!(!urls.contains(&"M/Name".to_owned()));
}

#[test]
fn cache_is_transparent() {
    let bytes = wiki_builder().build();

    let cached = Zim::from_source(
        Box::new(VecSource::new(bytes.clone())),
        ZimConfig::default(),
    )
    .unwrap();
    let uncached =
        Zim::from_source(Box::new(VecSource::new(bytes)), ZimConfig::with_cache_size(0)).unwrap();

    for probe in ["A/Main_Page", "A/Article", "I/logo.png", "Old_Main"] {
        let a = cached.entry_with_full_url(probe).unwrap();
        let b = uncached.entry_with_full_url(probe).unwrap();
        assert_eq!(a.full_url(), b.full_url());
        assert_eq!(a.title(), b.title());
        assert_eq!(a.is_redirect(), b.is_redirect());
    }

    // Title lookups agree whether they hit the cache or the linear scan.
    let a = cached
        .entry_with_title(Namespace::ARTICLE, "An Article")
        .unwrap();
    let b = uncached
        .entry_with_title(Namespace::ARTICLE, "An Article")
        .unwrap();
    assert_eq!(a.full_url(), b.full_url());

    // Repeated lookups through the warm cache stay identical.
    let again = cached
        .entry_with_title(Namespace::ARTICLE, "An Article")
        .unwrap();
    assert_eq!(again.full_url(), a.full_url());

    assert_eq!(uncached.cache_stats().len, 0);
    assert!(cached.cache_stats().len > 0);
}

#[test]
fn unsupported_compression_is_rejected() {
    for codec in [2u8, 3u8] {
        let mut builder = ZimBuilder::new();
        let cluster = builder.raw_cluster(codec, b"opaque payload".to_vec());
        builder.content_entry('A', "x", "", "text/plain", cluster, 0);

        let zim = open_bytes(builder.build()).unwrap();
        let content = zim
            .entry_with_url(Namespace::ARTICLE, "x")
            .unwrap()
            .resolve()
            .unwrap();

        // The codec id is recognized, but opening a reader is refused.
        assert_eq!(content.compression().unwrap().code(), codec);
        assert!(matches!(
            content.reader(),
            Err(ZimError::CompressionUnsupported(c)) if c == codec
        ));
    }
}

#[test]
fn unknown_codec_nibble_is_rejected() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.raw_cluster(9, b"whatever".to_vec());
    builder.content_entry('A', "x", "", "text/plain", cluster, 0);

    let zim = open_bytes(builder.build()).unwrap();
    let content = zim
        .entry_with_url(Namespace::ARTICLE, "x")
        .unwrap()
        .resolve()
        .unwrap();
    assert!(matches!(
        content.compression(),
        Err(ZimError::CompressionUnsupported(9))
    ));
}

#[test]
fn metadata_retrieval() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(
        ClusterCompression::Zstd,
        vec![
            b"wikipedia_en_all".to_vec(),
            b"Wikipedia".to_vec(),
            b"en".to_vec(),
        ],
    );
    builder.content_entry('M', "Name", "", "text/plain", cluster, 0);
    builder.content_entry('M', "Title", "", "text/plain", cluster, 1);
    builder.content_entry('M', "Language", "", "text/plain", cluster, 2);
    builder.content_entry('A', "pad", "", "text/plain", cluster, 0);

    let zim = open_bytes(builder.build()).unwrap();

    use zim_reader::MetadataKey;
    let all = zim.metadata(&[]).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[&MetadataKey::Name], "wikipedia_en_all");
    assert_eq!(all[&MetadataKey::Title], "Wikipedia");
    assert_eq!(all[&MetadataKey::Language], "en");

    let some = zim.metadata(&[MetadataKey::Title, MetadataKey::Creator]).unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some[&MetadataKey::Title], "Wikipedia");
}

#[test]
fn favicon_from_metadata_illustration() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(
        ClusterCompression::None,
        vec![b"\x89PNG fake icon".to_vec()],
    );
    builder.content_entry(
        'M',
        "Illustration_96x96@2",
        "",
        "image/png",
        cluster,
        0,
    );
    builder.content_entry('A', "pad", "", "text/plain", cluster, 0);

    let zim = open_bytes(builder.build()).unwrap();
    let favicon = zim.favicon().unwrap();
    assert_eq!(favicon.full_url(), "M/Illustration_96x96@2");
    assert_eq!(favicon.mime_type(), "image/png");
}

#[test]
fn favicon_namespace_fallback() {
    let mut builder = ZimBuilder::new();
    let cluster = builder.cluster(ClusterCompression::None, vec![b"icon".to_vec()]);
    builder.content_entry('-', "favicon", "", "image/png", cluster, 0);
    builder.content_entry('A', "pad", "", "text/plain", cluster, 0);

    let zim = open_bytes(builder.build()).unwrap();
    let favicon = zim.favicon().unwrap();
    assert_eq!(favicon.full_url(), "-/favicon");
}

#[test]
fn favicon_absent_is_not_found() {
    let zim = open_bytes(wiki_builder().build()).unwrap();
    assert!(matches!(zim.favicon(), Err(ZimError::NotFound)));
}

#[test]
fn close_is_idempotent_and_latches() {
    let zim = open_bytes(wiki_builder().build()).unwrap();

    let content = zim
        .entry_with_url(Namespace::ARTICLE, "Article")
        .unwrap()
        .resolve()
        .unwrap();
    let mut reader = content.reader().unwrap();

    zim.close().unwrap();
    assert!(matches!(zim.close(), Err(ZimError::Closed)));

    // Lookups that touch the source fail after close.
    assert!(zim.entry_at(0).is_err());

    // A reader created before close cannot load its cluster anymore.
    assert!(reader.size().is_err());
}

#[test]
fn corrupt_pointer_tables_fail_open() {
    // Truncating the archive mid-table must surface as Malformed.
    let bytes = wiki_builder().build();
    let url_ptr_pos = u64::from_le_bytes(bytes[32..40].try_into().unwrap()) as usize;
    let truncated = bytes[..url_ptr_pos + 4].to_vec();

    assert!(matches!(
        open_bytes(truncated),
        Err(ZimError::Malformed(_))
    ));

    // Non-increasing cluster pointers are rejected at open.
    let mut swapped = wiki_builder().build();
    let cluster_ptr_pos = u64::from_le_bytes(swapped[48..56].try_into().unwrap()) as usize;
    let first = swapped[cluster_ptr_pos..cluster_ptr_pos + 8].to_vec();
    let second = swapped[cluster_ptr_pos + 8..cluster_ptr_pos + 16].to_vec();
    swapped[cluster_ptr_pos..cluster_ptr_pos + 8].copy_from_slice(&second);
    swapped[cluster_ptr_pos + 8..cluster_ptr_pos + 16].copy_from_slice(&first);

    assert!(matches!(open_bytes(swapped), Err(ZimError::Malformed(_))));
}

#[test]
fn real_archives_if_available() {
    skip_test_if_no_zim_data!();

    for path in zim_testkit::find_zim_data().unwrap() {
        let zim = Zim::open(&path).unwrap();
        assert!(zim.entry_count() > 0);
        assert_eq!(zim.uuid().split('-').count(), 5);

        // Walk a few entries and resolve whatever redirects show up.
        for entry in zim.entries().take(64) {
            let entry = entry.unwrap();
            if entry.is_redirect() {
                let content = entry.resolve().unwrap();
                assert_ne!(content.url(), entry.url());
            }
        }
    }
}
