//! Dump archive information: header fields, metadata, main page, favicon.
//!
//! Usage: cargo run --example zim_info -- <archive.zim>

use std::error::Error;

use zim_reader::{Zim, ZimError};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: zim_info <archive.zim>")?;

    let zim = Zim::open(&path)?;

    let (major, minor) = zim.version();
    println!("archive:  {path}");
    println!("version:  {major}.{minor}");
    println!("uuid:     {}", zim.uuid());
    println!("entries:  {}", zim.entry_count());
    println!("clusters: {}", zim.cluster_count());

    match zim.main_page() {
        Ok(main) => println!("main:     {}", main.full_url()),
        Err(ZimError::NotFound) => println!("main:     (none)"),
        Err(err) => return Err(err.into()),
    }

    match zim.favicon() {
        Ok(favicon) => println!("favicon:  {} ({})", favicon.full_url(), favicon.mime_type()),
        Err(ZimError::NotFound) => println!("favicon:  (none)"),
        Err(err) => return Err(err.into()),
    }

    let metadata = zim.metadata(&[])?;
    if !metadata.is_empty() {
        println!("metadata:");
        let mut keys: Vec<_> = metadata.keys().collect();
        keys.sort_by_key(|k| k.as_str());
        for key in keys {
            let value = &metadata[key];
            let preview: String = value.chars().take(60).collect();
            println!("  {key}: {preview}");
        }
    }

    Ok(())
}
