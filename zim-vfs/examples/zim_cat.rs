//! Extract one entry by path name and write it to stdout.
//!
//! Usage: cargo run --example zim_cat -- <archive.zim> <path>
//!
//! The path resolves like a served file: "index.html" is the main page,
//! full URLs like "A/Main_Page" hit the URL map, bare names fall back
//! across the content namespaces.

use std::error::Error;
use std::io::{copy, stdout};

use zim_reader::Zim;
use zim_vfs::{VfsNode, ZimVfs};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (archive, name) = match (args.next(), args.next()) {
        (Some(archive), Some(name)) => (archive, name),
        _ => return Err("usage: zim_cat <archive.zim> <path>".into()),
    };

    let zim = Zim::open(archive)?;
    let vfs = ZimVfs::new(&zim);

    match vfs.open(&name)? {
        VfsNode::Directory(dir) => {
            for entry in dir.entries() {
                println!("{entry}");
            }
        }
        VfsNode::File(mut file) => {
            eprintln!("{} ({}, {} bytes)", file.name(), file.mime_type(), file.size());
            copy(&mut file, &mut stdout().lock())?;
        }
    }

    Ok(())
}
