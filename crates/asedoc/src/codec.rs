//! Bidirectional codec between [`Sprite`] documents and the `.ase` /
//! `.aseprite` binary format.
//!
//! Both directions are a single synchronous pass over the
//! frame-and-chunk structure. Decoding builds a fresh document or fails
//! with the first structural error; encoding writes chunks in a fixed
//! order and back-patches the length fields the format embeds.

mod chunk;
mod decoder;
mod encoder;
mod zlib;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use crate::doc::{Document, Sprite};
use crate::error::{Error, Result};

/// True when the path carries a recognised sprite extension
/// (`.ase` or `.aseprite`, case-insensitive).
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ext.eq_ignore_ascii_case("ase") || ext.eq_ignore_ascii_case("aseprite")
        })
}

fn check_supported(path: &Path) -> Result<()> {
    if is_supported(path) {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat {
            extension: path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("")
                .to_string(),
        })
    }
}

/// Decodes a sprite from any seekable byte source.
pub fn decode_stream<R: Read + Seek>(source: R) -> Result<Document> {
    let sprite = decoder::decode(source)?;
    Ok(Document::new(sprite))
}

/// Decodes a sprite file, recording the source path on the returned
/// document and marking it clean.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    check_supported(path)?;
    let file = File::open(path)?;
    let mut document = decode_stream(BufReader::new(file))?;
    document.record_path(path.to_path_buf());
    document.mark_clean();
    Ok(document)
}

/// Encodes a sprite to any seekable byte sink. On failure the sink is
/// left at an unspecified position and its contents must be discarded.
pub fn encode_stream<W: Write + Seek>(sprite: &Sprite, sink: W) -> Result<()> {
    encoder::encode(sprite, sink)
}

/// Encodes a document to a file, recording the destination path and
/// marking the document clean on success.
pub fn encode_file(document: &mut Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    check_supported(path)?;
    let file = File::create(path)?;
    let mut sink = BufWriter::new(file);
    encoder::encode(document.sprite(), &mut sink)?;
    sink.flush()?;
    document.record_path(path.to_path_buf());
    document.mark_clean();
    Ok(())
}
