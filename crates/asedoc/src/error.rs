//! Error taxonomy shared by the document model and the codec.

use std::io;

/// Failures surfaced by the model and codec.
///
/// Decoding and encoding never recover internally: the first failing
/// chunk aborts the whole call with one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file extension is not `.ase` or `.aseprite`.
    #[error("unsupported file extension: {extension:?}")]
    UnsupportedFormat { extension: String },

    /// The word after the file size field is not `0xA5E0`.
    #[error("bad file magic: found {found:#06x}")]
    InvalidFileMagic { found: u16 },

    /// A frame header's magic word is not `0xF1FA`.
    #[error("bad magic in frame {frame} header")]
    BadFrameMagic { frame: u16 },

    /// The header's color depth is not one of 8, 16 or 32 bits.
    #[error("unknown color depth: {bits} bits per pixel")]
    UnknownColorDepth { bits: u16 },

    /// A read ran past the available bytes.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Structural corruption other than truncation: malformed UTF-8,
    /// a broken compressed stream, impossible dimensions, and so on.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// An error propagated from the underlying byte source or sink.
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // Truncation is part of the taxonomy regardless of which layer
        // noticed it.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
