//! In-memory document model and binary codec for Aseprite sprite files
//! (`.ase` / `.aseprite`).
//!
//! File layout per the published format description:
//! <https://github.com/aseprite/aseprite/blob/main/docs/ase-file-specs.md>

pub mod codec;
pub mod doc;
pub mod error;
pub mod io;

pub use error::{Error, Result};
