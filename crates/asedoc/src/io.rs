//! Little-endian primitive readers and writers for the wire format.
//!
//! Every multi-byte integer in the format is little-endian. Strings are a
//! `u16` byte count followed by UTF-8 bytes with no terminator. `FIXED`
//! values are a signed 16.16 raw `i32`. Both sides expose the current
//! position and absolute seeks so length fields can be back-patched.

mod reader;
mod writer;

pub use reader::AseReader;
pub use writer::AseWriter;
