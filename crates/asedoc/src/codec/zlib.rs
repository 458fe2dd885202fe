//! RFC 1950 zlib streams for pixel and tileset payloads.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Error, Result};

/// Compresses `data` into a standalone zlib stream.
pub(super) fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses `src` until `dest` is full. A stream that ends early is
/// tolerated: the remainder of `dest` keeps its zero fill. Corrupt
/// streams fail with [`Error::InvalidData`].
pub(super) fn inflate_into(src: &[u8], dest: &mut [u8]) -> Result<()> {
    let mut decoder = ZlibDecoder::new(src);
    let mut filled = 0;
    while filled < dest.len() {
        match decoder.read(&mut dest[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => {
                return Err(Error::InvalidData(format!(
                    "corrupt compressed stream: {err}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data: Vec<u8> = (0..=255).cycle().take(4096).collect();
        let packed = deflate(&data).unwrap();
        let mut unpacked = vec![0u8; data.len()];
        inflate_into(&packed, &mut unpacked).unwrap();
        assert_eq!(unpacked, data);
    }

    #[test]
    fn emits_a_zlib_wrapper() {
        // RFC 1950: CMF low nibble 8 = deflate, and the CMF/FLG pair is a
        // multiple of 31.
        let packed = deflate(b"abc").unwrap();
        assert_eq!(packed[0] & 0x0F, 8);
        assert_eq!(((u16::from(packed[0]) << 8) | u16::from(packed[1])) % 31, 0);
    }

    #[test]
    fn short_stream_zero_fills_the_rest() {
        let packed = deflate(&[1, 2, 3]).unwrap();
        let mut dest = vec![0u8; 8];
        inflate_into(&packed, &mut dest).unwrap();
        assert_eq!(dest, vec![1, 2, 3, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn garbage_is_invalid_data() {
        let mut dest = vec![0u8; 4];
        assert!(matches!(
            inflate_into(&[0xDE, 0xAD, 0xBE, 0xEF], &mut dest),
            Err(Error::InvalidData(_))
        ));
    }
}
