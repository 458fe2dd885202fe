use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Reader for the format's primitive types over any seekable byte source.
pub struct AseReader<R> {
    inner: R,
}

impl<R: Read + Seek> AseReader<R> {
    pub fn new(inner: R) -> AseReader<R> {
        AseReader { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current offset from the start of the source.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Absolute seek from the start of the source.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Relative skip forward.
    pub fn skip(&mut self, bytes: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(i64::try_from(bytes).map_err(
            |_| Error::InvalidData(format!("skip of {bytes} bytes out of range")),
        )?))?;
        Ok(())
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f32_le(&mut self) -> Result<f32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_f64_le(&mut self) -> Result<f64> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Signed 16.16 fixed-point value.
    pub fn read_fixed(&mut self) -> Result<f64> {
        let raw = self.read_i32_le()?;
        Ok(f64::from(raw) / 65536.0)
    }

    /// `u16` byte count followed by that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let byte_count = self.read_u16_le()?;
        let mut bytes = vec![0u8; usize::from(byte_count)];
        self.read_exact(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::InvalidData("invalid UTF-8 in string".into()))
    }

    /// 16 raw bytes.
    pub fn read_uuid(&mut self) -> Result<[u8; 16]> {
        let mut buf = [0; 16];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// `count` raw bytes into a fresh buffer.
    pub fn read_vec(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; count];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_little_endian_primitives() {
        let data = vec![0x01, 0x02, 0x03, 0xFF, 0xFF, 0x04, 0x03, 0x02, 0x01];
        let mut reader = AseReader::new(Cursor::new(data));
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16_le().unwrap(), 0x0302);
        assert_eq!(reader.read_i16_le().unwrap(), -1);
        assert_eq!(reader.read_u32_le().unwrap(), 0x0102_0304);
        assert_eq!(reader.position().unwrap(), 9);
    }

    #[test]
    fn reads_fixed_point() {
        // 1.5 in 16.16 is 0x00018000.
        let data = 0x0001_8000_i32.to_le_bytes().to_vec();
        let mut reader = AseReader::new(Cursor::new(data));
        let value = reader.read_fixed().unwrap();
        assert!((value - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn reads_length_prefixed_string() {
        let mut data = vec![5, 0];
        data.extend_from_slice(b"hello");
        let mut reader = AseReader::new(Cursor::new(data));
        assert_eq!(reader.read_string().unwrap(), "hello");
    }

    #[test]
    fn invalid_utf8_is_invalid_data() {
        let data = vec![2, 0, 0xFF, 0xFE];
        let mut reader = AseReader::new(Cursor::new(data));
        assert!(matches!(
            reader.read_string(),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn short_read_is_unexpected_eof() {
        let mut reader = AseReader::new(Cursor::new(vec![0x01]));
        assert!(matches!(reader.read_u32_le(), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn seek_and_skip() {
        let data = (0u8..16).collect::<Vec<_>>();
        let mut reader = AseReader::new(Cursor::new(data));
        reader.seek_to(4).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 4);
        reader.skip(3).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 8);
    }
}
