use std::io::{Seek, SeekFrom, Write};

use crate::error::{Error, Result};

/// Writer for the format's primitive types over any seekable byte sink.
///
/// Length fields in the format are written as placeholders and patched
/// once the enclosed bytes are known; `patch_u16_le_at`/`patch_u32_le_at`
/// rewrite an absolute offset and restore the current position.
pub struct AseWriter<W> {
    inner: W,
}

impl<W: Write + Seek> AseWriter<W> {
    pub fn new(inner: W) -> AseWriter<W> {
        AseWriter { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Current offset from the start of the sink.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Absolute seek from the start of the sink.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// `count` zero bytes, used for reserved runs and header placeholders.
    pub fn pad(&mut self, count: usize) -> Result<()> {
        const ZEROS: [u8; 128] = [0; 128];
        let mut remaining = count;
        while remaining > 0 {
            let step = remaining.min(ZEROS.len());
            self.write_bytes(&ZEROS[..step])?;
            remaining -= step;
        }
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i16_le(&mut self, value: i16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32_le(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f32_le(&mut self, value: f32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f64_le(&mut self, value: f64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Signed 16.16 fixed-point value: raw `i32` is `round(value * 65536)`.
    pub fn write_fixed(&mut self, value: f64) -> Result<()> {
        let raw = (value * 65536.0).round();
        if raw < f64::from(i32::MIN) || raw > f64::from(i32::MAX) {
            return Err(Error::InvalidData(format!(
                "fixed-point value {value} out of range"
            )));
        }
        #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
        let raw = raw as i32;
        self.write_i32_le(raw)
    }

    /// `u16` byte count followed by the UTF-8 bytes, no terminator.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let byte_count = u16::try_from(value.len()).map_err(|_| {
            Error::InvalidData(format!("string of {} bytes too long", value.len()))
        })?;
        self.write_u16_le(byte_count)?;
        self.write_bytes(value.as_bytes())
    }

    /// 16 raw bytes.
    pub fn write_uuid(&mut self, value: &[u8; 16]) -> Result<()> {
        self.write_bytes(value)
    }

    /// Rewrite a `u16` at an absolute offset, restoring the position.
    pub fn patch_u16_le_at(&mut self, offset: u64, value: u16) -> Result<()> {
        let saved = self.position()?;
        self.seek_to(offset)?;
        self.write_u16_le(value)?;
        self.seek_to(saved)
    }

    /// Rewrite a `u32` at an absolute offset, restoring the position.
    pub fn patch_u32_le_at(&mut self, offset: u64, value: u32) -> Result<()> {
        let saved = self.position()?;
        self.seek_to(offset)?;
        self.write_u32_le(value)?;
        self.seek_to(saved)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn collect(writer: AseWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn writes_little_endian_primitives() {
        let mut writer = AseWriter::new(Cursor::new(Vec::new()));
        writer.write_u8(0x01).unwrap();
        writer.write_u16_le(0x0302).unwrap();
        writer.write_i16_le(-1).unwrap();
        writer.write_u32_le(0x0102_0304).unwrap();
        assert_eq!(
            collect(writer),
            vec![0x01, 0x02, 0x03, 0xFF, 0xFF, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn string_layout_matches_reader() {
        let mut writer = AseWriter::new(Cursor::new(Vec::new()));
        writer.write_string("ab").unwrap();
        assert_eq!(collect(writer), vec![2, 0, b'a', b'b']);
    }

    #[test]
    fn fixed_round_trips_through_raw() {
        let mut writer = AseWriter::new(Cursor::new(Vec::new()));
        writer.write_fixed(-2.25).unwrap();
        let bytes = collect(writer);
        assert_eq!(i32::from_le_bytes(bytes.try_into().unwrap()), -147_456);
    }

    #[test]
    fn pad_writes_zeros() {
        let mut writer = AseWriter::new(Cursor::new(Vec::new()));
        writer.write_u8(0xAA).unwrap();
        writer.pad(200).unwrap();
        let bytes = collect(writer);
        assert_eq!(bytes.len(), 201);
        assert!(bytes[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn patching_restores_position() {
        let mut writer = AseWriter::new(Cursor::new(Vec::new()));
        writer.write_u32_le(0).unwrap();
        writer.write_u16_le(0xBEEF).unwrap();
        writer.patch_u32_le_at(0, 0xCAFE_F00D).unwrap();
        assert_eq!(writer.position().unwrap(), 6);
        let bytes = collect(writer);
        assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), 0xCAFE_F00D);
        assert_eq!(u16::from_le_bytes(bytes[4..].try_into().unwrap()), 0xBEEF);
    }
}
