//! Little-endian primitive codec for save blobs.
//!
//! Strings are a 7-bit variable-length byte count followed by UTF-8 bytes;
//! bools are a single byte.

use super::CorruptSaveError;

#[derive(Debug, Default)]
pub struct SaveWriter {
    buf: Vec<u8>,
}

impl SaveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_string(&mut self, value: &str) {
        let mut len = value.len() as u32;
        while len >= 0x80 {
            self.buf.push((len as u8) | 0x80);
            len >>= 7;
        }
        self.buf.push(len as u8);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Counts and indices are stored as i32 on the wire.
    pub fn write_len(&mut self, len: usize) {
        self.write_i32(i32::try_from(len).unwrap_or(i32::MAX));
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_i32(i32::try_from(value).unwrap_or(i32::MAX));
    }
}

pub struct SaveReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SaveReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], CorruptSaveError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CorruptSaveError::Truncated(field))?;
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], CorruptSaveError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, CorruptSaveError> {
        Ok(i32::from_le_bytes(self.take_array(field)?))
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, CorruptSaveError> {
        Ok(f32::from_le_bytes(self.take_array(field)?))
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, CorruptSaveError> {
        let [byte] = self.take_array::<1>(field)?;
        Ok(byte != 0)
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String, CorruptSaveError> {
        let mut len: u32 = 0;
        let mut shift = 0;
        loop {
            let [byte] = self.take_array::<1>(field)?;
            if shift >= 32 {
                return Err(CorruptSaveError::InvalidValue {
                    field,
                    value: i64::from(byte),
                });
            }
            len |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let raw = self.take(len as usize, field)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CorruptSaveError::InvalidUtf8(field))
    }

    /// Reads an i32 that must not be negative.
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, CorruptSaveError> {
        let value = self.read_i32(field)?;
        u32::try_from(value).map_err(|_| CorruptSaveError::InvalidValue {
            field,
            value: i64::from(value),
        })
    }

    pub fn read_len(&mut self, field: &'static str) -> Result<usize, CorruptSaveError> {
        Ok(self.read_u32(field)? as usize)
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
