//! Bounds-checked byte reader
//!
//! Every decoder in this crate walks its input through a [`Cursor`] so that a
//! short or lying buffer turns into a [`ParseError`] instead of an
//! out-of-bounds read.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Buffer too short: wanted {wanted} bytes, {remaining} remaining")]
    Truncated { wanted: usize, remaining: usize },

    #[error("Advertising data too long: {0} bytes")]
    AdvDataTooLong(usize),
}

/// Forward-only reader over a byte slice
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Everything not yet consumed
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Take `n` bytes, or fail without consuming anything
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if n > self.remaining() {
            return Err(ParseError::Truncated {
                wanted: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, ParseError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, ParseError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i16_le(&mut self) -> Result<i16, ParseError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance() {
        let data = [0x01, 0x34, 0x12, 0xDE, 0xAD, 0xBE, 0xEF];
        let mut cur = Cursor::new(&data);

        assert_eq!(cur.read_u8().unwrap(), 0x01);
        assert_eq!(cur.read_u16_le().unwrap(), 0x1234);
        assert_eq!(cur.read_u32_be().unwrap(), 0xDEADBEEF);
        assert!(cur.is_empty());
        assert_eq!(cur.position(), 7);
    }

    #[test]
    fn test_overrun_does_not_consume() {
        let data = [0xAA, 0xBB];
        let mut cur = Cursor::new(&data);

        let err = cur.read_u32_le().unwrap_err();
        assert_eq!(err, ParseError::Truncated { wanted: 4, remaining: 2 });
        assert_eq!(cur.remaining(), 2);
        assert_eq!(cur.rest(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_signed_reads() {
        let data = [0xC4, 0xFE, 0xFF];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.read_i8().unwrap(), -60);
        assert_eq!(cur.read_i16_le().unwrap(), -2);
    }
}
