//! C1: bounded random-access view over a byte source (`spec.md` §4.1).
//!
//! Grounded on the teacher's `BufReaderExtension`/`TableDecode for u8/u16/u32`
//! read-primitive idiom (`metadata/bufreader_extension.rs`, `metadata/decode.rs`):
//! fixed-width big-endian reads, each failing independently on a short buffer.
//! Unlike the teacher's `Cursor<Vec<u8>>` (which owns its bytes and reads
//! little-endian via `byteorder`), ours borrows a `&[u8]` slice and reads
//! big-endian, per RP66's wire format and `spec.md` §5's "cursor does not own
//! the backing bytes" memory-discipline rule.

use crate::error::{Error, Result};

/// A bounded, borrowing cursor over a byte slice.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'d> {
    data: &'d [u8],
    pos: usize,
}

impl<'d> Cursor<'d> {
    pub fn new(data: &'d [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads `n` bytes at the cursor's current position, advancing it.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'d [u8]> {
        let bytes = self.read_at(self.pos, n)?;
        self.pos += n;
        Ok(bytes)
    }

    /// Reads `n` bytes at `offset` without moving the cursor.
    pub fn read_at(&self, offset: usize, n: usize) -> Result<&'d [u8]> {
        let end = offset.checked_add(n).ok_or(Error::Truncated)?;
        self.data.get(offset..end).ok_or(Error::Truncated)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::Truncated);
        }
        self.pos += n;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        Ok(f64::from_be_bytes(bytes.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives() {
        let data = [0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.read_u16().unwrap(), 1);
        assert_eq!(cur.read_i32().unwrap(), -2);
        assert!(cur.is_empty());
    }

    #[test]
    fn over_read_is_truncated() {
        let data = [0x00];
        let mut cur = Cursor::new(&data);
        assert!(matches!(cur.read_u16(), Err(Error::Truncated)));
    }

    #[test]
    fn read_at_does_not_move_position() {
        let data = [1, 2, 3, 4];
        let cur = Cursor::new(&data);
        assert_eq!(cur.read_at(1, 2).unwrap(), &[2, 3]);
        assert_eq!(cur.position(), 0);
    }
}
