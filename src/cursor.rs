// ABOUTME: Bounds-checked read cursor shared by every decoder stage.
// ABOUTME: Tracks the absolute offset of its window so errors point into the original message.

use crate::error::{ByteCount, Error, ErrorKind, Result};

/// A read position over a byte slice.
///
/// `base` is the absolute offset of `data[0]` in the message, so a cursor
/// over a field value still reports offsets relative to the whole message.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor whose first byte is at absolute offset 0.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Create a cursor whose first byte is at absolute offset `base`.
    #[must_use]
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Position relative to the start of this cursor's window.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute offset of the next unread byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The unread bytes.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Check if we've reached the end of the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Look at the next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read a single byte, advancing position.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek().ok_or_else(|| self.truncated(1))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.truncated(n));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read `width` bytes as a big-endian unsigned integer (at most 8 bytes).
    pub fn read_be_uint(&mut self, width: usize) -> Result<u64> {
        let start = self.offset();
        if width > 8 {
            return Err(Error::new(
                ErrorKind::UnsupportedLengthForm,
                start,
                format!("{width}-byte integer does not fit in 64 bits"),
            ));
        }
        let bytes = self.read_bytes(width)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Split off the next `n` bytes as an independent cursor.
    ///
    /// The parent advances past the window; the child reports offsets
    /// within the same absolute space.
    pub fn sub_cursor(&mut self, n: usize) -> Result<ByteCursor<'a>> {
        let base = self.offset();
        let bytes = self.read_bytes(n)?;
        Ok(ByteCursor::with_base(bytes, base))
    }

    /// Consume and return everything left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = self.rest();
        self.pos = self.data.len();
        rest
    }

    /// Build a `TruncatedValue` error for a read of `needed` bytes here.
    #[must_use]
    pub fn truncated(&self, needed: usize) -> Error {
        Error::new(
            ErrorKind::TruncatedValue,
            self.offset(),
            format!("need {}, {} remaining", ByteCount(needed), self.remaining()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_position() {
        let mut cur = ByteCursor::new(&[0x01, 0x02, 0x03]);
        assert_eq!(cur.read_byte().unwrap(), 0x01);
        assert_eq!(cur.read_bytes(2).unwrap(), &[0x02, 0x03]);
        assert!(cur.is_empty());
        assert_eq!(cur.position(), 3);
    }

    #[test]
    fn test_truncated_never_advances() {
        let mut cur = ByteCursor::with_base(&[0xAA, 0xBB], 10);
        cur.read_byte().unwrap();
        let err = cur.read_bytes(4).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TruncatedValue);
        assert_eq!(err.offset, 11);
        assert_eq!(err.detail, "need 4 bytes, 1 remaining");
        assert_eq!(cur.remaining(), 1);
    }

    #[test]
    fn test_truncated_single_byte_wording() {
        let mut cur = ByteCursor::new(&[]);
        let err = cur.read_byte().unwrap_err();
        assert_eq!(err.detail, "need 1 byte, 0 remaining");
    }

    #[test]
    fn test_read_be_uint() {
        let mut cur = ByteCursor::new(&[0x00, 0xA8, 0x01]);
        assert_eq!(cur.read_be_uint(2).unwrap(), 168);
        assert_eq!(cur.read_be_uint(1).unwrap(), 1);
        assert!(matches!(cur.read_be_uint(1), Err(e) if e.kind == ErrorKind::TruncatedValue));
    }

    #[test]
    fn test_sub_cursor_offsets() {
        let data = [0x10, 0x20, 0x30, 0x40, 0x50];
        let mut cur = ByteCursor::with_base(&data, 100);
        cur.read_byte().unwrap();
        let mut sub = cur.sub_cursor(2).unwrap();
        assert_eq!(cur.offset(), 103);
        assert_eq!(sub.offset(), 101);
        assert_eq!(sub.remaining(), 2);
        sub.read_bytes(2).unwrap();
        let err = sub.read_byte().unwrap_err();
        assert_eq!(err.offset, 103);
    }

    #[test]
    fn test_take_rest() {
        let mut cur = ByteCursor::new(&[1, 2, 3]);
        cur.read_byte().unwrap();
        assert_eq!(cur.take_rest(), &[2, 3]);
        assert!(cur.is_empty());
        assert_eq!(cur.take_rest(), &[] as &[u8]);
    }
}
