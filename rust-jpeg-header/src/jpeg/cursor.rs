use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

/// Read-only view over an image buffer with a moving read offset.
///
/// Every read is bounds-checked before it happens, so a truncated file surfaces as
/// [`Error::OutOfBounds`] instead of a panic.
#[derive(Debug, Clone)]
pub struct ByteCursor<'data> {
    cursor: Cursor<&'data [u8]>,
}

impl<'data> ByteCursor<'data> {
    /// Creates a cursor positioned at the start of `data`.
    pub fn new(data: &'data [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Current read offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    fn data(&self) -> &'data [u8] {
        *self.cursor.get_ref()
    }

    /// Fails with [`Error::OutOfBounds`] unless `count` more bytes can be read.
    pub fn ensure(&self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(Error::OutOfBounds {
                offset: self.position(),
                requested: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Returns the next `count` bytes without advancing.
    pub fn peek_bytes(&self, count: usize) -> Result<&'data [u8]> {
        self.ensure(count)?;
        let start = self.position();
        Ok(&self.data()[start..start + count])
    }

    /// Returns the next `count` bytes and advances past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'data [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.advance(count);
        Ok(bytes)
    }

    /// Advances past `count` bytes without looking at them.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        self.advance(count);
        Ok(())
    }

    /// Reads one byte.
    pub fn read_next_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        self.cursor.read_u8().map_err(|_| self.out_of_bounds(1))
    }

    /// Reads a big-endian u16.
    pub fn read_next_word(&mut self) -> Result<u16> {
        self.ensure(2)?;
        self.cursor
            .read_u16::<BigEndian>()
            .map_err(|_| self.out_of_bounds(2))
    }

    fn advance(&mut self, count: usize) {
        let position = self.cursor.position() + count as u64;
        self.cursor.set_position(position);
    }

    fn out_of_bounds(&self, requested: usize) -> Error {
        Error::OutOfBounds {
            offset: self.position(),
            requested,
            available: self.remaining(),
        }
    }
}
