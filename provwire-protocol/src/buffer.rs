//! Growable byte buffer with a consuming read cursor.
//!
//! `ByteBuffer` is the staging area shared by the record coder and the
//! package transport: outgoing record streams are appended to one and sliced
//! into package payloads, incoming payloads are appended to another and
//! consumed by the decode state machine. Reads advance a cursor (consumed
//! bytes are gone); writes append at the tail. An optional capacity limit
//! bounds the number of bytes buffered at any one time.

use crate::error::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Growable byte buffer with big-endian fixed-width primitives.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    buf: BytesMut,
    limit: Option<usize>,
}

impl ByteBuffer {
    /// Creates an empty, unbounded buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            limit: None,
        }
    }

    /// Creates an empty buffer that never holds more than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(limit),
            limit: Some(limit),
        }
    }

    fn check_capacity(&self, additional: usize) -> Result<(), ProtocolError> {
        if let Some(limit) = self.limit {
            let needed = self.buf.len() + additional;
            if needed > limit {
                return Err(ProtocolError::CapacityExceeded { needed, limit });
            }
        }
        Ok(())
    }

    fn check_available(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.len() < needed {
            return Err(ProtocolError::BufferUnderflow {
                needed,
                available: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), ProtocolError> {
        self.check_capacity(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), ProtocolError> {
        self.check_capacity(2)?;
        self.buf.put_u16(value);
        Ok(())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<(), ProtocolError> {
        self.check_capacity(4)?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Appends `value` as a big-endian integer of `width` bytes (1..=8).
    pub fn put_uint(&mut self, value: u64, width: usize) -> Result<(), ProtocolError> {
        self.check_capacity(width)?;
        self.buf.put_uint(value, width);
        Ok(())
    }

    pub fn put_slice(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.check_capacity(data.len())?;
        self.buf.put_slice(data);
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.check_available(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u16(&mut self) -> Result<u16, ProtocolError> {
        self.check_available(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.check_available(4)?;
        Ok(self.buf.get_u32())
    }

    /// Consumes a big-endian integer of `width` bytes (1..=8).
    pub fn get_uint(&mut self, width: usize) -> Result<u64, ProtocolError> {
        self.check_available(width)?;
        Ok(self.buf.get_uint(width))
    }

    /// Consumes exactly `len` bytes.
    pub fn get_bytes(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        self.check_available(len)?;
        Ok(self.buf.split_to(len).freeze())
    }

    /// Consumes and returns up to `max` bytes from the front.
    pub fn take(&mut self, max: usize) -> Bytes {
        let n = max.min(self.buf.len());
        self.buf.split_to(n).freeze()
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrows the unread bytes without consuming them.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let mut buf = ByteBuffer::new();
        buf.put_u8(0x12).unwrap();
        buf.put_u16(0x3456).unwrap();
        buf.put_u32(0x789ABCDE).unwrap();
        buf.put_slice(b"abc").unwrap();

        assert_eq!(buf.remaining(), 10);
        assert_eq!(buf.get_u8().unwrap(), 0x12);
        assert_eq!(buf.get_u16().unwrap(), 0x3456);
        assert_eq!(buf.get_u32().unwrap(), 0x789ABCDE);
        assert_eq!(buf.get_bytes(3).unwrap().as_ref(), b"abc");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_big_endian_layout() {
        let mut buf = ByteBuffer::new();
        buf.put_u16(0x0102).unwrap();
        assert_eq!(buf.as_slice(), &[0x01, 0x02]);
    }

    #[test]
    fn test_variable_width_int() {
        let mut buf = ByteBuffer::new();
        buf.put_uint(0x012345, 3).unwrap();
        assert_eq!(buf.as_slice(), &[0x01, 0x23, 0x45]);
        assert_eq!(buf.get_uint(3).unwrap(), 0x012345);
    }

    #[test]
    fn test_underflow() {
        let mut buf = ByteBuffer::new();
        buf.put_u8(1).unwrap();
        let result = buf.get_u32();
        assert!(matches!(
            result,
            Err(ProtocolError::BufferUnderflow {
                needed: 4,
                available: 1
            })
        ));
        // A failed read consumes nothing.
        assert_eq!(buf.remaining(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let mut buf = ByteBuffer::with_limit(4);
        buf.put_u32(7).unwrap();
        let result = buf.put_u8(1);
        assert!(matches!(
            result,
            Err(ProtocolError::CapacityExceeded {
                needed: 5,
                limit: 4
            })
        ));

        // Consuming frees room under the limit.
        buf.get_u16().unwrap();
        buf.put_u16(9).unwrap();
    }

    #[test]
    fn test_take_caps_at_remaining() {
        let mut buf = ByteBuffer::new();
        buf.put_slice(b"hello").unwrap();
        assert_eq!(buf.take(3).as_ref(), b"hel");
        assert_eq!(buf.take(100).as_ref(), b"lo");
        assert!(buf.take(1).is_empty());
    }
}
