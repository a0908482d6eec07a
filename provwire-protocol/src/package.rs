//! Package framing for the provisioning channel.
//!
//! Request layout (5-byte header + payload + 2-byte checksum):
//!
//! ```text
//! +---------+---------+---------+-------------+---------+----------+
//! | version | command | counter | payload_len | payload | checksum |
//! | 1 byte  | 1 byte  | 1 byte  | 2 bytes BE  | 0..121  | 2 bytes  |
//! +---------+---------+---------+-------------+---------+----------+
//! ```
//!
//! Response layout (7-byte header + size-prefixed payload + checksum):
//!
//! ```text
//! +---------+--------------+---------+------------+------+---------+----------+
//! | version | command|0x80 | counter | error      | size | payload | checksum |
//! | 1 byte  | 1 byte       | 1 byte  | 4 bytes BE | 1 b  | 0..118  | 2 bytes  |
//! +---------+--------------+---------+------------+------+---------+----------+
//! ```
//!
//! The checksum is the first two bytes of SHA-256 over every preceding byte.

use crate::error::ProtocolError;
use crate::{
    CHECKSUM_SIZE, HEADER_SIZE, MAX_PACKAGE_SIZE, MAX_PAYLOAD_SIZE, MAX_RESPONSE_PAYLOAD_SIZE,
    PROTOCOL_VERSION, RESPONSE_HEADER_SIZE,
};
use bytes::{BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha256};

/// Bit set on the command byte of every response.
pub const RESPONSE_FLAG: u8 = 0x80;

/// Provisioning command ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    None = 0,
    Init = 1,
    Finish = 2,
    Write = 3,
    Read = 4,
    Csr = 5,
}

impl TryFrom<u8> for CommandId {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CommandId::None),
            1 => Ok(CommandId::Init),
            2 => Ok(CommandId::Finish),
            3 => Ok(CommandId::Write),
            4 => Ok(CommandId::Read),
            5 => Ok(CommandId::Csr),
            _ => Err(ProtocolError::UnknownCommand(value)),
        }
    }
}

impl CommandId {
    /// Command byte the peer must echo on its response.
    pub fn response_id(self) -> u8 {
        self as u8 | RESPONSE_FLAG
    }
}

/// First two bytes of SHA-256 over `data`, as a big-endian u16.
pub fn checksum(data: &[u8]) -> u16 {
    let digest = Sha256::digest(data);
    u16::from_be_bytes([digest[0], digest[1]])
}

/// An outgoing request package.
#[derive(Debug, Clone)]
pub struct RequestPackage {
    pub command: CommandId,
    pub counter: u8,
    pub payload: Bytes,
}

impl RequestPackage {
    pub fn new(command: CommandId, counter: u8, payload: Bytes) -> Self {
        Self {
            command,
            counter,
            payload,
        }
    }

    /// Encodes the package into wire bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(self.command as u8);
        buf.put_u8(self.counter);
        buf.put_u16(self.payload.len() as u16);
        buf.put_slice(&self.payload);
        buf.put_u16(checksum(&buf));
        Ok(buf)
    }

    /// Decodes and verifies one complete request package.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let min = HEADER_SIZE + CHECKSUM_SIZE;
        if raw.len() < min {
            return Err(ProtocolError::TruncatedPackage {
                len: raw.len(),
                min,
            });
        }
        if raw.len() > MAX_PACKAGE_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: raw.len(),
                max: MAX_PACKAGE_SIZE,
            });
        }

        let body = &raw[..raw.len() - CHECKSUM_SIZE];
        let expected = u16::from_be_bytes([raw[raw.len() - 2], raw[raw.len() - 1]]);
        let actual = checksum(body);
        if actual != expected {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        if body[0] != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(body[0]));
        }
        let command = CommandId::try_from(body[1])?;
        let counter = body[2];
        let declared = u16::from_be_bytes([body[3], body[4]]) as usize;
        let payload = &body[HEADER_SIZE..];
        if declared != payload.len() {
            return Err(ProtocolError::SizePrefixMismatch {
                declared,
                actual: payload.len(),
            });
        }

        Ok(Self {
            command,
            counter,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

/// An incoming response package.
///
/// The command byte is kept raw; matching it against the request's
/// `response_id()` (and the counter and error fields) is the transport's
/// job, which has both sides of the exchange for diagnostics.
#[derive(Debug, Clone)]
pub struct ResponsePackage {
    pub version: u8,
    pub command: u8,
    pub counter: u8,
    pub error: u32,
    pub payload: Bytes,
}

impl ResponsePackage {
    pub fn new(command: CommandId, counter: u8, error: u32, payload: Bytes) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            command: command.response_id(),
            counter,
            error,
            payload,
        }
    }

    /// Encodes the package into wire bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        if self.payload.len() > MAX_RESPONSE_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_RESPONSE_PAYLOAD_SIZE,
            });
        }

        let mut buf =
            BytesMut::with_capacity(RESPONSE_HEADER_SIZE + 1 + self.payload.len() + CHECKSUM_SIZE);
        buf.put_u8(self.version);
        buf.put_u8(self.command);
        buf.put_u8(self.counter);
        buf.put_u32(self.error);
        buf.put_u8(self.payload.len() as u8);
        buf.put_slice(&self.payload);
        buf.put_u16(checksum(&buf));
        Ok(buf)
    }

    /// Decodes and verifies one complete response package.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let min = RESPONSE_HEADER_SIZE + 1 + CHECKSUM_SIZE;
        if raw.len() < min {
            return Err(ProtocolError::TruncatedPackage {
                len: raw.len(),
                min,
            });
        }
        if raw.len() > MAX_PACKAGE_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: raw.len(),
                max: MAX_PACKAGE_SIZE,
            });
        }

        let body = &raw[..raw.len() - CHECKSUM_SIZE];
        let expected = u16::from_be_bytes([raw[raw.len() - 2], raw[raw.len() - 1]]);
        let actual = checksum(body);
        if actual != expected {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        if body[0] != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(body[0]));
        }
        let command = body[1];
        let counter = body[2];
        let error = u32::from_be_bytes([body[3], body[4], body[5], body[6]]);
        let declared = body[RESPONSE_HEADER_SIZE] as usize;
        let payload = &body[RESPONSE_HEADER_SIZE + 1..];
        if declared != payload.len() {
            return Err(ProtocolError::SizePrefixMismatch {
                declared,
                actual: payload.len(),
            });
        }

        Ok(Self {
            version: body[0],
            command,
            counter,
            error,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}
