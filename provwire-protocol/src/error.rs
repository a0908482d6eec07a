//! Protocol error types.

use crate::record::ArgType;
use thiserror::Error;

/// Protocol-level errors raised while encoding records or framing packages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported argument type code: {0}")]
    UnsupportedType(u8),

    #[error("value kind does not match argument type {arg_type:?}")]
    ValueKindMismatch { arg_type: ArgType },

    #[error("argument id {0:#06x} exceeds the 9-bit namespace")]
    IdOutOfRange(u16),

    #[error("corrupt record: {0}")]
    CorruptRecord(&'static str),

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown command id: {0:#04x}")]
    UnknownCommand(u8),

    #[error("checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("truncated package: {len} bytes, need at least {min}")]
    TruncatedPackage { len: usize, min: usize },

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("payload size prefix {declared} does not match {actual} payload bytes")]
    SizePrefixMismatch { declared: usize, actual: usize },

    #[error("buffer capacity exceeded: {needed} bytes (limit {limit})")]
    CapacityExceeded { needed: usize, limit: usize },

    #[error("buffer underflow: need {needed} bytes, have {available}")]
    BufferUnderflow { needed: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::UnsupportedType(9);
        assert!(err.to_string().contains('9'));

        let err = ProtocolError::ChecksumMismatch {
            expected: 0xABCD,
            actual: 0x1234,
        };
        let msg = err.to_string();
        assert!(msg.contains("abcd") || msg.contains("ABCD"));

        let err = ProtocolError::ValueKindMismatch {
            arg_type: ArgType::Int16u,
        };
        assert!(err.to_string().contains("Int16u"));

        let err = ProtocolError::BufferUnderflow {
            needed: 4,
            available: 1,
        };
        assert!(err.to_string().contains('4'));
    }
}
