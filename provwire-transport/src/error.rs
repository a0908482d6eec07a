//! Transport error types.

use provwire_protocol::{ArgType, ProtocolError};
use thiserror::Error;

/// Transport errors. All are fatal for the session: the protocol has no
/// retry at this layer, so a caller either completes an exchange or aborts
/// with the diagnostics carried here.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "malformed response: {source}; request={request} response={response}"
    )]
    MalformedResponse {
        source: ProtocolError,
        request: String,
        response: String,
    },

    #[error(
        "response command mismatch: expected {expected:#04x}, got {actual:#04x}; \
         request={request} response={response}"
    )]
    CommandMismatch {
        expected: u8,
        actual: u8,
        request: String,
        response: String,
    },

    #[error(
        "response counter mismatch: expected {expected}, got {actual}; \
         request={request} response={response}"
    )]
    CounterMismatch {
        expected: u8,
        actual: u8,
        request: String,
        response: String,
    },

    #[error(
        "device reported error {code:#010x}; request={request} response={response}"
    )]
    DeviceError {
        code: u32,
        request: String,
        response: String,
    },

    #[error("unknown argument id {id:#06x}")]
    UnknownArgument { id: u16 },

    #[error(
        "decoded type {actual:?} does not match registered type {expected:?} \
         for argument {id:#06x}"
    )]
    TypeMismatch {
        id: u16,
        expected: ArgType,
        actual: ArgType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::CounterMismatch {
            expected: 4,
            actual: 5,
            request: "02030400".to_string(),
            response: "02830500".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 4"));
        assert!(msg.contains("02830500"));

        let err = TransportError::DeviceError {
            code: 0x12,
            request: String::new(),
            response: String::new(),
        };
        assert!(err.to_string().contains("0x00000012"));
    }
}
