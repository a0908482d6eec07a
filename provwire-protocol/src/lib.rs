//! # provwire-protocol
//!
//! Wire protocol for factory provisioning of secure elements over a
//! byte-oriented transport (serial, SPI, or anything request/response).
//!
//! This crate provides:
//! - Argument record encoding (flags + optional size + value)
//! - A resumable, fragmentation-tolerant record decode state machine
//! - Package framing with a rolling counter and truncated SHA-256 checksum
//! - Error types and protocol constants

pub mod buffer;
pub mod error;
pub mod package;
pub mod record;

pub use buffer::ByteBuffer;
pub use error::ProtocolError;
pub use package::{CommandId, RequestPackage, ResponsePackage, RESPONSE_FLAG};
pub use record::{size_length, ArgType, DecodeContext, DecodeOutcome, DecodeState, Record, Value};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u8 = 2;

/// Maximum size of one package on the wire, header and checksum included.
pub const MAX_PACKAGE_SIZE: usize = 128;

/// Size of the request header: version, command, counter, payload length (u16).
pub const HEADER_SIZE: usize = 5;

/// Size of the response header: version, command, counter, error (u32).
pub const RESPONSE_HEADER_SIZE: usize = 7;

/// Size of the truncated SHA-256 checksum trailing every package.
pub const CHECKSUM_SIZE: usize = 2;

/// Maximum request payload per package.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKAGE_SIZE - HEADER_SIZE - CHECKSUM_SIZE;

/// Maximum response payload per package (one extra byte for the size prefix).
pub const MAX_RESPONSE_PAYLOAD_SIZE: usize =
    MAX_PACKAGE_SIZE - RESPONSE_HEADER_SIZE - 1 - CHECKSUM_SIZE;
