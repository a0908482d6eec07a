//! # provwire-transport
//!
//! Package-level transport for provisioning secure elements.
//!
//! This crate provides:
//! - A synchronous half-duplex channel abstraction
//! - An argument registry holding typed provisioning arguments
//! - A blocking session that slices argument records into bounded packages,
//!   drives the counter handshake, and reassembles responses

pub mod argument;
pub mod channel;
pub mod error;
pub mod transport;

pub use argument::{Argument, ArgumentRegistry, Format};
pub use channel::Channel;
pub use error::TransportError;
pub use transport::Transport;
