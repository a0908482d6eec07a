//! Channel abstraction over the physical transport.

use std::io;

/// A synchronous, half-duplex byte channel to a provisioning target.
///
/// Implementations may sit on serial, SPI, TCP, or a test double; the
/// transport only relies on the blocking request/response contract: one
/// `write` of a full package, then one `read` returning one full response.
/// Timeout and retry policy, if any, belong to the implementation — a `read`
/// that blocks forever blocks the session.
pub trait Channel {
    /// Opens the channel.
    fn open(&mut self) -> io::Result<()>;

    /// Closes the channel.
    fn close(&mut self) -> io::Result<()>;

    /// Writes one complete package.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Reads one complete response package.
    fn read(&mut self) -> io::Result<Vec<u8>>;
}
