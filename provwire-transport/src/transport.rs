//! Blocking package transport over a provisioning channel.

use crate::argument::{ArgumentRegistry, Format};
use crate::channel::Channel;
use crate::error::TransportError;
use bytes::Bytes;
use provwire_protocol::{
    ByteBuffer, CommandId, DecodeContext, DecodeOutcome, Record, RequestPackage, ResponsePackage,
    Value, MAX_PAYLOAD_SIZE,
};
use std::io::Write;

/// Advances the rolling package counter.
///
/// The wire protocol wraps modulo 255, not 256, so the value 255 is skipped.
/// With no recovery for dropped packages this is a known sequencing
/// fragility; it is preserved bit-exactly for compatibility with deployed
/// targets.
fn next_counter(counter: u8) -> u8 {
    ((u16::from(counter) + 1) % 255) as u8
}

/// One provisioning exchange: slices argument records into bounded packages,
/// performs blocking round-trips with counter and checksum validation, and
/// reassembles the response record stream into the registry.
///
/// A transport owns its counter and decode state and must not be shared
/// between concurrent sessions. Every validation failure is fatal; nothing
/// is retried here.
pub struct Transport {
    command: CommandId,
    counter: u8,
    context: DecodeContext,
    incoming: ByteBuffer,
    last_request: Vec<u8>,
}

impl Transport {
    pub fn new(command: CommandId, start_counter: u8) -> Self {
        Self {
            command,
            counter: start_counter,
            context: DecodeContext::new(),
            incoming: ByteBuffer::new(),
            last_request: Vec::new(),
        }
    }

    /// Counter that the next package will carry.
    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Encodes the listed arguments and transmits them, splitting the record
    /// stream across as many packages as needed. Records may split mid-record
    /// at package boundaries; the peer reassembles from the byte stream.
    ///
    /// Sends at least one package even with no arguments, so bare INIT or
    /// FINISH exchanges still round-trip.
    ///
    /// Returns whether the response stream completed. When it returns
    /// `false`, the peer has more response packages pending; follow up with
    /// [`Transport::receive_arguments`].
    pub fn send_arguments<C: Channel>(
        &mut self,
        channel: &mut C,
        registry: &mut ArgumentRegistry,
        ids: &[u16],
    ) -> Result<bool, TransportError> {
        let mut outgoing = ByteBuffer::new();
        for &id in ids {
            let arg = registry
                .get(id)
                .ok_or(TransportError::UnknownArgument { id })?;
            let record = Record {
                id: arg.id,
                arg_type: arg.arg_type,
                value: arg.value.as_ref(),
                feedback: arg.feedback,
            }
            .encode()?;
            outgoing.put_slice(&record)?;
        }
        tracing::debug!(
            command = ?self.command,
            arguments = ids.len(),
            stream_bytes = outgoing.remaining(),
            "sending argument stream"
        );

        let mut complete;
        loop {
            let chunk = outgoing.take(MAX_PAYLOAD_SIZE);
            complete = self.roundtrip(channel, registry, chunk)?;
            if outgoing.is_empty() {
                break;
            }
        }
        Ok(complete)
    }

    /// Drains a pending multi-package response by sending empty continuation
    /// packages until payload decoding reports completion.
    ///
    /// Blocks for as long as the channel does; timeout policy belongs to the
    /// channel implementation.
    pub fn receive_arguments<C: Channel>(
        &mut self,
        channel: &mut C,
        registry: &mut ArgumentRegistry,
    ) -> Result<(), TransportError> {
        loop {
            if self.roundtrip(channel, registry, Bytes::new())? {
                return Ok(());
            }
        }
    }

    /// Sends the listed arguments and drains the full response stream.
    pub fn exchange<C: Channel>(
        &mut self,
        channel: &mut C,
        registry: &mut ArgumentRegistry,
        ids: &[u16],
    ) -> Result<(), TransportError> {
        if !self.send_arguments(channel, registry, ids)? {
            self.receive_arguments(channel, registry)?;
        }
        Ok(())
    }

    /// One blocking package round-trip: encode, write, read, validate,
    /// decode the response payload. Returns whether the response stream is
    /// complete.
    fn roundtrip<C: Channel>(
        &mut self,
        channel: &mut C,
        registry: &mut ArgumentRegistry,
        payload: Bytes,
    ) -> Result<bool, TransportError> {
        let request = RequestPackage::new(self.command, self.counter, payload);
        let raw = request.encode()?;
        tracing::debug!(
            command = ?self.command,
            counter = self.counter,
            bytes = raw.len(),
            "package out"
        );
        channel.write(&raw)?;
        self.last_request = raw.to_vec();

        let reply = channel.read()?;
        tracing::debug!(bytes = reply.len(), "package in");

        let response = match ResponsePackage::decode(&reply) {
            Ok(response) => response,
            Err(source) => {
                let (request, response) = self.dump(&reply);
                tracing::error!(
                    %source,
                    request = %request,
                    response = %response,
                    "malformed response, aborting"
                );
                return Err(TransportError::MalformedResponse {
                    source,
                    request,
                    response,
                });
            }
        };

        let expected = self.command.response_id();
        if response.command != expected {
            let (request, response_hex) = self.dump(&reply);
            tracing::error!(
                expected,
                actual = response.command,
                request = %request,
                response = %response_hex,
                "command mismatch, aborting"
            );
            return Err(TransportError::CommandMismatch {
                expected,
                actual: response.command,
                request,
                response: response_hex,
            });
        }
        if response.counter != self.counter {
            let (request, response_hex) = self.dump(&reply);
            tracing::error!(
                expected = self.counter,
                actual = response.counter,
                request = %request,
                response = %response_hex,
                "counter mismatch, aborting"
            );
            return Err(TransportError::CounterMismatch {
                expected: self.counter,
                actual: response.counter,
                request,
                response: response_hex,
            });
        }
        if response.error != 0 {
            let (request, response_hex) = self.dump(&reply);
            tracing::error!(
                code = response.error,
                request = %request,
                response = %response_hex,
                "device error, aborting"
            );
            return Err(TransportError::DeviceError {
                code: response.error,
                request,
                response: response_hex,
            });
        }

        self.counter = next_counter(self.counter);
        self.decode_payload(registry, &response.payload)
    }

    /// Feeds a response payload through the persistent decode context,
    /// delivering each completed record to the registry. Returns `true` when
    /// the incoming stream is fully consumed with no record in flight.
    fn decode_payload(
        &mut self,
        registry: &mut ArgumentRegistry,
        payload: &[u8],
    ) -> Result<bool, TransportError> {
        self.incoming.put_slice(payload)?;
        loop {
            match self.context.feed(&mut self.incoming)? {
                DecodeOutcome::NeedMore => break,
                DecodeOutcome::Record(value) => {
                    self.deliver(registry, value)?;
                    self.context.reset();
                }
            }
        }
        Ok(self.incoming.is_empty() && self.context.is_idle())
    }

    /// Stores one decoded record into its registry slot. Path-format binary
    /// values are spilled to a kept temp file; the argument value becomes the
    /// file path.
    fn deliver(
        &mut self,
        registry: &mut ArgumentRegistry,
        value: Option<Value>,
    ) -> Result<(), TransportError> {
        let id = self.context.id;
        let arg = registry
            .get_mut(id)
            .ok_or(TransportError::UnknownArgument { id })?;
        if let Some(actual) = self.context.arg_type {
            if actual != arg.arg_type {
                return Err(TransportError::TypeMismatch {
                    id,
                    expected: arg.arg_type,
                    actual,
                });
            }
        }

        match (arg.format, value) {
            (Format::Path, Some(Value::Binary(data))) => {
                let mut file = tempfile::Builder::new()
                    .prefix(&format!("{}-", arg.name))
                    .tempfile()?;
                file.write_all(&data)?;
                let path = file
                    .into_temp_path()
                    .keep()
                    .map_err(|e| TransportError::Io(e.error))?;
                tracing::debug!(argument = %arg.name, path = %path.display(), bytes = data.len(), "spilled value to file");
                arg.set(Some(Value::Text(path.display().to_string())));
            }
            (_, value) => {
                tracing::debug!(argument = %arg.name, null = value.is_none(), "stored value");
                arg.set(value);
            }
        }
        Ok(())
    }

    fn dump(&self, response: &[u8]) -> (String, String) {
        (hex::encode(&self.last_request), hex::encode(response))
    }
}
