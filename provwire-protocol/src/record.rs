//! Argument record encoding and the resumable decode state machine.
//!
//! Record layout (2-byte flags + optional size field + optional value):
//!
//! ```text
//! +-----------------+-------------------+---------------------+
//! | flags           | [size]            | [value]             |
//! | 2 bytes BE      | 0/1/2/4 bytes BE  | per type            |
//! +-----------------+-------------------+---------------------+
//! ```
//!
//! Flags bit layout (big-endian u16):
//!
//! ```text
//! | 15..12 | 11..10   | 9        | 8..0 |
//! | type   | size_len | feedback | id   |
//! ```
//!
//! A `size_len` of zero marks a null record: flags only, no size field, no
//! value bytes. The explicit size field is present only for non-null BINARY
//! records; integer value widths are implied by the type code. The encoding
//! is self-delimiting, so a decoder fed one byte at a time can always find
//! record boundaries.

use crate::buffer::ByteBuffer;
use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};

/// Mask for the 9-bit argument id namespace.
pub const ID_MASK: u16 = 0x01FF;

/// Id bit distinguishing custom ids from the well-known (reserved) range.
pub const CUSTOM_ID_BIT: u16 = 0x0100;

/// Flag bit requesting the peer echo back the stored value.
pub const FEEDBACK_BIT: u16 = 0x0200;

/// Mask and shift for the 2-bit size-length code.
pub const SIZE_MASK: u16 = 0x0C00;
pub const SIZE_SHIFT: u16 = 10;

/// Mask and shift for the 4-bit type code.
pub const TYPE_MASK: u16 = 0xF000;
pub const TYPE_SHIFT: u16 = 12;

/// Argument wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArgType {
    /// 8-bit unsigned integer.
    Int8u = 1,
    /// 16-bit unsigned integer, big-endian.
    Int16u = 2,
    /// 32-bit unsigned integer, big-endian.
    Int32u = 3,
    /// Variable-length binary (UTF-8 text is sent as its raw bytes).
    Binary = 4,
}

impl TryFrom<u8> for ArgType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ArgType::Int8u),
            2 => Ok(ArgType::Int16u),
            3 => Ok(ArgType::Int32u),
            4 => Ok(ArgType::Binary),
            _ => Err(ProtocolError::UnsupportedType(value)),
        }
    }
}

impl ArgType {
    /// Fixed value width in bytes, or `None` for variable-length types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            ArgType::Int8u => Some(1),
            ArgType::Int16u => Some(2),
            ArgType::Int32u => Some(4),
            ArgType::Binary => None,
        }
    }
}

/// An argument value in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    Binary(Bytes),
    Text(String),
}

/// Returns the size-length code for a value of `len` bytes.
///
/// 0 marks a null (empty) value; codes 1 and 2 select 1- and 2-byte size
/// fields; code 3 selects a 4-byte size field.
pub fn size_length(len: usize) -> u8 {
    if len == 0 {
        0
    } else if len < 0xFF {
        1
    } else if len < 0xFFFF {
        2
    } else {
        3
    }
}

/// Width in bytes of the explicit size field for a size-length code.
pub fn size_field_width(code: u8) -> usize {
    match code {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 4,
    }
}

/// One argument record to be encoded.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub id: u16,
    pub arg_type: ArgType,
    pub value: Option<&'a Value>,
    pub feedback: bool,
}

impl Record<'_> {
    /// Encodes the record into bytes.
    ///
    /// A `None` value encodes as a null record (flags only). The value kind
    /// must match the declared type; anything else is a contract violation.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        if self.id & !ID_MASK != 0 {
            return Err(ProtocolError::IdOutOfRange(self.id));
        }

        // Explicit Option branching: a zero-valued integer is a real value,
        // never null.
        let data = match (self.arg_type, self.value) {
            (_, None) => Bytes::new(),
            (ArgType::Int8u, Some(Value::U8(v))) => Bytes::copy_from_slice(&[*v]),
            (ArgType::Int16u, Some(Value::U16(v))) => Bytes::copy_from_slice(&v.to_be_bytes()),
            (ArgType::Int32u, Some(Value::U32(v))) => Bytes::copy_from_slice(&v.to_be_bytes()),
            (ArgType::Binary, Some(Value::Binary(b))) => b.clone(),
            (ArgType::Binary, Some(Value::Text(s))) => Bytes::copy_from_slice(s.as_bytes()),
            (arg_type, Some(_)) => return Err(ProtocolError::ValueKindMismatch { arg_type }),
        };

        if data.len() > u32::MAX as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: data.len(),
                max: u32::MAX as usize,
            });
        }

        let size_len = size_length(data.len());
        let mut flags = (self.id & ID_MASK)
            | (u16::from(size_len) << SIZE_SHIFT)
            | (u16::from(self.arg_type as u8) << TYPE_SHIFT);
        if self.feedback {
            flags |= FEEDBACK_BIT;
        }

        let mut buf = BytesMut::with_capacity(2 + 4 + data.len());
        buf.put_u16(flags);

        // Integer widths are implied by the type; only binary carries an
        // explicit size field, and only when non-null.
        if self.arg_type == ArgType::Binary && !data.is_empty() {
            buf.put_uint(data.len() as u64, size_field_width(size_len));
        }
        if !data.is_empty() {
            buf.put_slice(&data);
        }
        Ok(buf)
    }
}

/// Decode state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Waiting for the 2-byte flags word.
    Flags,
    /// Waiting for the size field (binary) or deriving the fixed size.
    Size,
    /// Waiting for the value bytes.
    Data,
    /// Record complete.
    Ready,
}

/// Outcome of one `DecodeContext::feed` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// More input is needed to complete the current record.
    NeedMore,
    /// A record completed; `None` is a null record.
    Record(Option<Value>),
}

/// Mutable decode state carried across fragment boundaries.
///
/// The context consumes bytes from the caller's buffer only once a state's
/// byte requirement is met, so input may arrive in arbitrary fragments.
/// Callers must `reset()` between records; feeding a completed context is a
/// corruption error.
#[derive(Debug, Default)]
pub struct DecodeContext {
    state: DecodeState,
    pub id: u16,
    pub arg_type: Option<ArgType>,
    pub size_len: u8,
    pub data_size: usize,
    pub is_null: bool,
    pub is_binary: bool,
    pub is_known: bool,
    pub feedback: bool,
    pub value: Option<Value>,
}

impl Default for DecodeState {
    fn default() -> Self {
        DecodeState::Flags
    }
}

impl DecodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all accumulated state ahead of the next record.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// True when no bytes of a record have been consumed yet.
    pub fn is_idle(&self) -> bool {
        self.state == DecodeState::Flags
    }

    pub fn is_complete(&self) -> bool {
        self.state == DecodeState::Ready
    }

    fn current_type(&self) -> Result<ArgType, ProtocolError> {
        self.arg_type
            .ok_or(ProtocolError::CorruptRecord("type consumed before flags"))
    }

    /// Advances the state machine with whatever bytes `input` holds.
    ///
    /// Consumes only the bytes each state requires; partial state bytes stay
    /// in `input` until enough arrive. Returns `Record` exactly once per
    /// record, when `Ready` is reached.
    pub fn feed(&mut self, input: &mut ByteBuffer) -> Result<DecodeOutcome, ProtocolError> {
        loop {
            match self.state {
                DecodeState::Flags => {
                    if input.remaining() < 2 {
                        return Ok(DecodeOutcome::NeedMore);
                    }
                    let flags = input.get_u16()?;
                    self.id = flags & ID_MASK;
                    self.feedback = flags & FEEDBACK_BIT != 0;
                    self.size_len = ((flags & SIZE_MASK) >> SIZE_SHIFT) as u8;
                    let arg_type = ArgType::try_from(((flags & TYPE_MASK) >> TYPE_SHIFT) as u8)?;
                    self.arg_type = Some(arg_type);
                    self.is_binary = arg_type == ArgType::Binary;
                    self.is_known = self.id & CUSTOM_ID_BIT == 0;
                    self.is_null = self.size_len == 0;
                    if self.is_null {
                        self.value = None;
                        self.state = DecodeState::Ready;
                        return Ok(DecodeOutcome::Record(None));
                    }
                    self.state = DecodeState::Size;
                }
                DecodeState::Size => {
                    let arg_type = self.current_type()?;
                    match arg_type.fixed_size() {
                        Some(size) => self.data_size = size,
                        None => {
                            let width = size_field_width(self.size_len);
                            if input.remaining() < width {
                                return Ok(DecodeOutcome::NeedMore);
                            }
                            self.data_size = input.get_uint(width)? as usize;
                        }
                    }
                    self.state = DecodeState::Data;
                }
                DecodeState::Data => {
                    if self.is_null || self.data_size == 0 {
                        return Err(ProtocolError::CorruptRecord(
                            "value bytes expected for a null or empty record",
                        ));
                    }
                    if input.remaining() < self.data_size {
                        return Ok(DecodeOutcome::NeedMore);
                    }
                    let value = match self.current_type()? {
                        ArgType::Int8u => Value::U8(input.get_u8()?),
                        ArgType::Int16u => Value::U16(input.get_u16()?),
                        ArgType::Int32u => Value::U32(input.get_u32()?),
                        ArgType::Binary => Value::Binary(input.get_bytes(self.data_size)?),
                    };
                    self.value = Some(value.clone());
                    self.state = DecodeState::Ready;
                    return Ok(DecodeOutcome::Record(Some(value)));
                }
                DecodeState::Ready => {
                    return Err(ProtocolError::CorruptRecord(
                        "decode driven past a completed record without reset",
                    ));
                }
            }
        }
    }
}
