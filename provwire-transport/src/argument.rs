//! Provisioning arguments and their registry.

use provwire_protocol::record::CUSTOM_ID_BIT;
use provwire_protocol::{ArgType, Value};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Presentation format of an argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Decimal integer.
    #[default]
    Decimal,
    /// Hexadecimal integer or byte string.
    Hex,
    /// UTF-8 text.
    Text,
    /// Large opaque payload spilled to a file; the argument value holds the
    /// file path, not the bytes.
    Path,
}

/// A named, typed value sent to or read from a provisioning target.
#[derive(Debug, Clone)]
pub struct Argument {
    pub id: u16,
    pub name: String,
    pub arg_type: ArgType,
    pub format: Format,
    pub value: Option<Value>,
    /// Supplied by the operator rather than derived or read back.
    pub is_user_input: bool,
    /// Ask the peer to echo back the value it stored.
    pub feedback: bool,
}

impl Argument {
    pub fn new(id: u16, name: impl Into<String>, arg_type: ArgType) -> Self {
        Self {
            id,
            name: name.into(),
            arg_type,
            format: Format::default(),
            value: None,
            is_user_input: false,
            feedback: false,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_feedback(mut self) -> Self {
        self.feedback = true;
        self
    }

    pub fn user_input(mut self) -> Self {
        self.is_user_input = true;
        self
    }

    /// Stores a decoded (or cleared) value.
    pub fn set(&mut self, value: Option<Value>) {
        self.value = value;
    }

    /// Whether the id falls in the reserved well-known range.
    pub fn is_well_known(&self) -> bool {
        self.id & CUSTOM_ID_BIT == 0
    }
}

/// Ordered registry of arguments keyed by id.
#[derive(Debug, Default)]
pub struct ArgumentRegistry {
    args: BTreeMap<u16, Argument>,
}

impl ArgumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an argument, replacing any previous entry with the same id.
    pub fn register(&mut self, arg: Argument) -> Option<Argument> {
        self.args.insert(arg.id, arg)
    }

    pub fn get(&self, id: u16) -> Option<&Argument> {
        self.args.get(&id)
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut Argument> {
        self.args.get_mut(&id)
    }

    pub fn iter(&self) -> btree_map::Values<'_, u16, Argument> {
        self.args.values()
    }

    /// Ids of operator-supplied arguments that currently hold a value, in id
    /// order.
    pub fn user_input_ids(&self) -> Vec<u16> {
        self.args
            .values()
            .filter(|a| a.is_user_input && a.value.is_some())
            .map(|a| a.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_argument_builder() {
        let arg = Argument::new(0x0010, "serial_number", ArgType::Binary)
            .with_format(Format::Hex)
            .with_value(Value::Binary(Bytes::from_static(b"\x01\x02")))
            .with_feedback()
            .user_input();

        assert_eq!(arg.id, 0x0010);
        assert_eq!(arg.name, "serial_number");
        assert_eq!(arg.format, Format::Hex);
        assert!(arg.feedback);
        assert!(arg.is_user_input);
        assert!(arg.is_well_known());
    }

    #[test]
    fn test_custom_id_range() {
        let arg = Argument::new(0x0142, "vendor_blob", ArgType::Binary);
        assert!(!arg.is_well_known());
    }

    #[test]
    fn test_registry_lookup_and_set() {
        let mut registry = ArgumentRegistry::new();
        registry.register(Argument::new(1, "a", ArgType::Int8u));
        registry.register(Argument::new(2, "b", ArgType::Int32u));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(3).is_none());

        registry.get_mut(2).unwrap().set(Some(Value::U32(9)));
        assert_eq!(registry.get(2).unwrap().value, Some(Value::U32(9)));

        registry.get_mut(2).unwrap().set(None);
        assert_eq!(registry.get(2).unwrap().value, None);
    }

    #[test]
    fn test_user_input_ids() {
        let mut registry = ArgumentRegistry::new();
        registry.register(
            Argument::new(5, "later", ArgType::Int8u)
                .user_input()
                .with_value(Value::U8(1)),
        );
        registry.register(Argument::new(2, "unset", ArgType::Int8u).user_input());
        registry.register(Argument::new(1, "derived", ArgType::Int8u).with_value(Value::U8(0)));

        assert_eq!(registry.user_input_ids(), vec![5]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ArgumentRegistry::new();
        registry.register(Argument::new(1, "old", ArgType::Int8u));
        let previous = registry.register(Argument::new(1, "new", ArgType::Int8u));
        assert_eq!(previous.unwrap().name, "old");
        assert_eq!(registry.get(1).unwrap().name, "new");
    }
}
