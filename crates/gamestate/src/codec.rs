//! Byte-level encoding of save-game records.
//!
//! Records are dynamic protobuf messages: the schema decides the layout,
//! and fields the store never touches (including ones unknown to the loaded
//! schema) ride along untouched through a decode/encode cycle.
use prost::Message;
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, ReflectMessage, Value};

use crate::error::CodecError;
use crate::schema::MessageType;

/// A decoded save-game record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    message: DynamicMessage,
}

impl Record {
    /// Empty record of the given type.
    pub fn new(message_type: &MessageType) -> Self {
        Self {
            message: DynamicMessage::new(message_type.descriptor().clone()),
        }
    }

    pub fn from_message(message: DynamicMessage) -> Self {
        Self { message }
    }

    pub fn type_name(&self) -> String {
        self.message.descriptor().full_name().to_string()
    }

    pub fn is_type(&self, message_type: &MessageType) -> bool {
        self.message.descriptor() == *message_type.descriptor()
    }

    pub fn message(&self) -> &DynamicMessage {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut DynamicMessage {
        &mut self.message
    }

    pub fn into_message(self) -> DynamicMessage {
        self.message
    }

    pub fn has(&self, field: &FieldDescriptor) -> bool {
        self.message.has_field(field)
    }

    pub fn clear(&mut self, field: &FieldDescriptor) {
        self.message.clear_field(field);
    }

    pub fn get_i64(&self, field: &FieldDescriptor) -> Result<i64, CodecError> {
        read_integer(&self.message, field)
    }

    pub fn set_i64(&mut self, field: &FieldDescriptor, value: i64) -> Result<(), CodecError> {
        write_integer(&mut self.message, field, value)
    }

    pub fn get_string(&self, field: &FieldDescriptor) -> Result<String, CodecError> {
        match self.message.get_field(field).as_str() {
            Some(s) => Ok(s.to_string()),
            None => Err(field_kind(&self.message, field, "a string")),
        }
    }

    pub fn set_string(&mut self, field: &FieldDescriptor, value: &str) -> Result<(), CodecError> {
        if self
            .message
            .try_set_field(field, Value::String(value.to_string()))
            .is_err()
        {
            return Err(field_kind(&self.message, field, "a string"));
        }
        Ok(())
    }
}

/// Encodes and decodes records for a schema-defined message type.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordCodec;

impl RecordCodec {
    pub fn decode(&self, bytes: &[u8], message_type: &MessageType) -> Result<Record, CodecError> {
        DynamicMessage::decode(message_type.descriptor().clone(), bytes)
            .map(Record::from_message)
            .map_err(|source| CodecError::Decode {
                message_type: message_type.name().to_string(),
                source,
            })
    }

    pub fn encode(&self, record: &Record, message_type: &MessageType) -> Result<Vec<u8>, CodecError> {
        if !record.is_type(message_type) {
            return Err(CodecError::MessageTypeMismatch {
                expected: message_type.name().to_string(),
                actual: record.type_name(),
            });
        }
        Ok(record.message.encode_to_vec())
    }
}

/// Whether a field holds a single protobuf integer of any width.
pub(crate) fn is_scalar_integer(field: &FieldDescriptor) -> bool {
    !field.is_list()
        && matches!(
            field.kind(),
            Kind::Int32
                | Kind::Int64
                | Kind::Uint32
                | Kind::Uint64
                | Kind::Sint32
                | Kind::Sint64
                | Kind::Fixed32
                | Kind::Fixed64
                | Kind::Sfixed32
                | Kind::Sfixed64
        )
}

pub(crate) fn read_integer(
    message: &DynamicMessage,
    field: &FieldDescriptor,
) -> Result<i64, CodecError> {
    let value = message.get_field(field);
    let widened = match &*value {
        Value::I32(v) => Some(i64::from(*v)),
        Value::I64(v) => Some(*v),
        Value::U32(v) => Some(i64::from(*v)),
        Value::U64(v) => i64::try_from(*v).ok(),
        _ => None,
    };
    widened.ok_or_else(|| field_kind(message, field, "an integer representable as i64"))
}

pub(crate) fn write_integer(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: i64,
) -> Result<(), CodecError> {
    let out_of_range = || CodecError::OutOfRange {
        field: field.full_name().to_string(),
        value,
    };

    let narrowed = match field.kind() {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            Value::I32(i32::try_from(value).map_err(|_| out_of_range())?)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(value),
        Kind::Uint32 | Kind::Fixed32 => {
            Value::U32(u32::try_from(value).map_err(|_| out_of_range())?)
        }
        Kind::Uint64 | Kind::Fixed64 => {
            Value::U64(u64::try_from(value).map_err(|_| out_of_range())?)
        }
        _ => return Err(field_kind(message, field, "an integer")),
    };

    if message.try_set_field(field, narrowed).is_err() {
        return Err(field_kind(message, field, "an integer"));
    }
    Ok(())
}

fn field_kind(message: &DynamicMessage, field: &FieldDescriptor, expected: &'static str) -> CodecError {
    CodecError::FieldKind {
        message_type: message.descriptor().full_name().to_string(),
        field: field.name().to_string(),
        expected,
    }
}
