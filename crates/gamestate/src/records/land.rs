//! Typed access to the cash embedded in `Data.LandMessage`.
//!
//! Only `userData.money` is interpreted. The rest of the land record is
//! carried as decoded and re-encoded unchanged.
use prost_reflect::{FieldDescriptor, Kind};

use crate::codec::{Record, read_integer, write_integer};
use crate::error::{CodecError, SchemaError};
use crate::records::currency::integer;
use crate::schema::{MessageType, Schema};

const USER_DATA: &str = "userData";
const MONEY: &str = "money";

/// `userData` and `userData.money` resolved against the loaded schema.
#[derive(Debug, Clone)]
pub struct LandFields {
    user_data: FieldDescriptor,
    money: FieldDescriptor,
}

impl LandFields {
    pub(crate) fn resolve(message_type: &MessageType) -> Result<Self, SchemaError> {
        let user_data = message_type
            .field(USER_DATA)
            .ok_or_else(|| SchemaError::MissingField {
                message: message_type.name().to_string(),
                field: USER_DATA.to_string(),
            })?;

        let user_data_type = match user_data.kind() {
            Kind::Message(descriptor) if !user_data.is_list() && !user_data.is_map() => {
                MessageType::new(descriptor)
            }
            _ => {
                return Err(SchemaError::FieldKind {
                    message: message_type.name().to_string(),
                    field: USER_DATA.to_string(),
                    expected: "a singular message",
                });
            }
        };

        let money = integer(&user_data_type, MONEY)?;
        Ok(Self { user_data, money })
    }
}

/// A player's land/world record.
#[derive(Debug, Clone, PartialEq)]
pub struct LandRecord {
    record: Record,
}

impl LandRecord {
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// Current cash. An absent `userData` or `money` reads as zero.
    pub fn cash(&self, schema: &Schema) -> Result<i64, CodecError> {
        let fields = schema.land_fields();
        if !self.record.has(&fields.user_data) {
            return Ok(0);
        }

        let user_data = self.record.message().get_field(&fields.user_data);
        match user_data.as_message() {
            Some(user) => read_integer(user, &fields.money),
            None => Err(user_data_kind(&self.record)),
        }
    }

    /// Set `userData.money`, creating an empty `userData` when absent.
    pub fn set_cash(&mut self, schema: &Schema, value: i64) -> Result<(), CodecError> {
        let fields = schema.land_fields();
        let type_name = self.record.type_name();

        let slot = self.record.message_mut().get_field_mut(&fields.user_data);
        match slot.as_message_mut() {
            Some(user) => write_integer(user, &fields.money, value),
            None => Err(CodecError::FieldKind {
                message_type: type_name,
                field: USER_DATA.to_string(),
                expected: "a message",
            }),
        }
    }
}

fn user_data_kind(record: &Record) -> CodecError {
    CodecError::FieldKind {
        message_type: record.type_name(),
        field: USER_DATA.to_string(),
        expected: "a message",
    }
}
