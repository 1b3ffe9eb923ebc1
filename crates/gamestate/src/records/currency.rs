//! Typed view over `Data.CurrencyData`.
use std::fmt;
use std::str::FromStr;

use prost_reflect::{FieldDescriptor, Kind};
use serde::{Deserialize, Serialize};

use crate::codec::{Record, is_scalar_integer};
use crate::error::{CodecError, SchemaError};
use crate::schema::{MessageType, Schema};

const ID: &str = "id";
const BALANCE: &str = "vcBalance";
const TOTAL_PURCHASED: &str = "vcTotalPurchased";
const TOTAL_AWARDED: &str = "vcTotalAwarded";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

/// Ledger fields resolved against the loaded schema.
#[derive(Debug, Clone)]
pub struct CurrencyFields {
    id: FieldDescriptor,
    balance: FieldDescriptor,
    total_purchased: FieldDescriptor,
    total_awarded: FieldDescriptor,
    created_at: FieldDescriptor,
    updated_at: FieldDescriptor,
}

impl CurrencyFields {
    pub(crate) fn resolve(message_type: &MessageType) -> Result<Self, SchemaError> {
        let id = required(message_type, ID)?;
        if id.is_list() || id.kind() != Kind::String {
            return Err(SchemaError::FieldKind {
                message: message_type.name().to_string(),
                field: ID.to_string(),
                expected: "a string",
            });
        }

        Ok(Self {
            id,
            balance: integer(message_type, BALANCE)?,
            total_purchased: integer(message_type, TOTAL_PURCHASED)?,
            total_awarded: integer(message_type, TOTAL_AWARDED)?,
            created_at: integer(message_type, CREATED_AT)?,
            updated_at: integer(message_type, UPDATED_AT)?,
        })
    }
}

fn required(message_type: &MessageType, name: &str) -> Result<FieldDescriptor, SchemaError> {
    message_type
        .field(name)
        .ok_or_else(|| SchemaError::MissingField {
            message: message_type.name().to_string(),
            field: name.to_string(),
        })
}

pub(crate) fn integer(message_type: &MessageType, name: &str) -> Result<FieldDescriptor, SchemaError> {
    let field = required(message_type, name)?;
    if !is_scalar_integer(&field) {
        return Err(SchemaError::FieldKind {
            message: message_type.name().to_string(),
            field: name.to_string(),
            expected: "an integer",
        });
    }
    Ok(field)
}

/// A player's premium-currency ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRecord {
    pub id: String,
    pub balance: i64,
    pub total_purchased: i64,
    pub total_awarded: i64,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Milliseconds since the Unix epoch.
    pub updated_at: i64,
}

impl CurrencyRecord {
    pub fn from_record(record: &Record, schema: &Schema) -> Result<Self, CodecError> {
        let fields = schema.currency_fields();
        Ok(Self {
            id: record.get_string(&fields.id)?,
            balance: record.get_i64(&fields.balance)?,
            total_purchased: record.get_i64(&fields.total_purchased)?,
            total_awarded: record.get_i64(&fields.total_awarded)?,
            created_at: record.get_i64(&fields.created_at)?,
            updated_at: record.get_i64(&fields.updated_at)?,
        })
    }

    /// Build a fresh `CurrencyData` record holding every ledger field.
    pub fn to_record(&self, schema: &Schema) -> Result<Record, CodecError> {
        let fields = schema.currency_fields();
        let mut record = Record::new(schema.currency());
        record.set_string(&fields.id, &self.id)?;
        record.set_i64(&fields.total_purchased, self.total_purchased)?;
        record.set_i64(&fields.created_at, self.created_at)?;
        self.write_ledger(&mut record, schema)?;
        Ok(record)
    }

    /// Write the mutable ledger fields (`balance`, `totalAwarded`,
    /// `updatedAt`) into an existing record. Everything else in `record` is
    /// left as decoded.
    pub fn write_ledger(&self, record: &mut Record, schema: &Schema) -> Result<(), CodecError> {
        let fields = schema.currency_fields();
        record.set_i64(&fields.balance, self.balance)?;
        record.set_i64(&fields.total_awarded, self.total_awarded)?;
        record.set_i64(&fields.updated_at, self.updated_at)?;
        Ok(())
    }
}

/// How an absolute donut balance is folded into the ledger.
///
/// The admin surface historically treated "set donuts" as "set balance and
/// awarded total to the same value", which loses the award history. That is
/// still the default; the other variants are opt-in.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerPolicy {
    /// `balance = totalAwarded = new`.
    #[default]
    OverwriteBalanceAndAwarded,
    /// `balance = new`, awarded total untouched.
    OverwriteBalanceOnly,
    /// `balance = new`; any increase over the old balance counts as awarded.
    AwardDifference,
}

impl LedgerPolicy {
    /// Compute the ledger after setting the balance to `new_balance` at `now_ms`.
    ///
    /// `id`, `total_purchased` and `created_at` never change.
    pub fn apply(self, current: &CurrencyRecord, new_balance: i64, now_ms: i64) -> CurrencyRecord {
        let total_awarded = match self {
            LedgerPolicy::OverwriteBalanceAndAwarded => new_balance,
            LedgerPolicy::OverwriteBalanceOnly => current.total_awarded,
            LedgerPolicy::AwardDifference => {
                let granted = new_balance.saturating_sub(current.balance).max(0);
                current.total_awarded.saturating_add(granted)
            }
        };

        CurrencyRecord {
            balance: new_balance,
            total_awarded,
            updated_at: now_ms,
            ..current.clone()
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LedgerPolicy::OverwriteBalanceAndAwarded => "overwrite-balance-and-awarded",
            LedgerPolicy::OverwriteBalanceOnly => "overwrite-balance-only",
            LedgerPolicy::AwardDifference => "award-difference",
        }
    }
}

impl fmt::Display for LedgerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "overwrite-balance-and-awarded" => Ok(LedgerPolicy::OverwriteBalanceAndAwarded),
            "overwrite-balance-only" => Ok(LedgerPolicy::OverwriteBalanceOnly),
            "award-difference" => Ok(LedgerPolicy::AwardDifference),
            other => Err(format!("unknown ledger policy '{}'", other)),
        }
    }
}
