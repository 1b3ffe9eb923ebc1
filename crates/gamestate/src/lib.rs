//! Per-player binary save-game store.
//!
//! Each player owns a currency ledger (`<id>.currency`) and a land/world
//! record (`<id>.land`), both protobuf blobs described by an external
//! `.proto` schema. This crate loads that schema once, decodes and rewrites
//! the two records under per-entity locks, and exposes the combined currency
//! view through [`GameStateGateway`].
//!
//! Modules are organized by responsibility:
//! - [`schema`] loads and validates the message definitions
//! - [`entity`] validates identifiers and maps them to file paths
//! - [`codec`] and [`records`] turn bytes into typed records and back
//! - [`store`] persists single record files atomically
//! - [`services`] hold the currency and cash rules
//! - [`gateway`] is the surface the routing layer calls
pub mod clock;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod records;
pub mod schema;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{Record, RecordCodec};
pub use config::StoreConfig;
pub use entity::{EntityId, EntityPathResolver, EntityPaths, RecordKind};
pub use error::{CodecError, ConfigError, ErrorKind, Result, SchemaError, StoreError};
pub use gateway::{CurrencyUpdate, GameStateGateway, GatewayBuilder, UpdateReport, UpdateResult};
pub use records::{CurrencyRecord, LandRecord, LedgerPolicy};
pub use schema::{CURRENCY_MESSAGE, LAND_MESSAGE, MessageType, Schema, SchemaRegistry};
pub use services::{CurrencyService, CurrencyView, LandCashService, StoreContext};
pub use store::{EntityLocks, FileStateStore, StateStore};
