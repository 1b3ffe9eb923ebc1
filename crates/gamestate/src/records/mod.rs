//! Typed views over the two save-game records.

pub mod currency;
pub mod land;

pub use currency::{CurrencyFields, CurrencyRecord, LedgerPolicy};
pub use land::{LandFields, LandRecord};
