//! Store configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::records::LedgerPolicy;

/// Where save files and the schema live, and how ledgers are rewritten.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub schema_path: PathBuf,
    pub ledger_policy: LedgerPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            schema_path: PathBuf::from("TappedOut.proto"),
            ledger_policy: LedgerPolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>, schema_path: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            schema_path: schema_path.into(),
            ledger_policy: LedgerPolicy::default(),
        }
    }

    pub fn with_ledger_policy(mut self, policy: LedgerPolicy) -> Self {
        self.ledger_policy = policy;
        self
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `DATA_DIRECTORY` - Root of the per-player save directories (default: `data`)
    /// - `SCHEMA_PATH` - `.proto` file or descriptor set (default: `TappedOut.proto`)
    /// - `LEDGER_POLICY` - How `set donuts` updates the ledger
    ///   (default: `overwrite-balance-and-awarded`)
    ///
    /// Fails on an unrecognized `LEDGER_POLICY` rather than guessing one.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = non_empty(lookup("DATA_DIRECTORY")) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(path) = non_empty(lookup("SCHEMA_PATH")) {
            config.schema_path = PathBuf::from(path);
        }

        if let Some(raw) = non_empty(lookup("LEDGER_POLICY")) {
            config.ledger_policy =
                raw.parse::<LedgerPolicy>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        key: "LEDGER_POLICY",
                        value: raw.clone(),
                        reason,
                    })?;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
