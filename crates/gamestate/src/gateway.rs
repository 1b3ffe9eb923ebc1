//! External-facing facade over the currency and land services.
//!
//! The routing layer hands in a raw entity id plus an already parsed
//! [`CurrencyUpdate`] and gets back plain structs. The sync methods do the
//! file work on the calling thread; the async ones move it onto tokio's
//! blocking pool.
//!
//! # Partial updates
//!
//! Donuts and cash live in two independent files. An update that names both
//! applies each half on its own: a missing land file does not stop the
//! donuts half, and nothing is rolled back. A crash between the two writes
//! leaves one file updated and the other not; that state is valid.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::entity::{EntityId, EntityPathResolver};
use crate::error::{Result, StoreError};
use crate::schema::SchemaRegistry;
use crate::services::{CurrencyService, CurrencyView, LandCashService, StoreContext};
use crate::store::{FileStateStore, StateStore};

/// Requested changes. At least one field must be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyUpdate {
    #[serde(default)]
    pub donuts: Option<i64>,
    #[serde(default)]
    pub cash: Option<i64>,
}

impl CurrencyUpdate {
    pub fn donuts(value: i64) -> Self {
        Self {
            donuts: Some(value),
            cash: None,
        }
    }

    pub fn cash(value: i64) -> Self {
        Self {
            donuts: None,
            cash: Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.donuts.is_none() && self.cash.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        Ok(())
    }
}

/// Values that were actually written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donuts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<i64>,
}

/// Per-field outcome of [`GameStateGateway::apply_update`].
///
/// `None` means the field was not requested.
#[derive(Debug)]
pub struct UpdateReport {
    pub donuts: Option<Result<i64>>,
    pub cash: Option<Result<i64>>,
}

impl UpdateReport {
    /// Every requested field was written.
    pub fn is_complete(&self) -> bool {
        [&self.donuts, &self.cash]
            .into_iter()
            .flatten()
            .all(|outcome| outcome.is_ok())
    }

    /// The fields that were written, ignoring failures.
    pub fn applied(&self) -> UpdateResult {
        UpdateResult {
            donuts: self.donuts.as_ref().and_then(|r| r.as_ref().ok().copied()),
            cash: self.cash.as_ref().and_then(|r| r.as_ref().ok().copied()),
        }
    }

    /// Collapse to a single result: the first failure (donuts before cash),
    /// otherwise everything that was written.
    pub fn into_result(self) -> Result<UpdateResult> {
        let applied = self.applied();
        if let Some(Err(e)) = self.donuts {
            return Err(e);
        }
        if let Some(Err(e)) = self.cash {
            return Err(e);
        }
        Ok(applied)
    }
}

/// Entry point used by the routing layer.
#[derive(Clone)]
pub struct GameStateGateway {
    schema: Arc<SchemaRegistry>,
    currency: CurrencyService,
    land: LandCashService,
}

impl GameStateGateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub fn new(currency: CurrencyService, land: LandCashService) -> Self {
        Self {
            schema: Arc::clone(currency.schema()),
            currency,
            land,
        }
    }

    pub fn currency(&self) -> &CurrencyService {
        &self.currency
    }

    pub fn land(&self) -> &LandCashService {
        &self.land
    }

    /// Combined donuts + cash view.
    pub fn get_combined_view(&self, entity_id: &str) -> Result<CurrencyView> {
        let id = EntityId::parse(entity_id)?;
        self.currency.get_currency(&id)
    }

    /// Apply each requested field independently and report every outcome.
    ///
    /// Returns `Err` only when the request is invalid or the schema cannot be
    /// loaded; per-field failures are carried in the report.
    pub fn apply_update(&self, entity_id: &str, update: CurrencyUpdate) -> Result<UpdateReport> {
        let id = EntityId::parse(entity_id)?;
        update.validate()?;
        self.schema.load()?;

        let donuts = update
            .donuts
            .map(|value| self.currency.set_donuts(&id, value).map(|ledger| ledger.balance));
        let cash = update.cash.map(|value| self.land.set_cash(&id, value));

        let report = UpdateReport { donuts, cash };
        if let Some(Err(e)) = &report.donuts {
            tracing::warn!("Donuts update for {} failed: {}", id, e);
        }
        if let Some(Err(e)) = &report.cash {
            tracing::warn!("Cash update for {} failed: {}", id, e);
        }

        Ok(report)
    }

    /// `GetCurrencyView` for async callers.
    pub async fn get_currency_view(&self, entity_id: &str) -> Result<CurrencyView> {
        let gateway = self.clone();
        let entity_id = entity_id.to_string();
        tokio::task::spawn_blocking(move || gateway.get_combined_view(&entity_id))
            .await
            .map_err(StoreError::TaskJoin)?
    }

    /// [`GameStateGateway::apply_update`] for async callers.
    pub async fn update_currency_report(
        &self,
        entity_id: &str,
        update: CurrencyUpdate,
    ) -> Result<UpdateReport> {
        let gateway = self.clone();
        let entity_id = entity_id.to_string();
        tokio::task::spawn_blocking(move || gateway.apply_update(&entity_id, update))
            .await
            .map_err(StoreError::TaskJoin)?
    }

    /// `UpdateCurrencyView` for async callers.
    ///
    /// On a partial failure this returns the error even though the other
    /// field may already be written. Use
    /// [`GameStateGateway::update_currency_report`] to see both outcomes.
    pub async fn update_currency_view(
        &self,
        entity_id: &str,
        update: CurrencyUpdate,
    ) -> Result<UpdateResult> {
        self.update_currency_report(entity_id, update)
            .await?
            .into_result()
    }
}

/// Builder for [`GameStateGateway`].
pub struct GatewayBuilder {
    config: StoreConfig,
    schema: Option<Arc<SchemaRegistry>>,
    store: Option<Arc<dyn StateStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl GatewayBuilder {
    fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            schema: None,
            store: None,
            clock: None,
        }
    }

    /// Override configuration
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing registry instead of creating one from the config.
    pub fn schema(mut self, schema: Arc<SchemaRegistry>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Replace the file store (default: [`FileStateStore`]).
    pub fn store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Replace the wall clock used for `updatedAt`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Assemble the services and load the schema. Fails if the schema cannot
    /// be loaded.
    pub fn build(self) -> Result<GameStateGateway> {
        let schema = self
            .schema
            .unwrap_or_else(|| Arc::new(SchemaRegistry::new(&self.config.schema_path)));
        schema.load()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileStateStore::new()));
        let ctx = StoreContext::new(
            Arc::clone(&schema),
            EntityPathResolver::new(&self.config.data_dir),
            store,
        );

        let land = LandCashService::new(ctx.clone());
        let mut currency =
            CurrencyService::new(ctx, land.clone()).with_policy(self.config.ledger_policy);
        if let Some(clock) = self.clock {
            currency = currency.with_clock(clock);
        }

        tracing::info!(
            "Game-state gateway ready: data_dir={}, policy={}",
            self.config.data_dir.display(),
            self.config.ledger_policy
        );

        Ok(GameStateGateway {
            schema,
            currency,
            land,
        })
    }
}
