use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::entity::{EntityId, RecordKind};
use crate::error::Result;
use crate::records::{CurrencyRecord, LedgerPolicy};
use crate::schema::SchemaRegistry;
use crate::services::{LandCashService, StoreContext};

/// Combined donuts + cash view of one player.
///
/// Serializes to the JSON shape the game's admin surface has always used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyView {
    pub id: String,
    #[serde(rename = "donuts")]
    pub balance: i64,
    #[serde(rename = "donutsPurchased")]
    pub total_purchased: i64,
    #[serde(rename = "donutsAwarded")]
    pub total_awarded: i64,
    pub cash: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CurrencyView {
    pub fn new(ledger: CurrencyRecord, cash: i64) -> Self {
        Self {
            id: ledger.id,
            balance: ledger.balance,
            total_purchased: ledger.total_purchased,
            total_awarded: ledger.total_awarded,
            cash,
            created_at: ledger.created_at,
            updated_at: ledger.updated_at,
        }
    }
}

/// Reads and rewrites a player's currency ledger.
#[derive(Clone)]
pub struct CurrencyService {
    ctx: StoreContext,
    land: LandCashService,
    policy: LedgerPolicy,
    clock: Arc<dyn Clock>,
}

impl CurrencyService {
    pub fn new(ctx: StoreContext, land: LandCashService) -> Self {
        Self {
            ctx,
            land,
            policy: LedgerPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    pub(crate) fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.ctx.schema
    }

    /// Decode the ledger. Fails with `NotFound` if the currency file is absent.
    pub fn ledger(&self, id: &EntityId) -> Result<CurrencyRecord> {
        let schema = self.ctx.schema.load()?;
        let path = self.ctx.paths.path_for(id, RecordKind::Currency);
        let record = self.ctx.store.read(&path, schema.currency())?;
        Ok(CurrencyRecord::from_record(&record, schema)?)
    }

    /// Ledger plus cash. A missing land file reads as zero cash; a present but
    /// malformed one is an error.
    pub fn get_currency(&self, id: &EntityId) -> Result<CurrencyView> {
        let ledger = self.ledger(id)?;
        let cash = self.land.cash(id)?.unwrap_or(0);
        Ok(CurrencyView::new(ledger, cash))
    }

    /// Set the donut balance according to the configured [`LedgerPolicy`].
    ///
    /// `id`, `totalPurchased`, `createdAt` and any field outside the ledger
    /// are written back exactly as read.
    pub fn set_donuts(&self, id: &EntityId, value: i64) -> Result<CurrencyRecord> {
        let schema = self.ctx.schema.load()?;
        let path = self.ctx.paths.path_for(id, RecordKind::Currency);

        self.ctx.locks.with_lock(id, RecordKind::Currency, || {
            let mut record = self.ctx.store.read(&path, schema.currency())?;
            let current = CurrencyRecord::from_record(&record, schema)?;
            let next = self.policy.apply(&current, value, self.clock.now_millis());

            next.write_ledger(&mut record, schema)?;
            self.ctx.store.write(&path, &record, schema.currency())?;

            tracing::info!(
                "Set donuts for {}: balance {} -> {}, awarded {} -> {} ({})",
                id,
                current.balance,
                next.balance,
                current.total_awarded,
                next.total_awarded,
                self.policy
            );
            Ok(next)
        })
    }
}
