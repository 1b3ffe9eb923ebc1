use crate::entity::{EntityId, RecordKind};
use crate::error::Result;
use crate::records::LandRecord;
use crate::services::StoreContext;

/// Reads and rewrites the cash stored in a player's land record.
#[derive(Clone)]
pub struct LandCashService {
    ctx: StoreContext,
}

impl LandCashService {
    pub fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    /// Current cash, or `None` when the player has no land file.
    pub fn cash(&self, id: &EntityId) -> Result<Option<i64>> {
        let schema = self.ctx.schema.load()?;
        let path = self.ctx.paths.path_for(id, RecordKind::Land);

        match self.ctx.store.load(&path, schema.land())? {
            Some(record) => Ok(Some(LandRecord::new(record).cash(schema)?)),
            None => Ok(None),
        }
    }

    /// Overwrite `userData.money`. The land file must already exist.
    pub fn set_cash(&self, id: &EntityId, value: i64) -> Result<i64> {
        let schema = self.ctx.schema.load()?;
        let path = self.ctx.paths.path_for(id, RecordKind::Land);

        self.ctx.locks.with_lock(id, RecordKind::Land, || {
            let mut land = LandRecord::new(self.ctx.store.read(&path, schema.land())?);
            let previous = land.cash(schema)?;

            land.set_cash(schema, value)?;
            self.ctx.store.write(&path, land.record(), schema.land())?;

            tracing::info!("Set cash for {}: {} -> {}", id, previous, value);
            Ok(value)
        })
    }
}
