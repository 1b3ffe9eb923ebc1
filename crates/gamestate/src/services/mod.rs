//! Business rules over the currency and land records.
//!
//! Services resolve an entity's files, hold the entity lock for the whole
//! read-modify-write, and never create a record that is not already on disk.

mod currency;
mod land;

pub use currency::{CurrencyService, CurrencyView};
pub use land::LandCashService;

use std::sync::Arc;

use crate::entity::EntityPathResolver;
use crate::schema::SchemaRegistry;
use crate::store::{EntityLocks, StateStore};

/// Shared handles every service needs.
#[derive(Clone)]
pub struct StoreContext {
    pub schema: Arc<SchemaRegistry>,
    pub paths: EntityPathResolver,
    pub store: Arc<dyn StateStore>,
    pub locks: Arc<EntityLocks>,
}

impl StoreContext {
    pub fn new(
        schema: Arc<SchemaRegistry>,
        paths: EntityPathResolver,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            schema,
            paths,
            store,
            locks: Arc::new(EntityLocks::new()),
        }
    }
}
