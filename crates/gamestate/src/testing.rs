//! Shared fixtures for unit tests.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use prost_reflect::Value;
use tempfile::TempDir;

use crate::codec::{Record, RecordCodec};
use crate::entity::{EntityId, EntityPathResolver, RecordKind};
use crate::records::{CurrencyRecord, LandRecord};
use crate::schema::{Schema, SchemaRegistry};
use crate::services::StoreContext;
use crate::store::FileStateStore;

pub(crate) fn fixture_schema_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("proto")
        .join("TappedOut.proto")
}

fn shared_registry() -> &'static Arc<SchemaRegistry> {
    static REGISTRY: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Arc::new(SchemaRegistry::new(fixture_schema_path())))
}

/// One registry per test binary so records built here match the services'.
pub(crate) fn fixture_registry() -> Arc<SchemaRegistry> {
    Arc::clone(shared_registry())
}

pub(crate) fn fixture_schema() -> &'static Schema {
    shared_registry().load().unwrap()
}

/// Land record with a couple of buildings and, optionally, a cash value.
pub(crate) fn land_with_cash(cash: Option<i64>) -> Record {
    let schema = fixture_schema();
    let land = schema.land();
    let mut record = Record::new(land);
    record
        .set_string(&land.field("id").unwrap(), "land-1")
        .unwrap();
    record
        .set_i64(&land.field("friendDataTimestamp").unwrap(), 1_650_000_000_000)
        .unwrap();

    let building_type = schema.message_type("Data.BuildingData").unwrap();
    let buildings = [(12, 3, 4), (40, -2, 9)]
        .into_iter()
        .map(|(building, x, y)| {
            let mut b = Record::new(&building_type);
            b.set_i64(&building_type.field("building").unwrap(), building)
                .unwrap();
            b.set_i64(&building_type.field("positionX").unwrap(), x)
                .unwrap();
            b.set_i64(&building_type.field("positionY").unwrap(), y)
                .unwrap();
            Value::Message(b.into_message())
        })
        .collect();
    record
        .message_mut()
        .set_field(&land.field("buildingData").unwrap(), Value::List(buildings));

    let mut land = LandRecord::new(record);
    if let Some(cash) = cash {
        land.set_cash(schema, cash).unwrap();
    }
    land.into_record()
}

pub(crate) struct Fixture {
    temp: TempDir,
    paths: EntityPathResolver,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let paths = EntityPathResolver::new(temp.path());
        Self { temp, paths }
    }

    pub(crate) fn id(&self, raw: &str) -> EntityId {
        EntityId::parse(raw).unwrap()
    }

    pub(crate) fn context(&self) -> StoreContext {
        StoreContext::new(
            fixture_registry(),
            self.paths.clone(),
            Arc::new(FileStateStore::new()),
        )
    }

    pub(crate) fn entity_dir(&self, id: &EntityId) -> PathBuf {
        self.temp.path().join(id.as_str())
    }

    pub(crate) fn seed_currency(&self, id: &EntityId, currency: &CurrencyRecord) {
        let schema = fixture_schema();
        let record = currency.to_record(schema).unwrap();
        let bytes = RecordCodec.encode(&record, schema.currency()).unwrap();
        self.seed(id, RecordKind::Currency, &bytes);
    }

    pub(crate) fn seed_land(&self, id: &EntityId, record: &Record) {
        let bytes = RecordCodec.encode(record, fixture_schema().land()).unwrap();
        self.seed(id, RecordKind::Land, &bytes);
    }

    pub(crate) fn currency_bytes(&self, id: &EntityId) -> Vec<u8> {
        fs::read(self.paths.path_for(id, RecordKind::Currency)).unwrap()
    }

    pub(crate) fn land_bytes(&self, id: &EntityId) -> Vec<u8> {
        fs::read(self.paths.path_for(id, RecordKind::Land)).unwrap()
    }

    fn seed(&self, id: &EntityId, kind: RecordKind, bytes: &[u8]) {
        fs::create_dir_all(self.entity_dir(id)).unwrap();
        fs::write(self.paths.path_for(id, kind), bytes).unwrap();
    }
}
