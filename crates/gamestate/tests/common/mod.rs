#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use gamestate::{
    CurrencyRecord, FixedClock, GameStateGateway, LandRecord, Record, RecordCodec, Schema,
    SchemaRegistry, StoreConfig,
};
use prost_reflect::Value;
use tempfile::TempDir;

pub const NOW_MS: i64 = 1_700_000_000_000;

pub fn schema_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("proto")
        .join("TappedOut.proto")
}

fn shared_registry() -> &'static Arc<SchemaRegistry> {
    static REGISTRY: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Arc::new(SchemaRegistry::new(schema_path())))
}

/// Records built by the tests must come from the gateway's own registry.
pub fn registry() -> Arc<SchemaRegistry> {
    Arc::clone(shared_registry())
}

pub fn schema() -> &'static Schema {
    shared_registry().load().unwrap()
}

pub fn ledger(id: &str) -> CurrencyRecord {
    CurrencyRecord {
        id: id.to_string(),
        balance: 120,
        total_purchased: 80,
        total_awarded: 40,
        created_at: 1_600_000_000_000,
        updated_at: 1_600_000_500_000,
    }
}

/// Land record carrying a friend timestamp, one building and `cash`.
pub fn land(cash: i64) -> Record {
    let schema = schema();
    let land_type = schema.land();
    let mut record = Record::new(land_type);
    record
        .set_string(&land_type.field("id").unwrap(), "land")
        .unwrap();
    record
        .set_i64(&land_type.field("friendDataTimestamp").unwrap(), 1_650_000_000_000)
        .unwrap();

    let mut land = LandRecord::new(record);
    land.set_cash(schema, cash).unwrap();

    let user_data = land_type.field("userData").unwrap();
    let user_type = schema.message_type("Data.UserData").unwrap();
    let mut record = land.into_record();
    let user = record
        .message_mut()
        .get_field_mut(&user_data)
        .as_message_mut()
        .unwrap();
    user.set_field(
        &user_type.field("userName").unwrap(),
        Value::String("homer".to_string()),
    );
    user.set_field(&user_type.field("level").unwrap(), Value::I32(17));
    record
}

pub struct TestEnv {
    pub temp: TempDir,
    pub clock: Arc<FixedClock>,
    pub gateway: GameStateGateway,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::new(NOW_MS));
        let gateway = GameStateGateway::builder()
            .config(StoreConfig::new(temp.path(), schema_path()))
            .schema(registry())
            .clock(clock.clone())
            .build()
            .unwrap();
        Self {
            temp,
            clock,
            gateway,
        }
    }

    pub fn entity_dir(&self, id: &str) -> PathBuf {
        self.temp.path().join(id)
    }

    pub fn currency_path(&self, id: &str) -> PathBuf {
        self.entity_dir(id).join(format!("{id}.currency"))
    }

    pub fn land_path(&self, id: &str) -> PathBuf {
        self.entity_dir(id).join(format!("{id}.land"))
    }

    pub fn seed_currency(&self, id: &str, ledger: &CurrencyRecord) {
        let schema = schema();
        let record = ledger.to_record(schema).unwrap();
        let bytes = RecordCodec.encode(&record, schema.currency()).unwrap();
        fs::create_dir_all(self.entity_dir(id)).unwrap();
        fs::write(self.currency_path(id), bytes).unwrap();
    }

    pub fn seed_land(&self, id: &str, record: &Record) {
        let bytes = RecordCodec.encode(record, schema().land()).unwrap();
        self.seed_land_bytes(id, &bytes);
    }

    pub fn seed_land_bytes(&self, id: &str, bytes: &[u8]) {
        fs::create_dir_all(self.entity_dir(id)).unwrap();
        fs::write(self.land_path(id), bytes).unwrap();
    }

    pub fn stored_land(&self, id: &str) -> Record {
        let bytes = fs::read(self.land_path(id)).unwrap();
        RecordCodec.decode(&bytes, schema().land()).unwrap()
    }
}
