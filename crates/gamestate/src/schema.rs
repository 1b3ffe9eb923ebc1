//! Protobuf schema loading.
//!
//! The save files are protobuf blobs whose message definitions live outside
//! the binary (the game client's `.proto`). [`SchemaRegistry`] compiles that
//! definition on first use, checks that the messages and fields the store
//! touches are present, and hands out [`MessageType`] handles afterwards.
//!
//! A failed load is cached: every later caller gets the same
//! [`SchemaError`] instead of a silent retry.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use prost_reflect::{DescriptorPool, FieldDescriptor, MessageDescriptor};

use crate::error::SchemaError;
use crate::records::{CurrencyFields, LandFields};

/// Fully qualified name of the currency ledger message.
pub const CURRENCY_MESSAGE: &str = "Data.CurrencyData";
/// Fully qualified name of the land/world message.
pub const LAND_MESSAGE: &str = "Data.LandMessage";

/// Handle to one message type of the loaded schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    descriptor: MessageDescriptor,
}

impl MessageType {
    pub(crate) fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor }
    }

    /// Fully qualified name, e.g. `Data.LandMessage`.
    pub fn name(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Look a field up by its camelCase JSON name, falling back to the
    /// declared name.
    pub fn field(&self, name: &str) -> Option<FieldDescriptor> {
        self.descriptor
            .get_field_by_json_name(name)
            .or_else(|| self.descriptor.get_field_by_name(name))
    }
}

/// A loaded and validated schema.
#[derive(Debug)]
pub struct Schema {
    pool: DescriptorPool,
    currency: MessageType,
    land: MessageType,
    currency_fields: CurrencyFields,
    land_fields: LandFields,
}

impl Schema {
    /// Validate a descriptor pool and resolve the record fields.
    pub fn from_pool(pool: DescriptorPool) -> Result<Self, SchemaError> {
        let currency = lookup(&pool, CURRENCY_MESSAGE)?;
        let land = lookup(&pool, LAND_MESSAGE)?;
        let currency_fields = CurrencyFields::resolve(&currency)?;
        let land_fields = LandFields::resolve(&land)?;

        Ok(Self {
            pool,
            currency,
            land,
            currency_fields,
            land_fields,
        })
    }

    pub fn currency(&self) -> &MessageType {
        &self.currency
    }

    pub fn land(&self) -> &MessageType {
        &self.land
    }

    pub(crate) fn currency_fields(&self) -> &CurrencyFields {
        &self.currency_fields
    }

    pub(crate) fn land_fields(&self) -> &LandFields {
        &self.land_fields
    }

    /// Resolve any other message type defined by the schema.
    pub fn message_type(&self, name: &str) -> Result<MessageType, SchemaError> {
        lookup(&self.pool, name)
    }
}

fn lookup(pool: &DescriptorPool, name: &str) -> Result<MessageType, SchemaError> {
    pool.get_message_by_name(name)
        .map(MessageType::new)
        .ok_or_else(|| SchemaError::MissingMessage {
            name: name.to_string(),
        })
}

/// Process-wide schema cache.
///
/// Construct one at startup and share it by `Arc`. The first caller of
/// [`SchemaRegistry::load`] compiles the source; concurrent callers block
/// until that finishes and then reuse the result.
#[derive(Debug)]
pub struct SchemaRegistry {
    source: PathBuf,
    loaded: OnceLock<Result<Schema, SchemaError>>,
}

impl SchemaRegistry {
    /// Registry that loads lazily from `source`.
    ///
    /// `.proto` files are compiled in-process with imports resolved relative
    /// to the file's directory. Any other extension is read as a serialized
    /// `FileDescriptorSet`.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            loaded: OnceLock::new(),
        }
    }

    /// Registry around an already built schema.
    pub fn preloaded(schema: Schema) -> Self {
        let loaded = OnceLock::new();
        let _ = loaded.set(Ok(schema));
        Self {
            source: PathBuf::new(),
            loaded,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Load the schema once and return the cached result.
    pub fn load(&self) -> Result<&Schema, SchemaError> {
        self.loaded
            .get_or_init(|| {
                let result = load_source(&self.source).and_then(Schema::from_pool);
                match &result {
                    Ok(_) => tracing::info!("Loaded save-game schema from {}", self.source.display()),
                    Err(e) => tracing::error!("Schema load failed: {}", e),
                }
                result
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

fn load_source(path: &Path) -> Result<DescriptorPool, SchemaError> {
    if !path.exists() {
        return Err(SchemaError::Missing {
            path: path.to_path_buf(),
        });
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("proto") => compile_proto(path),
        _ => decode_descriptor_set(path),
    }
}

fn compile_proto(path: &Path) -> Result<DescriptorPool, SchemaError> {
    let include = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| SchemaError::Missing {
        path: path.to_path_buf(),
    })?;

    let files = protox::compile([file_name], [include]).map_err(|e| SchemaError::Compile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    DescriptorPool::from_file_descriptor_set(files).map_err(|e| SchemaError::Descriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn decode_descriptor_set(path: &Path) -> Result<DescriptorPool, SchemaError> {
    let bytes = fs::read(path).map_err(|e| SchemaError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    DescriptorPool::decode(bytes.as_slice()).map_err(|e| SchemaError::Descriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_schema_path;
    use tempfile::TempDir;

    fn write_proto(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("Broken.proto");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_fixture() {
        let registry = SchemaRegistry::new(fixture_schema_path());
        assert!(!registry.is_loaded());

        let schema = registry.load().unwrap();
        assert_eq!(schema.currency().name(), CURRENCY_MESSAGE);
        assert_eq!(schema.land().name(), LAND_MESSAGE);
        assert!(registry.is_loaded());

        let user_data = schema.message_type("Data.UserData").unwrap();
        assert!(user_data.field("money").is_some());
    }

    #[test]
    fn test_load_is_idempotent() {
        let registry = SchemaRegistry::new(fixture_schema_path());
        let first = registry.load().unwrap() as *const Schema;
        let second = registry.load().unwrap() as *const Schema;
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let registry = SchemaRegistry::new(temp.path().join("nope.proto"));
        assert!(matches!(
            registry.load().unwrap_err(),
            SchemaError::Missing { .. }
        ));
    }

    #[test]
    fn test_malformed_proto() {
        let temp = TempDir::new().unwrap();
        let path = write_proto(&temp, "syntax = \"proto2\"; message {");
        let registry = SchemaRegistry::new(path);
        assert!(matches!(
            registry.load().unwrap_err(),
            SchemaError::Compile { .. }
        ));
    }

    #[test]
    fn test_missing_message_type() {
        let temp = TempDir::new().unwrap();
        let path = write_proto(
            &temp,
            "syntax = \"proto2\";\npackage Data;\nmessage Other { optional int32 x = 1; }\n",
        );
        let err = SchemaRegistry::new(path).load().unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingMessage {
                name: CURRENCY_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn test_rejects_non_integer_balance() {
        let temp = TempDir::new().unwrap();
        let path = write_proto(
            &temp,
            r#"syntax = "proto2";
package Data;
message CurrencyData {
  optional string id = 1;
  optional int64 vcTotalPurchased = 2;
  optional int64 vcTotalAwarded = 3;
  optional string vcBalance = 4;
  optional int64 createdAt = 5;
  optional int64 updatedAt = 6;
}
message UserData { optional int32 money = 1; }
message LandMessage { optional UserData userData = 2; }
"#,
        );
        let err = SchemaRegistry::new(path).load().unwrap_err();
        assert!(matches!(err, SchemaError::FieldKind { ref field, .. } if field == "vcBalance"));
    }

    #[test]
    fn test_failure_is_cached() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Late.proto");
        let registry = SchemaRegistry::new(&path);
        let first = registry.load().unwrap_err();

        // Appearing later does not trigger a reload.
        fs::copy(fixture_schema_path(), &path).unwrap();
        let second = registry.load().unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_descriptor_set() {
        let compiled = SchemaRegistry::new(fixture_schema_path());
        let pool = compiled.load().unwrap().pool.clone();

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("TappedOut.pb");
        fs::write(&path, pool.encode_to_vec()).unwrap();

        let registry = SchemaRegistry::new(&path);
        let schema = registry.load().unwrap();
        assert_eq!(schema.currency().name(), CURRENCY_MESSAGE);
    }
}
