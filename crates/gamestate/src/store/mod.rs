//! Record persistence.
//!
//! A store moves whole records between memory and a single file. It knows
//! nothing about players or ledgers; the services decide which file to touch
//! and hold the entity lock around read-modify-write.

mod file;
mod locks;

pub use file::FileStateStore;
pub use locks::EntityLocks;

use std::path::Path;

use crate::codec::Record;
use crate::error::{Result, StoreError};
use crate::schema::MessageType;

/// Contract for loading and saving one record file.
pub trait StateStore: Send + Sync {
    /// Check whether a record file exists. No side effects.
    fn exists(&self, path: &Path) -> bool;

    /// Load and decode a record, `None` if the file does not exist.
    fn load(&self, path: &Path, message_type: &MessageType) -> Result<Option<Record>>;

    /// Encode and persist a record.
    ///
    /// Implementations must replace the file atomically: a concurrent reader
    /// sees either the previous contents or the new ones, never a mix.
    fn write(&self, path: &Path, record: &Record, message_type: &MessageType) -> Result<()>;

    /// Load a record that is required to exist.
    fn read(&self, path: &Path, message_type: &MessageType) -> Result<Record> {
        self.load(path, message_type)?
            .ok_or_else(|| StoreError::NotFound {
                message_type: message_type.name().to_string(),
                path: path.to_path_buf(),
            })
    }
}
