//! Player identifiers and the on-disk layout of their save files.
//!
//! Every player owns one directory under the data root:
//!
//! ```text
//! <data_dir>/<entity_id>/<entity_id>.currency
//! <data_dir>/<entity_id>/<entity_id>.land
//! ```
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::StoreError;

const MAX_ENTITY_ID_LEN: usize = 128;

/// Validated player identifier.
///
/// The identifier doubles as a directory and file name, so it is restricted
/// to `[A-Za-z0-9._-]` and must start with an ASCII alphanumeric. That rules
/// out `.`, `..`, separators and hidden names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let invalid = |reason| StoreError::InvalidEntityId {
            id: raw.to_string(),
            reason,
        };

        let Some(first) = raw.chars().next() else {
            return Err(invalid("must not be empty"));
        };
        if raw.len() > MAX_ENTITY_ID_LEN {
            return Err(invalid("longer than 128 characters"));
        }
        if !first.is_ascii_alphanumeric() {
            return Err(invalid("must start with a letter or digit"));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid("only letters, digits, '.', '_' and '-' are allowed"));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two save files owned by a player.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Currency,
    Land,
}

impl RecordKind {
    pub const fn extension(self) -> &'static str {
        match self {
            RecordKind::Currency => "currency",
            RecordKind::Land => "land",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Resolved file locations for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPaths {
    pub currency: PathBuf,
    pub land: PathBuf,
}

impl EntityPaths {
    pub fn get(&self, kind: RecordKind) -> &Path {
        match kind {
            RecordKind::Currency => &self.currency,
            RecordKind::Land => &self.land,
        }
    }
}

/// Maps entity identifiers onto paths below a data directory. Pure, no I/O.
#[derive(Debug, Clone)]
pub struct EntityPathResolver {
    data_dir: PathBuf,
}

impl EntityPathResolver {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn resolve(&self, id: &EntityId) -> EntityPaths {
        EntityPaths {
            currency: self.path_for(id, RecordKind::Currency),
            land: self.path_for(id, RecordKind::Land),
        }
    }

    pub fn path_for(&self, id: &EntityId, kind: RecordKind) -> PathBuf {
        self.data_dir
            .join(id.as_str())
            .join(format!("{}.{}", id.as_str(), kind.extension()))
    }
}
