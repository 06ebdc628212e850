// Entity identifiers and the generator that mints them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a source, game or pick.
///
/// Ids are immutable once assigned. The tracker never interprets their
/// contents; imported files may carry any string, which is replaced on
/// import anyway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        EntityId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        EntityId(raw.to_string())
    }
}

/// Source of fresh, collision-free identifiers for the lifetime of the
/// process.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> EntityId;
}

/// Random UUID v4 ids, matching the format written by the browser dashboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> EntityId {
        EntityId(uuid::Uuid::new_v4().to_string())
    }
}
