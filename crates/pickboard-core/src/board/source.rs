// Information sources (podcasts, models, analysts) that picks are attributed to.

use serde::{Deserialize, Serialize};

use super::ids::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Source {
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub name: String,
    /// Free-form category such as "Podcast" or "Model".
    #[serde(default, rename = "type", deserialize_with = "crate::board::null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub url: String,
}

impl Source {
    /// Source names are unique without regard to case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}
