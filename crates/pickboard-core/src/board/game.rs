// Game (matchup) representation, tag parsing and kickoff handling.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::EntityId;
use super::pick::Pick;

/// A matchup being tracked, with the picks logged against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Game {
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub name: String,
    /// Kickoff as entered, e.g. `2025-09-07T20:20`. Empty when unknown.
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub kickoff: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub archived: bool,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub picks: Vec<Pick>,
}

impl Game {
    pub fn find_pick(&self, pick_id: &EntityId) -> Option<&Pick> {
        self.picks.iter().find(|p| &p.id == pick_id)
    }

    pub fn find_pick_mut(&mut self, pick_id: &EntityId) -> Option<&mut Pick> {
        self.picks.iter_mut().find(|p| &p.id == pick_id)
    }

    /// Parse the kickoff for display. Returns `None` when unset or in a
    /// format we do not recognize; the raw string is still kept as-is.
    pub fn kickoff_time(&self) -> Option<NaiveDateTime> {
        parse_kickoff(&self.kickoff)
    }
}

/// Split comma-separated tag input into trimmed, non-empty tags.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts the `datetime-local` forms (`YYYY-MM-DDTHH:MM[:SS]`) and RFC 3339.
pub fn parse_kickoff(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
}

// ---------------------------------------------------------------------------
// Legacy tag shapes
// ---------------------------------------------------------------------------

// Older saves stored tags as one comma-delimited string.

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(TagsVisitor)
}

struct TagsVisitor;

impl<'de> Visitor<'de> for TagsVisitor {
    type Value = Vec<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of tags or a comma-separated string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(parse_tags(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TagsVisitor)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut tags = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(tag) = seq.next_element::<String>()? {
            tags.push(tag);
        }
        Ok(tags)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
