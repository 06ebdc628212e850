// Individual pick representation and confidence handling.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ids::EntityId;

pub const CONFIDENCE_MIN: f64 = 0.0;
pub const CONFIDENCE_MAX: f64 = 100.0;

/// A confidence score, always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Confidence(f64);

impl Confidence {
    /// Clamp `value` into range. Returns `None` for NaN, which has no
    /// meaningful position on the scale.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        Some(Confidence(value.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX)))
    }

    /// Coerce free-form input. Blank input clears the confidence; anything
    /// that is not a number also clears it rather than failing.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse::<f64>().ok().and_then(Confidence::new)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A single source's predicted outcome for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pick {
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub id: EntityId,
    /// Free text; normally matches a `Source::name` but is not enforced.
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub source: String,
    /// Free-text outcome label, e.g. "Lions -2.5".
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub choice: String,
    #[serde(
        default,
        serialize_with = "serialize_confidence",
        deserialize_with = "deserialize_confidence"
    )]
    pub confidence: Option<Confidence>,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub notes: String,
}

impl Pick {
    /// A blank pick row, as added by "add pick".
    pub fn blank(id: EntityId) -> Self {
        Pick {
            id,
            ..Pick::default()
        }
    }
}

/// Editable pick fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickField {
    Source,
    Choice,
    Confidence,
    Notes,
}

impl PickField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "source" => Some(PickField::Source),
            "choice" => Some(PickField::Choice),
            "confidence" | "conf" => Some(PickField::Confidence),
            "notes" => Some(PickField::Notes),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PickField::Source => "source",
            PickField::Choice => "choice",
            PickField::Confidence => "confidence",
            PickField::Notes => "notes",
        }
    }
}

impl fmt::Display for PickField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Confidence wire format
// ---------------------------------------------------------------------------

// Files written by the browser dashboard store an unset confidence as "" and
// whole numbers as integers. Both directions keep that shape.

fn serialize_confidence<S>(value: &Option<Confidence>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        None => serializer.serialize_str(""),
        Some(c) if c.0.fract() == 0.0 => serializer.serialize_i64(c.0 as i64),
        Some(c) => serializer.serialize_f64(c.0),
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<Confidence>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(ConfidenceVisitor)
}

struct ConfidenceVisitor;

impl<'de> Visitor<'de> for ConfidenceVisitor {
    type Value = Option<Confidence>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a numeric string, an empty string or null")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Confidence::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Confidence::new(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Confidence::new(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Confidence::parse(v))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ConfidenceVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
