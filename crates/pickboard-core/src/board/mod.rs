// Board model: sources, games and picks, plus the tracker that owns them.

pub mod game;
pub mod ids;
pub mod pick;
pub mod source;
pub mod state;
pub mod tracker;

use serde::{Deserialize, Deserializer};

/// Read an explicit `null` the same as a missing field. Pair with
/// `#[serde(default)]`, which only covers the missing case.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
