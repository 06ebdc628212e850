// Snapshot files: pretty-printed export of the whole board and validation of
// files being imported.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::board::state::BoardState;

/// Prefix of exported file names.
pub const SNAPSHOT_PREFIX: &str = "pick-insights";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("invalid import file format: {reason}")]
    Format { reason: String },
}

/// An exported board, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub file_name: String,
    pub contents: String,
}

/// `pick-insights-YYYY-MM-DD.json`
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{SNAPSHOT_PREFIX}-{}.json", date.format("%Y-%m-%d"))
}

/// Serialize `state` with two-space indentation under the file name for
/// `date`.
pub fn export(state: &BoardState, date: NaiveDate) -> Result<Snapshot, serde_json::Error> {
    Ok(Snapshot {
        file_name: file_name_for(date),
        contents: serde_json::to_string_pretty(state)?,
    })
}

/// Parse an import file. Both `sources` and `games` must be present as
/// arrays; everything inside them gets the same defaulting as a stored board.
/// Ids are left as found in the file.
pub fn parse(raw: &str) -> Result<BoardState, ImportError> {
    let value: Value = serde_json::from_str(raw).map_err(ImportError::Syntax)?;

    for key in ["sources", "games"] {
        if !value.get(key).is_some_and(Value::is_array) {
            return Err(ImportError::Format {
                reason: format!("expected a `{key}` array at the top level"),
            });
        }
    }

    serde_json::from_value(value).map_err(|e| ImportError::Format {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ids::UuidGenerator;

    #[test]
    fn file_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 7).unwrap();
        assert_eq!(file_name_for(date), "pick-insights-2025-09-07.json");
    }

    #[test]
    fn export_is_indented_json() {
        let state = BoardState::seeded(&mut UuidGenerator);
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let snap = export(&state, date).unwrap();
        assert_eq!(snap.file_name, "pick-insights-2025-01-02.json");
        assert!(snap.contents.starts_with("{\n  \"sources\": ["));
        assert!(snap.contents.contains("\n    {\n      \"id\": "));
    }

    #[test]
    fn parse_accepts_exported_board() {
        let state = BoardState::seeded(&mut UuidGenerator);
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let snap = export(&state, date).unwrap();
        let parsed = parse(&snap.contents).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn parse_rejects_missing_games() {
        let err = parse(r#"{ "sources": [] }"#).unwrap_err();
        match err {
            ImportError::Format { reason } => assert!(reason.contains("games"), "{reason}"),
            other => panic!("expected Format error, got: {other}"),
        }
    }

    #[test]
    fn parse_rejects_non_array_sources() {
        let err = parse(r#"{ "sources": "Sharp", "games": [] }"#).unwrap_err();
        assert!(matches!(err, ImportError::Format { .. }));
    }

    #[test]
    fn parse_rejects_top_level_array() {
        let err = parse("[]").unwrap_err();
        assert!(matches!(err, ImportError::Format { .. }));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse("{ not json").unwrap_err();
        assert!(matches!(err, ImportError::Syntax(_)));
    }

    #[test]
    fn parse_rejects_malformed_entries() {
        let err = parse(r#"{ "sources": [], "games": [42] }"#).unwrap_err();
        assert!(matches!(err, ImportError::Format { .. }));
    }

    #[test]
    fn parse_normalizes_legacy_game_shapes() {
        let state = parse(
            r#"{ "sources": [], "games": [{ "id": "g", "name": "Rams @ 49ers", "tags": "NFC West, TNF" }] }"#,
        )
        .unwrap();
        assert_eq!(state.games[0].tags, vec!["NFC West", "TNF"]);
        assert!(state.games[0].picks.is_empty());
    }
}
