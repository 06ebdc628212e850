// The pick tracker: owns the board, applies mutations, and writes the whole
// board through to the key-value store after each one.

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::game::{parse_tags, Game};
use super::ids::{EntityId, IdGenerator, UuidGenerator};
use super::pick::{Confidence, Pick, PickField};
use super::source::Source;
use super::state::BoardState;
use crate::consensus::{self, Consensus};
use crate::db::KeyValueStore;
use crate::snapshot::{self, ImportError, Snapshot};

/// Key the board blob is stored under.
pub const STORAGE_KEY: &str = "pick-insights-studio";

/// Suffix appended to the name of a duplicated game.
pub const COPY_SUFFIX: &str = " (copy)";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("`{field}` must not be blank")]
    InvalidInput { field: &'static str },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: EntityId },

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("failed to serialize board: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to persist board: {0:#}")]
    Storage(anyhow::Error),
}

/// Why a stored board could not be used. Never leaves `load`.
#[derive(Debug, Error)]
enum PersistedStateError {
    #[error("failed to read stored board: {0:#}")]
    Read(anyhow::Error),

    #[error("stored board is not valid: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Counts of what an import brought in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub sources: usize,
    pub games: usize,
    pub picks: usize,
}

pub struct PickTracker<S: KeyValueStore> {
    state: BoardState,
    store: S,
    ids: Box<dyn IdGenerator>,
}

impl<S: KeyValueStore> PickTracker<S> {
    /// Load the board from `store`, minting ids as random UUIDs.
    pub fn load(store: S) -> Self {
        Self::load_with_ids(store, Box::new(UuidGenerator))
    }

    /// Load the board from `store`. A missing, unreadable or corrupt blob
    /// yields the example board instead; the failure is only logged.
    pub fn load_with_ids(store: S, mut ids: Box<dyn IdGenerator>) -> Self {
        let state = match read_persisted(&store) {
            Ok(Some(mut state)) => {
                let assigned = state.assign_missing_ids(ids.as_mut());
                if assigned > 0 {
                    warn!("Assigned ids to {} stored entities that had none", assigned);
                }
                info!(
                    "Loaded board: {} sources, {} games, {} picks",
                    state.sources.len(),
                    state.games.len(),
                    state.pick_count()
                );
                state
            }
            Ok(None) => {
                info!("No stored board found, starting with example data");
                BoardState::seeded(ids.as_mut())
            }
            Err(e) => {
                error!("{}; falling back to example data", e);
                BoardState::seeded(ids.as_mut())
            }
        };

        PickTracker { state, store, ids }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn games(&self) -> &[Game] {
        &self.state.games
    }

    pub fn sources(&self) -> &[Source] {
        &self.state.sources
    }

    pub fn game(&self, game_id: &EntityId) -> Option<&Game> {
        self.state.find_game(game_id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Source names offered as suggestions when entering a pick.
    pub fn source_names(&self) -> Vec<&str> {
        self.state.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Consensus for one game, or `None` if the game does not exist.
    pub fn consensus(&self, game_id: &EntityId) -> Option<Consensus> {
        self.game(game_id).map(|g| consensus::compute(&g.picks))
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the whole board under [`STORAGE_KEY`], replacing what was there.
    pub fn save(&self) -> Result<(), TrackerError> {
        let blob = serde_json::to_string(&self.state)?;
        self.store
            .set(STORAGE_KEY, &blob)
            .map_err(TrackerError::Storage)
    }

    /// Run `change` against the board and persist. If `change` fails or the
    /// write fails, the board is restored to what it was before.
    fn apply<T>(
        &mut self,
        change: impl FnOnce(&mut BoardState, &mut dyn IdGenerator) -> Result<T, TrackerError>,
    ) -> Result<T, TrackerError> {
        let before = self.state.clone();
        let result = change(&mut self.state, self.ids.as_mut()).and_then(|value| {
            self.save()?;
            Ok(value)
        });
        if result.is_err() {
            self.state = before;
        }
        result
    }

    // ------------------------------------------------------------------
    // Games
    // ------------------------------------------------------------------

    /// Add a game at the top of the board. `tags_text` is comma-separated.
    pub fn add_game(
        &mut self,
        name: &str,
        kickoff: &str,
        tags_text: &str,
        notes: &str,
    ) -> Result<EntityId, TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring add_game with blank name");
            return Err(TrackerError::InvalidInput { field: "name" });
        }

        let id = self.apply(|state, ids| {
            let id = ids.next_id();
            state.games.insert(
                0,
                Game {
                    id: id.clone(),
                    name: name.to_string(),
                    kickoff: kickoff.trim().to_string(),
                    tags: parse_tags(tags_text),
                    notes: notes.trim().to_string(),
                    archived: false,
                    picks: Vec::new(),
                },
            );
            Ok(id)
        })?;
        info!("Added game {} ({})", name, id);
        Ok(id)
    }

    /// Remove a game and its picks. Returns `false` if no game had that id.
    pub fn remove_game(&mut self, game_id: &EntityId) -> Result<bool, TrackerError> {
        if self.state.find_game(game_id).is_none() {
            return Ok(false);
        }
        self.apply(|state, _| {
            state.games.retain(|g| &g.id != game_id);
            Ok(())
        })?;
        info!("Removed game {}", game_id);
        Ok(true)
    }

    /// Append a deep copy of a game, with fresh ids and " (copy)" appended
    /// to its name.
    pub fn duplicate_game(&mut self, game_id: &EntityId) -> Result<EntityId, TrackerError> {
        let id = self.apply(|state, ids| {
            let original = state.find_game(game_id).ok_or_else(|| not_found("game", game_id))?;
            let mut copy = original.clone();
            copy.id = ids.next_id();
            copy.name.push_str(COPY_SUFFIX);
            for pick in &mut copy.picks {
                pick.id = ids.next_id();
            }
            let id = copy.id.clone();
            state.games.push(copy);
            Ok(id)
        })?;
        info!("Duplicated game {} as {}", game_id, id);
        Ok(id)
    }

    /// Flip a game's archived flag. Returns the new value.
    pub fn toggle_archive(&mut self, game_id: &EntityId) -> Result<bool, TrackerError> {
        self.apply(|state, _| {
            let game = state
                .find_game_mut(game_id)
                .ok_or_else(|| not_found("game", game_id))?;
            game.archived = !game.archived;
            Ok(game.archived)
        })
    }

    pub fn update_game_notes(&mut self, game_id: &EntityId, notes: &str) -> Result<(), TrackerError> {
        self.apply(|state, _| {
            let game = state
                .find_game_mut(game_id)
                .ok_or_else(|| not_found("game", game_id))?;
            game.notes = notes.to_string();
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    pub fn add_source(&mut self, name: &str, kind: &str, url: &str) -> Result<EntityId, TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring add_source with blank name");
            return Err(TrackerError::InvalidInput { field: "name" });
        }

        let id = self.apply(|state, ids| {
            let id = ids.next_id();
            state.sources.push(Source {
                id: id.clone(),
                name: name.to_string(),
                kind: kind.trim().to_string(),
                url: url.trim().to_string(),
            });
            Ok(id)
        })?;
        info!("Added source {} ({})", name, id);
        Ok(id)
    }

    /// Create a bare source for `name` unless one already exists under any
    /// casing. Returns whether a source was created.
    pub fn ensure_source_exists(&mut self, name: &str) -> Result<bool, TrackerError> {
        if !needs_source(&self.state, name) {
            return Ok(false);
        }
        self.apply(|state, ids| Ok(ensure_source(state, ids, name)))
    }

    /// Remove a source. Picks that name it keep their source text.
    pub fn remove_source(&mut self, source_id: &EntityId) -> Result<bool, TrackerError> {
        if !self.state.sources.iter().any(|s| &s.id == source_id) {
            return Ok(false);
        }
        self.apply(|state, _| {
            state.sources.retain(|s| &s.id != source_id);
            Ok(())
        })?;
        info!("Removed source {}", source_id);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    /// Append an empty pick row to a game.
    pub fn add_pick(&mut self, game_id: &EntityId) -> Result<EntityId, TrackerError> {
        self.add_pick_with(game_id, &[])
    }

    /// Append a pick with some fields already filled in. The row and its
    /// fields are saved in a single write; if anything fails no row is
    /// added.
    pub fn add_pick_with(
        &mut self,
        game_id: &EntityId,
        fields: &[(PickField, &str)],
    ) -> Result<EntityId, TrackerError> {
        self.apply(|state, ids| {
            let game = state
                .find_game_mut(game_id)
                .ok_or_else(|| not_found("game", game_id))?;
            let id = ids.next_id();
            game.picks.push(Pick::blank(id.clone()));
            for &(field, value) in fields {
                set_pick_field(state, ids, game_id, &id, field, value)?;
            }
            Ok(id)
        })
    }

    /// Remove a pick from a game. Returns `false` if the game has no such
    /// pick.
    pub fn remove_pick(&mut self, game_id: &EntityId, pick_id: &EntityId) -> Result<bool, TrackerError> {
        let game = self
            .state
            .find_game(game_id)
            .ok_or_else(|| not_found("game", game_id))?;
        if game.find_pick(pick_id).is_none() {
            return Ok(false);
        }
        self.apply(|state, _| {
            if let Some(game) = state.find_game_mut(game_id) {
                game.picks.retain(|p| &p.id != pick_id);
            }
            Ok(())
        })?;
        Ok(true)
    }

    /// Edit one field of a pick.
    ///
    /// Confidence is coerced (blank clears it, numbers are clamped to
    /// 0-100, anything else clears it). A committed source is trimmed and
    /// registered as a source if it is new. Choice and notes are stored as
    /// given.
    pub fn update_pick_field(
        &mut self,
        game_id: &EntityId,
        pick_id: &EntityId,
        field: PickField,
        value: &str,
    ) -> Result<(), TrackerError> {
        self.apply(|state, ids| set_pick_field(state, ids, game_id, pick_id, field, value))?;
        debug!("Updated {} on pick {} in game {}", field, pick_id, game_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Export the board, named for today's (UTC) date.
    pub fn export_snapshot(&self) -> Result<Snapshot, TrackerError> {
        self.export_snapshot_on(Utc::now().date_naive())
    }

    pub fn export_snapshot_on(&self, date: NaiveDate) -> Result<Snapshot, TrackerError> {
        let snap = snapshot::export(&self.state, date)?;
        info!("Exported board as {}", snap.file_name);
        Ok(snap)
    }

    /// Replace the board with the contents of an import file. Every
    /// imported entity gets a fresh id. On any failure the board is left
    /// exactly as it was.
    pub fn import_snapshot(&mut self, raw: &str) -> Result<ImportSummary, TrackerError> {
        let mut imported = snapshot::parse(raw).inspect_err(|e| warn!("Rejected import: {}", e))?;

        let summary = self.apply(|state, ids| {
            imported.reassign_ids(ids);
            let summary = ImportSummary {
                sources: imported.sources.len(),
                games: imported.games.len(),
                picks: imported.pick_count(),
            };
            state.sources = imported.sources;
            state.games = imported.games;
            Ok(summary)
        })?;

        info!(
            "Imported board: {} sources, {} games, {} picks",
            summary.sources, summary.games, summary.picks
        );
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_persisted<S: KeyValueStore>(store: &S) -> Result<Option<BoardState>, PersistedStateError> {
    let Some(blob) = store.get(STORAGE_KEY).map_err(PersistedStateError::Read)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&blob)?))
}

fn not_found(kind: &'static str, id: &EntityId) -> TrackerError {
    TrackerError::NotFound {
        kind,
        id: id.clone(),
    }
}

fn set_pick_field(
    state: &mut BoardState,
    ids: &mut dyn IdGenerator,
    game_id: &EntityId,
    pick_id: &EntityId,
    field: PickField,
    value: &str,
) -> Result<(), TrackerError> {
    let game = state
        .find_game_mut(game_id)
        .ok_or_else(|| not_found("game", game_id))?;
    let pick = game
        .find_pick_mut(pick_id)
        .ok_or_else(|| not_found("pick", pick_id))?;

    match field {
        PickField::Confidence => pick.confidence = Confidence::parse(value),
        PickField::Choice => pick.choice = value.to_string(),
        PickField::Notes => pick.notes = value.to_string(),
        PickField::Source => {
            let source = value.trim().to_string();
            pick.source.clone_from(&source);
            if ensure_source(state, ids, &source) {
                info!("Registered new source {:?} from pick", source);
            }
        }
    }
    Ok(())
}

fn needs_source(state: &BoardState, name: &str) -> bool {
    !name.trim().is_empty() && state.find_source_by_name(name).is_none()
}

/// Append a bare source for `name` if none matches. Returns whether one was
/// added.
fn ensure_source(state: &mut BoardState, ids: &mut dyn IdGenerator, name: &str) -> bool {
    if !needs_source(state, name) {
        return false;
    }
    state.sources.push(Source {
        id: ids.next_id(),
        name: name.trim().to_string(),
        kind: String::new(),
        url: String::new(),
    });
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Sequential ids make assertions readable.
    struct CountingIds(u32);

    impl IdGenerator for CountingIds {
        fn next_id(&mut self) -> EntityId {
            self.0 += 1;
            EntityId::new(format!("id-{}", self.0))
        }
    }

    /// Store whose writes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: Arc<AtomicBool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(anyhow!("disk full"));
            }
            self.inner.set(key, value)
        }
    }

    fn empty_tracker() -> PickTracker<MemoryStore> {
        let store = MemoryStore::with_entry(STORAGE_KEY, r#"{"sources":[],"games":[]}"#);
        PickTracker::load_with_ids(store, Box::new(CountingIds(0)))
    }

    fn stored_blob(tracker: &PickTracker<MemoryStore>) -> Option<String> {
        tracker.store().get(STORAGE_KEY).unwrap()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    #[test]
    fn load_without_blob_uses_example_board() {
        let tracker = PickTracker::load(MemoryStore::new());
        assert_eq!(tracker.sources().len(), 3);
        assert_eq!(tracker.games()[0].name, "Lions @ Packers");
        assert_eq!(tracker.store().write_count(), 0);
    }

    #[test]
    fn load_with_corrupt_blob_uses_example_board() {
        let store = MemoryStore::with_entry(STORAGE_KEY, "{ this is not json");
        let tracker = PickTracker::load(store);
        assert_eq!(tracker.games().len(), 1);
        assert_eq!(tracker.games()[0].name, "Lions @ Packers");
    }

    #[test]
    fn load_normalizes_legacy_shapes() {
        let store = MemoryStore::with_entry(
            STORAGE_KEY,
            r#"{ "games": [{ "id": "g1", "name": "Bills @ Dolphins", "tags": "AFC East, , Weather" }] }"#,
        );
        let tracker = PickTracker::load(store);
        assert!(tracker.sources().is_empty());
        let game = &tracker.games()[0];
        assert_eq!(game.tags, vec!["AFC East", "Weather"]);
        assert!(game.picks.is_empty());
        assert_eq!(game.id.as_str(), "g1");
    }

    #[test]
    fn load_fills_in_missing_ids() {
        let store = MemoryStore::with_entry(
            STORAGE_KEY,
            r#"{ "sources": [{ "name": "Action Network" }], "games": [] }"#,
        );
        let tracker = PickTracker::load_with_ids(store, Box::new(CountingIds(0)));
        assert_eq!(tracker.sources()[0].id.as_str(), "id-1");
    }

    #[test]
    fn load_treats_null_picks_as_empty() {
        let store = MemoryStore::with_entry(
            STORAGE_KEY,
            r#"{"sources":[],"games":[{"id":"g1","name":"My Game","picks":null}]}"#,
        );
        let tracker = PickTracker::load(store);
        assert_eq!(tracker.games().len(), 1);
        assert_eq!(tracker.games()[0].name, "My Game");
        assert!(tracker.games()[0].picks.is_empty());
    }

    #[test]
    fn load_treats_null_collections_and_text_as_empty() {
        let store = MemoryStore::with_entry(
            STORAGE_KEY,
            r#"{
                "sources": null,
                "games": [{
                    "id": "g1", "name": "Bears @ Vikings", "kickoff": null, "tags": null,
                    "notes": null, "archived": null,
                    "picks": [{ "id": "p1", "source": null, "choice": "Bears +3", "confidence": null, "notes": null }]
                }]
            }"#,
        );
        let tracker = PickTracker::load(store);
        assert!(tracker.sources().is_empty());
        let game = &tracker.games()[0];
        assert_eq!(game.name, "Bears @ Vikings");
        assert_eq!(game.kickoff, "");
        assert!(game.tags.is_empty());
        assert_eq!(game.notes, "");
        assert!(!game.archived);
        assert_eq!(game.picks[0].source, "");
        assert_eq!(game.picks[0].choice, "Bears +3");
        assert_eq!(game.picks[0].notes, "");
    }

    #[test]
    fn load_with_null_games_keeps_sources() {
        let store = MemoryStore::with_entry(
            STORAGE_KEY,
            r#"{"sources":[{"id":"s1","name":"Action Network","type":null,"url":null}],"games":null}"#,
        );
        let tracker = PickTracker::load(store);
        assert!(tracker.games().is_empty());
        assert_eq!(tracker.sources()[0].name, "Action Network");
        assert_eq!(tracker.sources()[0].kind, "");
    }

    // ------------------------------------------------------------------
    // Games
    // ------------------------------------------------------------------

    #[test]
    fn add_game_prepends_and_persists() {
        let mut tracker = empty_tracker();
        tracker.add_game("Jets @ Bills", "", "", "").unwrap();
        let id = tracker
            .add_game("  Eagles @ Cowboys ", "2025-09-04T20:20", "NFC East, Opener,,", " Season opener ")
            .unwrap();

        let game = &tracker.games()[0];
        assert_eq!(game.id, id);
        assert_eq!(game.name, "Eagles @ Cowboys");
        assert_eq!(game.kickoff, "2025-09-04T20:20");
        assert_eq!(game.tags, vec!["NFC East", "Opener"]);
        assert_eq!(game.notes, "Season opener");
        assert!(!game.archived);
        assert!(game.picks.is_empty());
        assert_eq!(tracker.games()[1].name, "Jets @ Bills");
        assert_eq!(tracker.store().write_count(), 2);
    }

    #[test]
    fn add_game_with_blank_name_is_a_no_op() {
        let mut tracker = empty_tracker();
        let before = stored_blob(&tracker);
        let err = tracker.add_game("   ", "", "Tag", "").unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput { field: "name" }));
        assert!(tracker.games().is_empty());
        assert_eq!(tracker.store().write_count(), 0);
        assert_eq!(stored_blob(&tracker), before);
    }

    #[test]
    fn remove_game_filters_by_id() {
        let mut tracker = empty_tracker();
        let keep = tracker.add_game("Keep", "", "", "").unwrap();
        let drop = tracker.add_game("Drop", "", "", "").unwrap();
        assert!(tracker.remove_game(&drop).unwrap());
        assert_eq!(tracker.games().len(), 1);
        assert_eq!(tracker.games()[0].id, keep);
    }

    #[test]
    fn remove_unknown_game_does_not_persist() {
        let mut tracker = empty_tracker();
        assert!(!tracker.remove_game(&EntityId::new("missing")).unwrap());
        assert_eq!(tracker.store().write_count(), 0);
    }

    #[test]
    fn duplicate_game_appends_deep_copy() {
        let mut tracker = empty_tracker();
        let original = tracker.add_game("Lions @ Bears", "", "NFC North", "").unwrap();
        tracker.add_game("Other", "", "", "").unwrap();
        let pick = tracker.add_pick(&original).unwrap();
        tracker
            .update_pick_field(&original, &pick, PickField::Choice, "Lions -3")
            .unwrap();

        let copy_id = tracker.duplicate_game(&original).unwrap();
        let copy = tracker.games().last().unwrap().clone();
        assert_eq!(copy.id, copy_id);
        assert_ne!(copy.id, original);
        assert_eq!(copy.name, "Lions @ Bears (copy)");
        assert_eq!(copy.tags, vec!["NFC North"]);
        assert_eq!(copy.picks.len(), 1);
        assert_ne!(copy.picks[0].id, pick);
        assert_eq!(copy.picks[0].choice, "Lions -3");

        tracker
            .update_pick_field(&copy_id, &copy.picks[0].id, PickField::Choice, "Bears +3")
            .unwrap();
        let original_game = tracker.game(&original).unwrap();
        assert_eq!(original_game.picks[0].choice, "Lions -3");
    }

    #[test]
    fn duplicate_unknown_game_is_not_found() {
        let mut tracker = empty_tracker();
        let err = tracker.duplicate_game(&EntityId::new("nope")).unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: "game", .. }));
        assert_eq!(tracker.store().write_count(), 0);
    }

    #[test]
    fn toggle_archive_flips_in_place() {
        let mut tracker = empty_tracker();
        let id = tracker.add_game("Saints @ Falcons", "", "", "").unwrap();
        assert!(tracker.toggle_archive(&id).unwrap());
        assert!(tracker.game(&id).unwrap().archived);
        assert!(!tracker.toggle_archive(&id).unwrap());
        assert!(!tracker.game(&id).unwrap().archived);
        assert_eq!(tracker.games().len(), 1);
    }

    #[test]
    fn update_game_notes_stores_verbatim() {
        let mut tracker = empty_tracker();
        let id = tracker.add_game("Texans @ Colts", "", "", "").unwrap();
        tracker.update_game_notes(&id, "  QB questionable  ").unwrap();
        assert_eq!(tracker.game(&id).unwrap().notes, "  QB questionable  ");
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    #[test]
    fn add_source_appends_trimmed() {
        let mut tracker = empty_tracker();
        tracker.add_source("First", "", "").unwrap();
        tracker
            .add_source(" Bet The Board ", " Podcast ", " https://example.com ")
            .unwrap();
        let last = tracker.sources().last().unwrap();
        assert_eq!(last.name, "Bet The Board");
        assert_eq!(last.kind, "Podcast");
        assert_eq!(last.url, "https://example.com");
        assert_eq!(tracker.sources()[0].name, "First");
    }

    #[test]
    fn add_source_with_blank_name_is_rejected() {
        let mut tracker = empty_tracker();
        assert!(matches!(
            tracker.add_source("", "Model", "https://x").unwrap_err(),
            TrackerError::InvalidInput { .. }
        ));
        assert!(tracker.sources().is_empty());
        assert_eq!(tracker.store().write_count(), 0);
    }

    #[test]
    fn ensure_source_exists_is_case_insensitive_and_idempotent() {
        let mut tracker = empty_tracker();
        assert!(tracker.ensure_source_exists("Sharp Football Analysis").unwrap());
        assert!(!tracker.ensure_source_exists("sharp football analysis").unwrap());
        assert!(!tracker.ensure_source_exists("Sharp Football Analysis").unwrap());
        assert_eq!(tracker.sources().len(), 1);
        let source = &tracker.sources()[0];
        assert_eq!(source.name, "Sharp Football Analysis");
        assert_eq!(source.kind, "");
        assert_eq!(source.url, "");
        assert_eq!(tracker.store().write_count(), 1);
    }

    #[test]
    fn ensure_source_ignores_blank_name() {
        let mut tracker = empty_tracker();
        assert!(!tracker.ensure_source_exists("  ").unwrap());
        assert!(tracker.sources().is_empty());
    }

    #[test]
    fn remove_source_keeps_pick_text() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Bengals @ Browns", "", "", "").unwrap();
        let pick = tracker.add_pick(&game).unwrap();
        tracker
            .update_pick_field(&game, &pick, PickField::Source, "Warren Sharp")
            .unwrap();
        let source_id = tracker.sources()[0].id.clone();

        assert!(tracker.remove_source(&source_id).unwrap());
        assert!(tracker.sources().is_empty());
        assert_eq!(tracker.game(&game).unwrap().picks[0].source, "Warren Sharp");
        assert!(!tracker.remove_source(&source_id).unwrap());
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    #[test]
    fn add_pick_appends_blank_row() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Chiefs @ Chargers", "", "", "").unwrap();
        let first = tracker.add_pick(&game).unwrap();
        let second = tracker.add_pick(&game).unwrap();
        let picks = &tracker.game(&game).unwrap().picks;
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].id, first);
        assert_eq!(picks[1].id, second);
        assert_eq!(picks[1], Pick::blank(second.clone()));
    }

    #[test]
    fn add_pick_with_fields_is_one_write() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Jaguars @ Titans", "", "", "").unwrap();
        let writes = tracker.store().write_count();

        let pick = tracker
            .add_pick_with(
                &game,
                &[
                    (PickField::Source, " Establish The Run "),
                    (PickField::Choice, "Jaguars -3"),
                    (PickField::Confidence, "72"),
                ],
            )
            .unwrap();

        assert_eq!(tracker.store().write_count(), writes + 1);
        let stored = tracker.game(&game).unwrap().find_pick(&pick).unwrap();
        assert_eq!(stored.source, "Establish The Run");
        assert_eq!(stored.choice, "Jaguars -3");
        assert_eq!(stored.confidence.map(Confidence::value), Some(72.0));
        assert_eq!(tracker.source_names(), vec!["Establish The Run"]);
    }

    #[test]
    fn add_pick_with_fields_adds_nothing_when_write_fails() {
        let fail = Arc::new(AtomicBool::new(false));
        let store = FlakyStore {
            inner: MemoryStore::with_entry(STORAGE_KEY, r#"{"sources":[],"games":[]}"#),
            fail_writes: Arc::clone(&fail),
        };
        let mut tracker = PickTracker::load_with_ids(store, Box::new(CountingIds(0)));
        let game = tracker.add_game("Colts @ Texans", "", "", "").unwrap();
        let saved = tracker.store().get(STORAGE_KEY).unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = tracker
            .add_pick_with(&game, &[(PickField::Source, "Warren Sharp"), (PickField::Choice, "Colts +2")])
            .unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert!(tracker.game(&game).unwrap().picks.is_empty());
        assert!(tracker.sources().is_empty());
        assert_eq!(tracker.store().get(STORAGE_KEY).unwrap(), saved);
    }

    #[test]
    fn add_pick_to_unknown_game_fails() {
        let mut tracker = empty_tracker();
        assert!(matches!(
            tracker.add_pick(&EntityId::new("nope")).unwrap_err(),
            TrackerError::NotFound { kind: "game", .. }
        ));
    }

    #[test]
    fn remove_pick_filters_by_id() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Giants @ Commanders", "", "", "").unwrap();
        let a = tracker.add_pick(&game).unwrap();
        let b = tracker.add_pick(&game).unwrap();
        assert!(tracker.remove_pick(&game, &a).unwrap());
        let picks = &tracker.game(&game).unwrap().picks;
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].id, b);
        assert!(!tracker.remove_pick(&game, &a).unwrap());
    }

    #[test]
    fn update_confidence_coerces() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Panthers @ Bucs", "", "", "").unwrap();
        let pick = tracker.add_pick(&game).unwrap();
        let conf = |t: &PickTracker<MemoryStore>| {
            t.game(&game).unwrap().picks[0].confidence.map(Confidence::value)
        };

        tracker.update_pick_field(&game, &pick, PickField::Confidence, "150").unwrap();
        assert_eq!(conf(&tracker), Some(100.0));
        tracker.update_pick_field(&game, &pick, PickField::Confidence, "-5").unwrap();
        assert_eq!(conf(&tracker), Some(0.0));
        tracker.update_pick_field(&game, &pick, PickField::Confidence, "64").unwrap();
        assert_eq!(conf(&tracker), Some(64.0));
        tracker.update_pick_field(&game, &pick, PickField::Confidence, "").unwrap();
        assert_eq!(conf(&tracker), None);
        tracker.update_pick_field(&game, &pick, PickField::Confidence, "high").unwrap();
        assert_eq!(conf(&tracker), None);
    }

    #[test]
    fn update_source_trims_and_registers_source() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Seahawks @ Rams", "", "", "").unwrap();
        let pick = tracker.add_pick(&game).unwrap();
        tracker
            .update_pick_field(&game, &pick, PickField::Source, "  Establish The Run ")
            .unwrap();
        assert_eq!(tracker.game(&game).unwrap().picks[0].source, "Establish The Run");
        assert_eq!(tracker.source_names(), vec!["Establish The Run"]);

        let other = tracker.add_pick(&game).unwrap();
        tracker
            .update_pick_field(&game, &other, PickField::Source, "establish the run")
            .unwrap();
        assert_eq!(tracker.sources().len(), 1);
    }

    #[test]
    fn update_choice_and_notes_are_verbatim() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Cardinals @ 49ers", "", "", "").unwrap();
        let pick = tracker.add_pick(&game).unwrap();
        tracker.update_pick_field(&game, &pick, PickField::Choice, " 49ers -7 ").unwrap();
        tracker.update_pick_field(&game, &pick, PickField::Notes, "Travel spot. ").unwrap();
        let stored = &tracker.game(&game).unwrap().picks[0];
        assert_eq!(stored.choice, " 49ers -7 ");
        assert_eq!(stored.notes, "Travel spot. ");
        assert!(tracker.sources().is_empty());
    }

    #[test]
    fn update_unknown_pick_is_not_found() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Broncos @ Raiders", "", "", "").unwrap();
        let err = tracker
            .update_pick_field(&game, &EntityId::new("nope"), PickField::Choice, "X")
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: "pick", .. }));
    }

    #[test]
    fn consensus_follows_pick_edits() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Ravens @ Steelers", "", "", "").unwrap();
        for (choice, conf) in [("Ravens -3", "60"), ("Ravens -3", "80"), ("Steelers +3", "50")] {
            let pick = tracker.add_pick(&game).unwrap();
            tracker.update_pick_field(&game, &pick, PickField::Choice, choice).unwrap();
            tracker.update_pick_field(&game, &pick, PickField::Confidence, conf).unwrap();
        }
        let c = tracker.consensus(&game).unwrap();
        assert_eq!(c.percent, 67);
        assert_eq!(c.top().unwrap().choice, "Ravens -3");

        let last = tracker.game(&game).unwrap().picks[2].id.clone();
        tracker.update_pick_field(&game, &last, PickField::Choice, "Ravens -3").unwrap();
        assert_eq!(tracker.consensus(&game).unwrap().percent, 100);
        assert!(tracker.consensus(&EntityId::new("nope")).is_none());
    }

    // ------------------------------------------------------------------
    // Persistence failures
    // ------------------------------------------------------------------

    #[test]
    fn failed_write_rolls_back_mutation() {
        let fail = Arc::new(AtomicBool::new(false));
        let store = FlakyStore {
            inner: MemoryStore::with_entry(STORAGE_KEY, r#"{"sources":[],"games":[]}"#),
            fail_writes: Arc::clone(&fail),
        };
        let mut tracker = PickTracker::load_with_ids(store, Box::new(CountingIds(0)));
        let game = tracker.add_game("Vikings @ Lions", "", "", "").unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = tracker.add_game("Packers @ Bears", "", "", "").unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert_eq!(tracker.games().len(), 1);

        assert!(tracker.toggle_archive(&game).is_err());
        assert!(!tracker.game(&game).unwrap().archived);

        fail.store(false, Ordering::SeqCst);
        assert!(tracker.toggle_archive(&game).unwrap());
    }

    #[test]
    fn saved_blob_round_trips_through_load() {
        let mut tracker = empty_tracker();
        let game = tracker.add_game("Titans @ Jaguars", "2025-10-12T13:00", "AFC South", "").unwrap();
        let pick = tracker.add_pick(&game).unwrap();
        tracker.update_pick_field(&game, &pick, PickField::Confidence, "55.5").unwrap();

        let blob = stored_blob(&tracker).unwrap();
        let reloaded = PickTracker::load(MemoryStore::with_entry(STORAGE_KEY, &blob));
        assert_eq!(reloaded.state(), tracker.state());
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    #[test]
    fn export_names_file_by_date() {
        let tracker = empty_tracker();
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let snap = tracker.export_snapshot_on(date).unwrap();
        assert_eq!(snap.file_name, "pick-insights-2025-11-30.json");
        assert!(snap.contents.contains("\"games\": []"));
    }

    #[test]
    fn import_replaces_board_with_fresh_ids() {
        let mut tracker = empty_tracker();
        tracker.add_game("Old game", "", "", "").unwrap();
        let raw = r#"{
            "sources": [{ "id": "s1", "name": "PFF Forecast", "type": "Analytics", "url": "" }],
            "games": [{ "id": "g1", "name": "Dolphins @ Patriots", "kickoff": "", "tags": ["AFC East"],
                        "notes": "", "archived": true,
                        "picks": [{ "id": "p1", "source": "PFF Forecast", "choice": "Dolphins -1", "confidence": 58, "notes": "" }] }]
        }"#;

        let summary = tracker.import_snapshot(raw).unwrap();
        assert_eq!(summary, ImportSummary { sources: 1, games: 1, picks: 1 });
        assert_eq!(tracker.games().len(), 1);
        let game = &tracker.games()[0];
        assert_eq!(game.name, "Dolphins @ Patriots");
        assert!(game.archived);
        assert_ne!(game.id.as_str(), "g1");
        assert_ne!(game.picks[0].id.as_str(), "p1");
        assert_ne!(tracker.sources()[0].id.as_str(), "s1");
    }

    #[test]
    fn import_accepts_null_fields_inside_entities() {
        let mut tracker = empty_tracker();
        let raw = r#"{
            "sources": [{ "id": null, "name": "PFF Forecast", "type": null, "url": null }],
            "games": [{ "id": "g1", "name": "Rams @ 49ers", "notes": null, "picks": [
                { "id": "p1", "source": null, "choice": "Rams +3", "confidence": 61, "notes": null }
            ] }, { "id": "g2", "name": "Empty", "picks": null }]
        }"#;

        let summary = tracker.import_snapshot(raw).unwrap();
        assert_eq!(summary, ImportSummary { sources: 1, games: 2, picks: 1 });
        let pick = &tracker.games()[0].picks[0];
        assert_eq!(pick.source, "");
        assert_eq!(pick.choice, "Rams +3");
        assert!(tracker.games()[1].picks.is_empty());
        assert!(!tracker.sources()[0].id.as_str().is_empty());
    }

    #[test]
    fn rejected_import_leaves_board_untouched() {
        let mut tracker = empty_tracker();
        tracker.add_game("Keep me", "", "", "").unwrap();
        let before_state = tracker.state().clone();
        let before_blob = stored_blob(&tracker);
        let writes = tracker.store().write_count();

        let err = tracker.import_snapshot(r#"{ "sources": [] }"#).unwrap_err();
        assert!(matches!(err, TrackerError::Import(ImportError::Format { .. })));
        let err = tracker.import_snapshot("not json").unwrap_err();
        assert!(matches!(err, TrackerError::Import(ImportError::Syntax(_))));

        assert_eq!(tracker.state(), &before_state);
        assert_eq!(stored_blob(&tracker), before_blob);
        assert_eq!(tracker.store().write_count(), writes);
    }
}
