// Board state: the root aggregate of sources and games, persisted as one blob.

use serde::{Deserialize, Serialize};

use super::game::Game;
use super::ids::{EntityId, IdGenerator};
use super::pick::{Confidence, Pick};
use super::source::Source;

/// Everything the tracker persists. Field names are the on-disk format shared
/// with exported snapshot files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BoardState {
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub sources: Vec<Source>,
    #[serde(default, deserialize_with = "crate::board::null_as_default")]
    pub games: Vec<Game>,
}

impl BoardState {
    /// The example dataset shown on first launch.
    pub fn seeded(ids: &mut dyn IdGenerator) -> Self {
        let sources = vec![
            Source {
                id: ids.next_id(),
                name: "Sharp Football Analysis".into(),
                kind: "Model".into(),
                url: "https://www.sharpfootballanalysis.com/".into(),
            },
            Source {
                id: ids.next_id(),
                name: "The Ringer Gambling Show".into(),
                kind: "Podcast".into(),
                url: "https://www.theringer.com/podcasts".into(),
            },
            Source {
                id: ids.next_id(),
                name: "PFF Forecast".into(),
                kind: "Analytics".into(),
                url: "https://www.pff.com/podcasts/the-forecast".into(),
            },
        ];

        let games = vec![Game {
            id: ids.next_id(),
            name: "Lions @ Packers".into(),
            kickoff: String::new(),
            tags: vec!["Divisional".into(), "Primetime".into()],
            notes: "Monitor weather at Lambeau and offensive line injuries.".into(),
            archived: false,
            picks: vec![
                Pick {
                    id: ids.next_id(),
                    source: "Sharp Football Analysis".into(),
                    choice: "Lions -2.5".into(),
                    confidence: Confidence::new(68.0),
                    notes: "Edge in EPA/play and explosive plays.".into(),
                },
                Pick {
                    id: ids.next_id(),
                    source: "PFF Forecast".into(),
                    choice: "Packers +2.5".into(),
                    confidence: Confidence::new(60.0),
                    notes: "Numbers show value on the home dog.".into(),
                },
            ],
        }];

        BoardState { sources, games }
    }

    pub fn find_game(&self, game_id: &EntityId) -> Option<&Game> {
        self.games.iter().find(|g| &g.id == game_id)
    }

    pub fn find_game_mut(&mut self, game_id: &EntityId) -> Option<&mut Game> {
        self.games.iter_mut().find(|g| &g.id == game_id)
    }

    /// Case-insensitive lookup by source name.
    pub fn find_source_by_name(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.matches_name(name))
    }

    /// Give every source, game and pick a fresh id, discarding whatever ids
    /// they arrived with.
    pub fn reassign_ids(&mut self, ids: &mut dyn IdGenerator) {
        for source in &mut self.sources {
            source.id = ids.next_id();
        }
        for game in &mut self.games {
            game.id = ids.next_id();
            for pick in &mut game.picks {
                pick.id = ids.next_id();
            }
        }
    }

    /// Fill in ids for entities stored without one. Returns how many were
    /// assigned.
    pub fn assign_missing_ids(&mut self, ids: &mut dyn IdGenerator) -> usize {
        let mut assigned = 0;
        let mut fill = |id: &mut EntityId| {
            if id.as_str().is_empty() {
                *id = ids.next_id();
                assigned += 1;
            }
        };
        for source in &mut self.sources {
            fill(&mut source.id);
        }
        for game in &mut self.games {
            fill(&mut game.id);
            for pick in &mut game.picks {
                fill(&mut pick.id);
            }
        }
        assigned
    }

    pub fn pick_count(&self) -> usize {
        self.games.iter().map(|g| g.picks.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
