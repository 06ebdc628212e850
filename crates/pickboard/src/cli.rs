//! CLI definition and dispatch onto the pick tracker.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use pickboard_core::board::ids::EntityId;
use pickboard_core::board::pick::PickField;
use pickboard_core::board::tracker::{PickTracker, TrackerError};
use pickboard_core::db::KeyValueStore;

use crate::render;

#[derive(Parser, Debug)]
#[command(name = "pickboard")]
#[command(version)]
#[command(about = "Track betting picks from podcasts, models and analysts, and see the consensus per game")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding config/ (default: current directory)
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Keep the board in memory only; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// List games with their consensus
    Games {
        /// Also list archived games
        #[arg(long)]
        all: bool,
    },
    /// Show one game's picks, consensus and breakdown
    Show {
        /// Game id, id prefix or name
        game: String,
    },
    /// List sources
    Sources,
    /// Add a game to the top of the board
    AddGame {
        name: String,
        /// Kickoff, e.g. 2025-09-07T20:20
        #[arg(long, default_value = "")]
        kickoff: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Add an information source
    AddSource {
        name: String,
        /// Kind of source, e.g. Podcast or Model
        #[arg(long = "type", default_value = "")]
        kind: String,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Delete a game and its picks
    RemoveGame {
        game: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete a source (picks keep the name)
    RemoveSource {
        /// Source id, id prefix or name
        source: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Copy a game and its picks to the end of the board
    Duplicate { game: String },
    /// Archive or unarchive a game
    Archive { game: String },
    /// Add a pick to a game
    AddPick {
        game: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        choice: Option<String>,
        /// 0-100; out-of-range values are clamped
        #[arg(long, allow_hyphen_values = true)]
        confidence: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove a pick from a game
    RemovePick {
        game: String,
        /// Pick id prefix or 1-based row number
        pick: String,
    },
    /// Edit one field of a pick (source, choice, confidence, notes)
    SetPick {
        game: String,
        pick: String,
        field: String,
        #[arg(default_value = "", allow_hyphen_values = true)]
        value: String,
    },
    /// Replace a game's notes
    Notes {
        game: String,
        #[arg(default_value = "")]
        text: String,
    },
    /// Write the board to pick-insights-<date>.json
    Export {
        /// Output directory (default: export.directory from config)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the board with the contents of an exported file
    Import { file: PathBuf },
}

/// Where command output goes and where confirmations are read from.
pub struct Console<'a> {
    pub out: &'a mut dyn Write,
    pub input: &'a mut dyn BufRead,
    pub export_dir: PathBuf,
}

impl Console<'_> {
    /// Ask a yes/no question; anything but "y"/"yes" declines.
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        write!(self.out, "{prompt} [y/N] ")?;
        self.out.flush()?;
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Execute one command against the tracker.
pub async fn execute<S: KeyValueStore>(
    command: Command,
    tracker: &mut PickTracker<S>,
    console: &mut Console<'_>,
) -> Result<()> {
    match command {
        Command::Games { all } => {
            render::games(&mut *console.out, tracker.games(), all)?;
        }
        Command::Show { game } => {
            let id = resolve_game(tracker, &game)?;
            let consensus = tracker
                .consensus(&id)
                .ok_or_else(|| anyhow!("game {game} disappeared"))?;
            if let Some(g) = tracker.game(&id) {
                render::game(&mut *console.out, g, &consensus)?;
            }
        }
        Command::Sources => {
            render::sources(&mut *console.out, tracker.sources())?;
        }
        Command::AddGame {
            name,
            kickoff,
            tags,
            notes,
        } => {
            let id = blank_is_silent(tracker.add_game(&name, &kickoff, &tags, &notes))?;
            if let Some(id) = id {
                writeln!(console.out, "Added game {} ({})", name.trim(), render::short_id(&id))?;
            }
        }
        Command::AddSource { name, kind, url } => {
            let id = blank_is_silent(tracker.add_source(&name, &kind, &url))?;
            if let Some(id) = id {
                writeln!(console.out, "Added source {} ({})", name.trim(), render::short_id(&id))?;
            }
        }
        Command::RemoveGame { game, yes } => {
            let id = resolve_game(tracker, &game)?;
            let name = tracker.game(&id).map(|g| g.name.clone()).unwrap_or_default();
            if !yes && !console.confirm(&format!("Remove {name}?"))? {
                writeln!(console.out, "Kept {name}")?;
                return Ok(());
            }
            tracker.remove_game(&id)?;
            writeln!(console.out, "Removed {name}")?;
        }
        Command::RemoveSource { source, yes } => {
            let id = resolve_source(tracker, &source)?;
            let name = tracker
                .sources()
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            if !yes && !console.confirm(&format!("Remove source {name}?"))? {
                writeln!(console.out, "Kept {name}")?;
                return Ok(());
            }
            tracker.remove_source(&id)?;
            writeln!(console.out, "Removed source {name}")?;
        }
        Command::Duplicate { game } => {
            let id = resolve_game(tracker, &game)?;
            let copy = tracker.duplicate_game(&id)?;
            let name = tracker.game(&copy).map(|g| g.name.as_str()).unwrap_or_default();
            writeln!(console.out, "Added {} ({})", name, render::short_id(&copy))?;
        }
        Command::Archive { game } => {
            let id = resolve_game(tracker, &game)?;
            let archived = tracker.toggle_archive(&id)?;
            let verb = if archived { "Archived" } else { "Unarchived" };
            let name = tracker.game(&id).map(|g| g.name.as_str()).unwrap_or_default();
            writeln!(console.out, "{verb} {name}")?;
        }
        Command::AddPick {
            game,
            source,
            choice,
            confidence,
            notes,
        } => {
            let game_id = resolve_game(tracker, &game)?;
            let fields: Vec<(PickField, &str)> = [
                (PickField::Source, &source),
                (PickField::Choice, &choice),
                (PickField::Confidence, &confidence),
                (PickField::Notes, &notes),
            ]
            .into_iter()
            .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
            .collect();
            let pick_id = tracker.add_pick_with(&game_id, &fields)?;
            writeln!(console.out, "Added pick {}", render::short_id(&pick_id))?;
            if source.is_none() {
                print_source_hint(tracker, console)?;
            }
            print_consensus(tracker, &game_id, console)?;
        }
        Command::RemovePick { game, pick } => {
            let game_id = resolve_game(tracker, &game)?;
            let pick_id = resolve_pick(tracker, &game_id, &pick)?;
            tracker.remove_pick(&game_id, &pick_id)?;
            writeln!(console.out, "Removed pick {}", render::short_id(&pick_id))?;
            print_consensus(tracker, &game_id, console)?;
        }
        Command::SetPick {
            game,
            pick,
            field,
            value,
        } => {
            let field = PickField::from_name(&field).ok_or_else(|| {
                anyhow!("unknown pick field {field:?}; expected source, choice, confidence or notes")
            })?;
            let game_id = resolve_game(tracker, &game)?;
            let pick_id = resolve_pick(tracker, &game_id, &pick)?;
            tracker.update_pick_field(&game_id, &pick_id, field, &value)?;
            writeln!(console.out, "Updated {field}")?;
            print_consensus(tracker, &game_id, console)?;
        }
        Command::Notes { game, text } => {
            let id = resolve_game(tracker, &game)?;
            tracker.update_game_notes(&id, &text)?;
            writeln!(console.out, "Updated notes")?;
        }
        Command::Export { out } => {
            let dir = out.unwrap_or_else(|| console.export_dir.clone());
            let snapshot = tracker.export_snapshot()?;
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let path = dir.join(&snapshot.file_name);
            tokio::fs::write(&path, snapshot.contents.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote export to {}", path.display());
            writeln!(console.out, "Exported to {}", path.display())?;
        }
        Command::Import { file } => {
            let raw = read_import(&file).await?;
            match tracker.import_snapshot(&raw) {
                Ok(summary) => writeln!(
                    console.out,
                    "Imported {} sources, {} games, {} picks",
                    summary.sources, summary.games, summary.picks
                )?,
                Err(TrackerError::Import(e)) => {
                    bail!("Unable to import file. Ensure it was exported from this tool. ({e})")
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

async fn read_import(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Blank names are rejected without complaint; other errors propagate.
fn blank_is_silent(result: Result<EntityId, TrackerError>) -> Result<Option<EntityId>> {
    match result {
        Ok(id) => Ok(Some(id)),
        Err(TrackerError::InvalidInput { field }) => {
            warn!("Ignored command with blank {}", field);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Sources already on the board, offered when a pick has none yet.
fn print_source_hint<S: KeyValueStore>(
    tracker: &PickTracker<S>,
    console: &mut Console<'_>,
) -> Result<()> {
    let names = tracker.source_names();
    if !names.is_empty() {
        writeln!(console.out, "Known sources: {}", names.join(", "))?;
    }
    Ok(())
}

fn print_consensus<S: KeyValueStore>(
    tracker: &PickTracker<S>,
    game_id: &EntityId,
    console: &mut Console<'_>,
) -> Result<()> {
    if let Some(consensus) = tracker.consensus(game_id) {
        writeln!(console.out, "{}", consensus.label())?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument resolution
// ---------------------------------------------------------------------------

/// Pick the single candidate matching `needle` by exact id, then id prefix,
/// then case-insensitive name.
fn resolve<'a>(
    kind: &str,
    needle: &str,
    candidates: impl Iterator<Item = (&'a EntityId, &'a str)> + Clone,
) -> Result<EntityId> {
    let needle = needle.trim();
    if needle.is_empty() {
        bail!("no {kind} given");
    }

    if let Some((id, _)) = candidates.clone().find(|(id, _)| id.as_str() == needle) {
        return Ok(id.clone());
    }

    let by_prefix: Vec<&EntityId> = candidates
        .clone()
        .filter(|(id, _)| id.as_str().starts_with(needle))
        .map(|(id, _)| id)
        .collect();
    match by_prefix.as_slice() {
        [one] => return Ok((*one).clone()),
        [] => {}
        _ => bail!("{kind} id prefix {needle:?} is ambiguous"),
    }

    let lowered = needle.to_lowercase();
    let by_name: Vec<&EntityId> = candidates
        .filter(|(_, name)| name.to_lowercase() == lowered)
        .map(|(id, _)| id)
        .collect();
    match by_name.as_slice() {
        [one] => Ok((*one).clone()),
        [] => bail!("no {kind} matches {needle:?}"),
        _ => bail!("{kind} name {needle:?} is ambiguous; use its id"),
    }
}

pub fn resolve_game<S: KeyValueStore>(tracker: &PickTracker<S>, needle: &str) -> Result<EntityId> {
    resolve(
        "game",
        needle,
        tracker.games().iter().map(|g| (&g.id, g.name.as_str())),
    )
}

pub fn resolve_source<S: KeyValueStore>(tracker: &PickTracker<S>, needle: &str) -> Result<EntityId> {
    resolve(
        "source",
        needle,
        tracker.sources().iter().map(|s| (&s.id, s.name.as_str())),
    )
}

/// Picks are addressed by 1-based row number or id prefix.
pub fn resolve_pick<S: KeyValueStore>(
    tracker: &PickTracker<S>,
    game_id: &EntityId,
    needle: &str,
) -> Result<EntityId> {
    let game = tracker
        .game(game_id)
        .ok_or_else(|| anyhow!("game {game_id} not found"))?;

    if let Ok(row) = needle.trim().parse::<usize>() {
        if let Some(pick) = row.checked_sub(1).and_then(|i| game.picks.get(i)) {
            return Ok(pick.id.clone());
        }
    }

    resolve(
        "pick",
        needle,
        game.picks.iter().map(|p| (&p.id, p.choice.as_str())),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
