// Plain-text rendering of the board, a single game card, and sources.

use std::io::{self, Write};

use pickboard_core::board::game::Game;
use pickboard_core::board::ids::EntityId;
use pickboard_core::board::source::Source;
use pickboard_core::consensus::{self, Consensus};

/// Width of the consensus meter and breakdown bars, in cells.
const BAR_CELLS: usize = 24;

/// Leading characters of an id, enough to type back in as a prefix.
pub fn short_id(id: &EntityId) -> &str {
    let raw = id.as_str();
    match raw.char_indices().nth(8) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}

fn bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_CELLS as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

fn kickoff_text(game: &Game) -> Option<String> {
    match game.kickoff_time() {
        Some(t) => Some(t.format("%a %b %-d %Y, %H:%M").to_string()),
        None if !game.kickoff.trim().is_empty() => Some(game.kickoff.clone()),
        None => None,
    }
}

fn tag_text(game: &Game) -> String {
    game.tags
        .iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per game with its consensus.
pub fn games<W: Write + ?Sized>(out: &mut W, games: &[Game], include_archived: bool) -> io::Result<()> {
    let visible: Vec<&Game> = games
        .iter()
        .filter(|g| include_archived || !g.archived)
        .collect();

    if visible.is_empty() {
        writeln!(out, "No games yet. Add your first matchup to get started!")?;
        return Ok(());
    }

    for game in visible {
        let mut parts = vec![format!("{}  {}", short_id(&game.id), game.name)];
        if game.archived {
            parts.push("[archived]".into());
        }
        if let Some(kickoff) = kickoff_text(game) {
            parts.push(kickoff);
        }
        if !game.tags.is_empty() {
            parts.push(tag_text(game));
        }
        parts.push(consensus::compute(&game.picks).label());
        writeln!(out, "{}", parts.join("  ·  "))?;
    }
    Ok(())
}

/// Full game card: details, pick rows, consensus meter and breakdown.
pub fn game<W: Write + ?Sized>(out: &mut W, game: &Game, consensus: &Consensus) -> io::Result<()> {
    let archived = if game.archived { "  [archived]" } else { "" };
    writeln!(out, "{}{}", game.name, archived)?;
    writeln!(out, "id: {}", game.id)?;

    let mut meta = Vec::new();
    if let Some(kickoff) = kickoff_text(game) {
        meta.push(kickoff);
    }
    if !game.tags.is_empty() {
        meta.push(tag_text(game));
    }
    if !meta.is_empty() {
        writeln!(out, "{}", meta.join(" • "))?;
    }
    if !game.notes.is_empty() {
        writeln!(out, "notes: {}", game.notes)?;
    }

    writeln!(out)?;
    writeln!(out, "Picks")?;
    if game.picks.is_empty() {
        writeln!(out, "  Add your first pick for this matchup!")?;
    }
    for (n, pick) in game.picks.iter().enumerate() {
        let confidence = pick
            .confidence
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        let source = if pick.source.is_empty() { "-" } else { pick.source.as_str() };
        let choice = if pick.choice.trim().is_empty() { "-" } else { pick.choice.as_str() };
        write!(
            out,
            "  {:>2}. {}  {:<28} {:<20} {:>5}",
            n + 1,
            short_id(&pick.id),
            source,
            choice,
            confidence
        )?;
        if pick.notes.is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, "  {}", pick.notes)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Consensus")?;
    writeln!(out, "  {} {}", bar(consensus.percent as f64), consensus.label())?;

    writeln!(out)?;
    writeln!(out, "Breakdown")?;
    if consensus.is_empty() {
        writeln!(out, "  Log picks to generate a breakdown.")?;
        return Ok(());
    }
    for row in &consensus.breakdown {
        writeln!(out, "  {}  {}", row.choice, row.detail())?;
        writeln!(out, "  {}", bar(row.bar_width))?;
        for note in &row.notes {
            writeln!(out, "    - {note}")?;
        }
    }
    Ok(())
}

pub fn sources<W: Write + ?Sized>(out: &mut W, sources: &[Source]) -> io::Result<()> {
    if sources.is_empty() {
        writeln!(out, "Add the podcasts, models, and insiders you trust.")?;
        return Ok(());
    }
    for source in sources {
        let mut line = format!("{}  {}", short_id(&source.id), source.name);
        if !source.kind.is_empty() {
            line.push_str(&format!("  ({})", source.kind));
        }
        if !source.url.is_empty() {
            line.push_str(&format!("  {}", source.url));
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pickboard_core::board::ids::UuidGenerator;
    use pickboard_core::board::state::BoardState;

    fn rendered(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn short_id_truncates_to_eight_chars() {
        assert_eq!(short_id(&EntityId::new("0123456789abcdef")), "01234567");
        assert_eq!(short_id(&EntityId::new("abc")), "abc");
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(100.0).chars().filter(|c| *c == '█').count(), BAR_CELLS);
        assert_eq!(bar(50.0).chars().filter(|c| *c == '█').count(), BAR_CELLS / 2);
        assert_eq!(bar(0.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(bar(150.0).chars().count(), BAR_CELLS);
    }

    #[test]
    fn game_list_shows_consensus_and_tags() {
        let state = BoardState::seeded(&mut UuidGenerator);
        let text = rendered(|out| games(out, &state.games, true));
        assert!(text.contains("Lions @ Packers"), "{text}");
        assert!(text.contains("#Divisional #Primetime"), "{text}");
        assert!(text.contains("50% like Lions -2.5 (1 of 2)"), "{text}");
    }

    #[test]
    fn archived_games_hidden_unless_requested() {
        let mut state = BoardState::seeded(&mut UuidGenerator);
        state.games[0].archived = true;
        let hidden = rendered(|out| games(out, &state.games, false));
        assert!(hidden.contains("No games yet"), "{hidden}");
        let shown = rendered(|out| games(out, &state.games, true));
        assert!(shown.contains("[archived]"), "{shown}");
    }

    #[test]
    fn game_card_lists_breakdown_and_notes() {
        let state = BoardState::seeded(&mut UuidGenerator);
        let g = &state.games[0];
        let c = consensus::compute(&g.picks);
        let text = rendered(|out| game(out, g, &c));
        assert!(text.contains("Lions -2.5  1 pick · Avg conf: 68"), "{text}");
        assert!(text.contains("- Sharp Football Analysis: Edge in EPA/play and explosive plays."), "{text}");
        assert!(text.contains("notes: Monitor weather"), "{text}");
    }

    #[test]
    fn empty_game_card_shows_prompts() {
        let g = Game {
            id: EntityId::new("g1"),
            name: "Bears @ Lions".into(),
            ..Game::default()
        };
        let c = consensus::compute(&g.picks);
        let text = rendered(|out| game(out, &g, &c));
        assert!(text.contains("Add your first pick for this matchup!"), "{text}");
        assert!(text.contains("No picks logged yet"), "{text}");
        assert!(text.contains("Log picks to generate a breakdown."), "{text}");
    }

    #[test]
    fn unparsed_kickoff_is_shown_raw() {
        let g = Game {
            kickoff: "Sunday night".into(),
            ..Game::default()
        };
        assert_eq!(kickoff_text(&g).as_deref(), Some("Sunday night"));
        let g = Game {
            kickoff: "2025-09-07T20:20".into(),
            ..Game::default()
        };
        assert_eq!(kickoff_text(&g).as_deref(), Some("Sun Sep 7 2025, 20:20"));
    }

    #[test]
    fn source_list_and_empty_state() {
        let state = BoardState::seeded(&mut UuidGenerator);
        let text = rendered(|out| sources(out, &state.sources));
        assert!(text.contains("The Ringer Gambling Show  (Podcast)  https://www.theringer.com/podcasts"), "{text}");
        let empty = rendered(|out| sources(out, &[]));
        assert!(empty.contains("Add the podcasts"), "{empty}");
    }
}
