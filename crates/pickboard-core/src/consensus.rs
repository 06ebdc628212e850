// Consensus and per-choice breakdown for a game's picks.
//
// Picks are grouped by their trimmed choice label. The most-picked choice is
// the consensus; every choice gets a row in the breakdown with its pick
// count, average confidence, bar width relative to the leader, and any notes
// attached to the picks behind it.

use std::collections::HashMap;
use std::fmt;

use crate::board::pick::Pick;

/// A `(source, notes)` pair shown under a breakdown row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickNote {
    pub source: String,
    pub notes: String,
}

impl fmt::Display for PickNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.notes)
    }
}

/// Aggregate stats for one distinct choice.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceBreakdown {
    pub choice: String,
    pub total: usize,
    pub confidence_sum: f64,
    /// How many picks in this group carried a confidence.
    pub confidence_count: usize,
    pub notes: Vec<PickNote>,
    /// `total` relative to the leading choice, 0-100.
    pub bar_width: f64,
}

impl ChoiceBreakdown {
    fn new(choice: &str) -> Self {
        ChoiceBreakdown {
            choice: choice.to_string(),
            total: 0,
            confidence_sum: 0.0,
            confidence_count: 0,
            notes: Vec::new(),
            bar_width: 0.0,
        }
    }

    /// Rounded `confidence_sum / total`, or `None` when no pick in the group
    /// recorded a confidence.
    pub fn average_confidence(&self) -> Option<u32> {
        if self.confidence_count == 0 || self.total == 0 {
            return None;
        }
        Some((self.confidence_sum / self.total as f64).round() as u32)
    }

    /// Row detail, e.g. `2 picks · Avg conf: 70`.
    pub fn detail(&self) -> String {
        let avg = self
            .average_confidence()
            .map_or_else(|| "—".to_string(), |a| a.to_string());
        let plural = if self.total == 1 { "" } else { "s" };
        format!("{} pick{} · Avg conf: {}", self.total, plural, avg)
    }
}

/// Consensus summary and ranked breakdown for one game.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Consensus {
    pub total_picks: usize,
    /// Share of all counted picks backing the leading choice, 0-100.
    pub percent: u32,
    /// Choices ordered by pick count, most popular first.
    pub breakdown: Vec<ChoiceBreakdown>,
}

impl Consensus {
    pub fn top(&self) -> Option<&ChoiceBreakdown> {
        self.breakdown.first()
    }

    pub fn is_empty(&self) -> bool {
        self.breakdown.is_empty()
    }

    /// Meter label, e.g. `67% like Lions -2.5 (2 of 3)`.
    pub fn label(&self) -> String {
        match self.top() {
            Some(top) => format!(
                "{}% like {} ({} of {})",
                self.percent, top.choice, top.total, self.total_picks
            ),
            None => "No picks logged yet".to_string(),
        }
    }
}

/// Derive the consensus for a set of picks. Never fails; an empty or
/// choice-less set yields an empty consensus.
pub fn compute(picks: &[Pick]) -> Consensus {
    let mut groups: Vec<ChoiceBreakdown> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for pick in picks {
        let key = pick.choice.trim();
        if key.is_empty() {
            continue;
        }

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(ChoiceBreakdown::new(key));
            groups.len() - 1
        });
        let group = &mut groups[slot];

        group.total += 1;
        if let Some(confidence) = pick.confidence {
            group.confidence_sum += confidence.value();
            group.confidence_count += 1;
        }
        if !pick.notes.is_empty() {
            group.notes.push(PickNote {
                source: pick.source.clone(),
                notes: pick.notes.clone(),
            });
        }
    }

    let total_picks: usize = groups.iter().map(|g| g.total).sum();

    // sort_by is stable, so equal counts keep first-seen order.
    groups.sort_by(|a, b| b.total.cmp(&a.total));

    let max_total = groups.first().map_or(0, |g| g.total);
    for group in &mut groups {
        group.bar_width = if max_total == 0 {
            0.0
        } else {
            group.total as f64 / max_total as f64 * 100.0
        };
    }

    let percent = if max_total == 0 {
        0
    } else {
        (max_total as f64 / total_picks.max(1) as f64 * 100.0).round() as u32
    };

    Consensus {
        total_picks,
        percent,
        breakdown: groups,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
