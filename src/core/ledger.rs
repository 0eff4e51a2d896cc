/// Scoring ledger — running score and scoring timeline built from
/// normalized play events.

use serde::Serialize;
use tracing::debug;

use crate::schema::event::{Half, NormalizedEvent, RunSource};
use crate::schema::score::Score;
use crate::schema::team::{Side, TeamSide};

/// One scoring play with the running score after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringEntry {
    pub sequence: u64,
    pub half: Half,
    pub inning: u32,
    pub description: String,
    pub credited: Side,
    pub runs: u32,
    pub runs_source: RunSource,
    pub subject_score_after: u32,
    pub opponent_score_after: u32,
}

impl ScoringEntry {
    pub fn score_after(&self) -> Score {
        Score::new(self.subject_score_after, self.opponent_score_after)
    }
}

/// An ordered scoring timeline with final totals. Immutable once built:
/// the totals always equal the last entry's running score, or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreLedger {
    timeline: Vec<ScoringEntry>,
    subject_final: u32,
    opponent_final: u32,
}

impl ScoreLedger {
    pub fn timeline(&self) -> &[ScoringEntry] {
        &self.timeline
    }

    pub fn subject_final(&self) -> u32 {
        self.subject_final
    }

    pub fn opponent_final(&self) -> u32 {
        self.opponent_final
    }

    pub fn final_score(&self) -> Score {
        Score::new(self.subject_final, self.opponent_final)
    }

    /// Entries whose run count came from the description heuristic.
    pub fn inferred_entries(&self) -> usize {
        self.timeline
            .iter()
            .filter(|e| e.runs_source == RunSource::Inferred)
            .count()
    }

    pub fn into_timeline(self) -> Vec<ScoringEntry> {
        self.timeline
    }
}

/// Accumulates scoring entries in sequence order.
struct LedgerBuilder<'a> {
    teams: &'a TeamSide,
    timeline: Vec<ScoringEntry>,
    running: Score,
}

impl<'a> LedgerBuilder<'a> {
    fn new(teams: &'a TeamSide) -> Self {
        Self {
            teams,
            timeline: Vec::new(),
            running: Score::default(),
        }
    }

    fn push(&mut self, event: &NormalizedEvent) {
        if event.runs_scored == 0 {
            return;
        }

        let credited = self.teams.credited_side(event.half);
        match credited {
            Side::Subject => {
                self.running.subject = self.running.subject.saturating_add(event.runs_scored)
            }
            Side::Opponent => {
                self.running.opponent = self.running.opponent.saturating_add(event.runs_scored)
            }
        }
        debug!(
            sequence = event.sequence,
            inning = event.inning,
            half = %event.half,
            runs = event.runs_scored,
            ?credited,
            "scoring play"
        );

        self.timeline.push(ScoringEntry {
            sequence: event.sequence,
            half: event.half,
            inning: event.inning,
            description: event.description.clone(),
            credited,
            runs: event.runs_scored,
            runs_source: event.runs_source,
            subject_score_after: self.running.subject,
            opponent_score_after: self.running.opponent,
        });
    }

    fn build(self) -> ScoreLedger {
        ScoreLedger {
            timeline: self.timeline,
            subject_final: self.running.subject,
            opponent_final: self.running.opponent,
        }
    }
}

/// Walk events in `sequence` order and build the scoring ledger.
pub fn build_ledger(events: &[NormalizedEvent], teams: &TeamSide) -> ScoreLedger {
    let mut ordered: Vec<&NormalizedEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.sequence);

    let mut builder = LedgerBuilder::new(teams);
    for event in ordered {
        builder.push(event);
    }
    builder.build()
}
