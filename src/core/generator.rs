/// Narrative generators — the contract the packager drives, and a local
/// grammar-driven implementation of it.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use thiserror::Error;

use crate::core::consistency::LedgerStatus;
use crate::core::grammar::{GrammarError, GrammarSet, SelectionContext};
use crate::core::ledger::ScoringEntry;
use crate::core::packager::FactSheet;
use crate::schema::event::Half;
use crate::schema::team::Side;

/// Entry rules a recap grammar must define, one per outcome.
pub const ENTRY_RULES: &[&str] = &["win_recap", "loss_recap", "tie_recap"];

/// Fact slots the grammar narrator fills.
pub const FACT_SLOTS: &[&str] = &[
    "subject",
    "opponent",
    "winner",
    "loser",
    "subject_runs",
    "opponent_runs",
    "score",
    "margin",
    "key_play",
    "key_inning",
];

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

/// One request to a narrative generator.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    /// Structured facts, for generators that do not read prose.
    pub sheet: &'a FactSheet,
    pub fact_block: &'a str,
    pub instruction: &'a str,
    /// 1-based; attempts after the first carry a strengthened instruction.
    pub attempt: u32,
}

/// Produces free text for a fact-locked request.
pub trait NarrativeGenerator {
    fn generate(&mut self, request: &NarrativeRequest<'_>) -> Result<String, GeneratorError>;
}

impl<F> NarrativeGenerator for F
where
    F: FnMut(&NarrativeRequest<'_>) -> Result<String, GeneratorError>,
{
    fn generate(&mut self, request: &NarrativeRequest<'_>) -> Result<String, GeneratorError> {
        self(request)
    }
}

/// Writes recaps by expanding a recap grammar with the sheet's facts.
/// Output is a pure function of the grammar, seed, sheet, and attempt.
#[derive(Debug, Clone)]
pub struct GrammarNarrator {
    grammars: GrammarSet,
    seed: u64,
}

impl GrammarNarrator {
    pub fn new(grammars: GrammarSet, seed: u64) -> Self {
        Self { grammars, seed }
    }

    /// Narrator over the grammar bundled with the crate.
    pub fn builtin(seed: u64) -> Result<Self, GeneratorError> {
        Ok(Self::new(GrammarSet::builtin()?, seed))
    }

    /// Narrator over the bundled grammar with rules from `path` layered on top.
    pub fn from_path(path: &Path, seed: u64) -> Result<Self, GeneratorError> {
        let mut grammars = GrammarSet::builtin()?;
        grammars.merge(GrammarSet::load_from_ron(path)?);
        Ok(Self::new(grammars, seed))
    }

    pub fn grammars(&self) -> &GrammarSet {
        &self.grammars
    }

    /// Selection tags and slot values for a fact sheet.
    pub fn context_for(sheet: &FactSheet) -> SelectionContext {
        let mut ctx = SelectionContext::new();
        let score = sheet.final_score();
        let (high, low) = score.pair();
        let winner = sheet.winner();

        ctx.tag(match winner {
            Some(Side::Subject) => "outcome:win",
            Some(Side::Opponent) => "outcome:loss",
            None => "outcome:tie",
        });
        if winner.is_some() {
            ctx.tag(match score.margin() {
                1 => "margin:one_run",
                2 | 3 => "margin:close",
                4..=6 => "margin:comfortable",
                _ => "margin:blowout",
            });
            if low == 0 {
                ctx.tag("shutout");
            }
        }

        let timeline = sheet.timeline();
        if timeline.is_empty() {
            ctx.tag("no_scoring_plays");
        }
        if timeline.iter().any(|e| e.inning > 9) {
            ctx.tag("extra_innings");
        }
        if let Some(side) = winner {
            if timeline
                .iter()
                .any(|e| e.score_after().leader() == Some(side.other()))
            {
                ctx.tag(if side == Side::Subject {
                    "comeback"
                } else {
                    "blown_lead"
                });
            }
            if is_walk_off(timeline, side) {
                ctx.tag("walk_off");
            }
        }
        if matches!(sheet.status(), LedgerStatus::Reconciled { .. }) {
            ctx.tag("reconciled");
        }

        ctx.slot("subject", sheet.subject().name.as_str());
        ctx.slot("opponent", sheet.opponent().name.as_str());
        ctx.slot("subject_runs", score.subject.to_string());
        ctx.slot("opponent_runs", score.opponent.to_string());
        ctx.slot("score", format!("{}-{}", high, low));
        ctx.slot("margin", score.margin().to_string());
        if let Some(side) = winner {
            ctx.slot("winner", sheet.team(side).name.as_str());
            ctx.slot("loser", sheet.team(side.other()).name.as_str());
        }
        if let Some(key) = key_play(timeline) {
            ctx.slot("key_play", key.description.as_str());
            ctx.slot("key_inning", inning_phrase(key.half, key.inning));
        }
        ctx
    }
}

impl NarrativeGenerator for GrammarNarrator {
    fn generate(&mut self, request: &NarrativeRequest<'_>) -> Result<String, GeneratorError> {
        let ctx = Self::context_for(request.sheet);
        let entry = match request.sheet.winner() {
            Some(Side::Subject) => "win_recap",
            Some(Side::Opponent) => "loss_recap",
            None => "tie_recap",
        };
        // prime offset per attempt so a retry draws different alternatives
        let mut rng = StdRng::seed_from_u64(
            self.seed
                .wrapping_add(u64::from(request.attempt.saturating_sub(1)) * 7919),
        );
        Ok(self.grammars.expand(entry, &ctx, &mut rng)?)
    }
}

/// The biggest scoring play; the earliest one wins ties.
fn key_play(timeline: &[ScoringEntry]) -> Option<&ScoringEntry> {
    timeline
        .iter()
        .fold(None, |best: Option<&ScoringEntry>, entry| match best {
            Some(b) if b.runs >= entry.runs => Some(b),
            _ => Some(entry),
        })
}

/// The final scoring play ended the game: home team, ninth or later,
/// turning a non-lead into the winning lead.
fn is_walk_off(timeline: &[ScoringEntry], winner: Side) -> bool {
    let Some((last, earlier)) = timeline.split_last() else {
        return false;
    };
    let before = earlier.last().map(|e| e.score_after()).unwrap_or_default();
    last.half == Half::Bottom
        && last.inning >= 9
        && last.credited == winner
        && before.leader() != Some(winner)
}

/// "the top of the 3rd", "the bottom of the 11th".
pub fn inning_phrase(half: Half, inning: u32) -> String {
    let suffix = match (inning % 10, inning % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!(
        "the {} of the {}{}",
        half.label().to_lowercase(),
        inning,
        suffix
    )
}
