/// Consistency checker — cross-checks a built ledger against the official
/// final score.

use serde::Serialize;
use tracing::{info, warn};

use crate::core::ledger::{ScoreLedger, ScoringEntry};
use crate::schema::score::{AuthoritativeResult, Score};

/// How a checked ledger relates to the official result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LedgerStatus {
    /// Play-by-play totals equal the official totals.
    Verified,
    /// Play-by-play totals disagreed; `derived` is what the plays added up to.
    Reconciled { derived: Score },
}

/// A ledger that passed the completion gate, carrying the final score to
/// publish. The timeline is the builder's, unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckedLedger {
    timeline: Vec<ScoringEntry>,
    final_score: Score,
    status: LedgerStatus,
    inferred_entries: usize,
}

impl CheckedLedger {
    pub fn timeline(&self) -> &[ScoringEntry] {
        &self.timeline
    }

    pub fn final_score(&self) -> Score {
        self.final_score
    }

    pub fn status(&self) -> LedgerStatus {
        self.status
    }

    pub fn is_reconciled(&self) -> bool {
        matches!(self.status, LedgerStatus::Reconciled { .. })
    }

    pub fn inferred_entries(&self) -> usize {
        self.inferred_entries
    }
}

/// Result of the completion gate and total comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// The game is not over; nothing may be published.
    Incomplete { derived: Score },
    /// Verified or reconciled; safe to package.
    Ready(CheckedLedger),
}

/// Compare a ledger against the official result for the same game.
pub fn check(ledger: ScoreLedger, official: &AuthoritativeResult) -> Check {
    let derived = ledger.final_score();
    if !official.is_complete {
        info!(
            subject = derived.subject,
            opponent = derived.opponent,
            "game not final; nothing to report"
        );
        return Check::Incomplete { derived };
    }

    let inferred_entries = ledger.inferred_entries();
    let official_score = official.score();
    let status = if derived == official_score {
        LedgerStatus::Verified
    } else {
        warn!(
            derived_subject = derived.subject,
            derived_opponent = derived.opponent,
            official_subject = official_score.subject,
            official_opponent = official_score.opponent,
            "play-by-play totals disagree with official final; using official score"
        );
        LedgerStatus::Reconciled { derived }
    };

    Check::Ready(CheckedLedger {
        timeline: ledger.into_timeline(),
        final_score: official_score,
        status,
        inferred_entries,
    })
}
