use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::team::{Side, Team};

/// A score seen from the subject team's side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub subject: u32,
    pub opponent: u32,
}

impl Score {
    pub fn new(subject: u32, opponent: u32) -> Self {
        Self { subject, opponent }
    }

    /// The leading side, or `None` when level.
    pub fn leader(&self) -> Option<Side> {
        match self.subject.cmp(&self.opponent) {
            std::cmp::Ordering::Greater => Some(Side::Subject),
            std::cmp::Ordering::Less => Some(Side::Opponent),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn margin(&self) -> u32 {
        self.subject.abs_diff(self.opponent)
    }

    /// Runs for one side.
    pub fn runs(&self, side: Side) -> u32 {
        match side {
            Side::Subject => self.subject,
            Side::Opponent => self.opponent,
        }
    }

    /// The score as an unordered pair, larger number first.
    pub fn pair(&self) -> (u32, u32) {
        (
            self.subject.max(self.opponent),
            self.subject.min(self.opponent),
        )
    }
}

/// Identifies one game in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRef {
    pub game_pk: u64,
    pub date: NaiveDate,
    pub home: Team,
    pub away: Team,
}

/// The feed's official totals, by home/away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTally {
    pub home: u32,
    pub away: u32,
    pub is_complete: bool,
}

/// The official result seen from the subject team's side. Used to
/// cross-check a ledger, never to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativeResult {
    pub subject_final: u32,
    pub opponent_final: u32,
    pub is_complete: bool,
}

impl AuthoritativeResult {
    pub fn score(&self) -> Score {
        Score::new(self.subject_final, self.opponent_final)
    }
}
