use serde::{Deserialize, Serialize};

use super::event::Half;
use super::score::{AuthoritativeResult, FinalTally};

/// A club as named by the feed or the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    /// Other names the club goes by in prose ("SF", "San Francisco").
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Team {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            aliases: Vec::new(),
        }
    }

    /// Every name a recap might use for this club: the display name, its
    /// aliases, and the nickname (last word) of each multi-word name.
    /// Deduplicated, in first-seen order.
    pub fn match_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |candidate: &str| {
            let candidate = candidate.trim();
            if !candidate.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(candidate)) {
                names.push(candidate.to_string());
            }
        };
        for name in std::iter::once(&self.name).chain(self.aliases.iter()) {
            push(name);
            if let Some(nickname) = name.split_whitespace().last() {
                push(nickname);
            }
        }
        names
    }
}

/// Home or away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomeAway {
    Home,
    Away,
}

impl HomeAway {
    /// The team at bat in a given half-inning.
    pub fn batting(half: Half) -> HomeAway {
        match half {
            Half::Top => HomeAway::Away,
            Half::Bottom => HomeAway::Home,
        }
    }
}

/// Perspective of a recap: the subject team or its opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Subject,
    Opponent,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Self::Subject => Self::Opponent,
            Self::Opponent => Self::Subject,
        }
    }
}

/// Binding of home and away to clubs, with exactly one side marked as the
/// subject of the recap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSide {
    home: Team,
    away: Team,
    subject: HomeAway,
}

impl TeamSide {
    pub fn new(home: Team, away: Team, subject: HomeAway) -> Self {
        Self {
            home,
            away,
            subject,
        }
    }

    /// Bind the side whose team id matches `subject_id`. Returns `None` when
    /// the team is not playing in this game.
    pub fn for_team(home: Team, away: Team, subject_id: u32) -> Option<Self> {
        let subject = if home.id == Some(subject_id) {
            HomeAway::Home
        } else if away.id == Some(subject_id) {
            HomeAway::Away
        } else {
            return None;
        };
        Some(Self::new(home, away, subject))
    }

    pub fn subject_side(&self) -> HomeAway {
        self.subject
    }

    pub fn home(&self) -> &Team {
        &self.home
    }

    pub fn away(&self) -> &Team {
        &self.away
    }

    pub fn subject(&self) -> &Team {
        self.team(Side::Subject)
    }

    pub fn opponent(&self) -> &Team {
        self.team(Side::Opponent)
    }

    pub fn team(&self, side: Side) -> &Team {
        match (side, self.subject) {
            (Side::Subject, HomeAway::Home) | (Side::Opponent, HomeAway::Away) => &self.home,
            (Side::Subject, HomeAway::Away) | (Side::Opponent, HomeAway::Home) => &self.away,
        }
    }

    /// Mutable access to the subject club, used to apply configured names.
    pub fn subject_mut(&mut self) -> &mut Team {
        match self.subject {
            HomeAway::Home => &mut self.home,
            HomeAway::Away => &mut self.away,
        }
    }

    /// Which perspective a home/away side maps to.
    pub fn side_of(&self, home_away: HomeAway) -> Side {
        if home_away == self.subject {
            Side::Subject
        } else {
            Side::Opponent
        }
    }

    /// The side credited with runs scored in a half-inning.
    ///
    /// {Top, Bottom} × {Home, Away} → {Subject, Opponent}, spelled out.
    pub fn credited_side(&self, half: Half) -> Side {
        match (half, self.subject) {
            (Half::Top, HomeAway::Away) => Side::Subject,
            (Half::Top, HomeAway::Home) => Side::Opponent,
            (Half::Bottom, HomeAway::Home) => Side::Subject,
            (Half::Bottom, HomeAway::Away) => Side::Opponent,
        }
    }

    /// Re-express a home/away tally from the subject team's side.
    pub fn authoritative(&self, tally: &FinalTally) -> AuthoritativeResult {
        let (subject_final, opponent_final) = match self.subject {
            HomeAway::Home => (tally.home, tally.away),
            HomeAway::Away => (tally.away, tally.home),
        };
        AuthoritativeResult {
            subject_final,
            opponent_final,
            is_complete: tally.is_complete,
        }
    }
}
