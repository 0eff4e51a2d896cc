//! In-memory feed for fixtures and tests.

use chrono::NaiveDate;
use std::cell::Cell;

use super::{FeedSource, SourceError};
use crate::schema::event::RawEvent;
use crate::schema::score::{FinalTally, GameRef};

#[derive(Debug, Clone)]
struct StoredGame {
    game: GameRef,
    plays: Vec<RawEvent>,
    tally: Option<FinalTally>,
}

/// Games held in memory. A game stored without a tally reports its official
/// result as missing.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    games: Vec<StoredGame>,
    fetches: Cell<usize>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game(mut self, game: GameRef, plays: Vec<RawEvent>, tally: Option<FinalTally>) -> Self {
        self.games.push(StoredGame { game, plays, tally });
        self
    }

    /// Number of play-by-play and tally fetches served so far.
    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }

    fn stored(&self, game: &GameRef) -> Result<&StoredGame, SourceError> {
        self.fetches.set(self.fetches.get() + 1);
        self.games
            .iter()
            .find(|g| g.game.game_pk == game.game_pk)
            .ok_or(SourceError::Missing {
                what: "game",
                game_pk: game.game_pk,
            })
    }
}

impl FeedSource for MemoryFeed {
    fn find_game(&self, team_id: u32, date: NaiveDate) -> Result<Option<GameRef>, SourceError> {
        Ok(self
            .games
            .iter()
            .map(|g| &g.game)
            .find(|g| {
                g.date == date && (g.home.id == Some(team_id) || g.away.id == Some(team_id))
            })
            .cloned())
    }

    fn play_by_play(&self, game: &GameRef) -> Result<Vec<RawEvent>, SourceError> {
        Ok(self.stored(game)?.plays.clone())
    }

    fn final_tally(&self, game: &GameRef) -> Result<FinalTally, SourceError> {
        self.stored(game)?.tally.ok_or(SourceError::Missing {
            what: "final score",
            game_pk: game.game_pk,
        })
    }
}
