//! Feed sources: where games, play-by-play, and official totals come from.

#[cfg(feature = "http")]
pub mod http;
pub mod memory;
pub mod stats;

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::schema::event::RawEvent;
use crate::schema::score::{FinalTally, GameRef};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("no {what} for game {game_pk}")]
    Missing { what: &'static str, game_pk: u64 },
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A provider of game data. Each call is a single blocking fetch.
pub trait FeedSource {
    /// The team's game on `date`, or `None` when it did not play.
    fn find_game(&self, team_id: u32, date: NaiveDate) -> Result<Option<GameRef>, SourceError>;

    /// Every play record for the game, in chronological order.
    fn play_by_play(&self, game: &GameRef) -> Result<Vec<RawEvent>, SourceError>;

    /// Official home/away totals and whether the game is over.
    fn final_tally(&self, game: &GameRef) -> Result<FinalTally, SourceError>;
}

impl<T: FeedSource + ?Sized> FeedSource for Box<T> {
    fn find_game(&self, team_id: u32, date: NaiveDate) -> Result<Option<GameRef>, SourceError> {
        (**self).find_game(team_id, date)
    }

    fn play_by_play(&self, game: &GameRef) -> Result<Vec<RawEvent>, SourceError> {
        (**self).play_by_play(game)
    }

    fn final_tally(&self, game: &GameRef) -> Result<FinalTally, SourceError> {
        (**self).final_tally(game)
    }
}
