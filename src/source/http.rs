//! Blocking HTTP client for the stats API.

use chrono::NaiveDate;
use tracing::info;

use super::stats::{PlayByPlay, Schedule};
use super::{FeedSource, SourceError};
use crate::schema::event::RawEvent;
use crate::schema::score::{FinalTally, GameRef};

/// Stats API client.
pub struct StatsApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl StatsApiClient {
    /// `base_url` should be like `https://statsapi.mlb.com` (no trailing slash).
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, url: &str) -> Result<String, SourceError> {
        info!(url = %url, "fetching from stats API");
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SourceError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.text()?)
    }
}

impl FeedSource for StatsApiClient {
    fn find_game(&self, team_id: u32, date: NaiveDate) -> Result<Option<GameRef>, SourceError> {
        let url = format!(
            "{}/api/v1/schedule?sportId=1&teamId={}&date={}",
            self.base_url,
            team_id,
            date.format("%Y-%m-%d")
        );
        let schedule = Schedule::parse(&self.get(&url)?)?;
        Ok(schedule.find_game(team_id, date))
    }

    fn play_by_play(&self, game: &GameRef) -> Result<Vec<RawEvent>, SourceError> {
        let url = format!("{}/api/v1/game/{}/playByPlay", self.base_url, game.game_pk);
        let feed = PlayByPlay::parse(&self.get(&url)?)?;
        info!(game_pk = game.game_pk, plays = feed.all_plays.len(), "fetched play-by-play");
        Ok(feed.raw_events())
    }

    fn final_tally(&self, game: &GameRef) -> Result<FinalTally, SourceError> {
        let url = format!(
            "{}/api/v1/schedule?sportId=1&gamePk={}",
            self.base_url, game.game_pk
        );
        let schedule = Schedule::parse(&self.get(&url)?)?;
        schedule.tally(game.game_pk).ok_or(SourceError::Missing {
            what: "final score",
            game_pk: game.game_pk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = StatsApiClient::new("https://statsapi.mlb.com/");
        assert_eq!(client.base_url, "https://statsapi.mlb.com");
    }
}
