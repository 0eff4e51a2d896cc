//! Stats API document shapes and a file-backed feed over saved documents.
//!
//! Three documents are read, all JSON as the API serves them:
//!
//! - schedule (`/api/v1/schedule?sportId=1&teamId=..&date=..`): games by
//!   date with teams, status, and scores;
//! - play-by-play (`/api/v1/game/{gamePk}/playByPlay`): `allPlays` in order;
//! - a schedule filtered by `gamePk`, used for the official final.
//!
//! [`FileFeed`] expects them under one directory:
//!
//! ```text
//! {dir}/schedule/{YYYY-MM-DD}.json
//! {dir}/games/{gamePk}/playByPlay.json
//! {dir}/games/{gamePk}/result.json
//! ```

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{FeedSource, SourceError};
use crate::schema::event::RawEvent;
use crate::schema::score::{FinalTally, GameRef};
use crate::schema::team::Team;

/// Detailed states that end a game without a result.
const NO_RESULT_STATES: &[&str] = &["Postponed", "Cancelled", "Suspended"];

#[derive(Debug, Clone, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub games: Vec<ScheduledGame>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledGame {
    pub game_pk: u64,
    pub status: GameStatus,
    pub teams: ScheduledTeams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub abstract_game_state: String,
    #[serde(default)]
    pub detailed_state: String,
}

impl GameStatus {
    pub fn is_complete(&self) -> bool {
        self.abstract_game_state == "Final"
            && !NO_RESULT_STATES.contains(&self.detailed_state.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledTeams {
    pub home: ScheduledTeam,
    pub away: ScheduledTeam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledTeam {
    pub team: TeamInfo,
    #[serde(default)]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamInfo {
    pub id: u32,
    pub name: String,
}

impl From<&TeamInfo> for Team {
    fn from(info: &TeamInfo) -> Self {
        Team::new(info.id, &info.name)
    }
}

impl Schedule {
    pub fn parse(json: &str) -> Result<Schedule, SourceError> {
        Ok(serde_json::from_str(json)?)
    }

    fn games(&self) -> impl Iterator<Item = (NaiveDate, &ScheduledGame)> {
        self.dates
            .iter()
            .flat_map(|d| d.games.iter().map(move |g| (d.date, g)))
    }

    /// The first game on `date` involving `team_id`. A doubleheader yields
    /// its first game.
    pub fn find_game(&self, team_id: u32, date: NaiveDate) -> Option<GameRef> {
        let mut matching = self.games().filter(|(d, g)| {
            *d == date && (g.teams.home.team.id == team_id || g.teams.away.team.id == team_id)
        });
        let (date, game) = matching.next()?;
        let others = matching.count();
        if others > 0 {
            debug!(game_pk = game.game_pk, others, "multiple games on date; using the first");
        }
        Some(GameRef {
            game_pk: game.game_pk,
            date,
            home: Team::from(&game.teams.home.team),
            away: Team::from(&game.teams.away.team),
        })
    }

    /// Official totals for `game_pk`. Missing scores count as zero.
    pub fn tally(&self, game_pk: u64) -> Option<FinalTally> {
        self.games()
            .find(|(_, g)| g.game_pk == game_pk)
            .map(|(_, g)| FinalTally {
                home: g.teams.home.score.unwrap_or(0),
                away: g.teams.away.score.unwrap_or(0),
                is_complete: g.status.is_complete(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayByPlay {
    #[serde(default)]
    pub all_plays: Vec<Play>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Play {
    pub about: PlayAbout,
    pub result: PlayResult,
    /// Absent on some feeds; when absent, runs come from the description.
    pub runners: Option<Vec<Runner>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayAbout {
    pub inning: Option<u32>,
    pub half_inning: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayResult {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Runner {
    pub details: RunnerDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnerDetails {
    pub is_scoring_event: bool,
}

impl Play {
    pub fn to_raw(&self) -> RawEvent {
        RawEvent {
            inning: self.about.inning,
            half: self.about.half_inning.clone(),
            description: self.result.description.clone(),
            runs: self.runners.as_ref().map(|runners| {
                runners.iter().filter(|r| r.details.is_scoring_event).count() as u32
            }),
        }
    }
}

impl PlayByPlay {
    pub fn parse(json: &str) -> Result<PlayByPlay, SourceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn raw_events(&self) -> Vec<RawEvent> {
        self.all_plays.iter().map(Play::to_raw).collect()
    }
}

/// Reads saved stats API documents from a directory.
#[derive(Debug, Clone)]
pub struct FileFeed {
    dir: PathBuf,
}

impl FileFeed {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, path: PathBuf) -> Result<String, SourceError> {
        debug!(path = %path.display(), "reading feed document");
        std::fs::read_to_string(&path).map_err(|source| SourceError::Io { path, source })
    }

    fn game_dir(&self, game: &GameRef) -> PathBuf {
        self.dir.join("games").join(game.game_pk.to_string())
    }
}

impl FeedSource for FileFeed {
    fn find_game(&self, team_id: u32, date: NaiveDate) -> Result<Option<GameRef>, SourceError> {
        let path = self
            .dir
            .join("schedule")
            .join(format!("{}.json", date.format("%Y-%m-%d")));
        let schedule = Schedule::parse(&self.read(path)?)?;
        Ok(schedule.find_game(team_id, date))
    }

    fn play_by_play(&self, game: &GameRef) -> Result<Vec<RawEvent>, SourceError> {
        let feed = PlayByPlay::parse(&self.read(self.game_dir(game).join("playByPlay.json"))?)?;
        info!(game_pk = game.game_pk, plays = feed.all_plays.len(), "loaded play-by-play");
        Ok(feed.raw_events())
    }

    fn final_tally(&self, game: &GameRef) -> Result<FinalTally, SourceError> {
        let schedule = Schedule::parse(&self.read(self.game_dir(game).join("result.json"))?)?;
        schedule.tally(game.game_pk).ok_or(SourceError::Missing {
            what: "final score",
            game_pk: game.game_pk,
        })
    }
}
