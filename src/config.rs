//! Run configuration, loaded from RON.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The team a recap is written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub id: u32,
    /// Display name used in headlines and fact blocks.
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Where game data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedConfig {
    /// Saved stats API documents under `dir`.
    Files { dir: PathBuf },
    /// The live stats API; needs the `http` feature.
    StatsApi { base_url: String },
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig::Files {
            dir: PathBuf::from("feeds"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: default_file_name(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_file_name() -> String {
    "index.html".to_string()
}

fn default_utc_offset_hours() -> i32 {
    -7
}

fn default_max_drop_rate() -> f64 {
    0.5
}

fn default_narrative_attempts() -> u32 {
    2
}

/// Everything a run needs to know, passed explicitly to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecapConfig {
    pub team: TeamConfig,
    /// Offset of the team's local time from UTC; "yesterday" is computed in it.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Extra grammar rules layered over the bundled grammar.
    #[serde(default)]
    pub grammar_path: Option<PathBuf>,
    #[serde(default)]
    pub seed: u64,
    /// Abort when more than this fraction of play records is malformed.
    #[serde(default = "default_max_drop_rate")]
    pub max_drop_rate: f64,
    #[serde(default)]
    pub require_final_score: bool,
    #[serde(default = "default_narrative_attempts")]
    pub narrative_attempts: u32,
}

impl RecapConfig {
    /// A configuration with defaults for everything but the team.
    pub fn for_team(id: u32, name: &str) -> Self {
        Self {
            team: TeamConfig {
                id,
                name: name.to_string(),
                aliases: Vec::new(),
            },
            utc_offset_hours: default_utc_offset_hours(),
            feed: FeedConfig::default(),
            output: OutputConfig::default(),
            grammar_path: None,
            seed: 0,
            max_drop_rate: default_max_drop_rate(),
            require_final_score: false,
            narrative_attempts: default_narrative_attempts(),
        }
    }

    pub fn load(path: &Path) -> Result<RecapConfig, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<RecapConfig, ConfigError> {
        let config: RecapConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.team.name.trim().is_empty() {
            return Err(ConfigError::Invalid("team name is empty".to_string()));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours {} is outside -12..=14",
                self.utc_offset_hours
            )));
        }
        if !(0.0..=1.0).contains(&self.max_drop_rate) {
            return Err(ConfigError::Invalid(format!(
                "max_drop_rate {} is outside 0.0..=1.0",
                self.max_drop_rate
            )));
        }
        if self.narrative_attempts == 0 {
            return Err(ConfigError::Invalid(
                "narrative_attempts must be at least 1".to_string(),
            ));
        }
        if self.output.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("output file_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            ConfigError::Invalid(format!("bad utc offset {}", self.utc_offset_hours))
        })
    }

    /// The day before `now`, in the team's local time.
    pub fn yesterday<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Result<NaiveDate, ConfigError> {
        let local = now.with_timezone(&self.offset()?).date_naive();
        local
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| ConfigError::Invalid("date out of range".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parse_full_config() {
        let config = RecapConfig::parse_ron(
            r#"(
                team: (id: 137, name: "Giants", aliases: ["San Francisco", "SF"]),
                utc_offset_hours: -8,
                feed: StatsApi(base_url: "https://statsapi.mlb.com"),
                output: (dir: "public", file_name: "recap.html"),
                grammar_path: Some("recap_data/extra.ron"),
                seed: 42,
                max_drop_rate: 0.25,
                require_final_score: true,
                narrative_attempts: 3,
            )"#,
        )
        .unwrap();
        assert_eq!(config.team.aliases, vec!["San Francisco", "SF"]);
        assert_eq!(
            config.feed,
            FeedConfig::StatsApi {
                base_url: "https://statsapi.mlb.com".to_string()
            }
        );
        assert_eq!(config.output.file_name, "recap.html");
        assert_eq!(config.seed, 42);
        assert!(config.require_final_score);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config = RecapConfig::parse_ron(r#"(team: (id: 137, name: "Giants"))"#).unwrap();
        assert_eq!(config, RecapConfig::for_team(137, "Giants"));
        assert_eq!(config.output.file_name, "index.html");
        assert_eq!(config.max_drop_rate, 0.5);
        assert_eq!(config.narrative_attempts, 2);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_rate = r#"(team: (id: 1, name: "A"), max_drop_rate: 1.5)"#;
        assert!(matches!(
            RecapConfig::parse_ron(bad_rate),
            Err(ConfigError::Invalid(_))
        ));
        let bad_offset = r#"(team: (id: 1, name: "A"), utc_offset_hours: 20)"#;
        assert!(matches!(
            RecapConfig::parse_ron(bad_offset),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RecapConfig::parse_ron("(seed: 1)"),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn yesterday_uses_local_offset() {
        let config = RecapConfig::for_team(137, "Giants");
        // 03:00 UTC on the 18th is 20:00 on the 17th at UTC-7.
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap();
        assert_eq!(
            config.yesterday(now).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
        );
        let later = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        assert_eq!(
            config.yesterday(later).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );
    }

    #[test]
    fn load_missing_file() {
        let err = RecapConfig::load(Path::new("/nonexistent/recap.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
