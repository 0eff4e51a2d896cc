/// The recap pipeline: feed → ledger → checked facts → narrative → document.
///
/// Wires together game lookup, normalization, ledger building, the
/// consistency check, fact-locked narrative generation, and publishing.

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, FeedConfig, RecapConfig};
use crate::core::consistency::{check, Check, LedgerStatus};
use crate::core::document::RecapDocument;
use crate::core::generator::{GeneratorError, GrammarNarrator, NarrativeGenerator};
use crate::core::ledger::build_ledger;
use crate::core::normalize::normalize;
use crate::core::packager::{request_narrative, FactLock, FactSheet, NarrativeOutcome, RetryBudget};
use crate::publish::{DirectoryPublisher, PublishError, PublishReceipt, Publisher};
use crate::schema::score::{GameRef, Score};
use crate::schema::team::TeamSide;
use crate::source::stats::FileFeed;
use crate::source::{FeedSource, SourceError};

#[derive(Debug, Error)]
pub enum RecapError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error("feed quality too low: dropped {dropped} of {total} play records (limit {limit})")]
    FeedQuality {
        dropped: usize,
        total: usize,
        limit: f64,
    },
    #[error("team {team_id} is not playing in game {game_pk}")]
    TeamNotInGame { team_id: u32, game_pk: u64 },
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),
}

/// What a published run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub game: GameRef,
    pub document: RecapDocument,
    pub receipt: PublishReceipt,
    pub dropped_events: usize,
    pub status: LedgerStatus,
    pub narrative_attempts: u32,
}

/// How a run ended when nothing failed.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The team did not play on the date.
    NoGame { date: NaiveDate },
    /// The game is not final; nothing was published.
    Incomplete { game: GameRef, derived: Score },
    Published(Box<RunReport>),
}

/// One line per run, for logs and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcome: &'static str,
    pub detail: String,
}

impl RunOutcome {
    pub fn summary(&self) -> RunSummary {
        match self {
            RunOutcome::NoGame { date } => RunSummary {
                outcome: "no_game",
                detail: format!("no game on {}", date),
            },
            RunOutcome::Incomplete { game, .. } => RunSummary {
                outcome: "incomplete",
                detail: format!("game {} is not final", game.game_pk),
            },
            RunOutcome::Published(report) => RunSummary {
                outcome: "published",
                detail: format!(
                    "{} ({}) → {}",
                    report.document.headline,
                    if report.document.is_fact_only() {
                        "facts only"
                    } else {
                        "with narrative"
                    },
                    report.receipt.location
                ),
            },
        }
    }
}

/// The top-level recap engine. Built via `RecapPipeline::builder()`.
pub struct RecapPipeline {
    config: RecapConfig,
    source: Box<dyn FeedSource>,
    generator: Box<dyn NarrativeGenerator>,
    publisher: Box<dyn Publisher>,
}

/// Builder for constructing a `RecapPipeline`. Anything not supplied is
/// derived from the configuration.
pub struct RecapPipelineBuilder {
    config: RecapConfig,
    source: Option<Box<dyn FeedSource>>,
    generator: Option<Box<dyn NarrativeGenerator>>,
    publisher: Option<Box<dyn Publisher>>,
}

impl RecapPipeline {
    pub fn builder(config: RecapConfig) -> RecapPipelineBuilder {
        RecapPipelineBuilder {
            config,
            source: None,
            generator: None,
            publisher: None,
        }
    }

    pub fn config(&self) -> &RecapConfig {
        &self.config
    }

    /// Recap the team's game from the day before `now`, local time.
    pub fn run_for_yesterday<Tz: TimeZone>(
        &mut self,
        now: DateTime<Tz>,
    ) -> Result<RunOutcome, RecapError> {
        let date = self.config.yesterday(now)?;
        self.run(date)
    }

    /// Recap the team's game on `date`.
    pub fn run(&mut self, date: NaiveDate) -> Result<RunOutcome, RecapError> {
        let team_id = self.config.team.id;
        match self.source.find_game(team_id, date)? {
            Some(game) => self.run_game(game),
            None => {
                info!(team_id, %date, "no game found");
                Ok(RunOutcome::NoGame { date })
            }
        }
    }

    /// Recap a specific game.
    pub fn run_game(&mut self, game: GameRef) -> Result<RunOutcome, RecapError> {
        info!(game_pk = game.game_pk, date = %game.date, "recapping game");

        // 1. Bind the configured team to its side
        let teams = self.bind_teams(&game)?;

        // 2. Normalize the feed
        let raw = self.source.play_by_play(&game)?;
        let normalized = normalize(&raw);
        info!(
            records = normalized.total(),
            events = normalized.events.len(),
            dropped = normalized.dropped_count(),
            "normalized play-by-play"
        );
        if normalized.dropped_count() > 0 {
            warn!(
                dropped = normalized.dropped_count(),
                first = %normalized.dropped[0],
                "dropped malformed play records"
            );
        }

        // 3. Build the ledger
        let ledger = build_ledger(&normalized.events, &teams);

        // 4. Cross-check against the official final; unfinished games stop
        // here whatever the feed looks like
        let official = teams.authoritative(&self.source.final_tally(&game)?);
        let checked = match check(ledger, &official) {
            Check::Incomplete { derived } => {
                return Ok(RunOutcome::Incomplete { game, derived });
            }
            Check::Ready(checked) => checked,
        };
        if normalized.drop_rate() > self.config.max_drop_rate {
            return Err(RecapError::FeedQuality {
                dropped: normalized.dropped_count(),
                total: normalized.total(),
                limit: self.config.max_drop_rate,
            });
        }

        // 5. Package facts and request a narrative
        let sheet = FactSheet::package(&checked, &teams);
        let lock = FactLock::new(&sheet).require_final_score(self.config.require_final_score);
        let outcome = request_narrative(
            self.generator.as_mut(),
            &sheet,
            &lock,
            RetryBudget::new(self.config.narrative_attempts),
        );
        if let NarrativeOutcome::Withheld { reasons, .. } = &outcome {
            warn!(reasons = %reasons.join(" | "), "publishing fact-only recap");
        }

        // 6. Assemble and publish
        let document = RecapDocument::assemble(&sheet, game.date, &outcome);
        let receipt = self.publisher.publish(&document)?;

        Ok(RunOutcome::Published(Box::new(RunReport {
            game,
            document,
            receipt,
            dropped_events: normalized.dropped_count(),
            status: checked.status(),
            narrative_attempts: outcome.attempts(),
        })))
    }

    /// The configured display name replaces the feed's for the subject; the
    /// feed's name and configured aliases still match in prose.
    fn bind_teams(&self, game: &GameRef) -> Result<TeamSide, RecapError> {
        let team = &self.config.team;
        let mut teams = TeamSide::for_team(game.home.clone(), game.away.clone(), team.id)
            .ok_or(RecapError::TeamNotInGame {
                team_id: team.id,
                game_pk: game.game_pk,
            })?;
        let subject = teams.subject_mut();
        let feed_name = std::mem::replace(&mut subject.name, team.name.clone());
        for alias in std::iter::once(&feed_name).chain(team.aliases.iter()) {
            if !subject.aliases.contains(alias) && *alias != subject.name {
                subject.aliases.push(alias.clone());
            }
        }
        Ok(teams)
    }
}

impl RecapPipelineBuilder {
    pub fn source(mut self, source: impl FeedSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn generator(mut self, generator: impl NarrativeGenerator + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Some(Box::new(publisher));
        self
    }

    pub fn build(self) -> Result<RecapPipeline, RecapError> {
        self.config.validate()?;

        let source = match self.source {
            Some(source) => source,
            None => default_source(&self.config.feed)?,
        };

        let generator: Box<dyn NarrativeGenerator> = match self.generator {
            Some(generator) => generator,
            None => match &self.config.grammar_path {
                Some(path) => Box::new(GrammarNarrator::from_path(path, self.config.seed)?),
                None => Box::new(GrammarNarrator::builtin(self.config.seed)?),
            },
        };

        let publisher = match self.publisher {
            Some(publisher) => publisher,
            None => Box::new(DirectoryPublisher::new(
                self.config.output.dir.clone(),
                &self.config.output.file_name,
            )),
        };

        Ok(RecapPipeline {
            config: self.config,
            source,
            generator,
            publisher,
        })
    }
}

fn default_source(feed: &FeedConfig) -> Result<Box<dyn FeedSource>, RecapError> {
    match feed {
        FeedConfig::Files { dir } => Ok(Box::new(FileFeed::new(dir.clone()))),
        #[cfg(feature = "http")]
        FeedConfig::StatsApi { base_url } => Ok(Box::new(
            crate::source::http::StatsApiClient::new(base_url),
        )),
        #[cfg(not(feature = "http"))]
        FeedConfig::StatsApi { .. } => Err(RecapError::Config(ConfigError::Invalid(
            "the StatsApi feed needs the `http` feature".to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::TextPublisher;
    use crate::schema::event::RawEvent;
    use crate::schema::score::FinalTally;
    use crate::schema::team::Team;
    use crate::source::memory::MemoryFeed;

    fn game() -> GameRef {
        GameRef {
            game_pk: 9,
            date: NaiveDate::from_ymd_opt(2026, 6, 2).unwrap(),
            home: Team::new(119, "Los Angeles Dodgers"),
            away: Team::new(137, "San Francisco Giants"),
        }
    }

    #[test]
    fn bind_teams_applies_configured_name() {
        let mut config = RecapConfig::for_team(137, "Giants");
        config.team.aliases = vec!["SF".to_string()];
        let pipeline = RecapPipeline::builder(config)
            .source(MemoryFeed::new())
            .publisher(TextPublisher::new(Vec::new(), "buffer"))
            .build()
            .unwrap();
        let teams = pipeline.bind_teams(&game()).unwrap();
        assert_eq!(teams.subject().name, "Giants");
        assert_eq!(teams.subject().aliases, vec!["San Francisco Giants", "SF"]);
        assert_eq!(teams.opponent().name, "Los Angeles Dodgers");
    }

    #[test]
    fn team_not_in_game() {
        let feed = MemoryFeed::new().with_game(
            game(),
            vec![RawEvent::new(1, "top", "Out.")],
            Some(FinalTally::default()),
        );
        let mut pipeline = RecapPipeline::builder(RecapConfig::for_team(147, "Yankees"))
            .source(feed)
            .publisher(TextPublisher::new(Vec::new(), "buffer"))
            .build()
            .unwrap();
        assert!(matches!(
            pipeline.run_game(game()),
            Err(RecapError::TeamNotInGame { team_id: 147, game_pk: 9 })
        ));
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn stats_api_without_http_feature_is_config_error() {
        let mut config = RecapConfig::for_team(137, "Giants");
        config.feed = FeedConfig::StatsApi {
            base_url: "https://statsapi.mlb.com".to_string(),
        };
        assert!(matches!(
            RecapPipeline::builder(config).build(),
            Err(RecapError::Config(_))
        ));
    }

    #[test]
    fn invalid_config_rejected_at_build() {
        let mut config = RecapConfig::for_team(137, "Giants");
        config.max_drop_rate = 2.0;
        assert!(matches!(
            RecapPipeline::builder(config).source(MemoryFeed::new()).build(),
            Err(RecapError::Config(_))
        ));
    }

    #[test]
    fn run_summary_for_no_game() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 2).unwrap();
        let summary = RunOutcome::NoGame { date }.summary();
        assert_eq!(summary.outcome, "no_game");
        assert_eq!(summary.detail, "no game on 2026-06-02");
    }
}
