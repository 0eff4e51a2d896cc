/// Pipeline integration tests — feed to published recap, end to end.

use chrono::NaiveDate;
use recap_engine::config::{FeedConfig, RecapConfig};
use recap_engine::core::consistency::LedgerStatus;
use recap_engine::core::generator::{GeneratorError, NarrativeRequest};
use recap_engine::core::pipeline::{RecapError, RecapPipeline, RunOutcome, RunReport};
use recap_engine::publish::{DirectoryPublisher, TextPublisher};
use recap_engine::schema::event::RawEvent;
use recap_engine::schema::score::{FinalTally, GameRef, Score};
use recap_engine::schema::team::Team;
use recap_engine::source::memory::MemoryFeed;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

const FIXTURE_FEEDS: &str = "tests/fixtures/feeds";

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

fn giants_config() -> RecapConfig {
    let mut config = RecapConfig::for_team(137, "Giants");
    config.feed = FeedConfig::Files {
        dir: FIXTURE_FEEDS.into(),
    };
    config.seed = 42;
    config
}

fn published(outcome: RunOutcome) -> RunReport {
    match outcome {
        RunOutcome::Published(report) => *report,
        other => panic!("expected a published recap, got {:?}", other),
    }
}

fn memory_game() -> GameRef {
    GameRef {
        game_pk: 1,
        date: date(1),
        home: Team::new(137, "San Francisco Giants"),
        away: Team::new(119, "Los Angeles Dodgers"),
    }
}

/// Giants (home) 3, Dodgers (away) 2 by the plays.
fn memory_plays() -> Vec<RawEvent> {
    vec![
        RawEvent::new(1, "top", "Betts homers (1) on a line drive to left field.").with_runs(1),
        RawEvent::new(2, "bottom", "Chapman doubles. Lee scores. Ramos scores.").with_runs(2),
        RawEvent::new(5, "top", "Smith singles. Freeman scores.").with_runs(1),
        RawEvent::new(7, "bottom", "Flores homers (9) to right field.").with_runs(1),
        RawEvent::new(9, "top", "Muncy grounds out.").with_runs(0),
    ]
}

fn memory_pipeline(tally: Option<FinalTally>) -> RecapPipeline {
    RecapPipeline::builder(RecapConfig::for_team(137, "Giants"))
        .source(MemoryFeed::new().with_game(memory_game(), memory_plays(), tally))
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap()
}

fn final_tally(home: u32, away: u32) -> Option<FinalTally> {
    Some(FinalTally {
        home,
        away,
        is_complete: true,
    })
}

#[test]
fn file_feed_recap_end_to_end() {
    let out = tempfile::tempdir().unwrap();
    let mut pipeline = RecapPipeline::builder(giants_config())
        .publisher(DirectoryPublisher::new(out.path(), "index.html"))
        .build()
        .unwrap();

    let report = published(pipeline.run(date(17)).unwrap());
    assert_eq!(report.game.game_pk, 776543);
    assert_eq!(report.dropped_events, 1);
    assert_eq!(report.status, LedgerStatus::Verified);
    assert_eq!(report.document.headline, "Giants Win!");

    let lines: Vec<&str> = report.document.fact_block.lines().collect();
    assert_eq!(lines[0], "Final: Giants 5, Los Angeles Dodgers 2");
    assert_eq!(
        lines[1],
        "Top 1: Mookie Betts homers (20) on a fly ball to left field. → Giants 0, Los Angeles Dodgers 1"
    );
    assert!(lines[3].starts_with("Top 6: Will Smith singles"));
    assert!(lines[3].ends_with("→ Giants 3, Los Angeles Dodgers 2"));
    assert_eq!(
        lines[5],
        "Note: run counts for 1 scoring play(s) were inferred from play descriptions."
    );

    // The bundled narrator stays inside the locked facts.
    let narrative = report.document.narrative.as_deref().unwrap();
    assert!(narrative.contains("Giants"));
    assert_eq!(report.narrative_attempts, 1);

    let html = std::fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(html.contains("<h1>Giants Win!</h1>"));
    assert!(html.contains("<li>Final: Giants 5, Los Angeles Dodgers 2</li>"));
}

#[test]
fn opponent_perspective_of_same_game() {
    let mut config = giants_config();
    config.team.id = 119;
    config.team.name = "Dodgers".to_string();
    let mut pipeline = RecapPipeline::builder(config)
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();

    let report = published(pipeline.run(date(17)).unwrap());
    assert_eq!(report.document.headline, "Dodgers Lose!");
    assert!(report
        .document
        .fact_block
        .starts_with("Final: Dodgers 2, San Francisco Giants 5"));
}

#[test]
fn fact_block_is_idempotent() {
    let render = || {
        let out = tempfile::tempdir().unwrap();
        let mut pipeline = RecapPipeline::builder(giants_config())
            .publisher(DirectoryPublisher::new(out.path(), "index.html"))
            .build()
            .unwrap();
        let report = published(pipeline.run(date(17)).unwrap());
        let html = std::fs::read_to_string(out.path().join("index.html")).unwrap();
        (report.document.fact_block, html)
    };
    let (first_block, first_html) = render();
    let (second_block, second_html) = render();
    assert_eq!(first_block, second_block);
    assert_eq!(first_html, second_html);
}

#[test]
fn no_game_is_clean_outcome() {
    let mut pipeline = RecapPipeline::builder(giants_config())
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();
    assert_eq!(
        pipeline.run(date(15)).unwrap(),
        RunOutcome::NoGame { date: date(15) }
    );
}

#[test]
fn live_game_is_gated() {
    let out = tempfile::tempdir().unwrap();
    let mut pipeline = RecapPipeline::builder(giants_config())
        .publisher(DirectoryPublisher::new(out.path(), "index.html"))
        .build()
        .unwrap();

    match pipeline.run(date(16)).unwrap() {
        RunOutcome::Incomplete { game, derived } => {
            assert_eq!(game.game_pk, 776510);
            assert_eq!(derived, Score::new(1, 0));
        }
        other => panic!("expected incomplete game, got {:?}", other),
    }
    assert!(!out.path().join("index.html").exists());
}

#[test]
fn missing_schedule_is_source_unavailable() {
    let mut pipeline = RecapPipeline::builder(giants_config())
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();
    assert!(matches!(
        pipeline.run(date(1)),
        Err(RecapError::SourceUnavailable(_))
    ));
}

#[test]
fn missing_official_result_is_source_unavailable() {
    let mut pipeline = memory_pipeline(None);
    let err = pipeline.run(date(1)).unwrap_err();
    assert!(matches!(err, RecapError::SourceUnavailable(_)));
}

#[test]
fn verified_memory_game() {
    let mut pipeline = memory_pipeline(final_tally(3, 2));
    let report = published(pipeline.run(date(1)).unwrap());
    assert_eq!(report.status, LedgerStatus::Verified);
    assert!(!report.document.reconciled);
    assert!(report
        .document
        .fact_block
        .starts_with("Final: Giants 3, Los Angeles Dodgers 2"));
}

#[test]
fn reconciliation_precedence() {
    // Plays add up to 3-2; the official final is 4-2.
    let mut pipeline = memory_pipeline(final_tally(4, 2));
    let report = published(pipeline.run(date(1)).unwrap());

    assert_eq!(
        report.status,
        LedgerStatus::Reconciled {
            derived: Score::new(3, 2)
        }
    );
    assert!(report.document.reconciled);
    let block = &report.document.fact_block;
    assert!(block.starts_with("Final: Giants 4, Los Angeles Dodgers 2"));
    assert!(block.contains("Note: the play-by-play adds up to Giants 3, Los Angeles Dodgers 2"));
    // Timeline lines are unchanged by reconciliation.
    assert!(block.contains("Bottom 7: Flores homers (9) to right field. → Giants 3, Los Angeles Dodgers 2"));
    if let Some(narrative) = &report.document.narrative {
        assert!(!narrative.contains("3-2"));
    }
}

#[test]
fn fact_lock_falls_back_to_facts_only() {
    let instructions = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&instructions);
    let generator = move |request: &NarrativeRequest<'_>| -> Result<String, GeneratorError> {
        seen.borrow_mut().push(request.instruction.to_string());
        Ok("Los Angeles Dodgers wins 6–5".to_string())
    };

    let mut pipeline = RecapPipeline::builder(RecapConfig::for_team(137, "Giants"))
        .source(MemoryFeed::new().with_game(memory_game(), memory_plays(), final_tally(3, 2)))
        .generator(generator)
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();

    let report = published(pipeline.run(date(1)).unwrap());
    assert!(report.document.is_fact_only());
    assert_eq!(report.narrative_attempts, 2);
    assert!(report.document.to_text().contains("Final: Giants 3, Los Angeles Dodgers 2"));
    assert!(!report.document.to_html().contains("6–5"));

    let instructions = instructions.borrow();
    assert_eq!(instructions.len(), 2);
    assert!(instructions[1].contains("states a 6-5 score that never occurred"));
}

#[test]
fn generator_outage_publishes_facts_only() {
    let generator = |_: &NarrativeRequest<'_>| -> Result<String, GeneratorError> {
        Err(GeneratorError::Unavailable("connection refused".to_string()))
    };
    let mut pipeline = RecapPipeline::builder(RecapConfig::for_team(137, "Giants"))
        .source(MemoryFeed::new().with_game(memory_game(), memory_plays(), final_tally(3, 2)))
        .generator(generator)
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();
    let report = published(pipeline.run(date(1)).unwrap());
    assert!(report.document.is_fact_only());
}

#[test]
fn drop_tolerance_end_to_end() {
    let mut plays = Vec::new();
    for i in 0..8u32 {
        let half = if i % 2 == 0 { "top" } else { "bottom" };
        plays.push(RawEvent::new(i / 2 + 1, half, "Strikeout.").with_runs(0));
    }
    plays.push(RawEvent {
        inning: None,
        ..RawEvent::new(5, "top", "Lineout.")
    });
    plays.push(RawEvent {
        half: Some("middle".to_string()),
        ..RawEvent::new(5, "top", "Walk.")
    });

    let mut pipeline = RecapPipeline::builder(RecapConfig::for_team(137, "Giants"))
        .source(MemoryFeed::new().with_game(memory_game(), plays, final_tally(0, 0)))
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();
    let report = published(pipeline.run(date(1)).unwrap());
    assert_eq!(report.dropped_events, 2);
    assert_eq!(report.document.headline, "Giants Tie");
    assert!(report.document.fact_block.contains("No scoring plays recorded."));
}

#[test]
fn unusable_feed_is_rejected() {
    let plays = vec![
        RawEvent::new(1, "top", "Strikeout."),
        RawEvent {
            inning: None,
            ..RawEvent::new(1, "top", "Walk.")
        },
        RawEvent {
            description: None,
            ..RawEvent::new(1, "top", "")
        },
        RawEvent::new(0, "top", "Single."),
    ];
    let mut pipeline = RecapPipeline::builder(RecapConfig::for_team(137, "Giants"))
        .source(MemoryFeed::new().with_game(memory_game(), plays, final_tally(0, 0)))
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();
    match pipeline.run(date(1)) {
        Err(RecapError::FeedQuality { dropped, total, .. }) => {
            assert_eq!(dropped, 3);
            assert_eq!(total, 4);
        }
        other => panic!("expected feed quality error, got {:?}", other.map(|o| o.summary().outcome)),
    }
}

#[test]
fn unfinished_game_with_messy_feed_is_incomplete() {
    let plays = vec![
        RawEvent::new(1, "top", "Betts homers (1) on a line drive to left field.").with_runs(1),
        RawEvent {
            inning: None,
            ..RawEvent::new(1, "bottom", "Walk.")
        },
        RawEvent {
            description: None,
            ..RawEvent::new(2, "top", "")
        },
    ];
    let tally = Some(FinalTally {
        home: 0,
        away: 1,
        is_complete: false,
    });
    let mut pipeline = RecapPipeline::builder(RecapConfig::for_team(137, "Giants"))
        .source(MemoryFeed::new().with_game(memory_game(), plays, tally))
        .publisher(TextPublisher::new(Vec::new(), "buffer"))
        .build()
        .unwrap();
    match pipeline.run(date(1)).unwrap() {
        RunOutcome::Incomplete { game, derived } => {
            assert_eq!(game.game_pk, 1);
            assert_eq!(derived, Score::new(0, 1));
        }
        other => panic!("expected incomplete game, got {:?}", other),
    }
}

#[test]
fn config_file_drives_pipeline() {
    let mut config = RecapConfig::load(Path::new("tests/fixtures/recap.ron")).unwrap();
    let out = tempfile::tempdir().unwrap();
    config.output.dir = out.path().to_path_buf();

    let mut pipeline = RecapPipeline::builder(config).build().unwrap();
    let report = published(pipeline.run(date(17)).unwrap());
    assert!(report.receipt.location.ends_with("index.html"));
    assert!(out.path().join("index.html").exists());
}
