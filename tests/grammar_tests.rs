/// Recap grammar loading and linting integration tests.

use recap_engine::core::generator::{ENTRY_RULES, FACT_SLOTS};
use recap_engine::core::grammar::{GrammarSet, SelectionContext};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn bundled_grammar_loads_from_disk() {
    let path = std::path::Path::new("recap_data/grammar.ron");
    let gs = GrammarSet::load_from_ron(path).unwrap();
    for rule in ENTRY_RULES {
        assert!(gs.rules.contains_key(*rule), "missing entry rule {}", rule);
    }
    let builtin = GrammarSet::builtin().unwrap();
    assert_eq!(gs.rules.len(), builtin.rules.len());
}

#[test]
fn bundled_grammar_lints_clean() {
    let gs = GrammarSet::builtin().unwrap();
    let report = gs.lint(ENTRY_RULES, FACT_SLOTS);
    assert!(report.errors.is_empty(), "lint errors: {:?}", report.errors);
    assert!(report.warnings.is_empty(), "lint warnings: {:?}", report.warnings);
}

#[test]
fn entry_rules_only_fire_for_their_outcome() {
    let gs = GrammarSet::builtin().unwrap();
    let mut ctx = SelectionContext::new();
    ctx.tag("outcome:tie");
    ctx.tag("no_scoring_plays");
    for (name, value) in [
        ("subject", "Giants"),
        ("opponent", "Dodgers"),
        ("subject_runs", "0"),
        ("opponent_runs", "0"),
        ("score", "0-0"),
        ("margin", "0"),
    ] {
        ctx.slot(name, value);
    }
    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(gs.expand("win_recap", &ctx, &mut rng).unwrap(), "");
    assert_eq!(gs.expand("loss_recap", &ctx, &mut rng).unwrap(), "");
    let tie = gs.expand("tie_recap", &ctx, &mut rng).unwrap();
    assert!(tie.contains("Giants"));
    assert!(tie.contains("Dodgers"));
}

#[test]
fn override_file_replaces_bundled_rule() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("closers.ron");
    std::fs::write(
        &path,
        r#"{
            "win_closer": Rule(alternatives: [
                (weight: 1, text: "Orange and black."),
                (weight: 1, text: "Orange and black again."),
                (weight: 1, text: "Still orange and black."),
            ]),
        }"#,
    )
    .unwrap();

    let mut gs = GrammarSet::builtin().unwrap();
    gs.merge(GrammarSet::load_from_ron(&path).unwrap());
    let closer = &gs.rules["win_closer"];
    assert_eq!(closer.alternatives.len(), 3);
    assert!(gs.lint(ENTRY_RULES, FACT_SLOTS).is_clean());
}

#[test]
fn malformed_grammar_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.ron");
    std::fs::write(&path, r#"{ "win_recap": Rule(alternatives: [(weight: 1, text: "{unclosed")]) }"#)
        .unwrap();
    assert!(GrammarSet::load_from_ron(&path).is_err());
}
