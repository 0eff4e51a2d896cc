/// Narrative constraint packager — fact block, instruction contract, and
/// the fact-lock check applied to generated text.

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::consistency::{CheckedLedger, LedgerStatus};
use crate::core::generator::{NarrativeGenerator, NarrativeRequest};
use crate::core::ledger::ScoringEntry;
use crate::schema::score::Score;
use crate::schema::team::{HomeAway, Side, Team, TeamSide};

static SCORE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*(?:-|–|—|\s+to\s+)\s*(\d{1,2})\b").expect("score pattern")
});

const WIN_PHRASES: &str = r"win|wins|won|beat|beats|defeat|defeats|defeated|edge|edges|edged|outlast|outlasts|outlasted|rout|routs|routed|hold\s+off|holds\s+off|held\s+off|prevail|prevails|prevailed";

const LOSS_PHRASES: &str = r"lose|loses|lost|fall|falls|fell|drop|drops|dropped|are\s+defeated|were\s+defeated|are\s+beaten|were\s+beaten";

/// Phrases that put the named club ahead of the score that follows.
const LEAD_PHRASES: &str = r"led|leads|lead|finished\s+on\s+top|finishes\s+on\s+top|came\s+out\s+on\s+top|comes\s+out\s+on\s+top|went\s+ahead|goes\s+ahead|pulled\s+ahead|jumped\s+ahead|moved\s+ahead|was\s+ahead|were\s+ahead|took\s+an?|held\s+an?";

/// Phrases that put the named club behind the score that follows.
const TRAIL_PHRASES: &str = r"trailed|trails|trail|fell\s+behind|falls\s+behind|was\s+behind|were\s+behind";

/// A loss phrase followed by one of these describes a deficit, not the result.
static NOT_A_LOSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s+(?:behind|the\s+lead|a\s+lead|an\s+early\s+lead|their\s+lead|its\s+lead|ground)\b")
        .expect("loss exemption pattern")
});

const NEGATIONS: &[&str] = &["not", "never", "no", "failed", "unable", "nearly", "almost"];

/// Everything the recap is allowed to assert, frozen from a checked ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactSheet {
    subject: Team,
    opponent: Team,
    subject_side: HomeAway,
    final_score: Score,
    timeline: Vec<ScoringEntry>,
    status: LedgerStatus,
    inferred_entries: usize,
}

impl FactSheet {
    pub fn package(ledger: &CheckedLedger, teams: &TeamSide) -> FactSheet {
        FactSheet {
            subject: teams.subject().clone(),
            opponent: teams.opponent().clone(),
            subject_side: teams.subject_side(),
            final_score: ledger.final_score(),
            timeline: ledger.timeline().to_vec(),
            status: ledger.status(),
            inferred_entries: ledger.inferred_entries(),
        }
    }

    pub fn subject(&self) -> &Team {
        &self.subject
    }

    pub fn opponent(&self) -> &Team {
        &self.opponent
    }

    pub fn team(&self, side: Side) -> &Team {
        match side {
            Side::Subject => &self.subject,
            Side::Opponent => &self.opponent,
        }
    }

    pub fn subject_side(&self) -> HomeAway {
        self.subject_side
    }

    pub fn final_score(&self) -> Score {
        self.final_score
    }

    pub fn timeline(&self) -> &[ScoringEntry] {
        &self.timeline
    }

    pub fn status(&self) -> LedgerStatus {
        self.status
    }

    pub fn winner(&self) -> Option<Side> {
        self.final_score.leader()
    }

    /// "<Subject> Win!", "<Subject> Lose!", or "<Subject> Tie".
    pub fn headline(&self) -> String {
        match self.winner() {
            Some(Side::Subject) => format!("{} Win!", self.subject.name),
            Some(Side::Opponent) => format!("{} Lose!", self.subject.name),
            None => format!("{} Tie", self.subject.name),
        }
    }

    fn score_line(&self, score: Score) -> String {
        format!(
            "{} {}, {} {}",
            self.subject.name, score.subject, self.opponent.name, score.opponent
        )
    }

    pub fn final_line(&self) -> String {
        format!("Final: {}", self.score_line(self.final_score))
    }

    pub fn entry_line(&self, entry: &ScoringEntry) -> String {
        format!(
            "{} {}: {} → {}",
            entry.half,
            entry.inning,
            entry.description,
            self.score_line(entry.score_after())
        )
    }

    /// The fact block: final-score line, one line per scoring play, then
    /// data-quality notes. Deterministic for a given sheet.
    pub fn fact_block(&self) -> String {
        let mut lines = vec![self.final_line()];
        if self.timeline.is_empty() {
            lines.push("No scoring plays recorded.".to_string());
        }
        lines.extend(self.timeline.iter().map(|e| self.entry_line(e)));
        if let LedgerStatus::Reconciled { derived } = self.status {
            lines.push(format!(
                "Note: the play-by-play adds up to {}; the official final score takes precedence.",
                self.score_line(derived)
            ));
        }
        if self.inferred_entries > 0 {
            lines.push(format!(
                "Note: run counts for {} scoring play(s) were inferred from play descriptions.",
                self.inferred_entries
            ));
        }
        lines.join("\n")
    }

    /// The contract handed to the narrative generator with the fact block.
    pub fn instruction(&self) -> String {
        let outcome = match self.winner() {
            Some(side) => format!("The {} won.", self.team(side).name),
            None => "The game ended in a tie; neither team won.".to_string(),
        };
        format!(
            "Write a recap of this game from the {subject} perspective, using only the facts below. \
             Tone and length are up to you. {outcome} \
             Do not name a different winner. \
             Do not state any final score other than {final_score}. \
             Do not reverse, reassign, or change the runs of any scoring play listed.",
            subject = self.subject.name,
            outcome = outcome,
            final_score = self.score_line(self.final_score),
        )
    }

    /// The instruction for a regeneration, naming what the last draft got wrong.
    pub fn strengthened_instruction(&self, violations: &[Violation]) -> String {
        let listed: Vec<String> = violations.iter().map(|v| format!("- {}", v)).collect();
        format!(
            "Your previous draft contradicted the locked facts:\n{}\nRewrite it so every statement agrees with the facts.\n{}",
            listed.join("\n"),
            self.instruction()
        )
    }
}

/// A way generated text contradicts the fact sheet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("states a {high}-{low} score that never occurred")]
    UnknownScore { high: u32, low: u32 },
    #[error("credits {team} with a win (\"{phrase}\")")]
    FalseWinner { team: String, phrase: String },
    #[error("says {team} lost (\"{phrase}\")")]
    FalseLoser { team: String, phrase: String },
    #[error("gives a score to the wrong team (\"{phrase}\")")]
    ReversedScore { phrase: String },
    #[error("never states the final score {0}")]
    MissingFinalScore(String),
}

/// Outcome patterns for one club.
#[derive(Debug, Clone)]
struct OutcomePattern {
    team: String,
    pattern: Regex,
    exempt: Option<&'static Regex>,
}

impl OutcomePattern {
    fn new(team: &Team, phrases: &str, exempt: Option<&'static Regex>) -> Option<Self> {
        let names = name_alternation(&team.match_names())?;
        let pattern = format!(
            r"(?i)\b(?:{})\b((?:\s+[\w'’]+){{0,2}}?)\s+(?:{})\b",
            names, phrases
        );
        Regex::new(&pattern).ok().map(|pattern| Self {
            team: team.name.clone(),
            pattern,
            exempt,
        })
    }

    /// Matching phrases whose intervening words do not negate them.
    fn find(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures_iter(text)
            .filter(|caps| !caps.get(1).is_some_and(|gap| negated(gap.as_str())))
            .filter_map(|caps| caps.get(0))
            .filter(|m| {
                !self
                    .exempt
                    .is_some_and(|exempt| exempt.is_match(&text[m.end()..]))
            })
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// "<club> <phrase> N-M": the club is put ahead of (or behind) the score.
#[derive(Debug, Clone)]
struct AttributedScore {
    side: Side,
    ahead: bool,
    pattern: Regex,
}

impl AttributedScore {
    fn new(team: &Team, side: Side, ahead: bool) -> Option<Self> {
        let names = name_alternation(&team.match_names())?;
        let phrases = if ahead {
            format!("{}|{}", WIN_PHRASES, LEAD_PHRASES)
        } else {
            format!("{}|{}", TRAIL_PHRASES, LOSS_PHRASES)
        };
        let pattern = format!(
            r"(?i)\b(?:{})\b((?:\s+[\w'’]+){{0,2}}?)\s+(?:{})\b([^.!?;\d]{{0,30}}?)(\d{{1,2}})\s*(?:-|–|—|\s+to\s+)\s*(\d{{1,2}})\b",
            names, phrases
        );
        Regex::new(&pattern).ok().map(|pattern| Self {
            side,
            ahead,
            pattern,
        })
    }

    /// Scores this club is placed ahead of or behind, as (subject, opponent).
    fn find<'t>(&self, text: &'t str) -> Vec<(Score, &'t str)> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                if caps.get(1).is_some_and(|gap| negated(gap.as_str())) {
                    return None;
                }
                // a comma followed by more words starts a different clause
                let filler = caps.get(2).map_or("", |m| m.as_str());
                if filler
                    .split_once(',')
                    .is_some_and(|(_, rest)| rest.chars().any(char::is_alphabetic))
                {
                    return None;
                }
                if !standalone(text, caps.get(3)?.start(), whole.end()) {
                    return None;
                }
                let a: u32 = caps.get(3)?.as_str().parse().ok()?;
                let b: u32 = caps.get(4)?.as_str().parse().ok()?;
                if a == b {
                    return None;
                }
                let (mine, theirs) = if self.ahead {
                    (a.max(b), a.min(b))
                } else {
                    (a.min(b), a.max(b))
                };
                let score = match self.side {
                    Side::Subject => Score::new(mine, theirs),
                    Side::Opponent => Score::new(theirs, mine),
                };
                Some((score, whole.as_str()))
            })
            .collect()
    }
}

fn shares_name(name: &str, others: &[String]) -> bool {
    others.iter().any(|o| o.eq_ignore_ascii_case(name))
}

fn name_alternation(names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let escaped: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    Some(escaped.join("|"))
}

fn negated(gap: &str) -> bool {
    gap.split_whitespace().any(|word| {
        let word = word.to_lowercase();
        NEGATIONS.contains(&word.as_str()) || word.ends_with("n't") || word.ends_with("n’t")
    })
}

/// Scans generated text for contradictions of a fact sheet.
#[derive(Debug, Clone)]
pub struct FactLock {
    /// Unordered pairs, larger first, for scores stated without a team.
    allowed_pairs: FxHashSet<(u32, u32)>,
    /// Ordered scores, for scores tied to a team.
    allowed_scores: FxHashSet<Score>,
    final_score: Score,
    names: FxHashMap<String, Side>,
    line_score: Option<Regex>,
    attributed: Vec<AttributedScore>,
    false_winners: Vec<OutcomePattern>,
    false_losers: Vec<OutcomePattern>,
    require_final_score: bool,
}

impl FactLock {
    pub fn new(sheet: &FactSheet) -> Self {
        let final_score = sheet.final_score();
        let mut allowed_scores = FxHashSet::default();
        allowed_scores.insert(Score::default());
        allowed_scores.extend(sheet.timeline().iter().map(|e| e.score_after()));
        if let LedgerStatus::Reconciled { derived } = sheet.status() {
            allowed_scores.remove(&derived);
        }
        allowed_scores.insert(final_score);
        let allowed_pairs: FxHashSet<(u32, u32)> =
            allowed_scores.iter().map(|s| s.pair()).collect();

        let subject_names = sheet.subject().match_names();
        let opponent_names = sheet.opponent().match_names();
        let mut names = FxHashMap::default();
        for name in subject_names.iter().filter(|n| !shares_name(n, &opponent_names)) {
            names.insert(name.to_lowercase(), Side::Subject);
        }
        for name in opponent_names.iter().filter(|n| !shares_name(n, &subject_names)) {
            names.insert(name.to_lowercase(), Side::Opponent);
        }
        let all_names: Vec<String> = subject_names
            .iter()
            .chain(opponent_names.iter())
            .cloned()
            .collect();
        let line_score = name_alternation(&all_names).and_then(|names| {
            Regex::new(&format!(
                r"(?i)\b({names})\s+(\d{{1,2}}),?\s+(?:the\s+)?({names})\s+(\d{{1,2}})\b"
            ))
            .ok()
        });
        let attributed = [Side::Subject, Side::Opponent]
            .into_iter()
            .flat_map(|side| [(side, true), (side, false)])
            .filter_map(|(side, ahead)| AttributedScore::new(sheet.team(side), side, ahead))
            .collect();

        let (winners, losers): (Vec<&Team>, Vec<&Team>) = match sheet.winner() {
            Some(side) => (vec![sheet.team(side.other())], vec![sheet.team(side)]),
            None => (
                vec![sheet.subject(), sheet.opponent()],
                vec![sheet.subject(), sheet.opponent()],
            ),
        };

        Self {
            allowed_pairs,
            allowed_scores,
            final_score,
            names,
            line_score,
            attributed,
            false_winners: winners
                .into_iter()
                .filter_map(|t| OutcomePattern::new(t, WIN_PHRASES, None))
                .collect(),
            false_losers: losers
                .into_iter()
                .filter_map(|t| OutcomePattern::new(t, LOSS_PHRASES, Some(&*NOT_A_LOSS)))
                .collect(),
            require_final_score: false,
        }
    }

    /// Also flag text that never states the final score.
    pub fn require_final_score(mut self, required: bool) -> Self {
        self.require_final_score = required;
        self
    }

    /// Every contradiction found in `text`; empty means the text is clean.
    pub fn check(&self, text: &str) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut saw_final = false;

        let final_pair = self.final_score.pair();
        for (pair, _) in score_pairs(text) {
            if pair == final_pair {
                saw_final = true;
            }
            if !self.allowed_pairs.contains(&pair) {
                push_unique(
                    &mut violations,
                    Violation::UnknownScore {
                        high: pair.0,
                        low: pair.1,
                    },
                );
            }
        }

        let attributed = self
            .line_scores(text)
            .into_iter()
            .chain(self.attributed.iter().flat_map(|a| a.find(text)));
        for (score, phrase) in attributed {
            if score == self.final_score {
                saw_final = true;
            }
            if self.allowed_scores.contains(&score) {
                continue;
            }
            let pair = score.pair();
            let violation = if self.allowed_pairs.contains(&pair) {
                Violation::ReversedScore {
                    phrase: phrase.to_string(),
                }
            } else {
                Violation::UnknownScore {
                    high: pair.0,
                    low: pair.1,
                }
            };
            push_unique(&mut violations, violation);
        }

        for outcome in &self.false_winners {
            for phrase in outcome.find(text) {
                push_unique(
                    &mut violations,
                    Violation::FalseWinner {
                        team: outcome.team.clone(),
                        phrase,
                    },
                );
            }
        }
        for outcome in &self.false_losers {
            for phrase in outcome.find(text) {
                push_unique(
                    &mut violations,
                    Violation::FalseLoser {
                        team: outcome.team.clone(),
                        phrase,
                    },
                );
            }
        }

        if self.require_final_score && !saw_final {
            violations.push(Violation::MissingFinalScore(format!(
                "{}-{}",
                final_pair.0, final_pair.1
            )));
        }
        violations
    }

    /// "<club> N, <club> M" line scores, as (subject, opponent).
    fn line_scores<'t>(&self, text: &'t str) -> Vec<(Score, &'t str)> {
        let Some(pattern) = &self.line_score else {
            return Vec::new();
        };
        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let first = *self.names.get(&caps.get(1)?.as_str().to_lowercase())?;
                let second = *self.names.get(&caps.get(3)?.as_str().to_lowercase())?;
                if first == second {
                    return None;
                }
                let a: u32 = caps.get(2)?.as_str().parse().ok()?;
                let b: u32 = caps.get(4)?.as_str().parse().ok()?;
                let score = match first {
                    Side::Subject => Score::new(a, b),
                    Side::Opponent => Score::new(b, a),
                };
                Some((score, whole.as_str()))
            })
            .collect()
    }
}

fn push_unique(violations: &mut Vec<Violation>, violation: Violation) {
    if !violations.contains(&violation) {
        violations.push(violation);
    }
}

/// Score-like number pairs in `text`, larger first, with their matched text.
/// Pairs embedded in longer dashed runs ("1-2-3", dates) are skipped.
fn score_pairs(text: &str) -> Vec<((u32, u32), &str)> {
    SCORE_PAIR
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if !standalone(text, whole.start(), whole.end()) {
                return None;
            }
            let a: u32 = caps.get(1)?.as_str().parse().ok()?;
            let b: u32 = caps.get(2)?.as_str().parse().ok()?;
            Some(((a.max(b), a.min(b)), whole.as_str()))
        })
        .collect()
}

/// The score spanning `start..end` is not part of a longer dashed run.
fn standalone(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let before = start.checked_sub(1).map(|i| bytes[i]);
    let after = &bytes[end..];
    let joined_before = matches!(before, Some(b'-' | b'/'));
    let joined_after =
        after.len() >= 2 && matches!(after[0], b'-' | b'/') && after[1].is_ascii_digit();
    !(joined_before || joined_after)
}

/// How many times the generator may be asked for one recap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub attempts: u32,
}

impl RetryBudget {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self { attempts: 2 }
    }
}

/// Result of the generate-check-retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeOutcome {
    Accepted { text: String, attempts: u32 },
    /// Every attempt failed; publish the fact block alone.
    Withheld { attempts: u32, reasons: Vec<String> },
}

impl NarrativeOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Accepted { text, .. } => Some(text),
            Self::Withheld { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Accepted { attempts, .. } | Self::Withheld { attempts, .. } => *attempts,
        }
    }
}

/// Ask the generator for a recap and keep the first one that passes the
/// fact lock. A failed check feeds its violations into the next attempt's
/// instruction; generator errors and empty text also spend an attempt.
pub fn request_narrative(
    generator: &mut dyn NarrativeGenerator,
    sheet: &FactSheet,
    lock: &FactLock,
    budget: RetryBudget,
) -> NarrativeOutcome {
    let fact_block = sheet.fact_block();
    let mut reasons = Vec::new();
    let mut last_violations: Vec<Violation> = Vec::new();

    for attempt in 1..=budget.attempts {
        let instruction = if last_violations.is_empty() {
            sheet.instruction()
        } else {
            sheet.strengthened_instruction(&last_violations)
        };
        let request = NarrativeRequest {
            sheet,
            fact_block: &fact_block,
            instruction: &instruction,
            attempt,
        };

        match generator.generate(&request) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    warn!(attempt, "generator returned empty narrative");
                    reasons.push(format!("attempt {}: empty narrative", attempt));
                    continue;
                }
                let violations = lock.check(text);
                if violations.is_empty() {
                    info!(attempt, "narrative accepted");
                    return NarrativeOutcome::Accepted {
                        text: text.to_string(),
                        attempts: attempt,
                    };
                }
                let summary: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                warn!(
                    attempt,
                    violations = %summary.join("; "),
                    "narrative contradicts locked facts"
                );
                reasons.push(format!("attempt {}: {}", attempt, summary.join("; ")));
                last_violations = violations;
            }
            Err(e) => {
                warn!(attempt, error = %e, "narrative generator failed");
                reasons.push(format!("attempt {}: generator error: {}", attempt, e));
            }
        }
    }

    warn!(
        attempts = budget.attempts,
        "no acceptable narrative; publishing facts only"
    );
    NarrativeOutcome::Withheld {
        attempts: budget.attempts,
        reasons,
    }
}
