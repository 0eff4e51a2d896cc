use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of an inning a play happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Half {
    /// The visiting team bats.
    Top,
    /// The home team bats.
    Bottom,
}

impl Half {
    /// Parse a feed's half-inning indicator. Accepts `top`/`t` and
    /// `bottom`/`bot`/`b`, case-insensitive.
    pub fn parse(raw: &str) -> Option<Half> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" | "t" => Some(Half::Top),
            "bottom" | "bot" | "b" => Some(Half::Bottom),
            _ => None,
        }
    }

    /// Display label used in fact blocks: "Top" or "Bottom".
    pub fn label(&self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Bottom => "Bottom",
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a play's run count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunSource {
    /// The feed carried a structured count.
    Reported,
    /// Counted from the play description by the keyword detector.
    Inferred,
}

/// A play record as the feed delivered it. Every field may be missing;
/// the normalizer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub inning: Option<u32>,
    #[serde(default)]
    pub half: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Structured run count, when the source provides one.
    #[serde(default)]
    pub runs: Option<u32>,
}

impl RawEvent {
    pub fn new(inning: u32, half: &str, description: &str) -> Self {
        Self {
            inning: Some(inning),
            half: Some(half.to_string()),
            description: Some(description.to_string()),
            runs: None,
        }
    }

    pub fn with_runs(mut self, runs: u32) -> Self {
        self.runs = Some(runs);
        self
    }
}

/// A play in the uniform internal shape consumed by the ledger builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub inning: u32,
    pub half: Half,
    /// Position of the record in source order; strictly increasing.
    pub sequence: u64,
    pub description: String,
    pub runs_scored: u32,
    pub runs_source: RunSource,
}
