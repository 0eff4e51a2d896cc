/// Event normalizer — raw play records to the uniform internal shape.

use thiserror::Error;
use tracing::debug;

use crate::core::runs::infer_runs_from_description;
use crate::schema::event::{Half, NormalizedEvent, RawEvent, RunSource};

/// Why a raw record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEvent {
    #[error("record {index}: missing inning")]
    MissingInning { index: usize },
    #[error("record {index}: inning must be 1 or greater")]
    ZeroInning { index: usize },
    #[error("record {index}: missing half-inning")]
    MissingHalf { index: usize },
    #[error("record {index}: unrecognised half-inning '{value}'")]
    UnknownHalf { index: usize, value: String },
    #[error("record {index}: missing description")]
    MissingDescription { index: usize },
}

/// Output of a normalization pass: the usable events plus a record of
/// every dropped one.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub events: Vec<NormalizedEvent>,
    pub dropped: Vec<MalformedEvent>,
}

impl Normalized {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Number of raw records seen.
    pub fn total(&self) -> usize {
        self.events.len() + self.dropped.len()
    }

    /// Fraction of raw records dropped; 0.0 for an empty feed.
    pub fn drop_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.dropped.len() as f64 / total as f64
        }
    }
}

/// Normalize a game's raw records, kept in source order.
pub fn normalize(raw: &[RawEvent]) -> Normalized {
    let mut out = Normalized::default();
    for (index, record) in raw.iter().enumerate() {
        match normalize_one(index, record) {
            Ok(event) => out.events.push(event),
            Err(reason) => {
                debug!(%reason, "dropping malformed play record");
                out.dropped.push(reason);
            }
        }
    }
    out
}

fn normalize_one(index: usize, raw: &RawEvent) -> Result<NormalizedEvent, MalformedEvent> {
    let inning = raw.inning.ok_or(MalformedEvent::MissingInning { index })?;
    if inning == 0 {
        return Err(MalformedEvent::ZeroInning { index });
    }

    let half_raw = raw
        .half
        .as_deref()
        .ok_or(MalformedEvent::MissingHalf { index })?;
    let half = Half::parse(half_raw).ok_or_else(|| MalformedEvent::UnknownHalf {
        index,
        value: half_raw.to_string(),
    })?;

    let description = raw
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(MalformedEvent::MissingDescription { index })?;

    let (runs_scored, runs_source) = match raw.runs {
        Some(runs) => (runs, RunSource::Reported),
        None => (infer_runs_from_description(description), RunSource::Inferred),
    };

    Ok(NormalizedEvent {
        inning,
        half,
        sequence: index as u64,
        description: description.to_string(),
        runs_scored,
        runs_source,
    })
}
