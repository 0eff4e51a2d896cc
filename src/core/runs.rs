/// Run counting from free-text play descriptions.
///
/// A fallback for feeds without a structured per-play run count. It counts
/// assertions, not runners: one per sentence that says a runner scored, one
/// per sentence that says the batter homered. Descriptions that imply runs
/// without saying so ("two-run double") are under-counted.

use regex::Regex;
use std::sync::LazyLock;

static RUNNER_SCORES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:scores|steals(?:\s+\(\d+\))?\s+home)\b").expect("runner pattern")
});

static BATTER_HOMERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:homers|home\s+run|grand\s+slam)\b").expect("home run pattern")
});

/// Count the runs a play description asserts.
pub fn infer_runs_from_description(description: &str) -> u32 {
    description
        .split(['.', ';', '!'])
        .map(|sentence| {
            u32::from(RUNNER_SCORES.is_match(sentence)) + u32::from(BATTER_HOMERS.is_match(sentence))
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_scoring_keywords() {
        assert_eq!(
            infer_runs_from_description("Thairo Estrada grounds out, shortstop Trea Turner to first baseman Freddie Freeman."),
            0
        );
    }

    #[test]
    fn single_runner_scores() {
        assert_eq!(
            infer_runs_from_description("Patrick Bailey singles on a line drive to left fielder Teoscar Hernandez. Matt Chapman scores."),
            1
        );
    }

    #[test]
    fn multiple_runners_count_separately() {
        let text = "Heliot Ramos doubles (12) on a fly ball to right fielder Mookie Betts. \
                    LaMonte Wade Jr. scores. Mike Yastrzemski scores.";
        assert_eq!(infer_runs_from_description(text), 2);
    }

    #[test]
    fn solo_home_run() {
        assert_eq!(
            infer_runs_from_description("Shohei Ohtani homers (31) on a fly ball to right center field."),
            1
        );
    }

    #[test]
    fn grand_slam_counts_batter_and_runners() {
        let text = "Matt Chapman hits a grand slam (2) to left field. \
                    Heliot Ramos scores. Patrick Bailey scores. Tyler Fitzgerald scores.";
        assert_eq!(infer_runs_from_description(text), 4);
    }

    #[test]
    fn steal_of_home() {
        assert_eq!(infer_runs_from_description("Tyler Fitzgerald steals (14) home."), 1);
    }

    #[test]
    fn initials_do_not_double_count() {
        assert_eq!(
            infer_runs_from_description("J.D. Martinez homers (9) on a line drive to left field."),
            1
        );
    }

    #[test]
    fn word_boundaries_respected() {
        assert_eq!(infer_runs_from_description("Scoreboard underscores nothing."), 0);
    }
}
