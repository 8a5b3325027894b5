use std::collections::HashSet;

use crate::score::{levenshtein, subsequence_score};

/// Score of every exact-prefix match.
pub const PREFIX_SCORE: u32 = 100;
/// Score of an edit-distance match at distance zero; each unit of distance
/// costs `EDIT_DISTANCE_STEP`.
const EDIT_DISTANCE_BASE: u32 = 45;
const EDIT_DISTANCE_STEP: u32 = 10;

/// Which tier produced a match. Ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    ExactPrefix,
    Subsequence,
    EditDistance,
}

/// One ranked suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub candidate: String,
    pub score: u32,
    pub kind: MatchKind,
}

/// Tier switches and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherOptions {
    pub subsequence: bool,
    pub edit_distance: bool,
    /// Largest accepted Levenshtein distance.
    pub max_edit_distance: usize,
    /// At most this many candidates are scored by the edit-distance tier.
    pub edit_distance_candidate_limit: usize,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            subsequence: true,
            edit_distance: true,
            max_edit_distance: 2,
            edit_distance_candidate_limit: 256,
        }
    }
}

/// Three-tier ranked matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatcher {
    options: MatcherOptions,
}

impl FuzzyMatcher {
    pub fn new(options: MatcherOptions) -> Self {
        Self { options }
    }

    /// A matcher that only runs the prefix tier.
    pub fn prefix_only() -> Self {
        Self::new(MatcherOptions {
            subsequence: false,
            edit_distance: false,
            ..MatcherOptions::default()
        })
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Rank `candidates` against `query`.
    ///
    /// Results are sorted by (kind, score desc, candidate asc). Duplicate
    /// candidates are reported once.
    pub fn match_candidates<'a, I>(&self, query: &str, candidates: I) -> Vec<MatchResult>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();
        let query_chars: Vec<char> = query_lower.chars().collect();

        let mut seen = HashSet::new();
        let pool: Vec<(&str, String)> = candidates
            .into_iter()
            .filter(|c| !c.is_empty() && seen.insert(*c))
            .map(|c| (c, c.to_lowercase()))
            .collect();

        let mut results: Vec<MatchResult> = pool
            .iter()
            .filter(|(_, lower)| lower.starts_with(&query_lower))
            .map(|(c, _)| result(c, PREFIX_SCORE, MatchKind::ExactPrefix))
            .collect();

        if results.is_empty() && self.options.subsequence && query_chars.len() >= 2 {
            results = pool
                .iter()
                .filter_map(|(c, lower)| {
                    let lower_chars: Vec<char> = lower.chars().collect();
                    subsequence_score(&query_chars, &lower_chars)
                        .map(|score| result(c, score, MatchKind::Subsequence))
                })
                .collect();
        }

        if results.is_empty() && self.options.edit_distance {
            results = self.edit_distance_tier(&query_chars, &pool);
        }

        results.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.candidate.cmp(&b.candidate))
        });
        results
    }

    fn edit_distance_tier(&self, query: &[char], pool: &[(&str, String)]) -> Vec<MatchResult> {
        let max = self.options.max_edit_distance;
        pool.iter()
            .take(self.options.edit_distance_candidate_limit)
            .filter_map(|(c, lower)| {
                let lower_chars: Vec<char> = lower.chars().collect();
                if lower_chars.len().abs_diff(query.len()) > max {
                    return None;
                }
                let distance = levenshtein(query, &lower_chars);
                (distance <= max).then(|| {
                    let penalty = u32::try_from(distance)
                        .unwrap_or(u32::MAX)
                        .saturating_mul(EDIT_DISTANCE_STEP);
                    let score = EDIT_DISTANCE_BASE.saturating_sub(penalty).max(1);
                    result(c, score, MatchKind::EditDistance)
                })
            })
            .collect()
    }
}

fn result(candidate: &str, score: u32, kind: MatchKind) -> MatchResult {
    MatchResult {
        candidate: candidate.to_string(),
        score,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|r| r.candidate.as_str()).collect()
    }

    #[test]
    fn prefix_outranks_subsequence() {
        let m = FuzzyMatcher::default();
        let pool = ["environment", "ssh env", "evaluate"];

        let results = m.match_candidates("ev", pool);
        assert_eq!(names(&results), vec!["evaluate"]);
        assert_eq!(results[0].kind, MatchKind::ExactPrefix);
        assert_eq!(results[0].score, PREFIX_SCORE);

        let results = m.match_candidates("env", pool);
        assert_eq!(names(&results), vec!["environment"]);
        assert_eq!(results[0].kind, MatchKind::ExactPrefix);

        // With no prefix hit the lower tier is consulted.
        let results = m.match_candidates("sv", pool);
        assert_eq!(names(&results), vec!["ssh env"]);
        assert!(results[0].score < PREFIX_SCORE);
    }

    #[test]
    fn subsequence_used_when_no_prefix() {
        let m = FuzzyMatcher::default();
        let results = m.match_candidates("sv", ["ssh env", "evaluate"]);
        assert_eq!(names(&results), vec!["ssh env"]);
        assert_eq!(results[0].kind, MatchKind::Subsequence);
        assert!((50..=90).contains(&results[0].score));
    }

    #[test]
    fn edit_distance_as_last_resort() {
        let m = FuzzyMatcher::default();
        let results = m.match_candidates("envm", ["env"]);
        assert_eq!(names(&results), vec!["env"]);
        assert_eq!(results[0].kind, MatchKind::EditDistance);
        assert!(results[0].score < 50);
    }

    #[test]
    fn edit_distance_respects_bound() {
        let m = FuzzyMatcher::default();
        assert!(m.match_candidates("databse", ["ssh"]).is_empty());
        let tight = FuzzyMatcher::new(MatcherOptions {
            max_edit_distance: 0,
            ..MatcherOptions::default()
        });
        assert!(tight.match_candidates("envm", ["env"]).is_empty());
    }

    #[test]
    fn closer_edits_rank_higher() {
        let m = FuzzyMatcher::default();
        let results = m.match_candidates("qurey", ["query", "queue"]);
        assert_eq!(results[0].candidate, "query");
        assert!(results.iter().all(|r| r.kind == MatchKind::EditDistance));
    }

    #[test]
    fn empty_query_matches_nothing() {
        let m = FuzzyMatcher::default();
        assert!(m.match_candidates("", ["ssh", "database"]).is_empty());
    }

    #[test]
    fn case_insensitive_keeps_original_spelling() {
        let m = FuzzyMatcher::default();
        let results = m.match_candidates("SS", ["SSH", "ssl"]);
        assert_eq!(names(&results), vec!["SSH", "ssl"]);
    }

    #[test]
    fn single_char_skips_subsequence() {
        let m = FuzzyMatcher::default();
        let results = m.match_candidates("v", ["env"]);
        assert!(results.iter().all(|r| r.kind != MatchKind::Subsequence));
    }

    #[test]
    fn ties_break_alphabetically_and_dedupe() {
        let m = FuzzyMatcher::default();
        let results = m.match_candidates("c", ["connect", "config", "connect", "cat"]);
        assert_eq!(names(&results), vec!["cat", "config", "connect"]);
    }

    #[test]
    fn prefix_only_disables_fuzzy_tiers() {
        let m = FuzzyMatcher::prefix_only();
        assert!(m.match_candidates("--prot", ["--port"]).is_empty());
        assert_eq!(names(&m.match_candidates("--p", ["--port", "-p"])), vec!["--port"]);
    }

    #[test]
    fn candidate_limit_caps_edit_tier() {
        let m = FuzzyMatcher::new(MatcherOptions {
            edit_distance_candidate_limit: 1,
            ..MatcherOptions::default()
        });
        let results = m.match_candidates("qurey", ["zzzzz", "query"]);
        assert!(results.is_empty());
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn results_are_sorted_and_single_tier(
                query in "[a-e]{0,3}",
                candidates in proptest::collection::vec("[a-e ]{1,6}", 0..20),
            ) {
                let m = FuzzyMatcher::default();
                let results = m.match_candidates(&query, candidates.iter().map(String::as_str));
                if query.is_empty() {
                    prop_assert!(results.is_empty());
                }
                for pair in results.windows(2) {
                    prop_assert_eq!(pair[0].kind, pair[1].kind);
                    let ordered = pair[0].score > pair[1].score
                        || (pair[0].score == pair[1].score && pair[0].candidate < pair[1].candidate);
                    prop_assert!(ordered, "{:?} before {:?}", pair[0], pair[1]);
                }
                for r in &results {
                    match r.kind {
                        MatchKind::ExactPrefix => prop_assert!(r.candidate.starts_with(&query)),
                        MatchKind::Subsequence => prop_assert!((50..=90).contains(&r.score)),
                        MatchKind::EditDistance => prop_assert!(r.score < 50),
                    }
                }
            }
        }
    }
}
