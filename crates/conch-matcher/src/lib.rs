//! Ranked fuzzy matching for completion.
//!
//! Three tiers are tried in order and the first tier that produces anything
//! wins:
//!
//! 1. exact prefix (score 100)
//! 2. in-order subsequence (score 50..=90, queries of two or more chars)
//! 3. Levenshtein distance within a bound (score below 50)
//!
//! Matching is case-insensitive and an empty query matches nothing. The
//! matcher is a pure function of its inputs and holds no shared state.

mod matcher;
mod score;

pub use matcher::{FuzzyMatcher, MatchKind, MatchResult, MatcherOptions};
pub use score::{levenshtein, subsequence_score};
