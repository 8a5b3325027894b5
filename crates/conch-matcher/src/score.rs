//! Scoring primitives.

/// Lowest subsequence score.
pub(crate) const SUBSEQUENCE_BASE: u32 = 50;
/// Highest subsequence score; always below a prefix match.
pub(crate) const SUBSEQUENCE_CAP: u32 = 90;

const RUN_BONUS_STEP: u32 = 10;
const RUN_BONUS_MAX: u32 = 20;
const START_BONUS: u32 = 10;
const WORD_START_BONUS: u32 = 5;
const LENGTH_BONUS_MAX: u32 = 10;

/// Levenshtein distance between two char slices.
///
/// Two-row dynamic programming, O(|a|·|b|) time, O(|b|) space.
pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Score `query` as an in-order subsequence of `candidate`.
///
/// Both inputs are expected lowercased. Returns `None` unless every query
/// char occurs in the candidate in order. The score starts at 50 and earns
/// bonuses for the longest contiguous run, for starting at the first char
/// (or right after a separator), and for covering more of the candidate.
pub fn subsequence_score(query: &[char], candidate: &[char]) -> Option<u32> {
    if query.is_empty() || query.len() > candidate.len() {
        return None;
    }

    let mut positions = Vec::with_capacity(query.len());
    let mut from = 0;
    for qc in query {
        let offset = candidate[from..].iter().position(|cc| cc == qc)?;
        positions.push(from + offset);
        from += offset + 1;
    }

    let mut longest_run = 1;
    let mut run = 1;
    for pair in positions.windows(2) {
        if pair[1] == pair[0] + 1 {
            run += 1;
            longest_run = longest_run.max(run);
        } else {
            run = 1;
        }
    }

    let first = positions[0];
    let start_bonus = if first == 0 {
        START_BONUS
    } else if !candidate[first - 1].is_alphanumeric() {
        WORD_START_BONUS
    } else {
        0
    };
    let run_bonus = ((longest_run as u32 - 1) * RUN_BONUS_STEP).min(RUN_BONUS_MAX);
    let length_bonus = (query.len() as u32 * LENGTH_BONUS_MAX) / candidate.len() as u32;

    Some((SUBSEQUENCE_BASE + run_bonus + start_bonus + length_bonus).min(SUBSEQUENCE_CAP))
}
