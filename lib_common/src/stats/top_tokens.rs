use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use regex::Regex;

/// Matches hashtag tokens, e.g. `#cats`.
pub const HASHTAG_PATTERN: &str = r"#\w+";
/// Matches mention tokens, e.g. `@alice`.
pub const MENTION_PATTERN: &str = r"@\w+";

/// Returns the `max` most frequent matches of `pattern` across `texts`,
/// ordered by descending aggregate frequency.
///
/// A token counts at most once per source text even if it repeats within
/// that text. Equal-frequency tokens keep first-seen order, so repeated
/// calls over the same snapshot are deterministic.
pub fn get_top<S: AsRef<str>>(texts: &[S], pattern: &Regex, max: usize) -> Vec<String> {
    if texts.is_empty() {
        return Vec::new();
    }

    // token -> (aggregate count, first-seen rank)
    let mut counts: HashMap<String, (u64, usize)> = HashMap::new();
    let mut next_rank = 0usize;

    for text in texts {
        let mut seen_in_text: HashSet<&str> = HashSet::new();
        for matched in pattern.find_iter(text.as_ref()) {
            let token = matched.as_str();
            if !seen_in_text.insert(token) {
                continue;
            }
            match counts.get_mut(token) {
                Some(entry) => entry.0 += 1,
                None => {
                    counts.insert(token.to_string(), (1, next_rank));
                    next_rank += 1;
                }
            }
        }
    }

    let mut ranked: Vec<(String, (u64, usize))> = counts.into_iter().collect();
    ranked.sort_by_key(|(_, (count, rank))| (Reverse(*count), *rank));
    ranked.into_iter().take(max).map(|(token, _)| token).collect()
}
