//! Subsequence matching for the track filter.

/// Character positions in `haystack` where the characters of `needle` occur
/// in order, taking the earliest candidate each time. Both sides go through
/// `fold` before comparing. `None` when `needle` is not a subsequence.
pub(super) fn positions(haystack: &str, needle: &str, fold: impl Fn(char) -> char) -> Option<Vec<usize>> {
    let mut hay = haystack.chars().map(&fold).enumerate();
    needle
        .chars()
        .map(&fold)
        .map(|wanted| hay.find(|&(_, c)| c == wanted).map(|(i, _)| i))
        .collect()
}
