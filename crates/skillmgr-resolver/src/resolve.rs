use skillmgr_core::PackageIdentity;

use crate::search::{exact_match, score_identities, CLOSE_MATCH_WINDOW};
use crate::types::{Disambiguation, Resolution};

pub const MAX_PROMPT_CANDIDATES: usize = 10;

pub fn resolve_identity(query: &str, identities: &[PackageIdentity]) -> Resolution {
    if let Some(index) = exact_match(query, identities) {
        return Resolution::Unique(index);
    }

    let scored = score_identities(query, identities);
    let Some(best) = scored.first().copied() else {
        return Resolution::NotFound;
    };

    let perfect = scored
        .iter()
        .filter(|candidate| candidate.score >= 1.0)
        .count();
    if perfect == 1 {
        return Resolution::Unique(best.index);
    }

    let close = scored
        .iter()
        .filter(|candidate| best.score - candidate.score < CLOSE_MATCH_WINDOW)
        .map(|candidate| candidate.index)
        .collect::<Vec<_>>();
    if close.len() == 1 {
        return Resolution::Unique(best.index);
    }
    Resolution::Ambiguous(close)
}

/// Narrows an ambiguous candidate set with a caller-supplied filter.
pub fn disambiguate<T, F>(candidates: Vec<T>, admits: F) -> Disambiguation<T>
where
    F: Fn(&T) -> bool,
{
    let mut remaining = candidates
        .into_iter()
        .filter(|candidate| admits(candidate))
        .collect::<Vec<_>>();

    match remaining.len() {
        0 => Disambiguation::NoneLeft,
        1 => Disambiguation::One(remaining.remove(0)),
        count if count >= MAX_PROMPT_CANDIDATES => Disambiguation::TooMany(count),
        _ => Disambiguation::Prompt(remaining),
    }
}
