use skillmgr_core::PackageIdentity;

use crate::types::Scored;

pub(crate) const MATCH_THRESHOLD: f64 = 0.6;
pub(crate) const CLOSE_MATCH_WINDOW: f64 = 0.3;

const FILLER_TOKENS: &[&str] = &["skill", "skills", "the", "a", "an"];

/// Lowercases, unifies separators and drops filler words such as "skill".
pub fn normalize_query(raw: &str) -> String {
    raw.to_lowercase()
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '_')
        .filter(|token| !token.is_empty())
        .filter(|token| !FILLER_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn exact_match(query: &str, identities: &[PackageIdentity]) -> Option<usize> {
    let raw = query.trim().to_lowercase();
    identities.iter().position(|identity| {
        identity.name.to_lowercase() == raw || identity.qualified_name().to_lowercase() == raw
    })
}

pub(crate) fn score_identities(query: &str, identities: &[PackageIdentity]) -> Vec<Scored> {
    let needle = normalize_query(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut scored = identities
        .iter()
        .enumerate()
        .map(|(index, identity)| {
            let by_name = score(&needle, &normalize_query(&identity.name));
            let by_qualified = score(&needle, &normalize_query(&identity.qualified_name()));
            Scored {
                index,
                score: by_name.max(by_qualified),
            }
        })
        .filter(|scored| scored.score >= MATCH_THRESHOLD)
        .collect::<Vec<_>>();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| identities[a.index].name.cmp(&identities[b.index].name))
    });
    scored
}

fn score(needle: &str, candidate: &str) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }
    if candidate == needle {
        return 1.0;
    }
    if candidate.contains(needle) {
        let coverage = needle.len() as f64 / candidate.len() as f64;
        return 0.8 + 0.2 * coverage;
    }
    similarity(needle, candidate)
}

/// `2 * lcs / (len(a) + len(b))` over chars.
pub(crate) fn similarity(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }

    let mut previous = vec![0_usize; right.len() + 1];
    let mut current = vec![0_usize; right.len() + 1];
    for left_ch in &left {
        for (j, right_ch) in right.iter().enumerate() {
            current[j + 1] = if left_ch == right_ch {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let lcs = previous[right.len()];
    (2 * lcs) as f64 / (left.len() + right.len()) as f64
}
