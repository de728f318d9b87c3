use skillmgr_core::PackageIdentity;

use super::*;
use crate::search::similarity;

fn identities(entries: &[(&str, &str)]) -> Vec<PackageIdentity> {
    entries
        .iter()
        .map(|(name, author)| PackageIdentity::new(*name, *author))
        .collect()
}

fn names(identities: &[PackageIdentity], indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|index| identities[*index].name.clone())
        .collect()
}

#[test]
fn exact_name_match_wins_over_fuzzy_candidates() {
    let catalog = identities(&[
        ("weather", "mycroftai"),
        ("weather-radar", "someone"),
        ("weather-alerts", "other"),
    ]);

    assert_eq!(resolve_identity("Weather", &catalog), Resolution::Unique(0));
}

#[test]
fn exact_qualified_name_match_wins() {
    let catalog = identities(&[("daily-news", "author1"), ("daily-news-extra", "author2")]);

    assert_eq!(
        resolve_identity("daily-news-extra.author2", &catalog),
        Resolution::Unique(1)
    );
}

#[test]
fn filler_words_do_not_block_a_perfect_match() {
    let catalog = identities(&[("weather", "mycroftai"), ("weather-radar", "someone")]);

    assert_eq!(
        resolve_identity("the weather skill", &catalog),
        Resolution::Unique(0)
    );
}

#[test]
fn substring_fragment_matching_several_packages_is_ambiguous() {
    let catalog = identities(&[
        ("daily-news-author1", "author1"),
        ("joke", "someone"),
        ("daily-news-author2", "author2"),
    ]);

    let Resolution::Ambiguous(indices) = resolve_identity("news", &catalog) else {
        panic!("fragment must be ambiguous");
    };
    assert_eq!(
        names(&catalog, &indices),
        vec!["daily-news-author1", "daily-news-author2"]
    );
}

#[test]
fn misspelled_query_resolves_by_similarity() {
    let catalog = identities(&[("weather", "mycroftai"), ("joke", "someone")]);

    assert_eq!(resolve_identity("wether", &catalog), Resolution::Unique(0));
}

#[test]
fn unknown_names_are_not_found() {
    let catalog = identities(&[("weather", "mycroftai"), ("joke", "someone")]);

    for query in ["calendar", "zzz", "", "   "] {
        assert_eq!(
            resolve_identity(query, &catalog),
            Resolution::NotFound,
            "query '{query}' must not resolve"
        );
    }
}

#[test]
fn empty_catalog_never_resolves() {
    assert_eq!(resolve_identity("weather", &[]), Resolution::NotFound);
}

#[test]
fn clearly_better_match_is_unique_even_with_weak_runner_up() {
    let catalog = identities(&[("timer", "mycroftai"), ("timezone-converter", "someone")]);

    assert_eq!(resolve_identity("timer", &catalog), Resolution::Unique(0));
    assert_eq!(resolve_identity("timr", &catalog), Resolution::Unique(0));
}

#[test]
fn normalize_query_unifies_separators() {
    assert_eq!(normalize_query("Daily_News-Skill"), "daily news");
    assert_eq!(normalize_query("  the   joke  "), "joke");
}

#[test]
fn similarity_is_symmetric_and_bounded() {
    let forward = similarity("weather", "wether");
    let backward = similarity("wether", "weather");
    assert!((forward - backward).abs() < f64::EPSILON);
    assert!(forward > 0.9 && forward <= 1.0);
    assert_eq!(similarity("", ""), 1.0);
    assert_eq!(similarity("abc", "xyz"), 0.0);
}

#[test]
fn disambiguate_filters_then_classifies() {
    let remote_only = |candidate: &(&str, bool)| !candidate.1;

    assert_eq!(
        disambiguate(vec![("a", true), ("b", false)], remote_only),
        Disambiguation::One(("b", false))
    );
    assert_eq!(
        disambiguate(vec![("a", true), ("b", true)], remote_only),
        Disambiguation::NoneLeft
    );
    assert_eq!(
        disambiguate(vec![("a", false), ("b", false)], remote_only),
        Disambiguation::Prompt(vec![("a", false), ("b", false)])
    );
}

#[test]
fn disambiguate_fails_fast_at_ten_candidates() {
    let candidates = (0..MAX_PROMPT_CANDIDATES).collect::<Vec<_>>();
    assert_eq!(
        disambiguate(candidates, |_| true),
        Disambiguation::TooMany(MAX_PROMPT_CANDIDATES)
    );

    let candidates = (0..MAX_PROMPT_CANDIDATES - 1).collect::<Vec<_>>();
    assert!(matches!(
        disambiguate(candidates, |_| true),
        Disambiguation::Prompt(_)
    ));
}
