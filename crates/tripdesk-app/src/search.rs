// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Whitespace- and case-insensitive substring matching used by every
//! candidate list and by the reservation tables.

pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Containment after [`normalize`]: a contiguous hit first, then, for purely
/// alphabetic queries, an in-order hit (`jkt` inside `jakarta`). Queries with
/// digits or punctuation such as dates and codes only match contiguously.
/// There is no typo tolerance. An empty query matches.
pub fn matches(query: &str, candidate_text: &str) -> bool {
    let needle = normalize(query);
    if needle.is_empty() {
        return true;
    }
    let haystack = normalize(candidate_text);
    if haystack.contains(&needle) {
        return true;
    }
    if !needle.chars().all(char::is_alphabetic) {
        return false;
    }

    let mut wanted = needle.chars();
    let mut current = wanted.next();
    for ch in haystack.chars() {
        let Some(target) = current else {
            return true;
        };
        if ch == target {
            current = wanted.next();
        }
    }
    current.is_none()
}

/// Every whitespace-separated term must match at least one field.
pub fn matches_all_terms<S: AsRef<str>>(query: &str, fields: &[S]) -> bool {
    query
        .split_whitespace()
        .all(|term| fields.iter().any(|field| matches(term, field.as_ref())))
}

/// Borrowing filter over `items`; source order is preserved.
pub fn filter_by_query<'a, T, F, S>(query: &str, items: &'a [T], fields_of: F) -> Vec<&'a T>
where
    F: Fn(&T) -> Vec<S>,
    S: AsRef<str>,
{
    if query.trim().is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| matches_all_terms(query, &fields_of(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{filter_by_query, matches, matches_all_terms, normalize};

    #[test]
    fn matching_ignores_case_and_whitespace() {
        assert!(matches("JKT", "Jakarta"));
        assert!(matches("jkt", "  J a k a r t a "));
        assert!(matches("jak", "Jakarta"));
        assert!(matches("jakartaintl", "Jakarta Intl"));
        assert!(matches("jakarta", "  J a k a r t a "));
        assert!(!matches("xyz", "Jakarta"));
        assert!(!matches("tkj", "Jakarta"));
        assert!(!matches("jakartaa", "Jakarta"));
    }

    #[test]
    fn numeric_terms_only_match_contiguously() {
        assert!(!matches("2021", "2024-01-01"));
        assert!(matches("2024-01", "2024-01-01"));
        assert!(!matches("ga98", "GA 9 X 8"));
        assert!(!matches_all_terms("jakarta 2021", &["Jakarta Intl", "2024-01-01"]));
        assert!(matches("mkh", "Makkah"));
    }

    #[test]
    fn empty_and_blank_queries_match_everything() {
        assert!(matches("", "anything"));
        assert!(matches("   \t", "anything"));
        assert!(matches_all_terms("  ", &["x"]));
        assert_eq!(normalize(" A b\tC "), "abc");
    }

    #[test]
    fn multi_term_queries_require_every_term() {
        assert!(matches_all_terms("jakarta 2024", &["Jakarta Intl", "2024-01-01"]));
        assert!(!matches_all_terms("jakarta 2024", &["Jakarta Intl", "2023-01-01"]));
        assert!(!matches_all_terms("jakarta", &[] as &[&str]));
    }

    #[test]
    fn filter_preserves_source_order_and_list() {
        let cities = vec!["Madinah", "Jeddah", "Makkah", "Jakarta"];
        let filtered = filter_by_query("jakarta", &cities, |city| vec![*city]);
        assert_eq!(filtered, vec![&"Jakarta"]);

        let filtered = filter_by_query("ah", &cities, |city| vec![*city]);
        assert_eq!(filtered, vec![&"Madinah", &"Jeddah", &"Makkah"]);

        let all = filter_by_query("", &cities, |city| vec![*city]);
        assert_eq!(all.len(), cities.len());
    }
}
