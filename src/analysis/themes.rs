//! Key-theme merging across providers.
//!
//! Duplicate collapsing uses fuzzy word-overlap matching (not plain
//! exact-string equality): phrases are normalized by lowercasing, trimming,
//! stripping a trailing `s` per word, and collapsing whitespace, then two
//! phrases match when at least 80% of the shorter phrase's words appear in
//! the longer one. This collapses "carbon tax" / "carbon taxes" /
//! "carbon tax policy" into the highest-relevance variant.

use crate::types::KeyTheme;

const MAX_THEMES: usize = 20;
const OVERLAP_THRESHOLD: f64 = 0.8;

struct ThemeEntry {
    normalized: String,
    theme: KeyTheme,
}

/// Merge theme lists: collapse near-duplicates keeping the higher-relevance
/// instance, sort by relevance descending, cap at 20.
pub fn merge_key_themes(theme_lists: &[Vec<KeyTheme>]) -> Vec<KeyTheme> {
    let mut entries: Vec<ThemeEntry> = Vec::new();

    for theme in theme_lists.iter().flatten() {
        let normalized = normalize_phrase(&theme.phrase);
        if normalized.is_empty() {
            continue;
        }

        match entries
            .iter_mut()
            .find(|e| is_similar(&e.normalized, &normalized))
        {
            Some(entry) => {
                if theme.relevance > entry.theme.relevance {
                    entry.theme = theme.clone();
                    // Keep the longer normalized form for future matching.
                    if normalized.len() > entry.normalized.len() {
                        entry.normalized = normalized;
                    }
                }
            }
            None => entries.push(ThemeEntry {
                normalized,
                theme: theme.clone(),
            }),
        }
    }

    let mut themes: Vec<KeyTheme> = entries.into_iter().map(|e| e.theme).collect();
    themes.sort_by(|a, b| b.relevance.cmp(&a.relevance)); // stable: first-seen tie order
    themes.truncate(MAX_THEMES);
    themes
}

/// Lowercase, trim, strip a trailing `s` from each word, collapse whitespace.
fn normalize_phrase(phrase: &str) -> String {
    phrase
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.strip_suffix('s').unwrap_or(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word-overlap ratio of the shorter phrase against the longer one.
fn is_similar(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    let words_a: Vec<&str> = a.split(' ').collect();
    let words_b: Vec<&str> = b.split(' ').collect();
    let (shorter, longer) = if words_a.len() <= words_b.len() {
        (&words_a, &words_b)
    } else {
        (&words_b, &words_a)
    };

    let longer_set: std::collections::HashSet<&str> = longer.iter().copied().collect();
    let overlap = shorter.iter().filter(|w| longer_set.contains(**w)).count();

    overlap as f64 / shorter.len() as f64 >= OVERLAP_THRESHOLD
}
