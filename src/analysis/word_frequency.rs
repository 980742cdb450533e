//! Word-frequency calculation and merging for word-cloud data.

use crate::types::WordFrequency;
use std::collections::HashSet;

const MAX_WORDS: usize = 100;

/// Closed stop-word list. Tokens on this list never reach the word cloud.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "should", "could", "may", "might", "must", "can", "this", "that",
    "these", "those", "i", "you", "he", "she", "it", "we", "they", "what", "which", "who", "when",
    "where", "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some",
    "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "just",
    "about", "also", "into", "over", "after", "before", "between", "through", "during", "above",
    "below", "under", "again", "further", "then", "once", "here", "there", "any", "many", "much",
    "well", "its", "his", "her", "their", "our", "your", "my", "me", "him", "them", "us", "being",
    "having", "doing", "while", "until", "since", "because", "although", "though", "however",
    "therefore", "thus", "hence", "yet", "still", "already", "always", "never", "sometimes",
    "often", "usually", "rather", "quite", "really", "even", "perhaps", "maybe", "likely",
    "certainly", "including", "several", "various", "among", "within", "without", "along",
    "across", "around", "upon", "toward", "towards", "against", "per", "via", "like", "unlike",
    "despite", "regarding", "concerning", "given", "based", "according", "provide", "provides",
    "provided", "include", "includes", "included", "make", "makes", "made",
];

/// Tokenize a string the same way `calculate` does, for building exclude
/// lists (typically the topic itself, so its own words never dominate the
/// word cloud).
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Count word occurrences in `text`, excluding short tokens, stop words, and
/// anything in `exclude`. Returns the top 100 by descending count; ties keep
/// first-appearance order (required for reproducible merges).
pub fn calculate(text: &str, exclude: &[String]) -> Vec<WordFrequency> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();

    // Insertion-ordered counting: a Vec of (word, count) plus an index map
    // keeps the first-appearance tie order stable.
    let mut order: Vec<(String, u64)> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for word in tokenize(text) {
        if word.len() <= 2 || stop.contains(word.as_str()) || excluded.contains(word.as_str()) {
            continue;
        }
        match index.get(&word) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(word.clone(), order.len());
                order.push((word, 1));
            }
        }
    }

    top_n(order)
}

/// Sum counts for matching words across all input lists. Commutative and
/// associative over the summed counts; ties keep the first-appearance order
/// across the concatenated inputs.
pub fn merge(lists: &[Vec<WordFrequency>]) -> Vec<WordFrequency> {
    let mut order: Vec<(String, u64)> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for list in lists {
        for entry in list {
            match index.get(&entry.word) {
                Some(&i) => order[i].1 += entry.count,
                None => {
                    index.insert(entry.word.clone(), order.len());
                    order.push((entry.word.clone(), entry.count));
                }
            }
        }
    }

    top_n(order)
}

fn top_n(mut order: Vec<(String, u64)>) -> Vec<WordFrequency> {
    order.sort_by(|a, b| b.1.cmp(&a.1)); // stable: ties stay insertion-ordered
    order
        .into_iter()
        .take(MAX_WORDS)
        .map(|(word, count)| WordFrequency { word, count })
        .collect()
}
