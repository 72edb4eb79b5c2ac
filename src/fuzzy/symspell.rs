// File: src/fuzzy/symspell.rs
use crate::core::types::{Frequency, FuzzyMatch, Verbosity};
use crate::fuzzy::distance::bounded_osa;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const DISTANCE_WEIGHT: f64 = 0.7;
const FREQUENCY_WEIGHT: f64 = 0.3;

/// A fuzzy search and spelling correction engine based on the Symmetric Delete
/// (SymSpell) algorithm. Delete variants of every word's prefix are precomputed,
/// so a lookup only touches the variants of the query, independent of dictionary size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymSpell {
    words: HashMap<String, Frequency>,
    /// Maps a delete variant (e.g. "th") to every word whose prefix reduces to it.
    deletes: HashMap<String, Vec<String>>,
    max_edit_distance: usize,
    prefix_length: usize,
}

impl SymSpell {
    pub fn new(max_edit_distance: usize, prefix_length: usize) -> Self {
        Self {
            words: HashMap::new(),
            deletes: HashMap::new(),
            max_edit_distance,
            prefix_length: prefix_length.max(1),
        }
    }

    pub fn max_edit_distance(&self) -> usize {
        self.max_edit_distance
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn frequency(&self, word: &str) -> Frequency {
        self.words.get(word).copied().unwrap_or(0)
    }

    /// Adds a word, or raises its frequency. Frequencies never go down.
    /// Complexity: amortized O(p^d) in the prefix length p for d deletes.
    pub fn insert(&mut self, word: &str, frequency: Frequency) -> bool {
        if word.is_empty() {
            return false;
        }
        if let Some(existing) = self.words.get_mut(word) {
            *existing = (*existing).max(frequency);
            return true;
        }
        self.words.insert(word.to_string(), frequency);
        for edit in self.generate_edits(word, self.max_edit_distance) {
            self.deletes.entry(edit).or_default().push(word.to_string());
        }
        true
    }

    /// Words within `max_distance` of `query`, ranked by distance, then frequency,
    /// then score. `verbosity` trims the ranked list.
    pub fn lookup(&self, query: &str, max_distance: usize, verbosity: Verbosity) -> Vec<FuzzyMatch> {
        if query.is_empty() {
            return Vec::new();
        }
        let max_distance = max_distance.min(self.max_edit_distance);
        let query_chars: Vec<char> = query.chars().collect();

        let mut candidates: HashSet<&str> = HashSet::new();
        if let Some((word, _)) = self.words.get_key_value(query) {
            candidates.insert(word.as_str());
        }
        for edit in self.generate_edits(query, max_distance) {
            if let Some((word, _)) = self.words.get_key_value(edit.as_str()) {
                candidates.insert(word.as_str());
            }
            if let Some(words) = self.deletes.get(&edit) {
                candidates.extend(words.iter().map(String::as_str));
            }
        }

        let mut matches: Vec<FuzzyMatch> = candidates
            .into_iter()
            .filter_map(|term| {
                let term_chars: Vec<char> = term.chars().collect();
                let distance = bounded_osa(&query_chars, &term_chars, max_distance)?;
                let frequency = self.frequency(term);
                Some(FuzzyMatch {
                    term: term.to_string(),
                    distance,
                    frequency,
                    score: match_score(distance, query_chars.len(), term_chars.len(), frequency),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .cmp(&b.distance)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.term.cmp(&b.term))
        });
        if let Some(cap) = verbosity.cap() {
            matches.truncate(cap);
        }
        matches
    }

    /// All unique strings reachable by deleting up to `distance` characters from
    /// the word's prefix, including the prefix itself.
    fn generate_edits(&self, word: &str, distance: usize) -> HashSet<String> {
        let prefix: String = word.chars().take(self.prefix_length).collect();
        let mut edits = HashSet::new();
        edits.insert(prefix.clone());

        let mut current_edits = vec![prefix];
        for _ in 0..distance {
            let mut next_edits = Vec::new();
            for edit in &current_edits {
                let chars: Vec<char> = edit.chars().collect();
                if chars.len() <= 1 {
                    continue;
                }
                for skip in 0..chars.len() {
                    let deleted_variant: String = chars
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| i != skip)
                        .map(|(_, c)| *c)
                        .collect();
                    if edits.insert(deleted_variant.clone()) {
                        next_edits.push(deleted_variant);
                    }
                }
            }
            current_edits = next_edits;
        }
        edits
    }
}

/// Blend of length-normalized edit distance and log frequency, in [0, 1].
pub fn match_score(distance: usize, query_len: usize, term_len: usize, frequency: Frequency) -> f64 {
    let span = (query_len + term_len).max(1) as f64;
    let closeness = (1.0 - distance as f64 / span).max(0.0);
    let popularity = f64::from(frequency.max(1)).ln() / f64::from(Frequency::MAX).ln();
    DISTANCE_WEIGHT * closeness + FREQUENCY_WEIGHT * popularity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(words: &[(&str, Frequency)]) -> SymSpell {
        let mut s = SymSpell::new(2, 7);
        for &(w, f) in words {
            s.insert(w, f);
        }
        s
    }

    #[test]
    fn finds_transposition() {
        let s = matcher(&[("the", 255), ("tie", 40), ("tea", 30)]);
        let best = s.lookup("teh", 2, Verbosity::Top);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].term, "the");
        assert_eq!(best[0].distance, 1);
    }

    #[test]
    fn ranks_by_distance_then_frequency() {
        let s = matcher(&[("the", 255), ("tie", 40), ("tea", 30), ("teh", 5)]);
        let all = s.lookup("teh", 2, Verbosity::All);
        let terms: Vec<&str> = all.iter().map(|m| m.term.as_str()).collect();
        assert_eq!(terms[0], "teh");
        assert_eq!(terms[1], "the");
        assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn closest_caps_at_three() {
        let s = matcher(&[("cat", 9), ("bat", 8), ("hat", 7), ("mat", 6), ("rat", 5)]);
        assert_eq!(s.lookup("zat", 1, Verbosity::Closest).len(), 3);
        assert_eq!(s.lookup("zat", 1, Verbosity::All).len(), 5);
    }

    #[test]
    fn insert_keeps_max_frequency() {
        let mut s = matcher(&[("word", 100)]);
        s.insert("word", 20);
        assert_eq!(s.frequency("word"), 100);
        s.insert("word", 150);
        assert_eq!(s.frequency("word"), 150);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn long_words_match_beyond_the_prefix() {
        let s = matcher(&[("understanding", 120)]);
        let found = s.lookup("understandnig", 2, Verbosity::Top);
        assert_eq!(found[0].term, "understanding");
        assert_eq!(found[0].distance, 1);
    }

    #[test]
    fn distance_is_clamped_to_the_index() {
        let s = matcher(&[("abcdef", 10)]);
        assert!(s.lookup("abc", 5, Verbosity::All).is_empty());
    }

    #[test]
    fn score_rewards_frequency_and_closeness() {
        assert!(match_score(0, 3, 3, 255) > match_score(1, 3, 3, 255));
        assert!(match_score(1, 3, 3, 255) > match_score(1, 3, 3, 10));
        let teh = match_score(1, 3, 3, 255);
        assert!(teh >= 0.85, "teh -> the scored {teh}");
    }
}
