// File: src/core/context.rs
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Probability for words the model has never seen.
const UNSEEN: f64 = 1e-9;

/// Entries kept per n-gram order before counts are decayed.
pub const DEFAULT_CAPACITY: usize = 50_000;

/// Word-level n-gram counts with trigram → bigram → unigram backoff.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NgramModel {
    window_size: usize,
    history: VecDeque<String>,
    unigrams: HashMap<String, u64>,
    bigrams: HashMap<(String, String), u64>,
    trigrams: HashMap<(String, String, String), u64>,
    total_words: u64,
    capacity: usize,
}

impl NgramModel {
    pub fn new(window_size: usize) -> Self {
        Self::with_capacity(window_size, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(window_size: usize, capacity: usize) -> Self {
        Self {
            window_size: window_size.max(2),
            history: VecDeque::with_capacity(window_size),
            capacity: capacity.max(1),
            ..Default::default()
        }
    }

    /// Adds a committed word to the running history and updates counts.
    /// O(1) amortized complexity.
    pub fn add_word(&mut self, word: &str) {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return;
        }
        *self.unigrams.entry(word.clone()).or_insert(0) += 1;
        self.total_words += 1;

        let mut recent = self.history.iter().rev();
        if let Some(prev) = recent.next() {
            *self
                .bigrams
                .entry((prev.clone(), word.clone()))
                .or_insert(0) += 1;
            if let Some(prev_prev) = recent.next() {
                *self
                    .trigrams
                    .entry((prev_prev.clone(), prev.clone(), word.clone()))
                    .or_insert(0) += 1;
            }
        }

        if self.history.len() == self.window_size {
            self.history.pop_front();
        }
        self.history.push_back(word);
        self.enforce_capacity();
    }

    /// Halves every count of an order that outgrew the capacity, dropping the
    /// ones that reach zero, until it fits again.
    fn enforce_capacity(&mut self) {
        let capacity = if self.capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            self.capacity
        };
        if decay(&mut self.unigrams, capacity) {
            self.total_words = self.unigrams.values().sum();
        }
        decay(&mut self.bigrams, capacity);
        decay(&mut self.trigrams, capacity);
    }

    /// Trains on free text; sentence punctuation breaks the history.
    pub fn train(&mut self, text: &str) {
        for sentence in text.split(['.', '!', '?', '\n']) {
            self.reset_history();
            for token in sentence.split_whitespace() {
                let word: String = token
                    .chars()
                    .filter(|c| c.is_alphabetic() || *c == '\'')
                    .collect();
                self.add_word(&word);
            }
        }
        self.reset_history();
    }

    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    /// The most recent committed words, oldest first.
    pub fn recent(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.total_words == 0
    }

    /// P(word | preceding) with backoff. `preceding` is ordered oldest first.
    pub fn probability(&self, word: &str, preceding: &[&str]) -> f64 {
        let word = word.to_lowercase();
        let prev: Vec<String> = preceding
            .iter()
            .rev()
            .take(2)
            .map(|w| w.to_lowercase())
            .collect();

        if let [w1, w2] = prev.as_slice() {
            let key = (w2.clone(), w1.clone(), word.clone());
            if let Some(&tri) = self.trigrams.get(&key) {
                if let Some(&bi) = self.bigrams.get(&(w2.clone(), w1.clone())) {
                    return (tri as f64 / bi as f64).min(1.0);
                }
            }
        }

        if let Some(w1) = prev.first() {
            if let Some(&bi) = self.bigrams.get(&(w1.clone(), word.clone())) {
                if let Some(&uni) = self.unigrams.get(w1) {
                    return (bi as f64 / uni as f64).min(1.0);
                }
            }
        }

        match self.unigrams.get(&word) {
            Some(&uni) if self.total_words > 0 => uni as f64 / self.total_words as f64,
            _ => UNSEEN,
        }
    }

    /// Whether `word` has been seen right after the last preceding word.
    pub fn has_bigram(&self, preceding: &[&str], word: &str) -> bool {
        preceding.last().is_some_and(|prev| {
            self.bigrams
                .contains_key(&(prev.to_lowercase(), word.to_lowercase()))
        })
    }
}

fn decay<K: Eq + Hash>(counts: &mut HashMap<K, u64>, capacity: usize) -> bool {
    let mut decayed = false;
    while counts.len() > capacity {
        counts.retain(|_, count| {
            *count /= 2;
            *count > 0
        });
        decayed = true;
    }
    decayed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_prefers_longer_context() {
        let mut model = NgramModel::new(3);
        model.train("the quick brown fox. the quick dog. the lazy dog. the fox jumps");

        let tri = model.probability("brown", &["the", "quick"]);
        assert!((tri - 0.5).abs() < 1e-9);

        let bi = model.probability("quick", &["the"]);
        assert!((bi - 0.5).abs() < 1e-9);

        let uni = model.probability("jumps", &[]);
        assert!(uni > 0.0 && uni < 0.1);

        assert_eq!(model.probability("zebra", &["the"]), UNSEEN);
    }

    #[test]
    fn history_is_bounded() {
        let mut model = NgramModel::new(2);
        for w in ["a", "b", "c", "d"] {
            model.add_word(w);
        }
        assert_eq!(model.recent(), vec!["c".to_string(), "d".to_string()]);
        assert!(model.has_bigram(&["C"], "d"));
        assert!(!model.has_bigram(&["a"], "d"));
    }

    #[test]
    fn counts_stay_within_capacity() {
        let mut model = NgramModel::with_capacity(3, 4);
        for _ in 0..3 {
            model.train("good morning");
        }
        for w in ["alpha", "beta", "gamma", "delta", "epsilon"] {
            model.add_word(w);
        }

        assert!(model.unigrams.len() <= 4);
        assert!(model.bigrams.len() <= 4);
        assert!(model.trigrams.len() <= 4);
        assert_eq!(model.total_words, model.unigrams.values().sum::<u64>());
        // Repeated words survive the decay that drops one-off ones.
        assert!(model.probability("morning", &["good"]) > 0.5);
        assert_eq!(model.probability("alpha", &[]), UNSEEN);
    }
}
