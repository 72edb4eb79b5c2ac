// File: src/learning.rs
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Accepts needed before a correction pair becomes trusted.
pub const PROMOTION_THRESHOLD: u32 = 3;

/// What a feedback call changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum LearningOutcome {
    /// Empty, identical or otherwise malformed feedback.
    Ignored,
    Counted(u32),
    Promoted { original: String, corrected: String },
    /// The pair was already trusted; nothing to count.
    AlreadyTrusted,
    Blacklisted,
}

type Pair = (String, String);

/// Accept/reject history per (original, corrected) pair, compared case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionMemory {
    accept_counts: HashMap<Pair, u32>,
    blacklist: HashSet<Pair>,
    /// original -> corrected, for pairs that reached the threshold.
    trusted: HashMap<String, String>,
    threshold: u32,
}

impl Default for CorrectionMemory {
    fn default() -> Self {
        Self::new(PROMOTION_THRESHOLD)
    }
}

impl CorrectionMemory {
    pub fn new(threshold: u32) -> Self {
        Self {
            accept_counts: HashMap::new(),
            blacklist: HashSet::new(),
            trusted: HashMap::new(),
            threshold: threshold.max(1),
        }
    }

    fn normalize(original: &str, corrected: &str) -> Option<Pair> {
        let original = original.trim().to_lowercase();
        let corrected = corrected.trim().to_lowercase();
        if original.is_empty() || corrected.is_empty() || original == corrected {
            return None;
        }
        Some((original, corrected))
    }

    pub fn accept(&mut self, original: &str, accepted: &str) -> LearningOutcome {
        let Some(pair) = Self::normalize(original, accepted) else {
            return LearningOutcome::Ignored;
        };
        if self.trusted.get(&pair.0) == Some(&pair.1) {
            return LearningOutcome::AlreadyTrusted;
        }
        // Explicit acceptance overrides an earlier rejection of the same pair.
        self.blacklist.remove(&pair);

        let count = self.accept_counts.entry(pair.clone()).or_insert(0);
        *count += 1;
        if *count < self.threshold {
            return LearningOutcome::Counted(*count);
        }

        self.accept_counts.remove(&pair);
        let (original, corrected) = pair;
        self.trusted.insert(original.clone(), corrected.clone());
        LearningOutcome::Promoted {
            original,
            corrected,
        }
    }

    pub fn reject(&mut self, original: &str, corrected: &str) -> LearningOutcome {
        let Some(pair) = Self::normalize(original, corrected) else {
            return LearningOutcome::Ignored;
        };
        self.accept_counts.remove(&pair);
        if self.trusted.get(&pair.0) == Some(&pair.1) {
            self.trusted.remove(&pair.0);
        }
        self.blacklist.insert(pair);
        LearningOutcome::Blacklisted
    }

    pub fn is_blacklisted(&self, original: &str, candidate: &str) -> bool {
        Self::normalize(original, candidate).is_some_and(|pair| self.blacklist.contains(&pair))
    }

    /// Trusted replacement for `original`, if one was promoted and not since rejected.
    pub fn trusted_for(&self, original: &str) -> Option<&str> {
        let key = original.trim().to_lowercase();
        self.trusted
            .get(&key)
            .filter(|corrected| !self.blacklist.contains(&(key.clone(), (*corrected).clone())))
            .map(String::as_str)
    }

    pub fn accept_count(&self, original: &str, corrected: &str) -> u32 {
        Self::normalize(original, corrected)
            .and_then(|pair| self.accept_counts.get(&pair).copied())
            .unwrap_or(0)
    }

    /// Every word some trusted correction points at.
    pub fn trusted_targets(&self) -> impl Iterator<Item = &str> {
        self.trusted.values().map(String::as_str)
    }
}
