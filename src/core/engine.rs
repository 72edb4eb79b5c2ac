// File: src/core/engine.rs
use crate::config::EngineConfig;
use crate::core::context::NgramModel;
use crate::core::layout::KeyLayout;
use crate::core::rhythm::TypingRhythm;
use crate::core::trie::TrieStore;
use crate::core::types::{
    Decision, Frequency, FuzzyMatch, Point, RankedCandidate, SwipeCandidate, SwipeOutcome,
    Verbosity,
};
use crate::error::EngineResult;
use crate::fuzzy::symspell::SymSpell;
use crate::learning::{CorrectionMemory, LearningOutcome};
use crate::persistence::{load_from_disk, save_to_disk, UserState};
use crate::swipe::decoder::PathDecoder;
use crate::swipe::path::SwipePath;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// The mapped trie plus the fuzzy index seeded from it.
pub struct Dictionary {
    pub trie: TrieStore,
    fuzzy: RwLock<SymSpell>,
}

impl Dictionary {
    /// Highest frequency known for `word` in either the trie or the fuzzy index.
    fn frequency(&self, word: &str) -> Frequency {
        let lower = word.to_lowercase();
        self.trie
            .lookup(word)
            .max(self.trie.lookup(&lower))
            .max(self.fuzzy.read().frequency(&lower))
    }
}

// The engine is composed of the read-only dictionary and the models that learn.
// Every entry point takes &self so one instance can be shared across worker threads.
pub struct KeyboardEngine {
    config: EngineConfig,
    layout: RwLock<Arc<KeyLayout>>,
    dictionary: OnceLock<Dictionary>,
    load_lock: Mutex<()>,
    memory: Mutex<CorrectionMemory>,
    context_model: RwLock<NgramModel>,
    rhythm: Mutex<TypingRhythm>,
    user_words: Mutex<HashMap<String, Frequency>>,
}

const CONTEXT_WINDOW_SIZE: usize = 3;

impl KeyboardEngine {
    /// Performs no I/O; the dictionary is mapped on first use.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let layout = match &config.layout {
            Some(keys) => KeyLayout::new(keys.clone()),
            None => KeyLayout::qwerty(),
        };
        Ok(Self {
            layout: RwLock::new(Arc::new(layout)),
            dictionary: OnceLock::new(),
            load_lock: Mutex::new(()),
            memory: Mutex::new(CorrectionMemory::default()),
            context_model: RwLock::new(NgramModel::new(CONTEXT_WINDOW_SIZE)),
            rhythm: Mutex::new(TypingRhythm::new(config.rhythm.clone())),
            user_words: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// Engine over a trie the caller already opened.
    pub fn with_trie(config: EngineConfig, trie: TrieStore) -> EngineResult<Self> {
        let engine = Self::new(config)?;
        let dictionary = engine.build_dictionary(trie);
        let _ = engine.dictionary.set(dictionary);
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.dictionary.get().is_some()
    }

    /// Maps the dictionary on first call. Concurrent first callers wait on one load;
    /// a failed load is reported and retried on the next call.
    pub fn dictionary(&self) -> EngineResult<&Dictionary> {
        if let Some(dictionary) = self.dictionary.get() {
            return Ok(dictionary);
        }
        let _guard = self.load_lock.lock();
        if let Some(dictionary) = self.dictionary.get() {
            return Ok(dictionary);
        }

        let path = self.config.dictionary_file();
        let started = Instant::now();
        let trie = TrieStore::open(&path, self.config.node_layout, &self.config.language)
            .inspect_err(|e| warn!("Dictionary load failed: {}", e))?;
        let dictionary = self.build_dictionary(trie);
        info!(
            language = %self.config.language,
            nodes = dictionary.trie.node_count(),
            words = dictionary.fuzzy.read().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dictionary loaded from {:?}",
            path
        );
        Ok(self.dictionary.get_or_init(|| dictionary))
    }

    /// Held across a learned-state change while no dictionary is published, so a
    /// load in flight cannot build its fuzzy index without the change.
    fn hold_pending_load(&self) -> Option<MutexGuard<'_, ()>> {
        if self.dictionary.get().is_some() {
            None
        } else {
            Some(self.load_lock.lock())
        }
    }

    fn build_dictionary(&self, trie: TrieStore) -> Dictionary {
        let mut fuzzy = SymSpell::new(
            self.config.fuzzy.max_edit_distance,
            self.config.fuzzy.prefix_length,
        );
        for (word, frequency) in trie.entries() {
            fuzzy.insert(&word.to_lowercase(), frequency);
        }
        for (word, &frequency) in self.user_words.lock().iter() {
            fuzzy.insert(word, frequency);
        }
        for target in self.memory.lock().trusted_targets() {
            fuzzy.insert(target, 1);
        }
        Dictionary {
            trie,
            fuzzy: RwLock::new(fuzzy),
        }
    }

    // --- Lookup surface ---

    pub fn lookup(&self, word: &str) -> EngineResult<Frequency> {
        if word.trim().is_empty() {
            return Ok(0);
        }
        Ok(self.dictionary()?.frequency(word.trim()))
    }

    pub fn suggest_prefix(&self, prefix: &str, limit: usize) -> EngineResult<Vec<String>> {
        Ok(self.dictionary()?.trie.prefix_enumerate(prefix, limit))
    }

    /// Fuzzy matches for `word`, minus pairs the user rejected.
    pub fn correct(
        &self,
        word: &str,
        max_distance: usize,
        verbosity: Verbosity,
    ) -> EngineResult<Vec<FuzzyMatch>> {
        let query = word.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let dictionary = self.dictionary()?;
        let memory = self.memory.lock();
        let mut matches: Vec<FuzzyMatch> = dictionary
            .fuzzy
            .read()
            .lookup(&query, max_distance, Verbosity::All)
            .into_iter()
            .filter(|m| !memory.is_blacklisted(&query, &m.term))
            .collect();
        if let Some(cap) = verbosity.cap() {
            matches.truncate(cap);
        }
        Ok(matches)
    }

    // --- Swipe path ---

    pub fn decode_swipe(&self, points: &[Point]) -> EngineResult<Vec<SwipeCandidate>> {
        let dictionary = self.dictionary()?;
        let layout = self.layout();
        let path = SwipePath::new(points.to_vec()).preprocess(&self.config.preprocess, &layout);
        Ok(PathDecoder::new(&dictionary.trie, &layout, &self.config.decoder).decode(path))
    }

    /// Weighted blend of the path score, log frequency and n-gram context.
    pub fn score_swipe_candidate(
        &self,
        word: &str,
        spatial_score: f64,
        preceding: &[&str],
    ) -> EngineResult<f64> {
        let dictionary = self.dictionary()?;
        Ok(self.fused_score(dictionary, word, spatial_score, preceding))
    }

    fn fused_score(
        &self,
        dictionary: &Dictionary,
        word: &str,
        spatial_score: f64,
        preceding: &[&str],
    ) -> f64 {
        let w = &self.config.fusion;
        let frequency = f64::from(dictionary.frequency(word).max(1));
        let context = if preceding.is_empty() {
            0.0
        } else {
            self.context_model
                .read()
                .probability(word, preceding)
                .max(w.context_floor)
                .ln()
        };
        w.spatial * spatial_score + w.frequency * frequency.ln() + w.context * context
    }

    /// Decodes, re-ranks with frequency and context, and picks an auto-commit word
    /// when the leader is clear of the runner-up by the configured margin.
    /// The spatial input keeps the decoder's length bonus so short words do not
    /// win on fewer transitions alone.
    pub fn rank_swipe(&self, points: &[Point], preceding: &[&str]) -> EngineResult<SwipeOutcome> {
        let decoded = self.decode_swipe(points)?;
        let dictionary = self.dictionary()?;
        let length_bonus = self.config.decoder.length_bonus;

        let mut candidates: Vec<RankedCandidate> = decoded
            .into_iter()
            .map(|c| {
                let spatial = c.path_score + length_bonus * c.word.chars().count() as f64;
                RankedCandidate {
                    score: self.fused_score(dictionary, &c.word, spatial, preceding),
                    path_score: c.path_score,
                    word: c.word,
                }
            })
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let auto_commit = match candidates.as_slice() {
            [] => None,
            [only] => Some(only.word.clone()),
            [first, second, ..] => (first.score - second.score
                > self.config.fusion.auto_commit_margin)
                .then(|| first.word.clone()),
        };
        debug!(
            candidates = candidates.len(),
            auto_commit = auto_commit.as_deref(),
            "swipe ranked"
        );
        Ok(SwipeOutcome {
            candidates,
            auto_commit,
        })
    }

    // --- Typing path ---

    pub fn record_keystroke(&self, at_ms: u64) {
        self.rhythm.lock().record(at_ms);
    }

    pub fn required_confidence(&self, char_len: usize) -> f64 {
        self.config.fusion.confidence.required(char_len)
    }

    /// Decides whether a just-finished word should be replaced. Never edits text.
    pub fn autocorrect(&self, word: &str, preceding: &[&str]) -> EngineResult<Decision> {
        let typed = word.trim();
        if typed.is_empty() || !typed.chars().all(|c| c.is_alphabetic() || c == '\'') {
            return Ok(Decision::keep(typed));
        }
        if self.rhythm.lock().is_burst() {
            debug!(word = typed, "burst typing, autocorrect skipped");
            return Ok(Decision::keep(typed));
        }

        let dictionary = self.dictionary()?;
        let lower = typed.to_lowercase();
        let memory = self.memory.lock();

        if let Some(target) = memory.trusted_for(&lower) {
            return Ok(Decision {
                original: typed.to_string(),
                replacement: Some(transfer_case(typed, target)),
                confidence: 1.0,
            });
        }

        let own_frequency = dictionary.frequency(typed);
        let candidates = dictionary.fuzzy.read().lookup(
            &lower,
            self.config.fuzzy.max_edit_distance,
            Verbosity::All,
        );
        let context_model = self.context_model.read();
        let bonus = self.config.fusion.context_bonus;

        let best = candidates
            .into_iter()
            .filter(|m| m.term != lower && !memory.is_blacklisted(&lower, &m.term))
            .take(3)
            .map(|m| {
                let backed = context_model.has_bigram(preceding, &m.term);
                let confidence = (m.score + if backed { bonus } else { 0.0 }).min(1.0);
                (confidence, m)
            })
            .fold(None::<(f64, FuzzyMatch)>, |best, item| match best {
                Some(b) if b.0 >= item.0 => Some(b),
                _ => Some(item),
            });

        let Some((confidence, candidate)) = best else {
            return Ok(Decision::keep(typed));
        };
        let required = self.required_confidence(typed.chars().count());
        let replace = confidence >= required && candidate.frequency > own_frequency;
        debug!(
            word = typed,
            candidate = %candidate.term,
            confidence,
            required,
            replace,
            "autocorrect decision"
        );

        Ok(Decision {
            original: typed.to_string(),
            replacement: replace.then(|| transfer_case(typed, &candidate.term)),
            confidence,
        })
    }

    // --- Learning ---

    pub fn on_correction_accepted(&self, original: &str, accepted: &str) -> LearningOutcome {
        let _pending = self.hold_pending_load();
        let outcome = self.memory.lock().accept(original, accepted);
        if let LearningOutcome::Promoted {
            original,
            corrected,
        } = &outcome
        {
            info!("Correction '{}' -> '{}' promoted to trusted", original, corrected);
            if let Some(dictionary) = self.dictionary.get() {
                dictionary.fuzzy.write().insert(corrected, 1);
            }
        }
        outcome
    }

    pub fn on_correction_rejected(&self, original: &str, corrected: &str) -> LearningOutcome {
        self.memory.lock().reject(original, corrected)
    }

    /// Feeds a committed word into the running n-gram history.
    pub fn commit_word(&self, word: &str) {
        self.context_model.write().add_word(word);
    }

    pub fn learn_text(&self, text: &str) {
        self.context_model.write().train(text);
    }

    pub fn recent_words(&self) -> Vec<String> {
        self.context_model.read().recent()
    }

    /// Adds a personal word. Frequencies only ever go up.
    pub fn add_user_word(&self, word: &str, frequency: Frequency) -> bool {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return false;
        }
        let _pending = self.hold_pending_load();
        let mut user_words = self.user_words.lock();
        let entry = user_words.entry(word.clone()).or_insert(0);
        *entry = (*entry).max(frequency);
        if let Some(dictionary) = self.dictionary.get() {
            dictionary.fuzzy.write().insert(&word, *entry);
        }
        true
    }

    // --- Layout & state ---

    pub fn layout(&self) -> Arc<KeyLayout> {
        self.layout.read().clone()
    }

    /// Swaps key geometry; decodes already running keep the old layout.
    pub fn set_layout(&self, layout: KeyLayout) {
        *self.layout.write() = Arc::new(layout);
    }

    pub fn user_state(&self) -> UserState {
        let mut user_words: Vec<(String, Frequency)> = self
            .user_words
            .lock()
            .iter()
            .map(|(w, &f)| (w.clone(), f))
            .collect();
        user_words.sort();
        UserState {
            memory: self.memory.lock().clone(),
            user_words,
            context_model: self.context_model.read().clone(),
        }
    }

    pub fn save_user_state(&self, path: &Path) -> EngineResult<()> {
        save_to_disk(&self.user_state(), path)
    }

    /// Replaces learned state with what was saved at `path`.
    pub fn load_user_state(&self, path: &Path) -> EngineResult<()> {
        let state = load_from_disk(path)
            .inspect_err(|e| warn!("Could not load user state {:?}: {}", path, e))?;
        self.restore(state);
        Ok(())
    }

    pub fn restore(&self, state: UserState) {
        let _pending = self.hold_pending_load();
        let mut memory = self.memory.lock();
        *memory = state.memory;
        *self.context_model.write() = state.context_model;
        let mut user_words = self.user_words.lock();
        user_words.clear();
        for (word, frequency) in state.user_words {
            let entry = user_words.entry(word).or_insert(0);
            *entry = (*entry).max(frequency);
        }
        if let Some(dictionary) = self.dictionary.get() {
            let mut fuzzy = dictionary.fuzzy.write();
            for (word, &frequency) in user_words.iter() {
                fuzzy.insert(word, frequency);
            }
            for target in memory.trusted_targets() {
                fuzzy.insert(target, 1);
            }
        }
    }
}

/// Carries the typed word's capitalisation over to its replacement.
fn transfer_case(typed: &str, replacement: &str) -> String {
    let letters: Vec<char> = typed.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    match typed.chars().next() {
        Some(first) if first.is_uppercase() => {
            let mut chars = replacement.chars();
            match chars.next() {
                Some(head) => head.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => replacement.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TrieBuilder;
    use crate::core::trie::NodeLayout;

    #[test]
    fn preloaded_trie_skips_the_lazy_load() {
        let mut builder = TrieBuilder::new();
        builder.insert("Hello", 90);
        builder.insert("help", 40);
        let trie = TrieStore::from_bytes(
            builder.to_bytes(NodeLayout::Packed).unwrap(),
            NodeLayout::Packed,
        )
        .unwrap();

        let engine = KeyboardEngine::with_trie(EngineConfig::default(), trie).unwrap();
        assert!(engine.is_loaded());
        assert_eq!(engine.lookup("Hello").unwrap(), 90);
        // The fuzzy index is case-folded.
        assert_eq!(engine.lookup("hello").unwrap(), 90);
        let terms: Vec<String> = engine
            .correct("helo", 1, Verbosity::All)
            .unwrap()
            .into_iter()
            .map(|m| m.term)
            .collect();
        assert_eq!(terms, vec!["hello", "help"]);
    }

    #[test]
    fn case_follows_the_typed_word() {
        assert_eq!(transfer_case("Teh", "the"), "The");
        assert_eq!(transfer_case("TEH", "the"), "THE");
        assert_eq!(transfer_case("teh", "the"), "the");
        assert_eq!(transfer_case("I", "it"), "It");
    }
}
