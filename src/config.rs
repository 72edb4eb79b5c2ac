// File: src/config.rs
use crate::core::layout::Key;
use crate::core::trie::NodeLayout;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dictionary_dir: PathBuf,
    pub language: String,
    pub node_layout: NodeLayout,
    pub decoder: DecoderParams,
    pub fuzzy: FuzzyParams,
    pub fusion: FusionWeights,
    pub rhythm: RhythmParams,
    pub preprocess: PreprocessParams,
    /// Custom key geometry. `None` selects the built-in QWERTY layout.
    pub layout: Option<Vec<Key>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dictionary_dir: PathBuf::from("dictionaries"),
            language: "en".to_string(),
            node_layout: NodeLayout::default(),
            decoder: DecoderParams::default(),
            fuzzy: FuzzyParams::default(),
            fusion: FusionWeights::default(),
            rhythm: RhythmParams::default(),
            preprocess: PreprocessParams::default(),
            layout: None,
        }
    }
}

impl EngineConfig {
    pub fn for_language(dictionary_dir: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            dictionary_dir: dictionary_dir.into(),
            language: language.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// `<dictionary_dir>/<language>.bin`
    pub fn dictionary_file(&self) -> PathBuf {
        self.dictionary_dir.join(format!("{}.bin", self.language))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.language.trim().is_empty() {
            return Err(EngineError::Config("language tag must not be empty".into()));
        }
        if self.decoder.beam_width == 0 {
            return Err(EngineError::Config("decoder.beam_width must be > 0".into()));
        }
        if !(self.decoder.sigma > 0.0) {
            return Err(EngineError::Config("decoder.sigma must be positive".into()));
        }
        if self.fuzzy.prefix_length == 0 {
            return Err(EngineError::Config("fuzzy.prefix_length must be > 0".into()));
        }
        if self.preprocess.dwell_samples < 2 {
            return Err(EngineError::Config(
                "preprocess.dwell_samples must be at least 2".into(),
            ));
        }
        let bands = &self.fusion.confidence;
        if !(bands.short >= bands.medium && bands.medium >= bands.long) {
            return Err(EngineError::Config(
                "fusion.confidence must not increase with word length".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderParams {
    pub beam_width: usize,
    /// Gaussian width of the spatial term, in normalized layout units.
    pub sigma: f64,
    /// Cost of letting a hypothesis sit on a sample without consuming a letter.
    pub wait_penalty: f64,
    /// Cheaper wait for samples the finger only passes over on a straight run.
    pub pass_through_penalty: f64,
    /// Turn cosine at or above which a sample counts as passed over.
    pub pass_through_cos: f64,
    pub direction_weight: f64,
    /// Minimum spatial term for accepting a doubled letter.
    pub dwell_bar: f64,
    pub freq_weight: f64,
    pub length_bonus: f64,
    /// Hard floor on the path score; frequency never buys back a path below it.
    pub path_floor: f64,
    pub max_candidates: usize,
    pub max_word_len: usize,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self {
            beam_width: 25,
            sigma: 0.10,
            wait_penalty: 3.5,
            pass_through_penalty: 0.5,
            pass_through_cos: 0.9,
            direction_weight: 2.0,
            dwell_bar: 0.95,
            freq_weight: 0.5,
            length_bonus: 0.7,
            path_floor: -10.0,
            max_candidates: 8,
            max_word_len: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyParams {
    pub max_edit_distance: usize,
    pub prefix_length: usize,
}

impl Default for FuzzyParams {
    fn default() -> Self {
        Self {
            max_edit_distance: 2,
            prefix_length: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub spatial: f64,
    pub frequency: f64,
    pub context: f64,
    /// Probability floor for the context term, keeps ln() finite.
    pub context_floor: f64,
    pub auto_commit_margin: f64,
    /// Confidence added to a typed correction the preceding word backs up.
    pub context_bonus: f64,
    pub confidence: ConfidenceBands,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            spatial: 0.5,
            frequency: 0.3,
            context: 0.2,
            context_floor: 1e-4,
            auto_commit_margin: 2.0,
            context_bonus: 0.05,
            confidence: ConfidenceBands::default(),
        }
    }
}

/// Minimum confidence before silently replacing a typed word, by word length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    /// Up to 3 characters.
    pub short: f64,
    /// 4 to 6 characters.
    pub medium: f64,
    /// 7 characters and longer.
    pub long: f64,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            short: 0.85,
            medium: 0.75,
            long: 0.65,
        }
    }
}

impl ConfidenceBands {
    pub fn required(&self, char_len: usize) -> f64 {
        match char_len {
            0..=3 => self.short,
            4..=6 => self.medium,
            _ => self.long,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmParams {
    pub window: usize,
    /// Mean inter-keystroke interval (ms) under which typing counts as a burst.
    pub burst_threshold_ms: f64,
    pub min_intervals: usize,
    /// A pause this long starts a fresh window.
    pub reset_gap_ms: u64,
}

impl Default for RhythmParams {
    fn default() -> Self {
        Self {
            window: 5,
            burst_threshold_ms: 90.0,
            min_intervals: 3,
            reset_gap_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    pub enabled: bool,
    pub smoothing_window: usize,
    /// Samples staying this close to where they started count as a hold.
    pub dwell_radius: f64,
    /// Consecutive held samples that make a deliberate dwell.
    pub dwell_samples: usize,
    /// How much nearer a new key centre must be before the visit moves to it.
    pub key_hysteresis: f64,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing_window: 0,
            dwell_radius: 0.015,
            dwell_samples: 4,
            key_hysteresis: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "language": "de", "decoder": { "beam_width": 30 } }"#)
                .unwrap();
        assert_eq!(config.language, "de");
        assert_eq!(config.decoder.beam_width, 30);
        assert_eq!(config.decoder.wait_penalty, 3.5);
        assert_eq!(config.preprocess.dwell_samples, 4);
        assert_eq!(config.fuzzy.prefix_length, 7);
        assert!(config.dictionary_file().ends_with("de.bin"));
    }

    #[test]
    fn rejects_increasing_confidence_bands() {
        let raw = r#"{ "fusion": { "confidence": { "short": 0.5, "medium": 0.7, "long": 0.9 } } }"#;
        assert!(matches!(
            EngineConfig::from_json_str(raw),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn confidence_bands_by_length() {
        let bands = ConfidenceBands::default();
        assert_eq!(bands.required(3), 0.85);
        assert_eq!(bands.required(4), 0.75);
        assert_eq!(bands.required(6), 0.75);
        assert_eq!(bands.required(7), 0.65);
    }
}
