// src/core/types.rs
use serde::{Deserialize, Serialize};

/// Dictionary frequency class. 0 marks a prefix that is not a complete word.
pub type Frequency = u8;

/// Byte offset of a node inside the mapped trie. 0 doubles as "no pointer".
pub type NodeRef = u32;

/// A touch sample in layout-normalized coordinates, both axes in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// How many fuzzy matches a lookup hands back. Selection happens after ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Only the single best match.
    Top,
    /// Up to three close matches.
    #[default]
    Closest,
    /// Everything within the distance bound.
    All,
}

impl Verbosity {
    pub fn cap(self) -> Option<usize> {
        match self {
            Verbosity::Top => Some(1),
            Verbosity::Closest => Some(3),
            Verbosity::All => None,
        }
    }
}

/// One candidate returned by the fuzzy matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub term: String,
    pub distance: usize,
    pub frequency: Frequency,
    pub score: f64,
}

/// A word hypothesis that survived swipe decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeCandidate {
    pub word: String,
    /// Accumulated spatial/directional cost of the trajectory, <= 0 for a clean path.
    pub path_score: f64,
    /// Path score plus frequency and length terms.
    pub score: f64,
}

/// Result of the typing-time correction check. Never applied by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub original: String,
    pub replacement: Option<String>,
    pub confidence: f64,
}

impl Decision {
    pub fn keep(original: &str) -> Self {
        Self {
            original: original.to_string(),
            replacement: None,
            confidence: 0.0,
        }
    }
}

/// A swipe candidate after frequency and context fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub word: String,
    pub path_score: f64,
    pub score: f64,
}

/// Ranked swipe suggestions plus the engine's auto-commit pick, if any.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwipeOutcome {
    pub candidates: Vec<RankedCandidate>,
    pub auto_commit: Option<String>,
}
