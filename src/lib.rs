// src/lib.rs

pub mod c_api;
pub mod config;
pub mod core;
pub mod error;
pub mod fuzzy;
pub mod learning;
pub mod persistence;
pub mod swipe;

pub use crate::config::EngineConfig;
pub use crate::core::engine::KeyboardEngine;
pub use crate::core::layout::{Key, KeyLayout};
pub use crate::core::trie::{NodeLayout, TrieStore};
pub use crate::core::types::{
    Decision, Frequency, FuzzyMatch, Point, RankedCandidate, SwipeCandidate, SwipeOutcome,
    Verbosity,
};
pub use crate::error::{EngineError, EngineResult};
pub use crate::learning::LearningOutcome;
