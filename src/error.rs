// File: src/error.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The per-language trie asset is missing or unreadable. Fatal for that language.
    #[error("Dictionary unavailable for '{language}' at {path:?}: {source}")]
    DictionaryUnavailable {
        language: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt dictionary {path:?}: {reason}")]
    CorruptDictionary { path: PathBuf, reason: String },

    #[error("Trie exceeds the 24-bit offset space ({0} bytes)")]
    TrieTooLarge(usize),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl EngineError {
    /// Asset errors mean the host should fall back to unassisted typing.
    pub fn is_asset_error(&self) -> bool {
        matches!(
            self,
            EngineError::DictionaryUnavailable { .. } | EngineError::CorruptDictionary { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
