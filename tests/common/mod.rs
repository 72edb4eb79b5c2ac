#![allow(dead_code)]

use ime_core::core::builder::TrieBuilder;
use ime_core::{EngineConfig, Frequency, KeyboardEngine, NodeLayout};
use std::path::Path;
use tempfile::TempDir;

pub const SMALL: &[(&str, Frequency)] = &[("the", 255), ("tie", 40), ("tea", 30)];

pub const WORDS: &[(&str, Frequency)] = &[
    ("the", 255),
    ("and", 250),
    ("to", 200),
    ("they", 180),
    ("then", 170),
    ("there", 160),
    ("too", 150),
    ("hello", 120),
    ("help", 110),
    ("world", 100),
    ("word", 90),
    ("morning", 80),
    ("night", 80),
    ("good", 75),
    ("quick", 60),
    ("brown", 50),
    ("tie", 40),
    ("tea", 30),
];

/// A compiled dictionary in a temp dir. The dir lives as long as the fixture.
pub struct Fixture {
    pub dir: TempDir,
    pub config: EngineConfig,
}

impl Fixture {
    pub fn engine(&self) -> KeyboardEngine {
        KeyboardEngine::new(self.config.clone()).unwrap()
    }
}

pub fn write_dictionary(path: &Path, words: &[(&str, Frequency)]) {
    let mut builder = TrieBuilder::new();
    for &(word, frequency) in words {
        builder.insert(word, frequency);
    }
    builder.write_to(path, NodeLayout::Packed).unwrap();
}

pub fn fixture(words: &[(&str, Frequency)]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::for_language(dir.path(), "en");
    write_dictionary(&config.dictionary_file(), words);
    Fixture { dir, config }
}
