// File: src/persistence.rs
use crate::core::context::NgramModel;
use crate::core::types::Frequency;
use crate::error::EngineResult;
use crate::learning::CorrectionMemory;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Everything the engine learns at runtime. The dictionary itself is read-only
/// and never part of this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserState {
    pub memory: CorrectionMemory,
    pub user_words: Vec<(String, Frequency)>,
    pub context_model: NgramModel,
}

/// Writes into a temp file beside `path`, then renames over it.
pub fn save_to_disk(state: &UserState, path: &Path) -> EngineResult<()> {
    let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, state)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn load_from_disk(path: &Path) -> EngineResult<UserState> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let state: UserState = bincode::deserialize_from(reader)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn state_survives_a_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("user_state.bin");

        let mut state = UserState::default();
        state.memory.reject("the", "teh");
        state.user_words.push(("rustacean".into(), 120));
        state.context_model.train("good morning");

        save_to_disk(&state, &path).unwrap();
        let loaded = load_from_disk(&path).unwrap();
        assert!(loaded.memory.is_blacklisted("the", "teh"));
        assert_eq!(loaded.user_words, state.user_words);
        assert!(loaded.context_model.has_bigram(&["good"], "morning"));
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user_state.bin");
        fs::write(&path, b"\xff\xff\xff\xff\xff\xff\xff\xff\xff").unwrap();
        assert!(load_from_disk(&path).is_err());
    }
}
