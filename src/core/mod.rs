// src/core/mod.rs
pub mod builder;
pub mod context;
pub mod engine;
pub mod layout;
pub mod rhythm;
pub mod trie;
pub mod types;
