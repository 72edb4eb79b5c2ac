// src/swipe/mod.rs
pub mod decoder;
pub mod path;
pub mod shape;
