// File: src/core/layout.rs
use crate::core::types::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const QWERTY_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];
/// Letter rows fill the top three quarters; the bottom row (space etc.) has no letters.
const QWERTY_ROW_HEIGHT: f64 = 0.25;
const QWERTY_KEY_WIDTH: f64 = 0.1;
const QWERTY_ROW_INSET: [f64; 3] = [0.0, 0.05, 0.15];

/// One key in normalized layout coordinates; `x`/`y` are the key centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub label: char,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Key {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn contains(&self, p: &Point) -> bool {
        (p.x - self.x).abs() <= self.width / 2.0 && (p.y - self.y).abs() <= self.height / 2.0
    }
}

/// Key geometry for the active layout. Owned by the host, handed to the engine.
#[derive(Debug, Clone)]
pub struct KeyLayout {
    keys: Vec<Key>,
    by_label: HashMap<char, usize>,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::qwerty()
    }
}

impl KeyLayout {
    /// Labels are matched case-insensitively.
    pub fn new(keys: Vec<Key>) -> Self {
        let by_label = keys
            .iter()
            .enumerate()
            .flat_map(|(i, k)| k.label.to_lowercase().map(move |c| (c, i)))
            .collect();
        Self { keys, by_label }
    }

    pub fn qwerty() -> Self {
        let keys = QWERTY_ROWS
            .iter()
            .enumerate()
            .flat_map(|(row, letters)| {
                letters.chars().enumerate().map(move |(col, label)| Key {
                    label,
                    x: QWERTY_ROW_INSET[row] + (col as f64 + 0.5) * QWERTY_KEY_WIDTH,
                    y: (row as f64 + 0.5) * QWERTY_ROW_HEIGHT,
                    width: QWERTY_KEY_WIDTH,
                    height: QWERTY_ROW_HEIGHT,
                })
            })
            .collect();
        Self::new(keys)
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn key(&self, label: char) -> Option<&Key> {
        let idx = match self.by_label.get(&label) {
            Some(&idx) => idx,
            None => *self.by_label.get(&label.to_lowercase().next()?)?,
        };
        self.keys.get(idx)
    }

    pub fn center(&self, label: char) -> Option<Point> {
        self.key(label).map(Key::center)
    }

    /// True when `p` lies on any letter key.
    pub fn on_letter_key(&self, p: &Point) -> bool {
        self.keys
            .iter()
            .any(|k| k.label.is_alphabetic() && k.contains(p))
    }

    pub fn nearest(&self, p: &Point) -> Option<&Key> {
        self.keys
            .iter()
            .min_by(|a, b| a.center().distance_sq(p).total_cmp(&b.center().distance_sq(p)))
    }

    /// Key-centre trajectory for `word`, skipping characters without a key.
    pub fn trace(&self, word: &str) -> Vec<Point> {
        word.chars().filter_map(|c| self.center(c)).collect()
    }
}
