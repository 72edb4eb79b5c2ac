// File: src/swipe/decoder.rs
use crate::config::DecoderParams;
use crate::core::layout::KeyLayout;
use crate::core::trie::{TrieNode, TrieStore};
use crate::core::types::{NodeRef, Point, SwipeCandidate};
use crate::swipe::path::SwipePath;
use crate::swipe::shape::is_plausible;
use std::collections::HashMap;
use tracing::debug;

/// One partial word tracked through the beam. Never outlives a single decode.
#[derive(Debug, Clone)]
struct Hypothesis {
    text: String,
    score: f64,
    node: TrieNode,
    last_char: Option<char>,
}

/// Beam search over trie transitions, scored against key geometry.
///
/// Expects one sample per key visited: every sample either advances a hypothesis
/// by one letter or makes it wait, so dense raw input should go through
/// [`SwipePath::preprocess`] first. Waiting on a sample the finger only passed
/// over is cheap; waiting on an endpoint or a turn costs the full penalty.
pub struct PathDecoder<'a> {
    trie: &'a TrieStore,
    layout: &'a KeyLayout,
    params: &'a DecoderParams,
}

impl<'a> PathDecoder<'a> {
    pub fn new(trie: &'a TrieStore, layout: &'a KeyLayout, params: &'a DecoderParams) -> Self {
        Self {
            trie,
            layout,
            params,
        }
    }

    /// Ranked words for one gesture. Degenerate input yields no candidates.
    pub fn decode(&self, path: SwipePath) -> Vec<SwipeCandidate> {
        let points = path.into_points();
        if points.len() < 2 || !points.iter().any(|p| self.layout.on_letter_key(p)) {
            return Vec::new();
        }

        let mut beam = vec![Hypothesis {
            text: String::new(),
            score: 0.0,
            node: self.trie.root(),
            last_char: None,
        }];

        for (i, sample) in points.iter().enumerate() {
            let movement = i.checked_sub(1).map(|prev| vector(&points[prev], sample));
            beam = self.step(&beam, sample, movement, self.wait_cost(&points, i));
            if beam.is_empty() {
                break;
            }
        }

        let candidates = self.finalize(beam);
        debug!(
            samples = points.len(),
            candidates = candidates.len(),
            top = candidates.first().map(|c| c.word.as_str()),
            "swipe decoded"
        );
        candidates
    }

    /// Full penalty at the endpoints and at turns. A repeated sample is a hold and
    /// counts as passed over.
    fn wait_cost(&self, points: &[Point], i: usize) -> f64 {
        let p = self.params;
        if i == 0 || i + 1 >= points.len() {
            return p.wait_penalty;
        }
        let incoming = vector(&points[i - 1], &points[i]);
        let outgoing = vector(&points[i], &points[i + 1]);
        match cosine(incoming, outgoing) {
            Some(turn) if turn < p.pass_through_cos => p.wait_penalty,
            _ => p.pass_through_penalty,
        }
    }

    fn step(
        &self,
        beam: &[Hypothesis],
        sample: &Point,
        movement: Option<(f64, f64)>,
        wait: f64,
    ) -> Vec<Hypothesis> {
        let p = self.params;
        let two_sigma_sq = 2.0 * p.sigma * p.sigma;

        let mut next: Vec<Hypothesis> = Vec::with_capacity(beam.len() * 4);
        let mut slots: HashMap<NodeRef, usize> = HashMap::with_capacity(beam.len() * 4);

        for hyp in beam {
            merge(
                &mut next,
                &mut slots,
                Hypothesis {
                    score: hyp.score - wait,
                    ..hyp.clone()
                },
            );

            let last_center = hyp.last_char.and_then(|c| self.layout.center(c));
            for child in self.trie.children(&hyp.node) {
                let Some(ch) = child.character() else {
                    continue;
                };
                let Some(center) = self.layout.center(ch) else {
                    continue;
                };

                let log_spatial = -sample.distance_sq(&center) / two_sigma_sq;
                if hyp.last_char == Some(ch) && log_spatial.exp() < p.dwell_bar {
                    continue;
                }

                let direction = match (movement, last_center) {
                    (Some(moved), Some(from)) => cosine(moved, vector(&from, &center))
                        .map_or(0.0, |cos| p.direction_weight * (cos - 1.0) / 2.0),
                    _ => 0.0,
                };

                let mut text = String::with_capacity(hyp.text.len() + ch.len_utf8());
                text.push_str(&hyp.text);
                text.push(ch);
                merge(
                    &mut next,
                    &mut slots,
                    Hypothesis {
                        text,
                        score: hyp.score + log_spatial + direction,
                        node: child,
                        last_char: Some(ch),
                    },
                );
            }
        }

        // Stable sort: equal scores keep insertion order.
        next.sort_by(|a, b| b.score.total_cmp(&a.score));
        next.truncate(p.beam_width);
        next
    }

    fn finalize(&self, beam: Vec<Hypothesis>) -> Vec<SwipeCandidate> {
        let p = self.params;
        let mut candidates: Vec<SwipeCandidate> = beam
            .into_iter()
            .filter(|h| h.node.is_terminal())
            .filter(|h| h.score >= p.path_floor)
            .filter(|h| is_plausible(&h.text, p.max_word_len))
            .map(|h| {
                let frequency = f64::from(h.node.frequency.max(1));
                let length = h.text.chars().count() as f64;
                SwipeCandidate {
                    score: h.score + p.freq_weight * frequency.ln() + p.length_bonus * length,
                    path_score: h.score,
                    word: h.text,
                }
            })
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(p.max_candidates);
        candidates
    }
}

/// Keeps a single hypothesis per trie node, the better-scoring one.
fn merge(next: &mut Vec<Hypothesis>, slots: &mut HashMap<NodeRef, usize>, hyp: Hypothesis) {
    match slots.get(&hyp.node.offset) {
        Some(&idx) => {
            if hyp.score > next[idx].score {
                next[idx] = hyp;
            }
        }
        None => {
            slots.insert(hyp.node.offset, next.len());
            next.push(hyp);
        }
    }
}

fn vector(from: &Point, to: &Point) -> (f64, f64) {
    (to.x - from.x, to.y - from.y)
}

fn cosine(a: (f64, f64), b: (f64, f64)) -> Option<f64> {
    let na = a.0.hypot(a.1);
    let nb = b.0.hypot(b.1);
    if na < 1e-9 || nb < 1e-9 {
        return None;
    }
    Some(((a.0 * b.0 + a.1 * b.1) / (na * nb)).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::TrieBuilder;
    use crate::core::trie::NodeLayout;
    use crate::core::types::Frequency;

    fn trie(words: &[(&str, Frequency)]) -> TrieStore {
        let mut builder = TrieBuilder::new();
        for &(w, f) in words {
            builder.insert(w, f);
        }
        TrieStore::from_bytes(builder.to_bytes(NodeLayout::Packed).unwrap(), NodeLayout::Packed)
            .unwrap()
    }

    fn decode(trie: &TrieStore, params: &DecoderParams, word: &str) -> Vec<SwipeCandidate> {
        let layout = KeyLayout::qwerty();
        let path = SwipePath::new(layout.trace(word));
        PathDecoder::new(trie, &layout, params).decode(path)
    }

    #[test]
    fn follows_the_key_sequence() {
        let t = trie(&[("the", 255), ("tie", 40), ("tea", 30)]);
        let out = decode(&t, &DecoderParams::default(), "the");
        assert_eq!(out[0].word, "the");
        assert!(out[0].path_score <= 0.0 && out[0].path_score >= -2.0);
        assert!(out.iter().skip(1).all(|c| c.score < out[0].score));
    }

    #[test]
    fn doubled_letters_need_a_dwell() {
        let t = trie(&[("to", 100), ("too", 200)]);
        let layout = KeyLayout::qwerty();
        let tk = layout.center('t').unwrap();
        let o = layout.center('o').unwrap();
        // Jitter near the edge of the o key must not produce a second o.
        let jitter = Point::new(o.x - 0.045, o.y);
        let path = SwipePath::new(vec![tk, o, jitter]);
        let out = PathDecoder::new(&t, &layout, &DecoderParams::default()).decode(path);
        assert!(out.iter().all(|c| c.word != "too"));
        assert!(out.iter().any(|c| c.word == "to"));

        // A sample right on the key centre is a deliberate dwell.
        let path = SwipePath::new(vec![tk, o, o]);
        let out = PathDecoder::new(&t, &layout, &DecoderParams::default()).decode(path);
        assert_eq!(out[0].word, "too");
    }

    #[test]
    fn keys_passed_on_a_straight_run_can_be_skipped_or_typed() {
        let t = trie(&[("type", 70), ("tie", 40), ("to", 200)]);
        let layout = KeyLayout::qwerty();
        // t y u i o p, then back along the row to e.
        let path = SwipePath::new(layout.trace("tyuiopoiuytre"));
        let out = PathDecoder::new(&t, &layout, &DecoderParams::default()).decode(path);
        assert_eq!(out[0].word, "type");
        assert!((out[0].path_score + 4.5).abs() < 1e-9);
        // "to" would have to wait out the turn at p and the final e.
        assert!(out.iter().all(|c| c.word != "to"));
    }

    #[test]
    fn single_sample_yields_nothing() {
        let t = trie(&[("a", 100)]);
        let layout = KeyLayout::qwerty();
        let path = SwipePath::new(vec![layout.center('a').unwrap()]);
        assert!(PathDecoder::new(&t, &layout, &DecoderParams::default())
            .decode(path)
            .is_empty());
    }

    #[test]
    fn off_keyboard_path_yields_nothing() {
        let t = trie(&[("the", 255)]);
        let layout = KeyLayout::qwerty();
        let path = SwipePath::from_xy(&[(0.2, 0.9), (0.5, 0.9), (0.8, 0.95)]);
        assert!(PathDecoder::new(&t, &layout, &DecoderParams::default())
            .decode(path)
            .is_empty());
    }
}
