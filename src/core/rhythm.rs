// File: src/core/rhythm.rs
use crate::config::RhythmParams;
use std::collections::VecDeque;

/// Moving average over recent inter-keystroke intervals.
#[derive(Debug, Clone)]
pub struct TypingRhythm {
    params: RhythmParams,
    last_stroke_ms: Option<u64>,
    intervals: VecDeque<u64>,
}

impl TypingRhythm {
    pub fn new(params: RhythmParams) -> Self {
        Self {
            intervals: VecDeque::with_capacity(params.window),
            params,
            last_stroke_ms: None,
        }
    }

    /// Timestamps are caller-supplied milliseconds; out-of-order ones are ignored.
    pub fn record(&mut self, at_ms: u64) {
        if let Some(last) = self.last_stroke_ms {
            if at_ms < last {
                return;
            }
            let gap = at_ms - last;
            if gap > self.params.reset_gap_ms {
                self.intervals.clear();
            } else {
                if self.intervals.len() == self.params.window.max(1) {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(gap);
            }
        }
        self.last_stroke_ms = Some(at_ms);
    }

    pub fn mean_interval_ms(&self) -> Option<f64> {
        if self.intervals.is_empty() {
            return None;
        }
        let sum: u64 = self.intervals.iter().sum();
        Some(sum as f64 / self.intervals.len() as f64)
    }

    pub fn is_burst(&self) -> bool {
        self.intervals.len() >= self.params.min_intervals
            && self
                .mean_interval_ms()
                .is_some_and(|mean| mean < self.params.burst_threshold_ms)
    }

    pub fn reset(&mut self) {
        self.intervals.clear();
        self.last_stroke_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rhythm() -> TypingRhythm {
        TypingRhythm::new(RhythmParams::default())
    }

    #[test]
    fn fast_typing_is_a_burst() {
        let mut r = rhythm();
        for t in [0, 50, 110, 160, 220] {
            r.record(t);
        }
        assert!(r.is_burst());
    }

    #[test]
    fn needs_enough_samples() {
        let mut r = rhythm();
        r.record(0);
        r.record(40);
        assert!(!r.is_burst());
    }

    #[test]
    fn pause_resets_the_window() {
        let mut r = rhythm();
        for t in [0, 50, 100, 150, 5_000, 5_050] {
            r.record(t);
        }
        assert!(!r.is_burst());
        assert_eq!(r.mean_interval_ms(), Some(50.0));
    }

    #[test]
    fn steady_typing_is_not_a_burst() {
        let mut r = rhythm();
        for t in [0, 200, 380, 600, 790] {
            r.record(t);
        }
        assert!(!r.is_burst());
    }
}
