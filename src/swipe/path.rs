// File: src/swipe/path.rs
use crate::config::PreprocessParams;
use crate::core::layout::KeyLayout;
use crate::core::types::Point;

/// One gesture's worth of touch samples in layout-normalized coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwipePath {
    points: Vec<Point>,
}

impl SwipePath {
    /// Non-finite samples are dropped.
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points: points.into_iter().filter(Point::is_finite).collect(),
        }
    }

    pub fn from_xy(samples: &[(f64, f64)]) -> Self {
        Self::new(samples.iter().copied().map(Point::from).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Smoothing, then key-visit resampling, as configured.
    pub fn preprocess(self, params: &PreprocessParams, layout: &KeyLayout) -> Self {
        if !params.enabled {
            return self;
        }
        self.smoothed(params.smoothing_window)
            .key_visits(layout, params)
    }

    /// Centred moving average. Endpoints are kept as-is so the gesture's start and
    /// end keys are not pulled inward.
    pub fn smoothed(self, window: usize) -> Self {
        let n = self.points.len();
        if window < 2 || n < 3 {
            return self;
        }
        let half = window / 2;
        let mut out = Vec::with_capacity(n);
        out.push(self.points[0]);
        for i in 1..n - 1 {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let span = &self.points[lo..=hi];
            let count = span.len() as f64;
            out.push(Point::new(
                span.iter().map(|p| p.x).sum::<f64>() / count,
                span.iter().map(|p| p.y).sum::<f64>() / count,
            ));
        }
        out.push(self.points[n - 1]);
        Self { points: out }
    }

    /// Resamples the trajectory into one sample per key crossed, taken where the
    /// finger came closest to that key's centre. A hold of `dwell_samples` samples
    /// inside `dwell_radius` adds a second sample at the hold point.
    pub fn key_visits(self, layout: &KeyLayout, params: &PreprocessParams) -> Self {
        let mut visits: Vec<KeyVisit> = Vec::new();
        let mut hold: Option<(Point, usize)> = None;

        for p in self.points {
            let Some(key) = layout.nearest(&p) else {
                continue;
            };
            let (anchor, held) = match hold {
                Some((anchor, count)) if anchor.distance(&p) <= params.dwell_radius => {
                    (anchor, count + 1)
                }
                _ => (p, 1),
            };
            hold = Some((anchor, held));

            let center = key.center();
            match visits.last_mut() {
                Some(visit)
                    if visit.label == key.label
                        || visit.center.distance(&p) - center.distance(&p)
                            <= params.key_hysteresis =>
                {
                    if p.distance(&visit.center) < visit.closest.distance(&visit.center) {
                        visit.closest = p;
                    }
                }
                _ => visits.push(KeyVisit {
                    label: key.label,
                    center,
                    closest: p,
                    dwell: None,
                }),
            }
            if held >= params.dwell_samples {
                if let Some(visit) = visits.last_mut() {
                    visit.dwell = Some(anchor);
                }
            }
        }

        let mut points = Vec::with_capacity(visits.len() + 1);
        for visit in visits {
            points.push(visit.closest);
            points.extend(visit.dwell);
        }
        Self { points }
    }
}

struct KeyVisit {
    label: char,
    center: Point,
    closest: Point,
    dwell: Option<Point>,
}
