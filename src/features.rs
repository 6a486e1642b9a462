use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::landmarks::{HandLandmark, LandmarkFrame, MotionSample, Producer, SourceFrame};
use crate::util::variance;

/// 21 wrist-relative points plus distance and angle for each fingertip.
pub const LANDMARK_FEATURE_LEN: usize = 21 * 3 + 5 * 2;
/// net dx, net dy, var x, var y, path length, mean intensity.
pub const MOTION_FEATURE_LEN: usize = 6;

pub const MIN_MOTION_WINDOW: usize = 10;
pub const MAX_MOTION_WINDOW: usize = 50;

/// Fixed-length numeric encoding of one observation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Expected feature length for a producer.
pub fn feature_len(producer: Producer) -> usize {
    match producer {
        Producer::Landmark => LANDMARK_FEATURE_LEN,
        Producer::Motion => MOTION_FEATURE_LEN,
    }
}

/// Wrist-relative offsets followed by fingertip distance/angle pairs.
pub fn extract(frame: &LandmarkFrame) -> FeatureVector {
    let wrist = frame.wrist();
    let mut values = Vec::with_capacity(LANDMARK_FEATURE_LEN);

    for p in frame.points() {
        values.push(p.x - wrist.x);
        values.push(p.y - wrist.y);
        values.push(p.z - wrist.z);
    }

    for tip in HandLandmark::fingertips() {
        let p = frame.point(tip);
        values.push(p.distance(&wrist));
        values.push((p.y - wrist.y).atan2(p.x - wrist.x));
    }

    FeatureVector(values)
}

/// Producer-tagged extraction. Motion samples are pushed into `window` and a
/// vector is produced only once the window holds enough samples.
pub fn extract_frame(frame: &SourceFrame, window: &mut MotionWindow) -> Option<FeatureVector> {
    match frame {
        SourceFrame::Landmarks(landmarks) => Some(extract(landmarks)),
        SourceFrame::Motion(sample) => {
            if !window.push(*sample) {
                return None;
            }
            window.features()
        }
    }
}

// ── Motion window ──────────────────────────────────────────

/// Rolling window of recent motion samples.
#[derive(Debug, Clone)]
pub struct MotionWindow {
    samples: VecDeque<MotionSample>,
    capacity: usize,
    min_intensity: f32,
}

impl MotionWindow {
    /// Capacity is clamped to `MIN_MOTION_WINDOW..=MAX_MOTION_WINDOW`.
    pub fn new(capacity: usize, min_intensity: f32) -> Self {
        let capacity = capacity.clamp(MIN_MOTION_WINDOW, MAX_MOTION_WINDOW);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            min_intensity,
        }
    }

    /// Adds a sample, evicting the oldest when full. Returns false when the
    /// sample was rejected for low intensity or a non-finite position.
    pub fn push(&mut self, sample: MotionSample) -> bool {
        if !sample.x.is_finite() || !sample.y.is_finite() {
            debug!("dropping non-finite motion sample");
            return false;
        }
        if sample.intensity < self.min_intensity {
            return false;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enough samples for analysis.
    pub fn is_ready(&self) -> bool {
        self.samples.len() >= MIN_MOTION_WINDOW
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> impl Iterator<Item = &MotionSample> {
        self.samples.iter()
    }

    pub fn xs(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.x).collect()
    }

    pub fn ys(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.y).collect()
    }

    /// Displacement between the oldest and newest sample.
    pub fn net_displacement(&self) -> (f32, f32) {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => (last.x - first.x, last.y - first.y),
            _ => (0.0, 0.0),
        }
    }

    /// Window summary, `None` until the window is ready.
    pub fn features(&self) -> Option<FeatureVector> {
        if !self.is_ready() {
            return None;
        }

        let (dx, dy) = self.net_displacement();
        let var_x = variance(&self.xs()).unwrap_or(0.0);
        let var_y = variance(&self.ys()).unwrap_or(0.0);
        let path: f32 = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt())
            .sum();
        let mean_intensity =
            self.samples.iter().map(|s| s.intensity).sum::<f32>() / self.samples.len() as f32;

        Some(FeatureVector(vec![dx, dy, var_x, var_y, path, mean_intensity]))
    }
}

impl Default for MotionWindow {
    fn default() -> Self {
        Self::new(30, 0.05)
    }
}
