use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::features::FeatureVector;

#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error("need at least {required} samples to train, have {available}")]
    InsufficientSamples { required: usize, available: usize },
    #[error("sample for '{label}' has {found} features, expected {expected}")]
    FeatureLengthMismatch {
        label: String,
        expected: usize,
        found: usize,
    },
}

/// One labeled observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    pub features: FeatureVector,
    pub label: String,
    pub timestamp: DateTime<Local>,
}

/// All collected samples, grouped by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    samples: BTreeMap<String, Vec<GestureSample>>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sample: GestureSample) {
        self.samples
            .entry(sample.label.clone())
            .or_default()
            .push(sample);
    }

    pub fn extend<I: IntoIterator<Item = GestureSample>>(&mut self, samples: I) {
        for sample in samples {
            self.add(sample);
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }

    pub fn samples_for(&self, label: &str) -> &[GestureSample] {
        self.samples.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GestureSample])> {
        self.samples.iter().map(|(l, s)| (l.as_str(), s.as_slice()))
    }

    pub fn total_samples(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0
    }

    /// Drops every sample under `label`; returns how many were removed.
    pub fn remove_label(&mut self, label: &str) -> usize {
        self.samples.remove(label).map_or(0, |s| s.len())
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn all_samples(&self) -> impl Iterator<Item = &GestureSample> {
        self.samples.values().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionState {
    Idle,
    Collecting {
        label: String,
        samples: Vec<GestureSample>,
    },
}

/// `Idle → Collecting(label) → Idle`. Samples gathered while collecting are
/// only added to the training set when the session stops.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    state: CollectionState,
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self {
            state: CollectionState::Idle,
        }
    }
}

impl TrainingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, CollectionState::Collecting { .. })
    }

    pub fn active_label(&self) -> Option<&str> {
        match &self.state {
            CollectionState::Collecting { label, .. } => Some(label),
            CollectionState::Idle => None,
        }
    }

    /// Number of samples gathered in the current session.
    pub fn pending_count(&self) -> usize {
        match &self.state {
            CollectionState::Collecting { samples, .. } => samples.len(),
            CollectionState::Idle => 0,
        }
    }

    /// Begins collecting under `label`. A session already running for another
    /// label is flushed into `set` first; returns the flushed count.
    pub fn start_collecting(&mut self, label: impl Into<String>, set: &mut TrainingSet) -> usize {
        let label = label.into();
        if self.active_label() == Some(label.as_str()) {
            return 0;
        }
        let flushed = self.stop_collecting(set);
        info!(label = %label, "collecting training samples");
        self.state = CollectionState::Collecting {
            label,
            samples: Vec::new(),
        };
        flushed
    }

    /// Appends a sample under the active label. Ignored while idle.
    pub fn record(&mut self, features: FeatureVector, timestamp: DateTime<Local>) -> bool {
        match &mut self.state {
            CollectionState::Collecting { label, samples } => {
                samples.push(GestureSample {
                    features,
                    label: label.clone(),
                    timestamp,
                });
                true
            }
            CollectionState::Idle => false,
        }
    }

    /// Flushes the session into `set` and returns to idle.
    pub fn stop_collecting(&mut self, set: &mut TrainingSet) -> usize {
        match std::mem::replace(&mut self.state, CollectionState::Idle) {
            CollectionState::Collecting { label, samples } => {
                let count = samples.len();
                debug!(label = %label, count, "flushing training session");
                set.extend(samples);
                count
            }
            CollectionState::Idle => 0,
        }
    }

    /// Drops the session without touching the training set.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending_count();
        self.state = CollectionState::Idle;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(v: f32) -> FeatureVector {
        FeatureVector::new(vec![v, v])
    }

    #[test]
    fn test_record_ignored_while_idle() {
        let mut session = TrainingSession::new();
        assert!(!session.record(fv(1.0), Local::now()));
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_collect_then_flush() {
        let mut set = TrainingSet::new();
        let mut session = TrainingSession::new();
        session.start_collecting("fist", &mut set);
        assert!(session.is_collecting());
        for i in 0..3 {
            assert!(session.record(fv(i as f32), Local::now()));
        }
        // nothing reaches the set until the session stops
        assert_eq!(set.total_samples(), 0);

        assert_eq!(session.stop_collecting(&mut set), 3);
        assert!(!session.is_collecting());
        assert_eq!(set.samples_for("fist").len(), 3);
        assert!(set.samples_for("fist").iter().all(|s| s.label == "fist"));
    }

    #[test]
    fn test_switching_label_flushes_previous() {
        let mut set = TrainingSet::new();
        let mut session = TrainingSession::new();
        session.start_collecting("fist", &mut set);
        session.record(fv(0.0), Local::now());
        session.record(fv(0.0), Local::now());

        let flushed = session.start_collecting("peace", &mut set);
        assert_eq!(flushed, 2);
        assert_eq!(session.active_label(), Some("peace"));
        assert_eq!(set.samples_for("fist").len(), 2);
    }

    #[test]
    fn test_restart_same_label_keeps_session() {
        let mut set = TrainingSet::new();
        let mut session = TrainingSession::new();
        session.start_collecting("fist", &mut set);
        session.record(fv(0.0), Local::now());
        assert_eq!(session.start_collecting("fist", &mut set), 0);
        assert_eq!(session.pending_count(), 1);
    }

    #[test]
    fn test_discard() {
        let mut set = TrainingSet::new();
        let mut session = TrainingSession::new();
        session.start_collecting("fist", &mut set);
        session.record(fv(0.0), Local::now());
        assert_eq!(session.discard(), 1);
        assert_eq!(session.stop_collecting(&mut set), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_training_set_grouping() {
        let mut set = TrainingSet::new();
        for label in ["b", "a", "b"] {
            set.add(GestureSample {
                features: fv(0.0),
                label: label.into(),
                timestamp: Local::now(),
            });
        }
        assert_eq!(set.labels().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.total_samples(), 3);
        assert_eq!(set.remove_label("b"), 2);
        assert_eq!(set.total_samples(), 1);
    }
}
