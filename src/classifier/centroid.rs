use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::features::feature_len;
use crate::landmarks::Producer;
use crate::training::{TrainingError, TrainingSet};
use crate::util::{element_wise_mean, euclidean_distance};

use super::{Classification, GestureClassifier, Observation, TrainableClassifier, TrainingReport};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Default training minimum per producer.
pub fn default_min_samples(producer: Producer) -> usize {
    match producer {
        Producer::Landmark => 50,
        Producer::Motion => 20,
    }
}

/// Label → centroid mapping. This is what gets persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    pub producer: Producer,
    pub feature_len: usize,
    pub centroids: BTreeMap<String, Vec<f32>>,
}

impl CentroidModel {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.centroids.keys().map(String::as_str)
    }

    pub fn centroid(&self, label: &str) -> Option<&[f32]> {
        self.centroids.get(label).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Best match as `(label, similarity)` without applying any threshold.
    pub fn nearest(&self, features: &[f32]) -> Option<(&str, f32)> {
        if features.len() != self.feature_len {
            return None;
        }
        self.centroids
            .iter()
            .map(|(label, c)| {
                let similarity = 1.0 / (1.0 + euclidean_distance(features, c));
                (label.as_str(), similarity)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Nearest centroid by `1 / (1 + distance)` similarity, gated by a threshold.
#[derive(Debug, Clone)]
pub struct CentroidClassifier {
    producer: Producer,
    min_samples: usize,
    threshold: f32,
    model: Option<CentroidModel>,
}

impl CentroidClassifier {
    pub fn new(producer: Producer) -> Self {
        Self {
            producer,
            min_samples: default_min_samples(producer),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            model: None,
        }
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Installs a previously persisted model. Models for a different producer
    /// are refused.
    pub fn with_model(mut self, model: CentroidModel) -> Self {
        self.load_model(model);
        self
    }

    pub fn load_model(&mut self, model: CentroidModel) -> bool {
        if model.producer != self.producer || model.feature_len != feature_len(self.producer) {
            debug!(
                expected = %self.producer,
                found = %model.producer,
                "ignoring model for another producer"
            );
            return false;
        }
        self.model = Some(model);
        true
    }

    pub fn model(&self) -> Option<&CentroidModel> {
        self.model.as_ref()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn classify_features(&self, features: &[f32]) -> Option<Classification> {
        let model = self.model.as_ref()?;
        let (label, similarity) = model.nearest(features)?;
        (similarity > self.threshold).then(|| Classification::new(label, similarity))
    }
}

impl GestureClassifier for CentroidClassifier {
    fn classify(&self, observation: &Observation<'_>) -> Option<Classification> {
        self.classify_features(observation.features().as_slice())
    }

    fn name(&self) -> &'static str {
        "centroid"
    }
}

impl TrainableClassifier for CentroidClassifier {
    fn train(&mut self, set: &TrainingSet) -> Result<TrainingReport, TrainingError> {
        let available = set.total_samples();
        if available < self.min_samples {
            return Err(TrainingError::InsufficientSamples {
                required: self.min_samples,
                available,
            });
        }

        let expected = feature_len(self.producer);
        let mut centroids = BTreeMap::new();
        for (label, samples) in set.iter() {
            if samples.is_empty() {
                continue;
            }
            if let Some(bad) = samples.iter().find(|s| s.features.len() != expected) {
                return Err(TrainingError::FeatureLengthMismatch {
                    label: label.to_string(),
                    expected,
                    found: bad.features.len(),
                });
            }
            let centroid =
                element_wise_mean(samples.iter().map(|s| s.features.as_slice()), expected)
                    .ok_or_else(|| TrainingError::InsufficientSamples {
                        required: self.min_samples,
                        available,
                    })?;
            centroids.insert(label.to_string(), centroid);
        }

        let labels: Vec<String> = centroids.keys().cloned().collect();
        info!(labels = ?labels, samples = available, "centroid model trained");
        self.model = Some(CentroidModel {
            producer: self.producer,
            feature_len: expected,
            centroids,
        });

        Ok(TrainingReport {
            labels,
            samples_used: available,
        })
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureVector, MOTION_FEATURE_LEN};
    use crate::training::GestureSample;
    use assert_matches::assert_matches;
    use chrono::Local;

    fn sample(label: &str, values: [f32; MOTION_FEATURE_LEN]) -> GestureSample {
        GestureSample {
            features: FeatureVector::new(values.to_vec()),
            label: label.into(),
            timestamp: Local::now(),
        }
    }

    fn two_label_set() -> TrainingSet {
        let mut set = TrainingSet::new();
        for i in 0..10 {
            let j = i as f32 * 0.01;
            set.add(sample("a", [j, 0.0, 0.0, 0.0, 0.0, 0.0]));
            set.add(sample("b", [5.0 + j, 5.0, 0.0, 0.0, 0.0, 0.0]));
        }
        set
    }

    #[test]
    fn test_refuses_below_minimum() {
        let mut c = CentroidClassifier::new(Producer::Motion);
        let mut set = TrainingSet::new();
        for _ in 0..19 {
            set.add(sample("a", [0.0; MOTION_FEATURE_LEN]));
        }
        assert_matches!(
            c.train(&set),
            Err(TrainingError::InsufficientSamples {
                required: 20,
                available: 19
            })
        );
        assert!(!c.is_trained());
    }

    #[test]
    fn test_landmark_default_minimum_is_50() {
        assert_eq!(CentroidClassifier::new(Producer::Landmark).min_samples(), 50);
        assert_eq!(CentroidClassifier::new(Producer::Motion).min_samples(), 20);
    }

    #[test]
    fn test_exact_centroid_has_similarity_one() {
        let mut c = CentroidClassifier::new(Producer::Motion);
        c.train(&two_label_set()).unwrap();

        let centroid = c.model().unwrap().centroid("a").unwrap().to_vec();
        let result = c.classify_features(&centroid).unwrap();
        assert_eq!(result.label, "a");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_centroid_is_element_wise_mean() {
        let mut c = CentroidClassifier::new(Producer::Motion).with_min_samples(2);
        let mut set = TrainingSet::new();
        set.add(sample("a", [0.0, 2.0, 0.0, 0.0, 0.0, 0.0]));
        set.add(sample("a", [2.0, 4.0, 0.0, 0.0, 0.0, 0.0]));
        c.train(&set).unwrap();
        assert_eq!(
            c.model().unwrap().centroid("a").unwrap(),
            &[1.0, 3.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_distant_input_is_rejected() {
        let mut c = CentroidClassifier::new(Producer::Motion);
        c.train(&two_label_set()).unwrap();
        // distance ~ 50 from both centroids → similarity ~ 0.02
        assert!(c.classify_features(&[50.0, -50.0, 0.0, 0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut c = CentroidClassifier::new(Producer::Motion)
            .with_min_samples(1)
            .with_threshold(0.5);
        let mut set = TrainingSet::new();
        set.add(sample("a", [0.0; MOTION_FEATURE_LEN]));
        c.train(&set).unwrap();
        // distance exactly 1 → similarity exactly 0.5, not above threshold
        assert!(c.classify_features(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).is_none());
        assert!(c.classify_features(&[0.5, 0.0, 0.0, 0.0, 0.0, 0.0]).is_some());
    }

    #[test]
    fn test_wrong_length_input_is_none() {
        let mut c = CentroidClassifier::new(Producer::Motion);
        c.train(&two_label_set()).unwrap();
        assert!(c.classify_features(&[0.0, 0.0]).is_none());
    }

    #[test]
    fn test_untrained_classifies_nothing() {
        let c = CentroidClassifier::new(Producer::Motion);
        assert!(c.classify_features(&[0.0; MOTION_FEATURE_LEN]).is_none());
    }

    #[test]
    fn test_mismatched_sample_length_is_refused() {
        let mut c = CentroidClassifier::new(Producer::Motion).with_min_samples(1);
        let mut set = TrainingSet::new();
        set.add(GestureSample {
            features: FeatureVector::new(vec![0.0; 3]),
            label: "a".into(),
            timestamp: Local::now(),
        });
        assert_matches!(
            c.train(&set),
            Err(TrainingError::FeatureLengthMismatch { expected: 6, found: 3, .. })
        );
        assert!(c.model().is_none());
    }

    #[test]
    fn test_single_label_model() {
        let mut c = CentroidClassifier::new(Producer::Motion);
        let mut set = TrainingSet::new();
        for _ in 0..25 {
            set.add(sample("scroll_up", [0.0, -0.4, 0.0, 0.01, 0.4, 0.8]));
        }
        let report = c.train(&set).unwrap();
        assert_eq!(report.labels, vec!["scroll_up".to_string()]);
        assert_eq!(report.samples_used, 25);
        assert_eq!(c.model().unwrap().len(), 1);
    }

    #[test]
    fn test_model_for_other_producer_is_refused() {
        let mut landmark = CentroidClassifier::new(Producer::Landmark);
        let model = CentroidModel {
            producer: Producer::Motion,
            feature_len: MOTION_FEATURE_LEN,
            centroids: BTreeMap::new(),
        };
        assert!(!landmark.load_model(model));
        assert!(!landmark.is_trained());
    }
}
