pub mod centroid;
pub mod heuristic;
pub mod motion;

use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, MotionWindow};
use crate::landmarks::LandmarkFrame;
use crate::training::{TrainingError, TrainingSet};

pub use centroid::{CentroidClassifier, CentroidModel};
pub use heuristic::{FingerState, FingerStateClassifier};
pub use motion::{MotionPatternClassifier, MotionThresholds};

/// Built-in gesture labels.
pub mod labels {
    pub const FIST: &str = "fist";
    pub const POINT: &str = "point";
    pub const PEACE: &str = "peace";
    pub const OPEN_HAND: &str = "open_hand";
    pub const ROCK_ON: &str = "rock_on";
    pub const THUMBS_UP: &str = "thumbs_up";
    pub const THREE: &str = "three";
    pub const FOUR: &str = "four";
    pub const SWIPE_LEFT: &str = "swipe_left";
    pub const SWIPE_RIGHT: &str = "swipe_right";
    pub const SWIPE_UP: &str = "swipe_up";
    pub const SWIPE_DOWN: &str = "swipe_down";
    pub const WAVE: &str = "wave";
}

/// A classifier verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// What a classifier sees for one cycle.
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    Hand {
        frame: &'a LandmarkFrame,
        features: &'a FeatureVector,
    },
    Motion {
        window: &'a MotionWindow,
        features: &'a FeatureVector,
    },
}

impl<'a> Observation<'a> {
    pub fn features(&self) -> &'a FeatureVector {
        match self {
            Self::Hand { features, .. } | Self::Motion { features, .. } => features,
        }
    }
}

pub trait GestureClassifier {
    fn classify(&self, observation: &Observation<'_>) -> Option<Classification>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Result of a successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub labels: Vec<String>,
    pub samples_used: usize,
}

/// A classifier that can be rebuilt from collected samples.
pub trait TrainableClassifier: GestureClassifier {
    fn train(&mut self, set: &TrainingSet) -> Result<TrainingReport, TrainingError>;

    fn is_trained(&self) -> bool;
}

/// Which classifier the pipeline runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassifierStrategy {
    /// Finger-state rules for landmarks, pattern analysis for motion.
    #[default]
    Heuristic,
    /// Nearest-centroid over a trained model.
    Centroid,
}
