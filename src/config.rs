use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::centroid::{default_min_samples, DEFAULT_SIMILARITY_THRESHOLD};
use crate::classifier::{ClassifierStrategy, MotionThresholds};
use crate::features::{MAX_MOTION_WINDOW, MIN_MOTION_WINDOW};
use crate::landmarks::{Handedness, Producer};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub producer: Producer,
    pub strategy: ClassifierStrategy,
    pub handedness: Handedness,
    pub confirmation_delay_ms: u64,
    pub similarity_threshold: f32,
    /// `None` falls back to the per-producer default.
    pub min_training_samples: Option<usize>,
    pub refresh_interval_ms: u64,
    pub scroll_step: f64,
    pub history_len: usize,
    pub indicator_clear_ms: u64,
    pub motion_window: usize,
    pub min_motion_intensity: f32,
    pub swipe_distance: f32,
    pub wave_variance: f32,
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = MotionThresholds::default();
        Self {
            producer: Producer::default(),
            strategy: ClassifierStrategy::default(),
            handedness: Handedness::default(),
            confirmation_delay_ms: 1500,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_training_samples: None,
            refresh_interval_ms: 1000,
            scroll_step: 120.0,
            history_len: 5,
            indicator_clear_ms: 2000,
            motion_window: 30,
            min_motion_intensity: 0.05,
            swipe_distance: thresholds.swipe_distance,
            wave_variance: thresholds.wave_variance,
        }
    }
}

impl Config {
    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn indicator_clear(&self) -> Duration {
        Duration::from_millis(self.indicator_clear_ms)
    }

    pub fn motion_window_len(&self) -> usize {
        self.motion_window.clamp(MIN_MOTION_WINDOW, MAX_MOTION_WINDOW)
    }

    pub fn min_samples(&self) -> usize {
        self.min_training_samples
            .unwrap_or_else(|| default_min_samples(self.producer))
    }

    pub fn motion_thresholds(&self) -> MotionThresholds {
        MotionThresholds {
            swipe_distance: self.swipe_distance,
            wave_variance: self.wave_variance,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "touchless") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("touchless_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
