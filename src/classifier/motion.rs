use tracing::debug;

use crate::features::MotionWindow;

use super::{labels, Classification, GestureClassifier, Observation};

/// Minimum horizontal direction changes for a wave.
const WAVE_REVERSALS: usize = 3;
/// Ignore jitter below this step size when counting reversals.
const REVERSAL_DEADBAND: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionThresholds {
    /// Net displacement (normalized units) for a swipe.
    pub swipe_distance: f32,
    /// Horizontal variance needed before reversals count as a wave.
    pub wave_variance: f32,
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self {
            swipe_distance: 0.25,
            wave_variance: 0.002,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MotionPatternClassifier {
    thresholds: MotionThresholds,
}

impl MotionPatternClassifier {
    pub fn new(thresholds: MotionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, window: &MotionWindow) -> Option<Classification> {
        if !window.is_ready() {
            return None;
        }

        let (dx, dy) = window.net_displacement();
        let swipe = self.thresholds.swipe_distance;

        // Dominant axis must be clearly ahead of the other one.
        if dx.abs() >= swipe && dx.abs() > 2.0 * dy.abs() {
            let label = if dx > 0.0 {
                labels::SWIPE_RIGHT
            } else {
                labels::SWIPE_LEFT
            };
            return Some(Classification::new(label, self.confidence(dx.abs())));
        }
        if dy.abs() >= swipe && dy.abs() > 2.0 * dx.abs() {
            // image y grows downward
            let label = if dy > 0.0 {
                labels::SWIPE_DOWN
            } else {
                labels::SWIPE_UP
            };
            return Some(Classification::new(label, self.confidence(dy.abs())));
        }

        let xs = window.xs();
        let var_x = crate::util::variance(&xs).unwrap_or(0.0);
        let reversals = count_reversals(&xs);
        if reversals >= WAVE_REVERSALS && var_x > self.thresholds.wave_variance {
            debug!(reversals, var_x, "wave pattern");
            let confidence = (0.6 + 0.05 * reversals as f32).min(0.95);
            return Some(Classification::new(labels::WAVE, confidence));
        }

        None
    }

    fn confidence(&self, displacement: f32) -> f32 {
        (displacement / (2.0 * self.thresholds.swipe_distance)).clamp(0.6, 0.95)
    }
}

/// Sign changes of the horizontal step, ignoring steps inside the deadband.
fn count_reversals(xs: &[f32]) -> usize {
    let mut reversals = 0;
    let mut last_sign = 0.0f32;
    for pair in xs.windows(2) {
        let step = pair[1] - pair[0];
        if step.abs() < REVERSAL_DEADBAND {
            continue;
        }
        let sign = step.signum();
        if last_sign != 0.0 && sign != last_sign {
            reversals += 1;
        }
        last_sign = sign;
    }
    reversals
}

impl GestureClassifier for MotionPatternClassifier {
    fn classify(&self, observation: &Observation<'_>) -> Option<Classification> {
        match observation {
            Observation::Motion { window, .. } => self.analyze(window),
            Observation::Hand { .. } => None,
        }
    }

    fn name(&self) -> &'static str {
        "motion-pattern"
    }
}
