use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classifier::labels;
use crate::landmarks::{HandLandmark, LandmarkFrame, MotionSample, Point3, Producer, SourceFrame};
use crate::recording::RecordedFrame;

/// Largest per-coordinate noise.
pub const MAX_JITTER: f32 = 0.02;
/// Frame spacing of generated recordings (about 30 fps).
pub const FRAME_INTERVAL_MS: u64 = 33;

const WAVE_AMPLITUDE: f32 = 0.1;
const WAVE_PERIOD: f32 = 8.0;

/// Extended fingers (thumb..pinky) and index tip x for a static pose.
pub fn pose_shape(label: &str) -> Option<([bool; 5], f32)> {
    let shape = match label {
        labels::FIST => ([false; 5], 0.42),
        labels::POINT => ([false, true, false, false, false], 0.42),
        labels::SWIPE_LEFT => ([false, true, false, false, false], 0.2),
        labels::SWIPE_RIGHT => ([false, true, false, false, false], 0.8),
        labels::PEACE => ([false, true, true, false, false], 0.42),
        labels::OPEN_HAND => ([true; 5], 0.42),
        labels::ROCK_ON => ([true, false, false, false, true], 0.42),
        labels::THUMBS_UP => ([true, false, false, false, false], 0.42),
        labels::THREE => ([false, true, true, true, false], 0.42),
        labels::FOUR => ([false, true, true, true, true], 0.42),
        _ => return None,
    };
    Some(shape)
}

pub fn is_motion_label(label: &str) -> bool {
    matches!(
        label,
        labels::SWIPE_LEFT
            | labels::SWIPE_RIGHT
            | labels::SWIPE_UP
            | labels::SWIPE_DOWN
            | labels::WAVE
    )
}

/// Right-hand skeleton with the given fingers extended.
fn skeleton(extended: [bool; 5], index_tip_x: f32) -> Vec<Point3> {
    let mut points = vec![Point3::default(); 21];
    points[HandLandmark::Wrist.index()] = Point3::new(0.5, 0.85, 0.0);

    // right hand seen from the camera: thumb opens toward smaller x
    points[HandLandmark::ThumbCmc.index()] = Point3::new(0.42, 0.78, -0.01);
    points[HandLandmark::ThumbMcp.index()] = Point3::new(0.37, 0.72, -0.02);
    points[HandLandmark::ThumbIp.index()] = Point3::new(0.33, 0.66, -0.02);
    let thumb_tip_x = if extended[0] { 0.27 } else { 0.40 };
    points[HandLandmark::ThumbTip.index()] = Point3::new(thumb_tip_x, 0.62, -0.03);

    let fingers = [
        (HandLandmark::IndexMcp, 0.42),
        (HandLandmark::MiddleMcp, 0.50),
        (HandLandmark::RingMcp, 0.57),
        (HandLandmark::PinkyMcp, 0.64),
    ];
    for (finger, (mcp, column)) in fingers.into_iter().enumerate() {
        let base = mcp.index();
        let x = if finger == 0 { index_tip_x } else { column };
        let (dip_y, tip_y) = if extended[finger + 1] {
            (0.42, 0.35)
        } else {
            (0.55, 0.60)
        };
        points[base] = Point3::new(column, 0.60, 0.0);
        points[base + 1] = Point3::new((column + x) / 2.0, 0.50, 0.0);
        points[base + 2] = Point3::new(x, dip_y, -0.01);
        points[base + 3] = Point3::new(x, tip_y, -0.02);
    }

    points
}

#[derive(Debug, Clone)]
pub struct Synthesizer {
    rng: StdRng,
    jitter: f32,
}

impl Synthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            jitter: MAX_JITTER / 2.0,
        }
    }

    /// Noise is clamped to `0.0..=MAX_JITTER`.
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter.clamp(0.0, MAX_JITTER);
        self
    }

    fn noise(&mut self, scale: f32) -> f32 {
        let j = self.jitter * scale;
        self.rng.gen_range(-j..=j)
    }

    /// A noisy frame for a static pose label.
    pub fn hand_pose(&mut self, label: &str) -> Option<LandmarkFrame> {
        let (extended, index_tip_x) = pose_shape(label)?;
        let points = skeleton(extended, index_tip_x)
            .into_iter()
            .map(|p| {
                Point3::new(
                    p.x + self.noise(1.0),
                    p.y + self.noise(1.0),
                    p.z + self.noise(0.5),
                )
            })
            .collect();
        LandmarkFrame::new(points)
    }

    /// `count` motion-centroid samples tracing a swipe or wave.
    pub fn motion_track(&mut self, label: &str, count: usize) -> Option<Vec<MotionSample>> {
        if !is_motion_label(label) || count < 2 {
            return None;
        }
        let last = (count - 1) as f32;
        let samples = (0..count)
            .map(|i| {
                let t = i as f32 / last;
                let (x, y) = match label {
                    labels::SWIPE_RIGHT => (0.2 + 0.6 * t, 0.5),
                    labels::SWIPE_LEFT => (0.8 - 0.6 * t, 0.5),
                    labels::SWIPE_DOWN => (0.5, 0.2 + 0.6 * t),
                    labels::SWIPE_UP => (0.5, 0.8 - 0.6 * t),
                    _ => {
                        let phase = i as f32 * std::f32::consts::TAU / WAVE_PERIOD;
                        (0.5 + WAVE_AMPLITUDE * phase.sin(), 0.5)
                    }
                };
                MotionSample {
                    x: x + self.noise(0.5),
                    y: y + self.noise(0.5),
                    intensity: 0.6 + self.noise(5.0).abs(),
                    timestamp_ms: i as u64 * FRAME_INTERVAL_MS,
                }
            })
            .collect();
        Some(samples)
    }

    /// A recording of `count` frames for `label`, spaced [`FRAME_INTERVAL_MS`]
    /// apart.
    pub fn recording(
        &mut self,
        producer: Producer,
        label: &str,
        count: usize,
    ) -> Option<Vec<RecordedFrame>> {
        let frames = match producer {
            Producer::Landmark => (0..count)
                .map(|_| self.hand_pose(label).map(SourceFrame::Landmarks))
                .collect::<Option<Vec<_>>>()?,
            Producer::Motion => self
                .motion_track(label, count)?
                .into_iter()
                .map(SourceFrame::Motion)
                .collect(),
        };
        Some(
            frames
                .into_iter()
                .enumerate()
                .map(|(i, frame)| RecordedFrame {
                    t_ms: i as u64 * FRAME_INTERVAL_MS,
                    frame,
                })
                .collect(),
        )
    }
}
