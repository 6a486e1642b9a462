use serde::{Deserialize, Serialize};

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks in detector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Number of keypoints in a landmark frame.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Fingertips, thumb first.
    pub fn fingertips() -> [HandLandmark; 5] {
        [
            Self::ThumbTip,
            Self::IndexTip,
            Self::MiddleTip,
            Self::RingTip,
            Self::PinkyTip,
        ]
    }
}

/// Which hand the detector reported. Decides which way the thumb opens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

// ── Frames ─────────────────────────────────────────────────

/// A normalized 3D keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Point3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One video frame worth of hand keypoints. Always exactly 21 points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandmarkFrame {
    points: Vec<Point3>,
}

impl LandmarkFrame {
    /// Returns `None` unless exactly [`LANDMARK_COUNT`] points are supplied.
    pub fn new(points: Vec<Point3>) -> Option<Self> {
        (points.len() == LANDMARK_COUNT).then_some(Self { points })
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn point(&self, landmark: HandLandmark) -> Point3 {
        self.points[landmark.index()]
    }

    pub fn wrist(&self) -> Point3 {
        self.point(HandLandmark::Wrist)
    }
}

/// Raw recordings may carry any number of points; validation happens here so
/// a bad frame never reaches the extractor.
impl<'de> Deserialize<'de> for LandmarkFrame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            points: Vec<Point3>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let len = raw.points.len();
        LandmarkFrame::new(raw.points).ok_or_else(|| {
            serde::de::Error::invalid_length(len, &"21 hand landmarks")
        })
    }
}

/// A single motion-centroid sample from the frame-difference producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f32,
    pub y: f32,
    pub intensity: f32,
    pub timestamp_ms: u64,
}

/// Which kind of producer feeds the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Producer {
    #[default]
    Landmark,
    Motion,
}

/// One delivery from the landmark source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceFrame {
    Landmarks(LandmarkFrame),
    Motion(MotionSample),
}

impl SourceFrame {
    pub fn producer(&self) -> Producer {
        match self {
            Self::Landmarks(_) => Producer::Landmark,
            Self::Motion(_) => Producer::Motion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_requires_21_points() {
        assert!(LandmarkFrame::new(vec![Point3::default(); 21]).is_some());
        assert!(LandmarkFrame::new(vec![Point3::default(); 20]).is_none());
        assert!(LandmarkFrame::new(vec![]).is_none());
    }

    #[test]
    fn test_landmark_indices() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbIp.index(), 3);
        assert_eq!(HandLandmark::IndexPip.index(), 6);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        let tips: Vec<usize> = HandLandmark::fingertips().iter().map(|l| l.index()).collect();
        assert_eq!(tips, vec![4, 8, 12, 16, 20]);
    }

    #[test]
    fn test_deserialize_rejects_short_frame() {
        let json = r#"{"kind":"landmarks","points":[{"x":0.0,"y":0.0,"z":0.0}]}"#;
        assert!(serde_json::from_str::<SourceFrame>(json).is_err());
    }

    #[test]
    fn test_motion_frame_roundtrip_tag() {
        let json = r#"{"kind":"motion","x":0.5,"y":0.4,"intensity":0.9,"timestamp_ms":12}"#;
        let frame: SourceFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.producer(), Producer::Motion);
    }

    #[test]
    fn test_point_distance() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(0.0, 3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
