use crate::landmarks::{HandLandmark, Handedness, LandmarkFrame};

use super::{labels, Classification, GestureClassifier, Observation};

/// Index tip x below this reads as a left swipe.
const SWIPE_LEFT_X: f32 = 0.3;
/// Index tip x above this reads as a right swipe.
const SWIPE_RIGHT_X: f32 = 0.7;

/// Extended/curled flag per finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    /// Thumb opens sideways so it compares x against the IP joint; the other
    /// fingers are extended when the tip sits above (smaller y) the PIP joint.
    pub fn from_frame(frame: &LandmarkFrame, handedness: Handedness) -> Self {
        let thumb_tip = frame.point(HandLandmark::ThumbTip);
        let thumb_ip = frame.point(HandLandmark::ThumbIp);
        let thumb = match handedness {
            Handedness::Right => thumb_tip.x < thumb_ip.x,
            Handedness::Left => thumb_tip.x > thumb_ip.x,
        };

        let up = |tip: HandLandmark, pip: HandLandmark| frame.point(tip).y < frame.point(pip).y;

        Self {
            thumb,
            index: up(HandLandmark::IndexTip, HandLandmark::IndexPip),
            middle: up(HandLandmark::MiddleTip, HandLandmark::MiddlePip),
            ring: up(HandLandmark::RingTip, HandLandmark::RingPip),
            pinky: up(HandLandmark::PinkyTip, HandLandmark::PinkyPip),
        }
    }

    pub fn up_count(&self) -> usize {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
            .iter()
            .filter(|f| **f)
            .count()
    }

    /// Exactly the given fingers are extended, in thumb..pinky order.
    fn only(&self, thumb: bool, index: bool, middle: bool, ring: bool, pinky: bool) -> bool {
        *self
            == Self {
                thumb,
                index,
                middle,
                ring,
                pinky,
            }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FingerStateClassifier {
    handedness: Handedness,
}

impl FingerStateClassifier {
    pub fn new(handedness: Handedness) -> Self {
        Self { handedness }
    }

    /// Rule table; first match wins.
    pub fn classify_frame(&self, frame: &LandmarkFrame) -> Option<Classification> {
        let fingers = FingerState::from_frame(frame, self.handedness);

        if fingers.up_count() == 0 {
            return Some(Classification::new(labels::FIST, 0.95));
        }

        if fingers.only(false, true, false, false, false) {
            let tip_x = frame.point(HandLandmark::IndexTip).x;
            if tip_x < SWIPE_LEFT_X {
                return Some(Classification::new(labels::SWIPE_LEFT, 0.8));
            }
            if tip_x > SWIPE_RIGHT_X {
                return Some(Classification::new(labels::SWIPE_RIGHT, 0.8));
            }
            return Some(Classification::new(labels::POINT, 0.95));
        }

        if fingers.only(false, true, true, false, false) {
            return Some(Classification::new(labels::PEACE, 0.95));
        }

        if fingers.up_count() == 5 {
            return Some(Classification::new(labels::OPEN_HAND, 0.95));
        }

        if fingers.up_count() == 2 && fingers.thumb && fingers.pinky {
            return Some(Classification::new(labels::ROCK_ON, 0.95));
        }

        if fingers.only(true, false, false, false, false) {
            return Some(Classification::new(labels::THUMBS_UP, 0.9));
        }

        if fingers.only(false, true, true, true, false) {
            return Some(Classification::new(labels::THREE, 0.9));
        }

        if fingers.only(false, true, true, true, true) {
            return Some(Classification::new(labels::FOUR, 0.9));
        }

        None
    }
}

impl GestureClassifier for FingerStateClassifier {
    fn classify(&self, observation: &Observation<'_>) -> Option<Classification> {
        match observation {
            Observation::Hand { frame, .. } => self.classify_frame(frame),
            Observation::Motion { .. } => None,
        }
    }

    fn name(&self) -> &'static str {
        "finger-state"
    }
}

// ── Test helpers ───────────────────────────────────────────

/// Builds a right-hand frame with the chosen fingers extended.
#[cfg(test)]
pub(crate) fn pose(extended: [bool; 5], index_tip_x: f32) -> LandmarkFrame {
    use crate::landmarks::Point3;

    let mut points = vec![Point3::new(0.5, 0.8, 0.0); 21];
    // thumb: IP at x=0.45, tip left of it when extended
    points[HandLandmark::ThumbIp.index()] = Point3::new(0.45, 0.7, 0.0);
    points[HandLandmark::ThumbTip.index()] =
        Point3::new(if extended[0] { 0.35 } else { 0.5 }, 0.7, 0.0);

    let fingers = [
        (HandLandmark::IndexPip, HandLandmark::IndexTip),
        (HandLandmark::MiddlePip, HandLandmark::MiddleTip),
        (HandLandmark::RingPip, HandLandmark::RingTip),
        (HandLandmark::PinkyPip, HandLandmark::PinkyTip),
    ];
    for (i, (pip, tip)) in fingers.iter().enumerate() {
        points[pip.index()] = Point3::new(0.5, 0.6, 0.0);
        let y = if extended[i + 1] { 0.4 } else { 0.7 };
        points[tip.index()] = Point3::new(0.5, y, 0.0);
    }
    points[HandLandmark::IndexTip.index()].x = index_tip_x;

    LandmarkFrame::new(points).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(extended: [bool; 5]) -> Option<(String, f32)> {
        FingerStateClassifier::default()
            .classify_frame(&pose(extended, 0.5))
            .map(|c| (c.label, c.confidence))
    }

    #[test]
    fn test_fist() {
        assert_eq!(classify([false; 5]), Some(("fist".into(), 0.95)));
    }

    #[test]
    fn test_point() {
        assert_eq!(
            classify([false, true, false, false, false]),
            Some(("point".into(), 0.95))
        );
    }

    #[test]
    fn test_peace() {
        assert_eq!(
            classify([false, true, true, false, false]),
            Some(("peace".into(), 0.95))
        );
    }

    #[test]
    fn test_open_hand() {
        assert_eq!(classify([true; 5]), Some(("open_hand".into(), 0.95)));
    }

    #[test]
    fn test_rock_on() {
        assert_eq!(
            classify([true, false, false, false, true]),
            Some(("rock_on".into(), 0.95))
        );
    }

    #[test]
    fn test_thumbs_up() {
        assert_eq!(
            classify([true, false, false, false, false]),
            Some(("thumbs_up".into(), 0.9))
        );
    }

    #[test]
    fn test_three() {
        assert_eq!(
            classify([false, true, true, true, false]),
            Some(("three".into(), 0.9))
        );
    }

    #[test]
    fn test_four() {
        assert_eq!(
            classify([false, true, true, true, true]),
            Some(("four".into(), 0.9))
        );
    }

    #[test]
    fn test_unmatched_pose_is_none() {
        // thumb + index is not in the table
        assert_eq!(classify([true, true, false, false, false]), None);
        assert_eq!(classify([false, false, true, false, false]), None);
    }

    #[test]
    fn test_index_swipes_by_tip_position() {
        let c = FingerStateClassifier::default();
        let only_index = [false, true, false, false, false];

        let left = c.classify_frame(&pose(only_index, 0.2)).unwrap();
        assert_eq!((left.label.as_str(), left.confidence), ("swipe_left", 0.8));

        let right = c.classify_frame(&pose(only_index, 0.8)).unwrap();
        assert_eq!((right.label.as_str(), right.confidence), ("swipe_right", 0.8));
    }

    #[test]
    fn test_left_hand_mirrors_thumb() {
        let c = FingerStateClassifier::new(Handedness::Left);
        // tip left of IP: extended for a right hand, curled for a left hand
        let label = c
            .classify_frame(&pose([true, false, false, false, false], 0.5))
            .unwrap()
            .label;
        assert_eq!(label, "fist");
    }

    #[test]
    fn test_classification_is_pure() {
        let c = FingerStateClassifier::default();
        let frame = pose([false, true, true, false, false], 0.5);
        let first = c.classify_frame(&frame);
        for _ in 0..10 {
            assert_eq!(c.classify_frame(&frame), first);
        }
    }

    #[test]
    fn test_motion_observation_is_ignored() {
        let c = FingerStateClassifier::default();
        let window = crate::features::MotionWindow::default();
        let features = crate::features::FeatureVector::default();
        let obs = Observation::Motion {
            window: &window,
            features: &features,
        };
        assert!(c.classify(&obs).is_none());
    }
}
