//! Two-hand and motion gestures layered over the per-hand states.
//!
//! A single global `ComplexGesture` is kept.  Swipe, zoom and finger-cross
//! detectors run in that order each frame and the last one to fire wins;
//! a recognized drawn shape is applied after them.  Any non-idle gesture
//! that nothing reaffirms within `gesture_timeout` falls back to idle.

use tracing::debug;

use super::config::GestureConfig;
use super::hand_state::HandState;
use crate::tracking::geometry::{self, Vec3};
use crate::tracking::hand::HandSample;

// ── Gesture value ──────────────────────────────────────────

/// The global compound gesture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComplexGesture {
    Idle,
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
    Zoom,
    FingerCross,
    /// A drawn stroke matched the named template.
    Shape(String),
}

impl ComplexGesture {
    /// Tag used in snapshots and IPC.  Shapes report their template name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::SwipeUp => "swipe-up",
            Self::SwipeDown => "swipe-down",
            Self::SwipeLeft => "swipe-left",
            Self::SwipeRight => "swipe-right",
            Self::Zoom => "zoom",
            Self::FingerCross => "finger-cross",
            Self::Shape(name) => name,
        }
    }

    pub fn is_swipe(&self) -> bool {
        matches!(
            self,
            Self::SwipeUp | Self::SwipeDown | Self::SwipeLeft | Self::SwipeRight
        )
    }
}

// ── Per-frame input ────────────────────────────────────────

/// A hand present this frame together with its updated state.
#[derive(Debug, Clone, Copy)]
pub struct TrackedHand<'a> {
    pub sample: &'a HandSample,
    pub state: HandState,
}

/// Everything the detector reads for one frame.
#[derive(Debug, Clone, Copy)]
pub struct CompoundInput<'a> {
    pub timestamp: f64,
    pub left: Option<TrackedHand<'a>>,
    pub right: Option<TrackedHand<'a>>,
    /// Smoothed right-hand velocity (units/s).
    pub right_velocity: Vec3,
}

// ── Finger cross ───────────────────────────────────────────

/// Index knuckles overlap and the index fingers are near-orthogonal.
///
/// A degenerate (zero-length) finger direction never counts as crossed.
pub fn fingers_crossed(left: &HandSample, right: &HandSample, config: &GestureConfig) -> bool {
    let knuckles = geometry::distance(&left.index_proximal_joint(), &right.index_proximal_joint());
    if knuckles >= config.overlap_threshold {
        return false;
    }
    let a = left.index_direction();
    let b = right.index_direction();
    if geometry::length(&a) < 0.5 || geometry::length(&b) < 0.5 {
        return false;
    }
    geometry::dot(&a, &b).abs() < config.orthogonal_threshold
}

// ── Detector ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CompoundGestureDetector {
    gesture: ComplexGesture,
    /// Time of the last trigger, reaffirmation or reset.
    timestamp: f64,
    /// Inter-palm distance when both hands entered grab-holding.
    zoom_baseline: Option<f32>,
    zoom_multiplier: f32,
    /// Last frame time the right hand was in pinch-holding.
    last_pinch_hold: Option<f64>,
}

impl Default for CompoundGestureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CompoundGestureDetector {
    pub fn new() -> Self {
        Self {
            gesture: ComplexGesture::Idle,
            timestamp: 0.0,
            zoom_baseline: None,
            zoom_multiplier: 1.0,
            last_pinch_hold: None,
        }
    }

    pub fn gesture(&self) -> &ComplexGesture {
        &self.gesture
    }

    /// Time the current gesture was last triggered or reaffirmed.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn zoom_baseline(&self) -> Option<f32> {
        self.zoom_baseline
    }

    /// Current zoom ratio; `None` unless the gesture is `Zoom`.
    pub fn zoom_multiplier(&self) -> Option<f32> {
        match self.gesture {
            ComplexGesture::Zoom => Some(self.zoom_multiplier),
            _ => None,
        }
    }

    /// Run the detectors for one frame.
    pub fn update(&mut self, input: &CompoundInput<'_>, config: &GestureConfig) {
        let now = input.timestamp;

        match input.right {
            Some(right) => self.detect_swipe(right.state, input.right_velocity, now, config),
            None => {
                if self.gesture != ComplexGesture::Idle {
                    self.set(ComplexGesture::Idle, now);
                }
            }
        }

        self.detect_zoom(input, now);

        if let (Some(left), Some(right)) = (input.left, input.right) {
            if fingers_crossed(left.sample, right.sample, config) {
                self.set(ComplexGesture::FingerCross, now);
            }
        }

        if self.gesture != ComplexGesture::Idle && now - self.timestamp > config.gesture_timeout {
            debug!("{} timed out", self.gesture.as_str());
            self.set(ComplexGesture::Idle, now);
        }
    }

    fn detect_swipe(&mut self, state: HandState, velocity: Vec3, now: f64, config: &GestureConfig) {
        if state == HandState::PinchHolding {
            self.last_pinch_hold = Some(now);
        }
        let eligible = self
            .last_pinch_hold
            .is_some_and(|t| now - t <= config.pinch_timeout);
        if !eligible {
            return;
        }

        let threshold = config.swipe_threshold;
        let [vx, vy, _] = velocity;
        let swipe = if vy.abs() > threshold {
            Some(if vy > 0.0 {
                ComplexGesture::SwipeUp
            } else {
                ComplexGesture::SwipeDown
            })
        } else if vx.abs() > threshold {
            Some(if vx > 0.0 {
                ComplexGesture::SwipeRight
            } else {
                ComplexGesture::SwipeLeft
            })
        } else {
            None
        };

        match swipe {
            Some(gesture) => {
                if gesture != self.gesture {
                    debug!("swipe detected: {}, velocity=({:.0}, {:.0})", gesture.as_str(), vx, vy);
                }
                self.set(gesture, now);
            }
            None if self.gesture.is_swipe() => self.set(ComplexGesture::Idle, now),
            None => {}
        }
    }

    fn detect_zoom(&mut self, input: &CompoundInput<'_>, now: f64) {
        let pair = match (input.left, input.right) {
            (Some(l), Some(r)) if l.state.is_grab_holding() && r.state.is_grab_holding() => {
                Some((l.sample.palm_position, r.sample.palm_position))
            }
            _ => None,
        };

        let Some((left, right)) = pair else {
            if self.zoom_baseline.take().is_some() && self.gesture == ComplexGesture::Zoom {
                self.set(ComplexGesture::Idle, now);
            }
            return;
        };

        let current = geometry::distance(&left, &right);
        match self.zoom_baseline {
            None => {
                debug!("zoom started, baseline={:.1}", current);
                self.zoom_baseline = Some(current);
                self.zoom_multiplier = 1.0;
            }
            Some(baseline) if baseline > f32::EPSILON => {
                self.zoom_multiplier = current / baseline;
            }
            Some(_) => self.zoom_multiplier = 1.0,
        }
        self.set(ComplexGesture::Zoom, now);
    }

    /// Apply a recognized drawn shape.
    pub fn apply_shape(&mut self, name: &str, now: f64) {
        debug!("shape recognized: {}", name);
        self.set(ComplexGesture::Shape(name.to_string()), now);
    }

    fn set(&mut self, gesture: ComplexGesture, now: f64) {
        self.gesture = gesture;
        self.timestamp = now;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let zoom = match self.zoom_multiplier() {
            Some(m) => format!("{:.3}", m),
            None => "nil".to_string(),
        };
        format!(
            "(:complex-gesture \"{}\" :timestamp {:.3} :zoom-multiplier {})",
            self.gesture.as_str(),
            self.timestamp,
            zoom,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::hand::{BoneKind, Digit, Hand};

    fn make_hand(hand: Hand, palm: Vec3) -> HandSample {
        HandSample::new(hand, 0.0, palm)
    }

    /// Place the index knuckle at `knuckle` pointing along `dir`.
    fn point_index(sample: &mut HandSample, knuckle: Vec3, dir: Vec3) {
        let index = sample.digit_mut(Digit::Index);
        index.bones[BoneKind::Proximal.index()].prev_joint = knuckle;
        index.bones[BoneKind::Distal.index()].next_joint = [
            knuckle[0] + dir[0] * 60.0,
            knuckle[1] + dir[1] * 60.0,
            knuckle[2] + dir[2] * 60.0,
        ];
    }

    fn right_only<'a>(t: f64, sample: &'a HandSample, state: HandState, v: Vec3) -> CompoundInput<'a> {
        CompoundInput {
            timestamp: t,
            left: None,
            right: Some(TrackedHand { sample, state }),
            right_velocity: v,
        }
    }

    fn both<'a>(
        t: f64,
        left: &'a HandSample,
        left_state: HandState,
        right: &'a HandSample,
        right_state: HandState,
    ) -> CompoundInput<'a> {
        CompoundInput {
            timestamp: t,
            left: Some(TrackedHand { sample: left, state: left_state }),
            right: Some(TrackedHand { sample: right, state: right_state }),
            right_velocity: [0.0; 3],
        }
    }

    #[test]
    fn test_initial_idle() {
        let d = CompoundGestureDetector::new();
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
        assert_eq!(d.zoom_multiplier(), None);
        assert_eq!(d.zoom_baseline(), None);
    }

    #[test]
    fn test_swipe_up_while_pinch_holding() {
        let config = GestureConfig { swipe_threshold: 650.0, ..GestureConfig::default() };
        let mut d = CompoundGestureDetector::new();
        let right = make_hand(Hand::Right, [0.0; 3]);
        d.update(&right_only(1.0, &right, HandState::PinchHolding, [0.0, 700.0, 0.0]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::SwipeUp);
    }

    #[test]
    fn test_swipe_directions() {
        let config = GestureConfig::default();
        let right = make_hand(Hand::Right, [0.0; 3]);
        let cases = [
            ([0.0, -900.0, 0.0], ComplexGesture::SwipeDown),
            ([900.0, 0.0, 0.0], ComplexGesture::SwipeRight),
            ([-900.0, 0.0, 0.0], ComplexGesture::SwipeLeft),
            // Vertical wins when both exceed
            ([1000.0, 900.0, 0.0], ComplexGesture::SwipeUp),
        ];
        for (v, expected) in cases {
            let mut d = CompoundGestureDetector::new();
            d.update(&right_only(1.0, &right, HandState::PinchHolding, v), &config);
            assert_eq!(d.gesture(), &expected, "velocity {:?}", v);
        }
    }

    #[test]
    fn test_no_swipe_without_pinch_hold() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let right = make_hand(Hand::Right, [0.0; 3]);
        d.update(&right_only(1.0, &right, HandState::PinchPressing, [0.0, 2000.0, 0.0]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
        d.update(&right_only(1.1, &right, HandState::OpenPalmAway, [2000.0, 0.0, 0.0]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
    }

    #[test]
    fn test_swipe_within_pinch_timeout() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let right = make_hand(Hand::Right, [0.0; 3]);
        d.update(&right_only(1.0, &right, HandState::PinchHolding, [0.0; 3]), &config);
        d.update(&right_only(1.05, &right, HandState::OpenPalmAway, [-900.0, 0.0, 0.0]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::SwipeLeft);

        let mut late = CompoundGestureDetector::new();
        late.update(&right_only(1.0, &right, HandState::PinchHolding, [0.0; 3]), &config);
        late.update(&right_only(1.5, &right, HandState::OpenPalmAway, [-900.0, 0.0, 0.0]), &config);
        assert_eq!(late.gesture(), &ComplexGesture::Idle);
    }

    #[test]
    fn test_swipe_reverts_when_slow() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let right = make_hand(Hand::Right, [0.0; 3]);
        d.update(&right_only(1.0, &right, HandState::PinchHolding, [0.0, 900.0, 0.0]), &config);
        assert!(d.gesture().is_swipe());
        d.update(&right_only(1.02, &right, HandState::PinchHolding, [0.0, 100.0, 0.0]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
    }

    #[test]
    fn test_right_hand_absent_forces_idle() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let right = make_hand(Hand::Right, [0.0; 3]);
        d.update(&right_only(1.0, &right, HandState::PinchHolding, [0.0, 900.0, 0.0]), &config);
        let empty = CompoundInput { timestamp: 1.02, left: None, right: None, right_velocity: [0.0; 3] };
        d.update(&empty, &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
    }

    #[test]
    fn test_gesture_timeout() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let right = make_hand(Hand::Right, [0.0; 3]);
        d.update(&right_only(1.0, &right, HandState::PinchHolding, [0.0, 900.0, 0.0]), &config);
        // Not eligible any more, nothing reaffirms
        d.update(&right_only(1.2, &right, HandState::OpenPalmAway, [0.0, 900.0, 0.0]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::SwipeUp);
        d.update(&right_only(1.4, &right, HandState::OpenPalmAway, [0.0, 900.0, 0.0]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
    }

    #[test]
    fn test_zoom_baseline_and_multiplier() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let hold = HandState::GrabTowardsHolding;

        let l = make_hand(Hand::Left, [-150.0, 200.0, 0.0]);
        let r = make_hand(Hand::Right, [150.0, 200.0, 0.0]);
        d.update(&both(1.0, &l, hold, &r, hold), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Zoom);
        assert_eq!(d.zoom_multiplier(), Some(1.0));
        assert!((d.zoom_baseline().unwrap() - 300.0).abs() < 1e-3);

        let l = make_hand(Hand::Left, [-75.0, 200.0, 0.0]);
        let r = make_hand(Hand::Right, [75.0, 200.0, 0.0]);
        d.update(&both(1.1, &l, hold, &r, hold), &config);
        assert!((d.zoom_multiplier().unwrap() - 0.5).abs() < 1e-5);

        // One hand leaves holding
        d.update(&both(1.2, &l, HandState::OpenPalmTowards, &r, hold), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
        assert_eq!(d.zoom_baseline(), None);
        assert_eq!(d.zoom_multiplier(), None);
    }

    #[test]
    fn test_zoom_requires_both_holding() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let l = make_hand(Hand::Left, [-150.0, 200.0, 0.0]);
        let r = make_hand(Hand::Right, [150.0, 200.0, 0.0]);
        d.update(&both(1.0, &l, HandState::GrabAwayPressing, &r, HandState::GrabAwayHolding), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
        assert_eq!(d.zoom_baseline(), None);

        // Mixed grab orientations still zoom
        d.update(&both(1.1, &l, HandState::GrabAwayHolding, &r, HandState::GrabTowardsHolding), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Zoom);
    }

    #[test]
    fn test_finger_cross() {
        let config = GestureConfig::default();
        let mut l = make_hand(Hand::Left, [0.0; 3]);
        let mut r = make_hand(Hand::Right, [0.0; 3]);
        point_index(&mut l, [0.0, 100.0, 0.0], [1.0, 0.0, 0.0]);
        point_index(&mut r, [10.0, 105.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(fingers_crossed(&l, &r, &config));

        let mut d = CompoundGestureDetector::new();
        let open = HandState::OpenPalmAway;
        d.update(&both(1.0, &l, open, &r, open), &config);
        assert_eq!(d.gesture(), &ComplexGesture::FingerCross);
    }

    #[test]
    fn test_finger_cross_rejects_parallel_or_far() {
        let config = GestureConfig::default();
        let mut l = make_hand(Hand::Left, [0.0; 3]);
        let mut r = make_hand(Hand::Right, [0.0; 3]);

        point_index(&mut l, [0.0, 100.0, 0.0], [1.0, 0.0, 0.0]);
        point_index(&mut r, [10.0, 100.0, 0.0], [1.0, 0.1, 0.0]);
        assert!(!fingers_crossed(&l, &r, &config), "parallel fingers");

        point_index(&mut r, [100.0, 100.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(!fingers_crossed(&l, &r, &config), "knuckles too far apart");
    }

    #[test]
    fn test_finger_cross_degenerate_directions() {
        let config = GestureConfig::default();
        let l = make_hand(Hand::Left, [0.0; 3]);
        let r = make_hand(Hand::Right, [0.0; 3]);
        assert!(!fingers_crossed(&l, &r, &config));
    }

    #[test]
    fn test_shape_overrides() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        d.apply_shape("circle", 2.0);
        assert_eq!(d.gesture(), &ComplexGesture::Shape("circle".into()));
        assert_eq!(d.gesture().as_str(), "circle");

        let right = make_hand(Hand::Right, [0.0; 3]);
        d.update(&right_only(2.1, &right, HandState::OpenPalmAway, [0.0; 3]), &config);
        assert_eq!(d.gesture().as_str(), "circle");
        d.update(&right_only(2.5, &right, HandState::OpenPalmAway, [0.0; 3]), &config);
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
    }

    #[test]
    fn test_reset() {
        let config = GestureConfig::default();
        let mut d = CompoundGestureDetector::new();
        let hold = HandState::GrabAwayHolding;
        let l = make_hand(Hand::Left, [-50.0, 0.0, 0.0]);
        let r = make_hand(Hand::Right, [50.0, 0.0, 0.0]);
        d.update(&both(1.0, &l, hold, &r, hold), &config);
        d.reset();
        assert_eq!(d.gesture(), &ComplexGesture::Idle);
        assert_eq!(d.zoom_baseline(), None);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(ComplexGesture::Idle.as_str(), "idle");
        assert_eq!(ComplexGesture::SwipeLeft.as_str(), "swipe-left");
        assert_eq!(ComplexGesture::FingerCross.as_str(), "finger-cross");
        assert_eq!(ComplexGesture::Shape("star".into()).as_str(), "star");
    }

    #[test]
    fn test_status_sexp() {
        let d = CompoundGestureDetector::new();
        let sexp = d.status_sexp();
        assert!(sexp.contains(":complex-gesture \"idle\""));
        assert!(sexp.contains(":zoom-multiplier nil"));
    }
}
