//! Per-frame orchestration and snapshot publication.
//!
//! `GestureController::process` is the single entry point the tracking
//! source calls once per frame.  It owns all mutable recognition state and
//! runs on one thread; other threads observe results only through
//! `SnapshotReader`, which hands out the latest immutable snapshot.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use super::actions::{Action, ActionSink};
use super::compound::{CompoundGestureDetector, CompoundInput, TrackedHand};
use super::config::{Calibration, GestureConfig};
use super::hand_state::{HandEffect, HandInput, HandState, HandStateMachine};
use super::shape::{ReferenceTemplate, ShapeMatch, ShapeRecognizer};
use crate::tracking::geometry::Vec3;
use crate::tracking::hand::{FrameSnapshot, Hand, HandSample};
use crate::tracking::{FrameBuffer, VelocityEstimator};

// ── Tracking mode ──────────────────────────────────────────

/// What the controller does with incoming frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingMode {
    /// Frames are ignored.
    Sleep,
    /// Full recognition.
    Active,
    /// Palm positions widen the play-area calibration; no recognition.
    Setup,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Active => "active",
            Self::Setup => "setup",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sleep" => Some(Self::Sleep),
            "active" => Some(Self::Active),
            "setup" => Some(Self::Setup),
            _ => None,
        }
    }
}

// ── Snapshot ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
        }
    }
}

/// One hand as seen in the last processed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandSnapshot {
    /// Palm position, `None` when the hand was absent.
    pub position: Option<Position>,
    /// Current state tag.
    pub gesture: String,
    /// Frame time, `None` when the hand was absent.
    pub timestamp: Option<f64>,
}

impl HandSnapshot {
    fn absent(state: HandState) -> Self {
        Self {
            position: None,
            gesture: state.as_str().to_string(),
            timestamp: None,
        }
    }

    fn to_sexp(&self) -> String {
        let position = match self.position {
            Some(p) => format!("({:.1} {:.1} {:.1})", p.x, p.y, p.z),
            None => "nil".to_string(),
        };
        format!("(:gesture :{} :position {})", self.gesture, position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexSnapshot {
    pub gesture: String,
    pub gesture_timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_multiplier: Option<f32>,
}

/// Immutable result of one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureSnapshot {
    pub left_hand: HandSnapshot,
    pub right_hand: HandSnapshot,
    pub complex_gesture: ComplexSnapshot,
}

impl Default for GestureSnapshot {
    fn default() -> Self {
        Self {
            left_hand: HandSnapshot::absent(HandState::OpenPalmAway),
            right_hand: HandSnapshot::absent(HandState::OpenPalmAway),
            complex_gesture: ComplexSnapshot {
                gesture: "idle".to_string(),
                gesture_timestamp: 0.0,
                zoom_multiplier: None,
            },
        }
    }
}

impl GestureSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Format as an IPC event s-expression.
    pub fn to_sexp(&self) -> String {
        let zoom = match self.complex_gesture.zoom_multiplier {
            Some(m) => format!(" :zoom-multiplier {:.3}", m),
            None => String::new(),
        };
        format!(
            "(:type :event :event :gesture-snapshot :left {} :right {} :complex \"{}\" :timestamp {:.3}{})",
            self.left_hand.to_sexp(),
            self.right_hand.to_sexp(),
            self.complex_gesture.gesture,
            self.complex_gesture.gesture_timestamp,
            zoom,
        )
    }
}

// ── Publication ────────────────────────────────────────────

type Shared = Arc<RwLock<Arc<GestureSnapshot>>>;

fn read_latest(shared: &Shared) -> Arc<GestureSnapshot> {
    match shared.read() {
        Ok(guard) => Arc::clone(&*guard),
        Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
    }
}

/// Write side, owned by the controller.
#[derive(Debug)]
pub struct SnapshotPublisher {
    shared: Shared,
}

impl SnapshotPublisher {
    pub fn new(initial: GestureSnapshot) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Swap in a new snapshot.
    pub fn publish(&self, snapshot: Arc<GestureSnapshot>) {
        match self.shared.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn latest(&self) -> Arc<GestureSnapshot> {
        read_latest(&self.shared)
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read side; cheap to clone and safe to send to other threads.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    shared: Shared,
}

impl SnapshotReader {
    pub fn latest(&self) -> Arc<GestureSnapshot> {
        read_latest(&self.shared)
    }
}

// ── Controller ─────────────────────────────────────────────

/// Owns every piece of recognition state.
pub struct GestureController<S: ActionSink> {
    config: GestureConfig,
    calibration: Calibration,
    mode: TrackingMode,
    sink: S,
    buffer: FrameBuffer,
    velocity: VelocityEstimator,
    left: HandStateMachine,
    right: HandStateMachine,
    compound: CompoundGestureDetector,
    shapes: ShapeRecognizer,
    publisher: SnapshotPublisher,
    frames_processed: u64,
}

impl<S: ActionSink> GestureController<S> {
    pub fn new(
        config: GestureConfig,
        calibration: Calibration,
        templates: Vec<ReferenceTemplate>,
        sink: S,
    ) -> Self {
        Self {
            config,
            calibration,
            mode: TrackingMode::Active,
            sink,
            buffer: FrameBuffer::default(),
            velocity: VelocityEstimator::new(),
            left: HandStateMachine::new(Hand::Left),
            right: HandStateMachine::new(Hand::Right),
            compound: CompoundGestureDetector::new(),
            shapes: ShapeRecognizer::new(templates),
            publisher: SnapshotPublisher::new(GestureSnapshot::default()),
            frames_processed: 0,
        }
    }

    // ── Accessors ──

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GestureConfig {
        &mut self.config
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn hand(&self, hand: Hand) -> &HandStateMachine {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn compound(&self) -> &CompoundGestureDetector {
        &self.compound
    }

    pub fn shapes(&self) -> &ShapeRecognizer {
        &self.shapes
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    pub fn latest_snapshot(&self) -> Arc<GestureSnapshot> {
        self.publisher.latest()
    }

    // ── Modes ──

    pub fn set_mode(&mut self, mode: TrackingMode) {
        if mode != self.mode {
            info!("tracking mode: {} -> {}", self.mode.as_str(), mode.as_str());
        }
        self.mode = mode;
    }

    /// Restore the default play area.
    pub fn reset_calibration(&mut self) {
        info!("calibration reset to defaults");
        self.calibration = Calibration::default();
    }

    /// Return every component to rest and publish an idle snapshot.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.velocity.reset();
        self.left.reset();
        self.right.reset();
        self.compound.reset();
        self.shapes.reset();
        self.publisher.publish(Arc::new(GestureSnapshot::default()));
        debug!("gesture state reset");
    }

    // ── Per-frame ──

    /// Process one tracking frame and return the published snapshot.
    pub fn process(&mut self, frame: &FrameSnapshot) -> Arc<GestureSnapshot> {
        match self.mode {
            TrackingMode::Sleep => return self.publisher.latest(),
            TrackingMode::Setup => {
                for sample in &frame.hands {
                    self.calibration.expand(&sample.palm_position);
                }
                return self.publisher.latest();
            }
            TrackingMode::Active => {}
        }

        let now = frame.timestamp;
        self.frames_processed += 1;
        self.buffer.append(frame);
        self.velocity.recompute(&self.buffer);

        let mut drawn = None;
        for hand in [Hand::Left, Hand::Right] {
            if let Some(sample) = frame.hand(hand) {
                if let Some(shape) = self.update_hand(sample, now) {
                    drawn = Some(shape);
                }
            }
        }

        let input = CompoundInput {
            timestamp: now,
            left: frame.left().map(|sample| TrackedHand {
                sample,
                state: self.left.state(),
            }),
            right: frame.right().map(|sample| TrackedHand {
                sample,
                state: self.right.state(),
            }),
            right_velocity: self.velocity.velocity(Hand::Right),
        };
        self.compound.update(&input, &self.config);
        if let Some(shape) = drawn {
            self.compound.apply_shape(&shape.name, now);
        }

        let snapshot = Arc::new(self.build_snapshot(frame));
        self.publisher.publish(Arc::clone(&snapshot));
        snapshot
    }

    /// Drive one hand's state machine and route its effects.  Returns a
    /// shape match when this frame finished a stroke that matched.
    fn update_hand(&mut self, sample: &HandSample, now: f64) -> Option<ShapeMatch> {
        let hand = sample.hand;
        let input = HandInput::from_sample(sample, now, &self.config);
        let machine = match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        };
        let effects = machine.update(&input, &self.config);

        if hand == Hand::Right {
            let [x, y, _] = sample.palm_position;
            let (sx, sy) = self.calibration.map_to_screen(x, y, &self.config);
            self.sink.emit(hand, Action::CursorMove { x: sx, y: sy });
        }

        let mut drawn = None;
        for effect in effects {
            match effect {
                HandEffect::Click => self.sink.emit(hand, Action::Click),
                HandEffect::PressDown => self.sink.emit(hand, Action::MouseDown),
                HandEffect::Release => self.sink.emit(hand, Action::MouseUp),
                HandEffect::Scroll(delta) => self.sink.emit(hand, Action::Scroll { delta }),
                HandEffect::BeginStroke => self.shapes.begin(),
                HandEffect::FinishStroke => drawn = self.shapes.finish(&self.config),
                HandEffect::ClearStroke => self.shapes.clear(),
            }
        }

        if hand == Hand::Left
            && matches!(
                self.left.state(),
                HandState::PinchPressing | HandState::PinchHolding
            )
        {
            self.shapes.capture(&sample.index_tip(), &self.config);
        }
        drawn
    }

    fn build_snapshot(&self, frame: &FrameSnapshot) -> GestureSnapshot {
        let hand_snapshot = |hand: Hand| {
            let state = self.hand(hand).state();
            match frame.hand(hand) {
                Some(sample) => HandSnapshot {
                    position: Some(sample.palm_position.into()),
                    gesture: state.as_str().to_string(),
                    timestamp: Some(frame.timestamp),
                },
                None => HandSnapshot::absent(state),
            }
        };
        GestureSnapshot {
            left_hand: hand_snapshot(Hand::Left),
            right_hand: hand_snapshot(Hand::Right),
            complex_gesture: ComplexSnapshot {
                gesture: self.compound.gesture().as_str().to_string(),
                gesture_timestamp: self.compound.timestamp(),
                zoom_multiplier: self.compound.zoom_multiplier(),
            },
        }
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:mode :{} :frames {} :left {} :right {} :compound {} :shapes {})",
            self.mode.as_str(),
            self.frames_processed,
            self.left.status_sexp(),
            self.right.status_sexp(),
            self.compound.status_sexp(),
            self.shapes.status_sexp(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
