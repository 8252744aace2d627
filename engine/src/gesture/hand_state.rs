//! Per-hand discrete gesture state machine.
//!
//! Each frame the hand's pinch/grab strengths and palm orientation are
//! reduced to at most one active pose, which drives a closed set of states
//! with a pressing → holding hysteresis.  A thumbs-up/down overlay is applied
//! after the table.  Transitions return their side effects instead of
//! performing them; the controller routes them to the action sink (clicks,
//! drags, scrolls) or to the shape recognizer (stroke capture).

use tracing::debug;

use super::config::GestureConfig;
use crate::tracking::hand::{Hand, HandSample};
use crate::tracking::orientation::{self, PalmOrientation};

// ── States ─────────────────────────────────────────────────

/// Discrete state of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandState {
    OpenPalmAway,
    OpenPalmTowards,
    PinchPressing,
    PinchHolding,
    GrabAwayPressing,
    GrabAwayHolding,
    GrabTowardsPressing,
    GrabTowardsHolding,
    ThumbsUp,
    ThumbsDown,
}

impl HandState {
    /// Every state, in declaration order.
    pub const ALL: [HandState; 10] = [
        Self::OpenPalmAway,
        Self::OpenPalmTowards,
        Self::PinchPressing,
        Self::PinchHolding,
        Self::GrabAwayPressing,
        Self::GrabAwayHolding,
        Self::GrabTowardsPressing,
        Self::GrabTowardsHolding,
        Self::ThumbsUp,
        Self::ThumbsDown,
    ];

    /// String representation for IPC and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenPalmAway => "open-palm-away",
            Self::OpenPalmTowards => "open-palm-towards",
            Self::PinchPressing => "pinch-pressing",
            Self::PinchHolding => "pinch-holding",
            Self::GrabAwayPressing => "grab-away-pressing",
            Self::GrabAwayHolding => "grab-away-holding",
            Self::GrabTowardsPressing => "grab-towards-pressing",
            Self::GrabTowardsHolding => "grab-towards-holding",
            Self::ThumbsUp => "thumbs-up",
            Self::ThumbsDown => "thumbs-down",
        }
    }

    /// The resting state for a palm orientation.
    pub fn open_palm(orientation: PalmOrientation) -> Self {
        match orientation {
            PalmOrientation::Away => Self::OpenPalmAway,
            PalmOrientation::Towards => Self::OpenPalmTowards,
        }
    }

    pub fn is_grab_holding(&self) -> bool {
        matches!(self, Self::GrabAwayHolding | Self::GrabTowardsHolding)
    }

    pub fn is_thumbs(&self) -> bool {
        matches!(self, Self::ThumbsUp | Self::ThumbsDown)
    }
}

// ── Per-frame input ────────────────────────────────────────

/// The single pose that counts this frame, by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseGesture {
    Pinch,
    GrabAway,
    GrabTowards,
}

impl PoseGesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pinch => "pinch",
            Self::GrabAway => "grab-away",
            Self::GrabTowards => "grab-towards",
        }
    }
}

/// Vertical thumb pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbPose {
    Up,
    Down,
}

impl ThumbPose {
    fn state(self) -> HandState {
        match self {
            Self::Up => HandState::ThumbsUp,
            Self::Down => HandState::ThumbsDown,
        }
    }
}

/// Classify pinch, then grab, else nothing.
pub fn classify_pose(
    sample: &HandSample,
    orientation: PalmOrientation,
    config: &GestureConfig,
) -> Option<PoseGesture> {
    let pointing = config.pinch_requires_index_curled && sample.index_extended();
    if sample.pinch_strength >= config.pinch_threshold
        && sample.pinch_strength > sample.grab_strength
        && !pointing
    {
        return Some(PoseGesture::Pinch);
    }
    if sample.grab_strength >= config.grab_threshold {
        return Some(match orientation {
            PalmOrientation::Away => PoseGesture::GrabAway,
            PalmOrientation::Towards => PoseGesture::GrabTowards,
        });
    }
    None
}

/// Thumbs up/down: only the thumb extended, pointing clearly up or down.
pub fn classify_thumb(sample: &HandSample, config: &GestureConfig) -> Option<ThumbPose> {
    if !sample.only_thumb_extended() {
        return None;
    }
    let vertical = sample.thumb_direction()[1];
    if vertical > config.thumb_vertical_threshold {
        Some(ThumbPose::Up)
    } else if vertical < -config.thumb_vertical_threshold {
        Some(ThumbPose::Down)
    } else {
        None
    }
}

/// Everything the state machine reads from one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandInput {
    /// Frame time in seconds.
    pub timestamp: f64,
    pub orientation: PalmOrientation,
    pub pose: Option<PoseGesture>,
    pub thumb: Option<ThumbPose>,
    pub palm_y: f32,
}

impl HandInput {
    pub fn from_sample(sample: &HandSample, timestamp: f64, config: &GestureConfig) -> Self {
        let orientation = orientation::classify(&sample.palm_normal);
        Self {
            timestamp,
            orientation,
            pose: classify_pose(sample, orientation, config),
            thumb: classify_thumb(sample, config),
            palm_y: sample.palm_position[1],
        }
    }
}

// ── Effects ────────────────────────────────────────────────

/// Side effect of a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandEffect {
    /// Quick pinch released before the hold threshold.
    Click,
    /// Pinch promoted to holding (right hand drag start).
    PressDown,
    /// Pinch hold ended (right hand drag end).
    Release,
    /// Grab-hold palm travel, in wheel units.
    Scroll(i32),
    /// Left pinch began: start capturing a stroke.
    BeginStroke,
    /// Left pinch ended: stop capturing and recognize.
    FinishStroke,
    /// Left grab-hold: discard the canvas.
    ClearStroke,
}

// ── State machine ──────────────────────────────────────────

/// State machine for one hand.
#[derive(Debug, Clone)]
pub struct HandStateMachine {
    hand: Hand,
    state: HandState,
    /// Time of the last entry into a pressing state.
    pressed_at: f64,
    /// Palm height at the previous scroll step.
    last_scroll_y: f32,
}

impl HandStateMachine {
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            state: HandState::OpenPalmAway,
            pressed_at: 0.0,
            last_scroll_y: 0.0,
        }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn state(&self) -> HandState {
        self.state
    }

    pub fn pressed_at(&self) -> f64 {
        self.pressed_at
    }

    /// The left hand draws with its pinch.
    fn draws(&self) -> bool {
        self.hand == Hand::Left
    }

    /// The right hand drags with its pinch.
    fn drags(&self) -> bool {
        self.hand == Hand::Right
    }

    /// Advance one frame and return the side effects, in order.
    pub fn update(&mut self, input: &HandInput, config: &GestureConfig) -> Vec<HandEffect> {
        let mut effects = Vec::new();
        let mut next = self.transition(input, config, &mut effects);

        if let Some(thumb) = input.thumb {
            self.exit_effects(next, &mut effects);
            next = thumb.state();
        }

        if next != self.state {
            debug!(
                "{} hand: {} -> {}",
                self.hand.as_str(),
                self.state.as_str(),
                next.as_str()
            );
        }
        self.state = next;
        effects
    }

    /// The transition table, without the thumb overlay.
    fn transition(
        &mut self,
        input: &HandInput,
        config: &GestureConfig,
        effects: &mut Vec<HandEffect>,
    ) -> HandState {
        let open = HandState::open_palm(input.orientation);
        let held = input.timestamp - self.pressed_at >= config.hold_threshold;

        match self.state {
            HandState::OpenPalmAway | HandState::OpenPalmTowards => match input.pose {
                Some(PoseGesture::Pinch) => {
                    self.pressed_at = input.timestamp;
                    if self.draws() {
                        effects.push(HandEffect::BeginStroke);
                    }
                    HandState::PinchPressing
                }
                Some(PoseGesture::GrabAway) => {
                    self.start_grab(input);
                    HandState::GrabAwayPressing
                }
                Some(PoseGesture::GrabTowards) => {
                    self.start_grab(input);
                    HandState::GrabTowardsPressing
                }
                None => open,
            },

            HandState::PinchPressing => match input.pose {
                Some(PoseGesture::Pinch) if held => {
                    if self.drags() {
                        effects.push(HandEffect::PressDown);
                    }
                    HandState::PinchHolding
                }
                Some(PoseGesture::Pinch) => HandState::PinchPressing,
                _ => {
                    if !held {
                        effects.push(HandEffect::Click);
                    }
                    if self.draws() {
                        effects.push(HandEffect::FinishStroke);
                    }
                    open
                }
            },

            HandState::PinchHolding => match input.pose {
                Some(PoseGesture::Pinch) => HandState::PinchHolding,
                _ => {
                    self.exit_effects(HandState::PinchHolding, effects);
                    open
                }
            },

            HandState::GrabAwayPressing => self.grab_pressing(
                input,
                held,
                PoseGesture::GrabAway,
                HandState::GrabAwayPressing,
                HandState::GrabAwayHolding,
                effects,
            ),
            HandState::GrabTowardsPressing => self.grab_pressing(
                input,
                held,
                PoseGesture::GrabTowards,
                HandState::GrabTowardsPressing,
                HandState::GrabTowardsHolding,
                effects,
            ),

            HandState::GrabAwayHolding => self.grab_holding(
                input,
                config,
                PoseGesture::GrabAway,
                HandState::GrabAwayHolding,
                effects,
            ),
            HandState::GrabTowardsHolding => self.grab_holding(
                input,
                config,
                PoseGesture::GrabTowards,
                HandState::GrabTowardsHolding,
                effects,
            ),

            // The overlay re-asserts thumbs if the pose still holds.
            HandState::ThumbsUp | HandState::ThumbsDown => open,
        }
    }

    fn start_grab(&mut self, input: &HandInput) {
        self.pressed_at = input.timestamp;
        self.last_scroll_y = input.palm_y;
    }

    fn grab_pressing(
        &mut self,
        input: &HandInput,
        held: bool,
        grab: PoseGesture,
        pressing: HandState,
        holding: HandState,
        effects: &mut Vec<HandEffect>,
    ) -> HandState {
        if input.pose != Some(grab) {
            return HandState::open_palm(input.orientation);
        }
        if !held {
            return pressing;
        }
        if self.draws() {
            effects.push(HandEffect::ClearStroke);
        }
        self.last_scroll_y = input.palm_y;
        holding
    }

    fn grab_holding(
        &mut self,
        input: &HandInput,
        config: &GestureConfig,
        grab: PoseGesture,
        holding: HandState,
        effects: &mut Vec<HandEffect>,
    ) -> HandState {
        if input.pose != Some(grab) {
            self.exit_effects(holding, effects);
            return HandState::open_palm(input.orientation);
        }
        let delta = input.palm_y - self.last_scroll_y;
        let amount = (-delta * config.scroll_sensitivity * 120.0) as i32;
        if amount != 0 {
            effects.push(HandEffect::Scroll(amount));
        }
        self.last_scroll_y = input.palm_y;
        holding
    }

    /// Effects owed when `state` is left other than by its own table row
    /// finishing normally (release, or the thumb overlay taking over).
    fn exit_effects(&self, state: HandState, effects: &mut Vec<HandEffect>) {
        match state {
            HandState::PinchHolding => {
                if self.drags() {
                    effects.push(HandEffect::Release);
                }
                if self.draws() {
                    effects.push(HandEffect::FinishStroke);
                }
            }
            HandState::PinchPressing if self.draws() => {
                effects.push(HandEffect::FinishStroke);
            }
            HandState::GrabAwayHolding | HandState::GrabTowardsHolding if self.draws() => {
                effects.push(HandEffect::ClearStroke);
            }
            _ => {}
        }
    }

    /// Return to rest without emitting anything.
    pub fn reset(&mut self) {
        *self = Self::new(self.hand);
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:hand :{} :state :{} :pressed-at {:.3})",
            self.hand.as_str(),
            self.state.as_str(),
            self.pressed_at,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
