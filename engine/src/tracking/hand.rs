//! Hand-pose sample data as delivered by the optical tracking sensor.
//!
//! Models five digits of four bones each, every bone carrying its
//! `prev_joint` (toward the wrist) and `next_joint` (toward the tip).
//! Samples are resolved poses; nothing here estimates joints.

use serde::{Deserialize, Serialize};

use super::geometry::{self, Vec3};

// ── Hand enum ──────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a hand from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

// ── Digit / bone definitions ───────────────────────────────

/// The five digits, in sensor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Digit {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

/// Number of digits per hand.
pub const DIGIT_COUNT: usize = 5;

/// Number of bones per digit.
pub const BONE_COUNT: usize = 4;

impl Digit {
    /// Convert digit enum to array index (0-4).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Pinky => "pinky",
        }
    }
}

/// Bones of a digit, wrist to tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoneKind {
    Metacarpal,
    Proximal,
    Intermediate,
    Distal,
}

impl BoneKind {
    /// Convert bone enum to array index (0-3).
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// A single bone segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Joint closer to the wrist.
    pub prev_joint: Vec3,
    /// Joint closer to the fingertip.
    pub next_joint: Vec3,
}

/// Pose of one digit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DigitPose {
    /// Metacarpal, proximal, intermediate, distal.
    pub bones: [Bone; BONE_COUNT],
    /// Sensor-provided extension flag.
    pub is_extended: bool,
}

impl DigitPose {
    pub fn bone(&self, kind: BoneKind) -> &Bone {
        &self.bones[kind.index()]
    }

    /// Fingertip position (distal bone's next joint).
    pub fn tip(&self) -> Vec3 {
        self.bone(BoneKind::Distal).next_joint
    }

    /// Base position (metacarpal bone's prev joint).
    pub fn base(&self) -> Vec3 {
        self.bone(BoneKind::Metacarpal).prev_joint
    }
}

// ── Hand sample ────────────────────────────────────────────

/// One detected hand at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandSample {
    #[serde(rename = "type")]
    pub hand: Hand,
    /// Sensor time of this sample in seconds.
    #[serde(default)]
    pub timestamp: f64,
    /// Palm center (mm).
    pub palm_position: Vec3,
    /// Palm normal; not necessarily unit length.
    pub palm_normal: Vec3,
    /// Pinch confidence in [0, 1].
    #[serde(default)]
    pub pinch_strength: f32,
    /// Grab confidence in [0, 1].
    #[serde(default)]
    pub grab_strength: f32,
    /// Thumb, index, middle, ring, pinky.
    #[serde(default)]
    pub digits: [DigitPose; DIGIT_COUNT],
}

impl HandSample {
    /// Create a sample with the palm at `palm_position`, palm facing away
    /// from the device and all digits collapsed at the origin.
    pub fn new(hand: Hand, timestamp: f64, palm_position: Vec3) -> Self {
        Self {
            hand,
            timestamp,
            palm_position,
            palm_normal: [0.0, 0.0, -1.0],
            pinch_strength: 0.0,
            grab_strength: 0.0,
            digits: [DigitPose::default(); DIGIT_COUNT],
        }
    }

    pub fn digit(&self, digit: Digit) -> &DigitPose {
        &self.digits[digit.index()]
    }

    pub fn digit_mut(&mut self, digit: Digit) -> &mut DigitPose {
        &mut self.digits[digit.index()]
    }

    /// Whether the index finger is reported as extended.
    pub fn index_extended(&self) -> bool {
        self.digit(Digit::Index).is_extended
    }

    /// True when the thumb is the only extended digit.
    pub fn only_thumb_extended(&self) -> bool {
        self.digits
            .iter()
            .enumerate()
            .all(|(i, d)| d.is_extended == (i == Digit::Thumb.index()))
    }

    /// Unit direction of the thumb, base to tip.
    pub fn thumb_direction(&self) -> Vec3 {
        let thumb = self.digit(Digit::Thumb);
        geometry::direction(&thumb.base(), &thumb.tip())
    }

    /// Index finger knuckle (proximal bone's prev joint).
    pub fn index_proximal_joint(&self) -> Vec3 {
        self.digit(Digit::Index).bone(BoneKind::Proximal).prev_joint
    }

    /// Unit direction of the index finger, from the proximal joint to the
    /// distal tip.
    pub fn index_direction(&self) -> Vec3 {
        let index = self.digit(Digit::Index);
        geometry::direction(&index.bone(BoneKind::Proximal).prev_joint, &index.tip())
    }

    /// Index fingertip position.
    pub fn index_tip(&self) -> Vec3 {
        self.digit(Digit::Index).tip()
    }
}

// ── Frame ──────────────────────────────────────────────────

/// All hands seen in one tracking frame (zero, one or two).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Frame time in seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub hands: Vec<HandSample>,
}

impl FrameSnapshot {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            hands: Vec::new(),
        }
    }

    /// Builder-style helper adding one hand.
    pub fn with_hand(mut self, sample: HandSample) -> Self {
        self.hands.push(sample);
        self
    }

    /// The sample for `hand`, if it was tracked this frame.  Only the first
    /// sample of each chirality counts.
    pub fn hand(&self, hand: Hand) -> Option<&HandSample> {
        self.hands.iter().find(|s| s.hand == hand)
    }

    pub fn left(&self) -> Option<&HandSample> {
        self.hand(Hand::Left)
    }

    pub fn right(&self) -> Option<&HandSample> {
        self.hand(Hand::Right)
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}
