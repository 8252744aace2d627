//! Palm-facing classification from the palm normal.

use super::geometry::{dot, Vec3};

/// Device forward axis in sensor space.
pub const DEVICE_FORWARD: Vec3 = [0.0, 0.0, 1.0];

/// Whether the palm faces away from or towards the sensor's forward axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PalmOrientation {
    Away,
    Towards,
}

impl PalmOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Away => "palm-away",
            Self::Towards => "palm-towards",
        }
    }
}

/// Negative projection on the forward axis means the palm faces away.
/// A zero normal projects to zero and classifies as `Towards`.
pub fn classify(palm_normal: &Vec3) -> PalmOrientation {
    if dot(palm_normal, &DEVICE_FORWARD) < 0.0 {
        PalmOrientation::Away
    } else {
        PalmOrientation::Towards
    }
}
