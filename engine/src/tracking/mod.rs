//! Sensor-side data model and signal processing.
//!
//! Provides:
//! - `hand`: per-frame hand samples (palm, strengths, digits and bones)
//! - `geometry`: vector primitives
//! - `frame_buffer`: bounded frame history and velocity estimation
//! - `orientation`: palm-facing classification

pub mod frame_buffer;
pub mod geometry;
pub mod hand;
pub mod orientation;

pub use frame_buffer::{FrameBuffer, VelocityEstimator};
pub use hand::{FrameSnapshot, Hand, HandSample};
pub use orientation::PalmOrientation;
