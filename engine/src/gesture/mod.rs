//! Gesture recognition over tracked hand frames.
//!
//! Provides:
//! - `config`: thresholds and play-area calibration
//! - `actions`: outward side effects and the `ActionSink` seam
//! - `hand_state`: per-hand discrete state machine
//! - `compound`: swipe, zoom, finger-cross and drawn-shape arbitration
//! - `shape`: stroke capture, rasterization and template matching
//! - `controller`: per-frame pipeline and snapshot publication

pub mod actions;
pub mod compound;
pub mod config;
pub mod controller;
pub mod hand_state;
pub mod shape;

pub use actions::{Action, ActionSink, LogSink, NullSink, RecordingSink};
pub use compound::ComplexGesture;
pub use config::{Calibration, GestureConfig};
pub use controller::{GestureController, GestureSnapshot, SnapshotReader, TrackingMode};
pub use hand_state::HandState;
