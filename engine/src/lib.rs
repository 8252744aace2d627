//! handgest - gesture recognition engine for optical hand-tracking frames.
//!
//! Feed one `FrameSnapshot` per tracking frame into
//! `GestureController::process`; recognized actions go to an `ActionSink`
//! and the latest `GestureSnapshot` is readable from any thread.

pub mod gesture;
pub mod ipc;
pub mod tracking;

pub use gesture::{
    Action, ActionSink, Calibration, GestureConfig, GestureController, GestureSnapshot,
    TrackingMode,
};
pub use tracking::{FrameSnapshot, Hand, HandSample};
