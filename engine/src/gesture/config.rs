//! Tunable thresholds and the play-area calibration record.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::tracking::geometry::Vec3;

// ── GestureConfig ──────────────────────────────────────────

/// Every recognition threshold, injected at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum pinch strength for a pinch.
    pub pinch_threshold: f32,
    /// Minimum grab strength for a grab.
    pub grab_threshold: f32,
    /// Seconds a pressing state must persist before it becomes holding.
    pub hold_threshold: f64,
    /// Reject pinches while the index finger is extended (pointing poses).
    pub pinch_requires_index_curled: bool,
    /// Minimum |vertical component| of the thumb direction for thumbs up/down.
    pub thumb_vertical_threshold: f32,
    /// Scroll units per mm of palm travel, before the 120-per-notch factor.
    pub scroll_sensitivity: f32,
    /// Palm speed (units/s) on one axis that triggers a swipe.
    pub swipe_threshold: f32,
    /// Seconds after leaving pinch-holding during which a swipe still counts.
    pub pinch_timeout: f64,
    /// Seconds a non-idle compound gesture survives without reaffirmation.
    pub gesture_timeout: f64,
    /// Max distance (mm) between index knuckles for a finger cross.
    pub overlap_threshold: f32,
    /// Max |cos| between index directions for a finger cross.
    pub orthogonal_threshold: f32,
    /// Maximum captured stroke points.
    pub stroke_capacity: usize,
    /// Keep one fingertip point every N frames while drawing.
    pub stroke_decimation: u32,
    /// Strokes with this many points or fewer are discarded unmatched.
    pub min_stroke_points: usize,
    /// Raster resolution (cells per side).
    pub grid_size: usize,
    /// Best template must score below this Hausdorff distance.
    pub match_threshold: f32,
    /// Drawing canvas width (px).
    pub canvas_width: f32,
    /// Drawing canvas height (px).
    pub canvas_height: f32,
    /// Target screen width (px).
    pub screen_width: f32,
    /// Target screen height (px).
    pub screen_height: f32,
    /// Subtracted from normalized y before inverting into screen space.
    pub cursor_y_offset: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.8,
            grab_threshold: 0.9,
            hold_threshold: 0.2,
            pinch_requires_index_curled: true,
            thumb_vertical_threshold: 0.5,
            scroll_sensitivity: 0.8,
            swipe_threshold: 800.0,
            pinch_timeout: 0.1,
            gesture_timeout: 0.3,
            overlap_threshold: 40.0,
            orthogonal_threshold: 0.35,
            stroke_capacity: 200,
            stroke_decimation: 2,
            min_stroke_points: 10,
            grid_size: 100,
            match_threshold: 30.0,
            canvas_width: 700.0,
            canvas_height: 500.0,
            screen_width: 1920.0,
            screen_height: 1080.0,
            cursor_y_offset: 0.1,
        }
    }
}

impl GestureConfig {
    /// Load a JSON config file.  Missing keys keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read gesture config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("invalid gesture config {}", path.display()))?;
        info!("gesture config loaded from {}", path.display());
        Ok(config)
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:pinch-threshold {:.2} :grab-threshold {:.2} :hold-threshold {:.3} :pinch-requires-index-curled {} :swipe-threshold {:.1} :pinch-timeout {:.3} :gesture-timeout {:.3} :overlap-threshold {:.1} :orthogonal-threshold {:.2} :grid-size {} :match-threshold {:.1})",
            self.pinch_threshold,
            self.grab_threshold,
            self.hold_threshold,
            if self.pinch_requires_index_curled { "t" } else { "nil" },
            self.swipe_threshold,
            self.pinch_timeout,
            self.gesture_timeout,
            self.overlap_threshold,
            self.orthogonal_threshold,
            self.grid_size,
            self.match_threshold,
        )
    }
}

// ── Calibration ────────────────────────────────────────────

/// Play-area bounds, `[hi, lo]` per axis, in sensor millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub max_min_x: [f32; 2],
    pub max_min_y: [f32; 2],
    pub max_min_z: [f32; 2],
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            max_min_x: [260.0, -180.0],
            max_min_y: [50.0, 0.0],
            max_min_z: [290.0, -140.0],
        }
    }
}

impl Calibration {
    /// Load a calibration record from JSON.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read calibration {}", path.display()))?;
        let calibration = serde_json::from_str(&raw)
            .with_context(|| format!("invalid calibration {}", path.display()))?;
        info!("calibration loaded from {}", path.display());
        Ok(calibration)
    }

    /// Load a calibration record, falling back to defaults when the file
    /// does not exist.  A file that exists but fails to parse is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!("no calibration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Widen the bounds to include `position` (setup mode).
    pub fn expand(&mut self, position: &Vec3) {
        for (bounds, value) in [
            (&mut self.max_min_x, position[0]),
            (&mut self.max_min_y, position[1]),
            (&mut self.max_min_z, position[2]),
        ] {
            bounds[0] = bounds[0].max(value);
            bounds[1] = bounds[1].min(value);
        }
    }

    /// Map a palm `(x, y)` to clamped screen pixels.
    pub fn map_to_screen(&self, x: f32, y: f32, config: &GestureConfig) -> (f32, f32) {
        let range_x = nonzero(self.max_min_x[0] - self.max_min_x[1]);
        let range_y = nonzero(self.max_min_y[0] - self.max_min_y[1]);

        let norm_x = (x - self.max_min_x[1]) / range_x;
        let norm_y = (y - self.max_min_y[1]) / range_y - config.cursor_y_offset;

        let screen_x = norm_x * config.screen_width;
        let screen_y = (1.0 - norm_y) * config.screen_height;

        (
            screen_x.clamp(0.0, (config.screen_width - 1.0).max(0.0)),
            screen_y.clamp(0.0, (config.screen_height - 1.0).max(0.0)),
        )
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:x ({:.1} {:.1}) :y ({:.1} {:.1}) :z ({:.1} {:.1}))",
            self.max_min_x[0],
            self.max_min_x[1],
            self.max_min_y[0],
            self.max_min_y[1],
            self.max_min_z[0],
            self.max_min_z[1],
        )
    }
}

fn nonzero(range: f32) -> f32 {
    if range == 0.0 {
        1.0
    } else {
        range
    }
}
