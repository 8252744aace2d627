//! Drawn-shape recognition.
//!
//! While the left hand pinches, index fingertip positions are projected onto
//! a virtual canvas and collected into a bounded, decimated stroke.  When the
//! pinch ends the stroke is scaled into a fixed binary raster and ranked
//! against reference templates by Hausdorff distance over occupied cells.
//!
//! Template files are plain text, one raster row per line, `1`/`#` for an
//! occupied cell and `0`/`.` for an empty one.  The file stem is the name.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::config::GestureConfig;
use crate::tracking::geometry::Vec3;

// ── Errors ─────────────────────────────────────────────────

/// Why a reference template could not be loaded.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template: {0}")]
    Io(#[from] io::Error),
    #[error("template has no rows")]
    Empty,
    #[error("line {line}: expected {expected} cells, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}, column {column}: invalid cell {ch:?}")]
    BadCell { line: usize, column: usize, ch: char },
}

// ── Raster ─────────────────────────────────────────────────

/// Binary occupancy grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Raster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.cells[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize) {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col] = true;
        }
    }

    /// Number of occupied cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Occupied cells as `(col, row)` coordinates.
    pub fn points(&self) -> Vec<(f32, f32)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c)
            .map(|(i, _)| ((i % self.width) as f32, (i / self.width) as f32))
            .collect()
    }

    /// Parse the text template format.  Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let rows: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_end()))
            .filter(|(_, l)| !l.is_empty())
            .collect();

        let Some(&(_, first)) = rows.first() else {
            return Err(TemplateError::Empty);
        };
        let width = first.chars().count();
        let mut raster = Raster::new(width, rows.len());

        for (row, &(line, cells)) in rows.iter().enumerate() {
            let found = cells.chars().count();
            if found != width {
                return Err(TemplateError::Ragged {
                    line,
                    expected: width,
                    found,
                });
            }
            for (col, ch) in cells.chars().enumerate() {
                match ch {
                    '1' | '#' => raster.set(row, col),
                    '0' | '.' => {}
                    _ => {
                        return Err(TemplateError::BadCell {
                            line,
                            column: col + 1,
                            ch,
                        })
                    }
                }
            }
        }
        Ok(raster)
    }
}

impl fmt::Display for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height {
            for col in 0..self.width {
                f.write_str(if self.get(row, col) { "1" } else { "0" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Scale a stroke into a `grid_size`² raster, preserving aspect ratio.
///
/// The bounding box is fitted using the smaller axis scale factor; a
/// zero-extent axis is treated as extent 1.
pub fn rasterize(points: &[Vec3], grid_size: usize) -> Raster {
    let mut raster = Raster::new(grid_size, grid_size);
    if points.is_empty() || grid_size == 0 {
        return raster;
    }

    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }

    let extent = |d: f32| if d > 0.0 { d } else { 1.0 };
    let last = (grid_size - 1) as f32;
    let scale = (last / extent(max_x - min_x)).min(last / extent(max_y - min_y));

    for p in points {
        let col = ((p[0] - min_x) * scale).round().clamp(0.0, last) as usize;
        let row = ((p[1] - min_y) * scale).round().clamp(0.0, last) as usize;
        raster.set(row, col);
    }
    raster
}

// ── Hausdorff distance ─────────────────────────────────────

/// `max_{a∈A} min_{b∈B} |a - b|`.  Infinite when `b` is empty.
pub fn directed(a: &[(f32, f32)], b: &[(f32, f32)]) -> f32 {
    a.iter()
        .map(|&(ax, ay)| {
            b.iter()
                .map(|&(bx, by)| ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt())
                .fold(f32::INFINITY, f32::min)
        })
        .fold(0.0, f32::max)
}

/// Bidirectional Hausdorff distance.  Two empty sets are identical; one
/// empty set is infinitely far from anything.
pub fn hausdorff(a: &[(f32, f32)], b: &[(f32, f32)]) -> f32 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 0.0,
        (true, false) | (false, true) => f32::INFINITY,
        (false, false) => directed(a, b).max(directed(b, a)),
    }
}

// ── Templates ──────────────────────────────────────────────

/// A named canonical shape.
#[derive(Debug, Clone)]
pub struct ReferenceTemplate {
    name: String,
    raster: Raster,
    points: Vec<(f32, f32)>,
}

impl ReferenceTemplate {
    pub fn new(name: impl Into<String>, raster: Raster) -> Self {
        let points = raster.points();
        Self {
            name: name.into(),
            raster,
            points,
        }
    }

    /// Load one template file; the name is the file stem.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = fs::read_to_string(path)?;
        let raster = Raster::parse(&text)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, raster))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }
}

/// Load every `*.txt` template in `dir`, sorted by name.  Unreadable or
/// malformed files are logged and skipped.
pub fn load_templates(dir: &Path) -> Vec<ReferenceTemplate> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot read template directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut templates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        match ReferenceTemplate::load(&path) {
            Ok(t) => templates.push(t),
            Err(e) => warn!("skipping template {}: {}", path.display(), e),
        }
    }
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    info!("{} shape templates loaded from {}", templates.len(), dir.display());
    templates
}

// ── Recognizer ─────────────────────────────────────────────

/// A template and its distance to the drawn raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMatch {
    pub name: String,
    pub distance: f32,
}

/// Project a fingertip onto the drawing canvas: `(x + W/2, H - y, z)`.
pub fn project_to_canvas(tip: &Vec3, config: &GestureConfig) -> Vec3 {
    [
        tip[0] + config.canvas_width / 2.0,
        config.canvas_height - tip[1],
        tip[2],
    ]
}

/// Stroke capture plus template matching.
#[derive(Debug, Clone, Default)]
pub struct ShapeRecognizer {
    templates: Vec<ReferenceTemplate>,
    stroke: VecDeque<Vec3>,
    capturing: bool,
    frames_seen: u32,
    last_raster: Option<Raster>,
}

impl ShapeRecognizer {
    pub fn new(templates: Vec<ReferenceTemplate>) -> Self {
        Self {
            templates,
            ..Self::default()
        }
    }

    pub fn templates(&self) -> &[ReferenceTemplate] {
        &self.templates
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Captured canvas points, oldest first.
    pub fn stroke(&self) -> &VecDeque<Vec3> {
        &self.stroke
    }

    /// Raster of the most recently finished stroke.
    pub fn last_raster(&self) -> Option<&Raster> {
        self.last_raster.as_ref()
    }

    /// Start a fresh stroke.
    pub fn begin(&mut self) {
        self.stroke.clear();
        self.frames_seen = 0;
        self.capturing = true;
    }

    /// Offer one fingertip position.  Only every `stroke_decimation`-th
    /// frame is kept, and the oldest point is dropped at capacity.
    pub fn capture(&mut self, tip: &Vec3, config: &GestureConfig) {
        if !self.capturing {
            return;
        }
        let keep = self.frames_seen % config.stroke_decimation.max(1) == 0;
        self.frames_seen = self.frames_seen.wrapping_add(1);
        if !keep {
            return;
        }
        if self.stroke.len() >= config.stroke_capacity {
            self.stroke.pop_front();
        }
        self.stroke.push_back(project_to_canvas(tip, config));
    }

    /// Discard the canvas without matching.
    pub fn clear(&mut self) {
        self.stroke.clear();
        self.frames_seen = 0;
        self.last_raster = None;
    }

    /// Drop the stroke and stop capturing.
    pub fn reset(&mut self) {
        self.clear();
        self.capturing = false;
    }

    /// Stop capturing and match the stroke.  The stroke is always cleared.
    pub fn finish(&mut self, config: &GestureConfig) -> Option<ShapeMatch> {
        self.capturing = false;
        let points: Vec<Vec3> = self.stroke.drain(..).collect();
        self.frames_seen = 0;

        if points.len() <= config.min_stroke_points {
            debug!("stroke too short ({} points), ignored", points.len());
            return None;
        }

        let raster = rasterize(&points, config.grid_size);
        trace!("stroke raster:\n{}", raster);
        let result = self.recognize(&raster, config);
        match &result {
            Some(m) => debug!("stroke matched {} (distance {:.2})", m.name, m.distance),
            None => debug!("stroke with {} points matched nothing", points.len()),
        }
        self.last_raster = Some(raster);
        result
    }

    /// All templates ranked by ascending distance to `raster`.
    pub fn rank(&self, raster: &Raster) -> Vec<ShapeMatch> {
        let points = raster.points();
        let mut ranked: Vec<ShapeMatch> = self
            .templates
            .iter()
            .map(|t| ShapeMatch {
                name: t.name.clone(),
                distance: hausdorff(&points, t.points()),
            })
            .collect();
        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        ranked
    }

    /// Best template, if it scores below `match_threshold`.
    pub fn recognize(&self, raster: &Raster, config: &GestureConfig) -> Option<ShapeMatch> {
        self.rank(raster)
            .into_iter()
            .next()
            .filter(|m| m.distance < config.match_threshold)
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let names: Vec<String> = self
            .templates
            .iter()
            .map(|t| format!("\"{}\"", t.name))
            .collect();
        format!(
            "(:capturing {} :stroke-points {} :templates ({}))",
            if self.capturing { "t" } else { "nil" },
            self.stroke.len(),
            names.join(" "),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
