//! Bounded per-hand palm history and the velocity derived from it.
//!
//! Each appended frame records, for both hands, either the palm position
//! or an explicit absence.  Velocity is the mean of the finite differences
//! over adjacent frames where that hand is present on both sides.

use std::collections::VecDeque;

use super::geometry::Vec3;
use super::hand::{FrameSnapshot, Hand};

/// Default number of frames kept.
pub const FRAME_BUFFER_CAPACITY: usize = 10;

/// One buffered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferedFrame {
    /// Frame time in seconds.
    pub timestamp: f64,
    pub left: Option<Vec3>,
    pub right: Option<Vec3>,
}

impl BufferedFrame {
    pub fn palm(&self, hand: Hand) -> Option<Vec3> {
        match hand {
            Hand::Left => self.left,
            Hand::Right => self.right,
        }
    }
}

/// Ring of the most recent frames.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    frames: VecDeque<BufferedFrame>,
    capacity: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(FRAME_BUFFER_CAPACITY)
    }
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Record a frame, evicting the oldest once over capacity.
    pub fn append(&mut self, frame: &FrameSnapshot) {
        self.frames.push_back(BufferedFrame {
            timestamp: frame.timestamp,
            left: frame.left().map(|s| s.palm_position),
            right: frame.right().map(|s| s.palm_position),
        });
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    /// Average velocity (units/s) of `hand` across the window.
    ///
    /// Pairs with a missing sample on either side, or with a non-positive
    /// time step, are skipped.  Returns zero when no pair is usable.
    pub fn velocity(&self, hand: Hand) -> Vec3 {
        let mut total = [0.0f64; 3];
        let mut valid_pairs = 0u32;

        for (current, next) in self.frames.iter().zip(self.frames.iter().skip(1)) {
            let (Some(c), Some(n)) = (current.palm(hand), next.palm(hand)) else {
                continue;
            };
            let dt = next.timestamp - current.timestamp;
            if dt <= 0.0 {
                continue;
            }
            for axis in 0..3 {
                total[axis] += f64::from(n[axis] - c[axis]) / dt;
            }
            valid_pairs += 1;
        }

        if valid_pairs == 0 {
            return [0.0; 3];
        }
        let n = f64::from(valid_pairs);
        [
            (total[0] / n) as f32,
            (total[1] / n) as f32,
            (total[2] / n) as f32,
        ]
    }

    /// Most recent frame, if any.
    pub fn latest(&self) -> Option<&BufferedFrame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

// ── Velocity ───────────────────────────────────────────────

/// Smoothed per-hand velocity, refreshed once per frame.
#[derive(Debug, Clone, Default)]
pub struct VelocityEstimator {
    left: Vec3,
    right: Vec3,
}

impl VelocityEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute both hands from the buffer contents.
    pub fn recompute(&mut self, buffer: &FrameBuffer) {
        self.left = buffer.velocity(Hand::Left);
        self.right = buffer.velocity(Hand::Right);
    }

    pub fn velocity(&self, hand: Hand) -> Vec3 {
        match hand {
            Hand::Left => self.left,
            Hand::Right => self.right,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::hand::HandSample;

    fn frame(t: f64, right: Option<Vec3>) -> FrameSnapshot {
        let mut f = FrameSnapshot::new(t);
        if let Some(p) = right {
            f = f.with_hand(HandSample::new(Hand::Right, t, p));
        }
        f
    }

    #[test]
    fn test_empty_buffer_zero_velocity() {
        let buf = FrameBuffer::default();
        assert_eq!(buf.velocity(Hand::Right), [0.0; 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_single_frame_zero_velocity() {
        let mut buf = FrameBuffer::default();
        buf.append(&frame(0.0, Some([1.0, 2.0, 3.0])));
        assert_eq!(buf.velocity(Hand::Right), [0.0; 3]);
    }

    #[test]
    fn test_stationary_hand() {
        let mut buf = FrameBuffer::default();
        for i in 0..8 {
            buf.append(&frame(i as f64 * 0.01, Some([5.0, 5.0, 5.0])));
        }
        assert_eq!(buf.velocity(Hand::Right), [0.0; 3]);
    }

    #[test]
    fn test_constant_velocity() {
        let mut buf = FrameBuffer::default();
        for i in 0..20 {
            let t = i as f64 * 0.02;
            buf.append(&frame(t, Some([0.0, 700.0 * t as f32, -100.0 * t as f32])));
        }
        let v = buf.velocity(Hand::Right);
        assert!(v[0].abs() < 1e-3);
        assert!((v[1] - 700.0).abs() < 0.5, "Expected ~700, got {}", v[1]);
        assert!((v[2] + 100.0).abs() < 0.5, "Expected ~-100, got {}", v[2]);
    }

    #[test]
    fn test_capacity_eviction() {
        let mut buf = FrameBuffer::new(3);
        for i in 0..10 {
            buf.append(&frame(i as f64, Some([i as f32, 0.0, 0.0])));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.latest().map(|f| f.timestamp), Some(9.0));
    }

    #[test]
    fn test_missing_samples_skipped() {
        let mut buf = FrameBuffer::default();
        buf.append(&frame(0.0, Some([0.0, 0.0, 0.0])));
        buf.append(&frame(0.1, None));
        buf.append(&frame(0.2, Some([100.0, 0.0, 0.0])));
        // No adjacent pair has the hand on both sides
        assert_eq!(buf.velocity(Hand::Right), [0.0; 3]);

        buf.append(&frame(0.3, Some([110.0, 0.0, 0.0])));
        let v = buf.velocity(Hand::Right);
        assert!((v[0] - 100.0).abs() < 1e-3, "Expected 100, got {}", v[0]);
    }

    #[test]
    fn test_non_positive_dt_skipped() {
        let mut buf = FrameBuffer::default();
        buf.append(&frame(1.0, Some([0.0, 0.0, 0.0])));
        buf.append(&frame(1.0, Some([50.0, 0.0, 0.0])));
        buf.append(&frame(0.9, Some([60.0, 0.0, 0.0])));
        assert_eq!(buf.velocity(Hand::Right), [0.0; 3]);
    }

    #[test]
    fn test_hands_are_independent() {
        let mut buf = FrameBuffer::default();
        for i in 0..5 {
            let t = i as f64 * 0.1;
            let f = frame(t, Some([10.0 * i as f32, 0.0, 0.0]))
                .with_hand(HandSample::new(Hand::Left, t, [0.0, 0.0, 0.0]));
            buf.append(&f);
        }
        let mut est = VelocityEstimator::new();
        est.recompute(&buf);
        assert_eq!(est.velocity(Hand::Left), [0.0; 3]);
        assert!((est.velocity(Hand::Right)[0] - 100.0).abs() < 1e-3);

        est.reset();
        assert_eq!(est.velocity(Hand::Right), [0.0; 3]);
    }
}
