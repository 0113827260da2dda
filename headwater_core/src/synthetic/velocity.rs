// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer velocity estimation.

use alloc::collections::VecDeque;
use core::time::Duration;

use kurbo::{Point, Vec2};

use crate::event::MotionEvent;
use crate::time::HostTime;

const MAX_SAMPLES: usize = 20;

/// Least-squares linear fit of recent pointer positions.
#[derive(Clone, Debug)]
pub struct VelocityTracker {
    horizon: Duration,
    samples: VecDeque<(HostTime, Point)>,
}

impl VelocityTracker {
    /// Creates a tracker that ignores samples older than `horizon`.
    #[must_use]
    pub fn new(horizon: Duration) -> Self {
        Self {
            horizon,
            samples: VecDeque::with_capacity(MAX_SAMPLES),
        }
    }

    /// Forgets every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Adds one position sample.
    pub fn add(&mut self, time: HostTime, position: Point) {
        if self.samples.len() == MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((time, position));
    }

    /// Adds the coalesced history and the current sample of `pointer`.
    pub fn add_movement(&mut self, event: &MotionEvent, pointer: u32) {
        for sample in &event.history {
            if let Some(p) = sample.pointers.iter().find(|p| p.id == pointer) {
                self.add(sample.time, p.position);
            }
        }
        if let Some(p) = event.pointers.iter().find(|p| p.id == pointer) {
            self.add(event.event_time, p.position);
        }
    }

    /// Estimated velocity in units per second, each axis clamped to
    /// `±max`.
    #[must_use]
    pub fn velocity(&self, max: f64) -> Vec2 {
        let Some(&(newest, _)) = self.samples.back() else {
            return Vec2::ZERO;
        };
        let horizon = self.horizon;
        let window = self
            .samples
            .iter()
            .filter(|(t, _)| newest.saturating_duration_since(*t) <= horizon);

        // Times in seconds before the newest sample (non-positive).
        let mut n = 0.0;
        let (mut st, mut sx, mut sy, mut stt, mut stx, mut sty) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        for &(time, p) in window {
            let t = -newest.saturating_duration_since(time).as_secs_f64();
            n += 1.0;
            st += t;
            sx += p.x;
            sy += p.y;
            stt += t * t;
            stx += t * p.x;
            sty += t * p.y;
        }
        let denom = n * stt - st * st;
        if n < 2.0 || denom.abs() < f64::EPSILON {
            return Vec2::ZERO;
        }
        let vx = (n * stx - st * sx) / denom;
        let vy = (n * sty - st * sy) / denom;
        Vec2::new(vx.clamp(-max, max), vy.clamp(-max, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> VelocityTracker {
        VelocityTracker::new(Duration::from_millis(100))
    }

    #[test]
    fn constant_motion_has_constant_velocity() {
        let mut v = tracker();
        for i in 0..5 {
            // 2 units per ms = 2000 units per second.
            let x = 20.0 * i as f64;
            v.add(HostTime::from_millis(10 * i), Point::new(x, 0.0));
        }
        let vel = v.velocity(1e9);
        assert!((vel.x - 2000.0).abs() < 1e-6, "got {}", vel.x);
        assert!(vel.y.abs() < 1e-9);
    }

    #[test]
    fn velocity_is_clamped() {
        let mut v = tracker();
        v.add(HostTime::from_millis(0), Point::ZERO);
        v.add(HostTime::from_millis(10), Point::new(0.0, -100.0));
        assert_eq!(v.velocity(500.0), Vec2::new(0.0, -500.0));
    }

    #[test]
    fn old_samples_are_ignored() {
        let mut v = tracker();
        v.add(HostTime::from_millis(0), Point::new(1000.0, 0.0));
        v.add(HostTime::from_millis(500), Point::ZERO);
        v.add(HostTime::from_millis(510), Point::new(10.0, 0.0));
        let vel = v.velocity(1e9);
        assert!((vel.x - 1000.0).abs() < 1e-6, "got {}", vel.x);
    }

    #[test]
    fn single_sample_is_still() {
        let mut v = tracker();
        v.add(HostTime::ZERO, Point::new(3.0, 4.0));
        assert_eq!(v.velocity(100.0), Vec2::ZERO);
    }
}
