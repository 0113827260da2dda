// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trackball motion to directional keys.
//!
//! Each axis accumulates relative movement and converts it to discrete key
//! presses in three steps:
//!
//! ```text
//!   step 0 ── |pos| ≥ first (0.5) ──► 1 key ──► step 1
//!   step 1 ── |pos| ≥ second (2.0) ─► 1 key, consume 2.0 ──► step 2
//!   step 2 ── |pos| ≥ steady (1.0) ─► 1 key, consume 1.0, accel × 1.1
//! ```
//!
//! Rolling quickly raises an acceleration multiplier that turns one unit of
//! movement into several keys. Reversing direction resets the axis.

use crate::config::TrackballConfig;
use crate::event::{KeyAction, KeyCode, KeyEvent, KeyFlags, MotionAction, MotionEvent, Source};
use crate::time::{HostTime, as_millis_f32};

use super::SynthOutput;

/// Movement state of one trackball axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackballAxis {
    /// Accumulated, not yet consumed movement.
    pub position: f32,
    /// Current acceleration multiplier, at least 1.
    pub acceleration: f32,
    /// Threshold step: 0 first, 1 second, 2 steady.
    pub step: u8,
    last_move_time: Option<HostTime>,
    dir: i8,
}

impl Default for TrackballAxis {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackballAxis {
    /// A resting axis at step 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: 0.0,
            acceleration: 1.0,
            step: 0,
            last_move_time: None,
            dir: 0,
        }
    }

    /// Clears movement and acceleration and sets the threshold step.
    pub fn reset(&mut self, step: u8) {
        *self = Self::new();
        self.step = step;
    }

    /// Adds a movement sample and returns the accumulated distance.
    pub fn collect(&mut self, offset: f32, time: HostTime, config: &TrackballConfig) -> f32 {
        let dir = if offset > 0.0 {
            1
        } else if offset < 0.0 {
            -1
        } else {
            0
        };
        if dir != 0 {
            if self.dir == -dir {
                self.position = 0.0;
                self.step = 0;
                self.acceleration = 1.0;
                self.last_move_time = None;
            }
            self.dir = dir;

            let nominal = offset.abs() * as_millis_f32(config.fast_move_time);
            if let Some(last) = self.last_move_time {
                let delta = as_millis_f32(time - last);
                if delta < nominal {
                    let scale = (nominal - delta) / config.acceleration_scale_ms;
                    if scale > 1.0 {
                        self.acceleration =
                            (self.acceleration * scale).min(config.max_acceleration);
                    }
                } else {
                    let scale = (delta - nominal) / config.acceleration_scale_ms;
                    if scale > 1.0 {
                        self.acceleration = (self.acceleration / scale).max(1.0);
                    }
                }
            }
            self.last_move_time = Some(time);
        }
        self.position += offset;
        self.position.abs()
    }

    /// Consumes accumulated movement into signed key units.
    pub fn generate(&mut self, config: &TrackballConfig) -> i32 {
        let mut movement = 0;
        loop {
            let dir: i32 = if self.position >= 0.0 { 1 } else { -1 };
            let dir_f = if dir > 0 { 1.0 } else { -1.0 };
            let distance = self.position.abs();
            match self.step {
                0 => {
                    if distance < config.first_threshold {
                        return movement;
                    }
                    movement += dir;
                    self.step = 1;
                }
                1 => {
                    if distance < config.second_threshold {
                        return movement;
                    }
                    movement += dir;
                    self.position -= config.second_threshold * dir_f;
                    self.step = 2;
                }
                _ => {
                    if distance < config.steady_threshold {
                        return movement;
                    }
                    movement += dir;
                    self.position -= config.steady_threshold * dir_f;
                    let grown = self.acceleration * config.steady_growth;
                    if grown < config.max_acceleration {
                        self.acceleration = grown;
                    }
                }
            }
        }
    }
}

/// Translates trackball events into directional keys.
#[derive(Clone, Debug)]
pub struct TrackballSynthesizer {
    config: TrackballConfig,
    x: TrackballAxis,
    y: TrackballAxis,
    last_time: Option<HostTime>,
}

impl TrackballSynthesizer {
    /// Creates a translator.
    #[must_use]
    pub fn new(config: TrackballConfig) -> Self {
        Self {
            config,
            x: TrackballAxis::new(),
            y: TrackballAxis::new(),
            last_time: None,
        }
    }

    /// Horizontal axis state.
    #[must_use]
    pub fn x(&self) -> &TrackballAxis {
        &self.x
    }

    /// Vertical axis state.
    #[must_use]
    pub fn y(&self) -> &TrackballAxis {
        &self.y
    }

    /// Processes an unconsumed trackball event.
    pub fn process(&mut self, event: &MotionEvent) -> SynthOutput {
        let time = event.event_time;
        let mut out = SynthOutput::default();

        let stale = match self.last_time {
            None => true,
            Some(last) => last + self.config.inactivity_reset < time,
        };
        if stale {
            self.x.reset(0);
            self.y.reset(0);
            self.last_time = Some(time);
        }

        let key = |action, code, repeat_count| {
            let mut k = KeyEvent::new(event.device, Source::Keyboard, code, action, time);
            k.meta = event.meta;
            k.repeat_count = repeat_count;
            k.flags = KeyFlags::SYNTHESIZED;
            k
        };

        match event.action {
            MotionAction::Down => {
                self.x.reset(2);
                self.y.reset(2);
                out.keys.push(key(KeyAction::Down, KeyCode::DPAD_CENTER, 0));
            }
            MotionAction::Up => {
                self.x.reset(2);
                self.y.reset(2);
                out.keys.push(key(KeyAction::Up, KeyCode::DPAD_CENTER, 0));
            }
            _ => {}
        }

        let position = event.position();
        #[expect(clippy::cast_possible_truncation, reason = "trackball deltas are small")]
        let (dx, dy) = (position.x as f32, position.y as f32);
        let x_off = self.x.collect(dx, time, &self.config);
        let y_off = self.y.collect(dy, time, &self.config);

        let mut code = None;
        let mut movement = 0;
        let mut accel = 1.0;
        if x_off > y_off {
            movement = self.x.generate(&self.config);
            if movement != 0 {
                code = Some(if movement > 0 {
                    KeyCode::DPAD_RIGHT
                } else {
                    KeyCode::DPAD_LEFT
                });
                accel = self.x.acceleration;
                self.y.reset(2);
            }
        } else if y_off > 0.0 {
            movement = self.y.generate(&self.config);
            if movement != 0 {
                code = Some(if movement > 0 {
                    KeyCode::DPAD_DOWN
                } else {
                    KeyCode::DPAD_UP
                });
                accel = self.y.acceleration;
                self.x.reset(2);
            }
        }

        if let Some(code) = code {
            let mut movement = movement.unsigned_abs();
            #[expect(clippy::cast_possible_truncation, reason = "acceleration is bounded")]
            let accel_movement = (movement as f32 * accel) as u32;
            if accel_movement > movement {
                movement -= 1;
                out.keys.push(key(KeyAction::Multiple, code, accel_movement - movement));
            }
            for _ in 0..movement {
                out.keys.push(key(KeyAction::Down, code, 0));
                out.keys.push(key(KeyAction::Up, code, 0));
            }
            self.last_time = Some(time);
        }
        out
    }

    /// Forgets timing after the trackball's event was consumed elsewhere.
    ///
    /// A consumed trackball event implied a discrete press, so the window
    /// leaves touch mode.
    pub fn cancel(&mut self) -> SynthOutput {
        self.last_time = None;
        SynthOutput {
            leave_touch_mode: true,
            ..SynthOutput::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::event::DeviceId;
    use alloc::vec::Vec;
    use kurbo::Point;

    fn config() -> TrackballConfig {
        InputConfig::handset().trackball
    }

    fn roll(dx: f64, dy: f64, ms: u64) -> MotionEvent {
        MotionEvent::new(
            DeviceId(4),
            Source::Trackball,
            MotionAction::Move,
            Point::new(dx, dy),
            HostTime::from_millis(ms),
        )
    }

    fn summary(out: &SynthOutput) -> Vec<(KeyCode, KeyAction, u32)> {
        out.keys
            .iter()
            .map(|k| (k.code, k.action, k.repeat_count))
            .collect()
    }

    #[test]
    fn two_small_rolls_yield_one_press() {
        let mut t = TrackballSynthesizer::new(config());
        let first = t.process(&roll(0.6, 0.0, 0));
        assert_eq!(
            summary(&first),
            [
                (KeyCode::DPAD_RIGHT, KeyAction::Down, 0),
                (KeyCode::DPAD_RIGHT, KeyAction::Up, 0)
            ]
        );
        assert_eq!(t.x().step, 1);

        let second = t.process(&roll(0.6, 0.0, 50));
        assert!(
            second.keys.is_empty(),
            "1.2 has not crossed the 2.0 threshold"
        );
        assert!((t.x().position - 1.2).abs() < 1e-6);
    }

    #[test]
    fn reversal_resets_position() {
        let cfg = config();
        let mut axis = TrackballAxis::new();
        axis.collect(0.4, HostTime::from_millis(0), &cfg);
        axis.collect(0.3, HostTime::from_millis(10), &cfg);
        axis.collect(-0.2, HostTime::from_millis(20), &cfg);
        assert!(
            (axis.position + 0.2).abs() < 1e-6,
            "only the new sample remains"
        );
        assert_eq!(axis.step, 0);
        assert!((axis.acceleration - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn fast_rolling_accelerates() {
        let cfg = config();
        let mut axis = TrackballAxis::new();
        axis.collect(1.0, HostTime::from_millis(0), &cfg);
        // Nominal 150 ms, observed 10 ms: scale (140 / 40) = 3.5.
        axis.collect(1.0, HostTime::from_millis(10), &cfg);
        assert!((axis.acceleration - 3.5).abs() < 1e-4);

        for i in 2..20 {
            axis.collect(1.0, HostTime::from_millis(10 * i), &cfg);
        }
        assert!(axis.acceleration <= cfg.max_acceleration);
    }

    #[test]
    fn slow_rolling_decays_to_one() {
        let cfg = config();
        let mut axis = TrackballAxis::new();
        axis.acceleration = 4.0;
        axis.collect(0.1, HostTime::from_millis(0), &cfg);
        axis.collect(0.1, HostTime::from_millis(1000), &cfg);
        assert!((axis.acceleration - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn accelerated_movement_batches_into_multiple() {
        let cfg = config();
        let mut t = TrackballSynthesizer::new(cfg);
        t.x.reset(2);
        t.last_time = Some(HostTime::from_millis(100));
        t.x.last_move_time = Some(HostTime::from_millis(0));
        t.x.dir = 1;
        t.x.acceleration = 3.0;
        // 2.0 at the nominal cadence leaves acceleration alone; two steady
        // units grow it to 3.63, so 2 × 3.63 → 7 units.
        let out = t.process(&roll(2.0, 0.0, 300));
        let keys = summary(&out);
        assert_eq!(keys[0].0, KeyCode::DPAD_RIGHT);
        assert_eq!(keys[0].1, KeyAction::Multiple);
        let pairs = keys.iter().filter(|k| k.1 == KeyAction::Down).count();
        assert_eq!(pairs, 1);
        assert_eq!(usize::try_from(keys[0].2).unwrap() + pairs, 7);
    }

    #[test]
    fn dominant_axis_wins_and_resets_the_other() {
        let mut t = TrackballSynthesizer::new(config());
        let out = t.process(&roll(0.2, 0.7, 0));
        assert_eq!(out.keys[0].code, KeyCode::DPAD_DOWN);
        assert_eq!(t.x().step, 2);
        assert!(t.x().position.abs() < f32::EPSILON);
    }

    #[test]
    fn press_and_release_map_to_center() {
        let mut t = TrackballSynthesizer::new(config());
        let mut down = roll(0.0, 0.0, 0);
        down.action = MotionAction::Down;
        let out = t.process(&down);
        assert_eq!(summary(&out), [(KeyCode::DPAD_CENTER, KeyAction::Down, 0)]);
        assert_eq!(t.x().step, 2);
    }

    #[test]
    fn inactivity_resets_both_axes() {
        let mut t = TrackballSynthesizer::new(config());
        t.process(&roll(0.6, 0.0, 0));
        assert_eq!(t.x().step, 1);
        t.process(&roll(0.1, 0.0, 400));
        assert_eq!(t.x().step, 0);
        assert!((t.x().position - 0.1).abs() < 1e-6);
    }

    #[test]
    fn cancel_leaves_touch_mode() {
        let mut t = TrackballSynthesizer::new(config());
        t.process(&roll(0.6, 0.0, 0));
        assert!(t.cancel().leave_touch_mode);
        assert!(t.last_time.is_none());
    }
}
