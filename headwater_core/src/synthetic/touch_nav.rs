// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch-navigation pad swipes to directional keys, with fling.
//!
//! Movement accumulates per axis and is paid out in ticks of a fixed
//! physical distance (12 mm by default). Each tick presses the direction's
//! key, or repeats it if it is already held. When the finger lifts fast
//! enough along the held direction, ticks keep coming on a timer with
//! decaying velocity:
//!
//! ```text
//!   lift, v ≥ min ──► tick after (tick / v) s ──► v *= 0.8 ──► v ≥ min? ──┐
//!                                    ▲                                     │
//!                                    └───────────────── yes ◄──────────────┘
//!                                                       no ──► release key
//! ```

use core::time::Duration;

use crate::config::TouchNavigationConfig;
use crate::device::InputDeviceInfo;
use crate::event::{
    DeviceId, KeyAction, KeyCode, KeyEvent, KeyFlags, MetaState, MotionAction, MotionEvent, Source,
};
use crate::time::HostTime;
use crate::timer::TimerKind;

use super::velocity::VelocityTracker;
use super::{SynthOutput, TimerOp};

/// Per-device tick geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Geometry {
    tick_distance: f64,
    min_fling_velocity: f64,
    max_fling_velocity: f64,
}

#[derive(Clone, Copy, Debug)]
struct PendingKey {
    code: KeyCode,
    down_time: HostTime,
    repeat_count: u32,
    meta: MetaState,
}

/// Translates touch-navigation events into directional keys.
#[derive(Clone, Debug)]
pub struct TouchNavigationSynthesizer {
    config: TouchNavigationConfig,
    current: Option<(DeviceId, Source)>,
    geometry: Option<Geometry>,

    active_pointer: Option<u32>,
    velocity: VelocityTracker,
    last: (f64, f64),
    accumulated: (f64, f64),
    consumed_movement: bool,

    pending: Option<PendingKey>,
    fling_velocity: f64,
    flinging: bool,
}

impl TouchNavigationSynthesizer {
    /// Creates an idle translator.
    #[must_use]
    pub fn new(config: TouchNavigationConfig) -> Self {
        Self {
            velocity: VelocityTracker::new(config.velocity_horizon),
            config,
            current: None,
            geometry: None,
            active_pointer: None,
            last: (0.0, 0.0),
            accumulated: (0.0, 0.0),
            consumed_movement: false,
            pending: None,
            fling_velocity: 0.0,
            flinging: false,
        }
    }

    /// Returns `true` while a fling is producing ticks.
    #[must_use]
    pub fn is_flinging(&self) -> bool {
        self.flinging
    }

    /// Distance of one tick for the current device, in device units.
    #[must_use]
    pub fn tick_distance(&self) -> Option<f64> {
        self.geometry.map(|g| g.tick_distance)
    }

    fn geometry_for(&self, device: Option<&InputDeviceInfo>) -> Option<Geometry> {
        let device = device?;
        let (x, y) = (device.x?, device.y?);
        let pad = self.config.default_pad_width_mm;
        let resolution = |r: crate::device::MotionRange| {
            if r.resolution > 0.0 {
                r.resolution
            } else {
                r.extent() / pad
            }
        };
        let nominal = f64::from((resolution(x) + resolution(y)) * 0.5);
        let tick_distance = f64::from(self.config.tick_distance_mm) * nominal;
        // Empty or inverted ranges cannot pay out ticks.
        if !tick_distance.is_finite() || tick_distance <= 0.0 {
            return None;
        }
        Some(Geometry {
            tick_distance,
            min_fling_velocity: f64::from(self.config.min_fling_ticks_per_second) * tick_distance,
            max_fling_velocity: f64::from(self.config.max_fling_ticks_per_second) * tick_distance,
        })
    }

    /// Processes an unconsumed touch-navigation event.
    pub fn process(
        &mut self,
        event: &MotionEvent,
        device: Option<&InputDeviceInfo>,
    ) -> SynthOutput {
        let mut out = SynthOutput::default();
        let time = event.event_time;

        if self.current != Some((event.device, event.source)) {
            self.finish_keys(time, &mut out);
            self.finish_tracking();
            self.current = Some((event.device, event.source));
            self.geometry = self.geometry_for(device);
        }
        let Some(geometry) = self.geometry else {
            return out;
        };

        match event.action {
            MotionAction::Down => {
                let caught_fling = self.flinging;
                self.finish_keys(time, &mut out);
                self.finish_tracking();
                let Some(pointer) = event.pointer_id() else {
                    return out;
                };
                self.active_pointer = Some(pointer);
                self.velocity.add_movement(event, pointer);
                let p = event.position();
                self.last = (p.x, p.y);
                self.accumulated = (0.0, 0.0);
                // Catching a fling counts as having moved a tick already.
                self.consumed_movement = caught_fling;
            }
            MotionAction::Move | MotionAction::Up => {
                let Some(pointer) = self.active_pointer else {
                    return out;
                };
                let Some(p) = event.pointers.iter().find(|p| p.id == pointer) else {
                    self.finish_keys(time, &mut out);
                    self.finish_tracking();
                    return out;
                };
                self.velocity.add_movement(event, pointer);
                let (x, y) = (p.position.x, p.position.y);
                self.accumulated.0 += x - self.last.0;
                self.accumulated.1 += y - self.last.1;
                self.last = (x, y);
                self.consume_accumulated(time, event.meta, geometry, &mut out);

                if event.action == MotionAction::Up {
                    if self.consumed_movement && self.pending.is_some() {
                        let v = self.velocity.velocity(geometry.max_fling_velocity);
                        if !self.start_fling(time, v.x, v.y, geometry, &mut out) {
                            self.finish_keys(time, &mut out);
                        }
                    }
                    self.finish_tracking();
                }
            }
            MotionAction::Cancel => {
                self.finish_keys(time, &mut out);
                self.finish_tracking();
            }
            _ => {}
        }
        out
    }

    /// Flushes the held key when the current device's event was consumed
    /// elsewhere.
    pub fn cancel(&mut self, event: &MotionEvent) -> SynthOutput {
        let mut out = SynthOutput::default();
        if self.current == Some((event.device, event.source)) {
            self.finish_keys(event.event_time, &mut out);
            self.finish_tracking();
        }
        out
    }

    /// Fires the fling timer.
    pub fn fling_tick(&mut self, now: HostTime) -> SynthOutput {
        let mut out = SynthOutput::default();
        let (Some(geometry), Some(pending)) = (self.geometry, self.pending) else {
            self.flinging = false;
            return out;
        };
        if !self.flinging {
            return out;
        }
        self.send_key_down_or_repeat(now, pending.code, pending.meta, &mut out);
        self.fling_velocity *= f64::from(self.config.fling_decay);
        if !self.post_fling(now, geometry, &mut out) {
            self.flinging = false;
            self.finish_keys(now, &mut out);
        }
        out
    }

    fn consume_accumulated(
        &mut self,
        time: HostTime,
        meta: MetaState,
        g: Geometry,
        out: &mut SynthOutput,
    ) {
        let (ax, ay) = (self.accumulated.0.abs(), self.accumulated.1.abs());
        if ax >= ay {
            if ax >= g.tick_distance {
                self.accumulated.0 = self.consume_axis(
                    time,
                    meta,
                    self.accumulated.0,
                    KeyCode::DPAD_LEFT,
                    KeyCode::DPAD_RIGHT,
                    g,
                    out,
                );
                self.accumulated.1 = 0.0;
                self.consumed_movement = true;
            }
        } else if ay >= g.tick_distance {
            self.accumulated.1 = self.consume_axis(
                time,
                meta,
                self.accumulated.1,
                KeyCode::DPAD_UP,
                KeyCode::DPAD_DOWN,
                g,
                out,
            );
            self.accumulated.0 = 0.0;
            self.consumed_movement = true;
        }
    }

    fn consume_axis(
        &mut self,
        time: HostTime,
        meta: MetaState,
        mut accumulator: f64,
        negative: KeyCode,
        positive: KeyCode,
        g: Geometry,
        out: &mut SynthOutput,
    ) -> f64 {
        while accumulator <= -g.tick_distance {
            self.send_key_down_or_repeat(time, negative, meta, out);
            accumulator += g.tick_distance;
        }
        while accumulator >= g.tick_distance {
            self.send_key_down_or_repeat(time, positive, meta, out);
            accumulator -= g.tick_distance;
        }
        accumulator
    }

    fn send_key_down_or_repeat(
        &mut self,
        time: HostTime,
        code: KeyCode,
        meta: MetaState,
        out: &mut SynthOutput,
    ) {
        match &mut self.pending {
            Some(p) if p.code == code => p.repeat_count += 1,
            _ => {
                self.send_key_up(time, out);
                self.pending = Some(PendingKey {
                    code,
                    down_time: time,
                    repeat_count: 0,
                    meta,
                });
            }
        }
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        pending.meta = meta;
        let key = self.key(KeyAction::Down, time, *pending);
        out.keys.push(key);
    }

    fn send_key_up(&mut self, time: HostTime, out: &mut SynthOutput) {
        if let Some(pending) = self.pending.take() {
            let mut up = self.key(KeyAction::Up, time, pending);
            up.repeat_count = 0;
            out.keys.push(up);
        }
    }

    fn key(&self, action: KeyAction, time: HostTime, pending: PendingKey) -> KeyEvent {
        let (device, source) = self.current.unwrap_or((DeviceId(0), Source::TouchNavigation));
        let mut key = KeyEvent::new(device, source, pending.code, action, time);
        key.down_time = pending.down_time;
        key.repeat_count = pending.repeat_count;
        key.meta = pending.meta;
        key.flags = KeyFlags::SYNTHESIZED;
        key
    }

    fn start_fling(
        &mut self,
        time: HostTime,
        vx: f64,
        vy: f64,
        g: Geometry,
        out: &mut SynthOutput,
    ) -> bool {
        let min = g.min_fling_velocity;
        let Some(pending) = self.pending else {
            return false;
        };
        let along = match pending.code {
            KeyCode::DPAD_LEFT if -vx >= min && vy.abs() < min => -vx,
            KeyCode::DPAD_RIGHT if vx >= min && vy.abs() < min => vx,
            KeyCode::DPAD_UP if -vy >= min && vx.abs() < min => -vy,
            KeyCode::DPAD_DOWN if vy >= min && vx.abs() < min => vy,
            _ => return false,
        };
        self.fling_velocity = along;
        self.flinging = self.post_fling(time, g, out);
        self.flinging
    }

    /// Arms the next fling tick at the time the finger would have covered
    /// one more tick at the current velocity.
    fn post_fling(&self, time: HostTime, g: Geometry, out: &mut SynthOutput) -> bool {
        if self.fling_velocity < g.min_fling_velocity {
            return false;
        }
        let delay = Duration::from_secs_f64(g.tick_distance / self.fling_velocity);
        let next = TimerOp::Schedule(TimerKind::TouchNavigationFling, time + delay);
        out.timers.push(next);
        true
    }

    fn cancel_fling(&mut self, out: &mut SynthOutput) {
        if self.flinging {
            out.timers.push(TimerOp::Cancel(TimerKind::TouchNavigationFling));
            self.flinging = false;
        }
    }

    fn finish_keys(&mut self, time: HostTime, out: &mut SynthOutput) {
        self.cancel_fling(out);
        self.send_key_up(time, out);
    }

    fn finish_tracking(&mut self) {
        self.active_pointer = None;
        self.velocity.clear();
    }
}
