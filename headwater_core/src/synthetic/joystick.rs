// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Joystick axes to held directional keys.
//!
//! The primary stick and the hat switch each contribute an X and a Y axis.
//! Every axis is a three-state machine with hysteresis:
//!
//! ```text
//!            |v| ≥ enter                 |v| < exit or sign flip
//!   Neutral ───────────────► Positive ─────────────────────────► Neutral
//!           ◄─────────────── Negative
//! ```
//!
//! Entering a direction presses its key and arms a repeat timer for the
//! device; leaving it releases the key. A direction change always releases
//! before it presses, so a key is never pressed twice without a release.

use crate::config::JoystickConfig;
use crate::event::{DeviceId, KeyAction, KeyCode, KeyEvent, KeyFlags, MotionEvent, Source};
use crate::time::HostTime;
use crate::timer::TimerKind;

use super::{SynthOutput, TimerOp};

/// Direction held on one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AxisState {
    /// Left on X, up on Y.
    Negative,
    /// Centered.
    #[default]
    Neutral,
    /// Right on X, down on Y.
    Positive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    StickX,
    StickY,
    HatX,
    HatY,
}

impl Axis {
    const ALL: [Self; 4] = [Self::StickX, Self::StickY, Self::HatX, Self::HatY];

    const fn index(self) -> usize {
        match self {
            Self::StickX => 0,
            Self::StickY => 1,
            Self::HatX => 2,
            Self::HatY => 3,
        }
    }

    const fn key(self, state: AxisState) -> Option<KeyCode> {
        let horizontal = matches!(self, Self::StickX | Self::HatX);
        match (state, horizontal) {
            (AxisState::Neutral, _) => None,
            (AxisState::Negative, true) => Some(KeyCode::DPAD_LEFT),
            (AxisState::Positive, true) => Some(KeyCode::DPAD_RIGHT),
            (AxisState::Negative, false) => Some(KeyCode::DPAD_UP),
            (AxisState::Positive, false) => Some(KeyCode::DPAD_DOWN),
        }
    }
}

/// Translates joystick axes into directional keys.
#[derive(Clone, Debug)]
pub struct JoystickSynthesizer {
    config: JoystickConfig,
    states: [AxisState; 4],
    /// Device and source of the most recent event.
    current: Option<(DeviceId, Source)>,
    /// The most recent press, repeated while held.
    repeating: Option<KeyEvent>,
}

impl JoystickSynthesizer {
    /// Creates a translator with every axis centered.
    #[must_use]
    pub fn new(config: JoystickConfig) -> Self {
        Self {
            config,
            states: [AxisState::Neutral; 4],
            current: None,
            repeating: None,
        }
    }

    /// Current state of the primary stick's X axis.
    #[must_use]
    pub fn stick_x(&self) -> AxisState {
        self.states[Axis::StickX.index()]
    }

    /// Current state of the primary stick's Y axis.
    #[must_use]
    pub fn stick_y(&self) -> AxisState {
        self.states[Axis::StickY.index()]
    }

    fn next_state(&self, current: AxisState, value: f32) -> AxisState {
        let enter = self.config.enter_threshold;
        let exit = self.config.exit_threshold;
        match current {
            AxisState::Neutral if value >= enter => AxisState::Positive,
            AxisState::Neutral if value <= -enter => AxisState::Negative,
            AxisState::Neutral => AxisState::Neutral,
            AxisState::Positive if value <= -enter => AxisState::Negative,
            AxisState::Positive if value < exit => AxisState::Neutral,
            AxisState::Negative if value >= enter => AxisState::Positive,
            AxisState::Negative if value > -exit => AxisState::Neutral,
            held => held,
        }
    }

    /// Processes an unconsumed joystick event.
    pub fn process(&mut self, event: &MotionEvent) -> SynthOutput {
        let mut out = SynthOutput::default();
        if self.current.is_some_and(|(d, _)| d != event.device) {
            out.merge(self.cancel_all(event.event_time));
        }
        self.current = Some((event.device, event.source));

        let axes = &event.axes;
        let values = [axes.x, axes.y, axes.hat_x, axes.hat_y];
        for axis in Axis::ALL {
            self.update_axis(axis, values[axis.index()], event, &mut out);
        }
        out
    }

    fn update_axis(&mut self, axis: Axis, value: f32, event: &MotionEvent, out: &mut SynthOutput) {
        let current = self.states[axis.index()];
        let next = self.next_state(current, value);
        if next == current {
            return;
        }
        self.states[axis.index()] = next;
        let time = event.event_time;
        let timer = TimerKind::JoystickRepeat(event.device);

        if let Some(code) = axis.key(current) {
            let mut up = KeyEvent::new(event.device, event.source, code, KeyAction::Up, time);
            up.meta = event.meta;
            up.flags = KeyFlags::SYNTHESIZED;
            out.keys.push(up);
            if self.repeating.as_ref().is_some_and(|k| k.code == code) {
                self.repeating = None;
                out.timers.push(TimerOp::Cancel(timer));
            }
        }
        if let Some(code) = axis.key(next) {
            let mut down = KeyEvent::new(event.device, event.source, code, KeyAction::Down, time);
            down.meta = event.meta;
            down.flags = KeyFlags::SYNTHESIZED;
            out.keys.push(down.clone());
            out.timers.push(TimerOp::Schedule(timer, time + self.config.repeat_timeout));
            self.repeating = Some(down);
        }
    }

    /// Fires the repeat timer for `device`.
    ///
    /// Repeats are only produced while the window has focus; without focus
    /// the timer lapses.
    pub fn repeat(&mut self, device: DeviceId, now: HostTime, has_focus: bool) -> SynthOutput {
        let mut out = SynthOutput::default();
        let Some(held) = self.repeating.as_mut().filter(|k| k.device == device) else {
            return out;
        };
        if !has_focus {
            return out;
        }
        held.repeat_count += 1;
        held.event_time = now;
        out.keys.push(held.clone());
        out.timers.push(TimerOp::Schedule(
            TimerKind::JoystickRepeat(device),
            now + self.config.repeat_delay,
        ));
        out
    }

    /// Releases every held key and disarms repeats.
    ///
    /// Used on device change, on window focus loss, and when a joystick
    /// event was consumed before reaching the translator.
    pub fn cancel_all(&mut self, now: HostTime) -> SynthOutput {
        let mut out = SynthOutput::default();
        if let Some((device, source)) = self.current {
            if let Some(held) = self.repeating.take() {
                out.timers.push(TimerOp::Cancel(TimerKind::JoystickRepeat(held.device)));
            }
            for axis in Axis::ALL {
                let state = core::mem::take(&mut self.states[axis.index()]);
                if let Some(code) = axis.key(state) {
                    let mut up = KeyEvent::new(device, source, code, KeyAction::Up, now);
                    up.flags = KeyFlags::SYNTHESIZED | KeyFlags::CANCELED;
                    out.keys.push(up);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::event::Axes;
    use alloc::vec::Vec;

    fn synth() -> JoystickSynthesizer {
        JoystickSynthesizer::new(InputConfig::handset().joystick)
    }

    fn stick(device: i32, x: f32, y: f32, ms: u64) -> MotionEvent {
        MotionEvent::axes(
            DeviceId(device),
            Axes {
                x,
                y,
                ..Axes::default()
            },
            HostTime::from_millis(ms),
        )
    }

    fn keys(out: &SynthOutput) -> Vec<(KeyCode, KeyAction)> {
        out.keys.iter().map(|k| (k.code, k.action)).collect()
    }

    #[test]
    fn push_and_return_yields_one_press_and_release() {
        let mut j = synth();
        let mut all = Vec::new();
        let mut timers = Vec::new();
        for (i, x) in [0.0, 0.7, 0.3, 0.0].into_iter().enumerate() {
            let out = j.process(&stick(1, x, 0.0, 10 * i as u64));
            all.extend(keys(&out));
            timers.extend(out.timers);
        }
        assert_eq!(
            all,
            [
                (KeyCode::DPAD_RIGHT, KeyAction::Down),
                (KeyCode::DPAD_RIGHT, KeyAction::Up)
            ]
        );
        let repeat = TimerKind::JoystickRepeat(DeviceId(1));
        assert_eq!(
            timers,
            [
                TimerOp::Schedule(repeat, HostTime::from_millis(10 + 500)),
                TimerOp::Cancel(repeat)
            ]
        );
    }

    #[test]
    fn sign_flip_releases_before_pressing() {
        let mut j = synth();
        j.process(&stick(1, 0.8, 0.0, 0));
        let out = j.process(&stick(1, -0.9, 0.0, 10));
        assert_eq!(
            keys(&out),
            [
                (KeyCode::DPAD_RIGHT, KeyAction::Up),
                (KeyCode::DPAD_LEFT, KeyAction::Down)
            ]
        );
    }

    #[test]
    fn never_two_presses_without_release() {
        let mut j = synth();
        let samples = [0.0, 0.6, 0.9, 0.4, 0.2, 0.55, -0.7, -0.3, 0.1, 0.8, 0.0];
        let mut held = false;
        for (i, x) in samples.into_iter().enumerate() {
            for (_, action) in keys(&j.process(&stick(1, x, 0.0, i as u64))) {
                match action {
                    KeyAction::Down => {
                        assert!(!held, "second DOWN at sample {i}");
                        held = true;
                    }
                    KeyAction::Up => held = false,
                    KeyAction::Multiple => unreachable!("joystick never batches"),
                }
            }
        }
        assert!(!held);
    }

    #[test]
    fn repeat_needs_focus_and_advances_count() {
        let mut j = synth();
        j.process(&stick(1, 0.0, -0.9, 0));

        let lapsed = j.repeat(DeviceId(1), HostTime::from_millis(500), false);
        assert!(lapsed.keys.is_empty() && lapsed.timers.is_empty());

        let out = j.repeat(DeviceId(1), HostTime::from_millis(500), true);
        assert_eq!(out.keys[0].code, KeyCode::DPAD_UP);
        assert_eq!(out.keys[0].repeat_count, 1);
        let repeat = TimerKind::JoystickRepeat(DeviceId(1));
        assert_eq!(
            out.timers,
            [TimerOp::Schedule(repeat, HostTime::from_millis(550))]
        );
        let out = j.repeat(DeviceId(1), HostTime::from_millis(550), true);
        assert_eq!(out.keys[0].repeat_count, 2);
    }

    #[test]
    fn device_change_releases_held_keys() {
        let mut j = synth();
        j.process(&stick(1, 0.9, 0.9, 0));
        let out = j.process(&stick(2, 0.0, 0.0, 10));
        let released: Vec<_> = out
            .keys
            .iter()
            .map(|k| (k.device, k.code, k.action))
            .collect();
        assert_eq!(
            released,
            [
                (DeviceId(1), KeyCode::DPAD_RIGHT, KeyAction::Up),
                (DeviceId(1), KeyCode::DPAD_DOWN, KeyAction::Up)
            ]
        );
        let cancel = TimerOp::Cancel(TimerKind::JoystickRepeat(DeviceId(1)));
        assert!(out.timers.contains(&cancel));
        assert_eq!(j.stick_x(), AxisState::Neutral);
    }

    #[test]
    fn canceled_releases_keep_the_pressing_source() {
        let mut j = synth();
        let mut e = stick(1, 0.9, 0.0, 0);
        e.source = Source::Gamepad;
        let down = j.process(&e);
        assert_eq!(down.keys[0].source, Source::Gamepad);

        let out = j.cancel_all(HostTime::from_millis(20));
        assert_eq!(out.keys.len(), 1);
        let up = &out.keys[0];
        assert_eq!(
            (up.code, up.action, up.source),
            (KeyCode::DPAD_RIGHT, KeyAction::Up, Source::Gamepad)
        );
        assert!(up.flags.contains(KeyFlags::CANCELED));
    }

    #[test]
    fn hat_axes_are_independent() {
        let mut j = synth();
        let mut e = stick(1, 0.0, 0.0, 0);
        e.axes.hat_x = -1.0;
        let out = j.process(&e);
        assert_eq!(keys(&out), [(KeyCode::DPAD_LEFT, KeyAction::Down)]);
        assert_eq!(j.stick_x(), AxisState::Neutral);
    }
}
