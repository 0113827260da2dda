// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synthetic key generation for input nothing else consumed.
//!
//! Each translator is a plain state machine: it is fed events (and timer
//! firings) and answers with a [`SynthOutput`] describing the keys to
//! enqueue and the timers to arm or disarm. The root applies the output;
//! translators never touch the queue or the clock themselves.
//!
//! - [`trackball`] turns relative trackball motion into directional keys.
//! - [`joystick`] turns stick and hat axes into held directional keys.
//! - [`touch_nav`] turns touch-pad swipes into directional keys with fling.
//! - [`keyboard`] substitutes fallback keys for unconsumed presses.

pub mod joystick;
pub mod keyboard;
pub mod touch_nav;
pub mod trackball;
pub mod velocity;

use alloc::vec::Vec;

use crate::event::KeyEvent;
use crate::time::HostTime;
use crate::timer::TimerKind;

/// A timer change requested by a translator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerOp {
    /// Arm (or re-arm) a timer.
    Schedule(TimerKind, HostTime),
    /// Disarm a timer.
    Cancel(TimerKind),
}

/// What a translator produced for one input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SynthOutput {
    /// Keys to enqueue, in order.
    pub keys: Vec<KeyEvent>,
    /// Timer changes, in order.
    pub timers: Vec<TimerOp>,
    /// A discrete press was implied; leave touch mode.
    pub leave_touch_mode: bool,
}

impl SynthOutput {
    /// Returns `true` if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.timers.is_empty() && !self.leave_touch_mode
    }

    /// Appends another output.
    pub fn merge(&mut self, other: Self) {
        self.keys.extend(other.keys);
        self.timers.extend(other.timers);
        self.leave_touch_mode |= other.leave_touch_mode;
    }
}
