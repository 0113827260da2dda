// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot timers for synthetic input.
//!
//! Joystick key repeats and touch-navigation fling ticks run on timers the
//! root owns. The host drives them by calling
//! [`ViewRoot::pump`](crate::root::ViewRoot::pump) at or after
//! [`ViewRoot::next_deadline`](crate::root::ViewRoot::next_deadline).
//!
//! Each [`TimerKind`] has at most one live timer: scheduling a kind that is
//! already pending moves its deadline.

use alloc::vec::Vec;

use crate::event::DeviceId;
use crate::time::HostTime;

/// What a timer does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Repeat the joystick key held for this device.
    JoystickRepeat(DeviceId),
    /// Emit the next touch-navigation fling tick.
    TouchNavigationFling,
}

/// Pending timers, ordered by deadline on demand.
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    timers: Vec<(HostTime, TimerKind)>,
}

impl TimerQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind` to fire at `deadline`, replacing any pending timer of the
    /// same kind.
    pub fn schedule(&mut self, kind: TimerKind, deadline: HostTime) {
        self.cancel(kind);
        self.timers.push((deadline, kind));
    }

    /// Disarms `kind`. Returns `true` if it was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.timers.len();
        self.timers.retain(|&(_, k)| k != kind);
        self.timers.len() != before
    }

    /// Returns `true` if `kind` is pending.
    #[must_use]
    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|&(_, k)| k == kind)
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        self.timers.iter().map(|&(t, _)| t).min()
    }

    /// Removes and returns the earliest timer due at `now`.
    ///
    /// Callers loop until `None` so timers armed while handling one fire in
    /// deadline order.
    pub fn pop_due(&mut self, now: HostTime) -> Option<(HostTime, TimerKind)> {
        let (index, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, (t, _))| *t <= now)
            .min_by_key(|(_, (t, _))| *t)?;
        Some(self.timers.swap_remove(index))
    }

    /// Disarms everything.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPEAT: TimerKind = TimerKind::JoystickRepeat(DeviceId(1));

    #[test]
    fn schedule_replaces_same_kind() {
        let mut q = TimerQueue::new();
        q.schedule(REPEAT, HostTime::from_millis(500));
        q.schedule(REPEAT, HostTime::from_millis(50));
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(HostTime::from_millis(50)));
    }

    #[test]
    fn pop_due_in_deadline_order() {
        let mut q = TimerQueue::new();
        let fling = TimerKind::TouchNavigationFling;
        q.schedule(fling, HostTime::from_millis(30));
        q.schedule(REPEAT, HostTime::from_millis(10));
        let other = TimerKind::JoystickRepeat(DeviceId(2));
        q.schedule(other, HostTime::from_millis(90));

        let now = HostTime::from_millis(40);
        assert_eq!(q.pop_due(now).map(|(_, k)| k), Some(REPEAT));
        assert_eq!(q.pop_due(now).map(|(_, k)| k), Some(fling));
        assert_eq!(q.pop_due(now), None);
        assert_eq!(q.next_deadline(), Some(HostTime::from_millis(90)));
    }

    #[test]
    fn cancel_reports_whether_pending() {
        let mut q = TimerQueue::new();
        assert!(!q.cancel(REPEAT));
        q.schedule(REPEAT, HostTime::ZERO);
        assert!(q.is_scheduled(REPEAT));
        assert!(q.cancel(REPEAT));
        assert!(q.is_empty());
    }
}
