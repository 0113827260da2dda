// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traversal scheduling.
//!
//! The [`TraversalScheduler`] guarantees at most one traversal per display
//! frame. Any number of layout or draw requests before the frame fires
//! collapse into one scheduled pass:
//!
//! ```text
//!            schedule()                       begin()
//!   Idle ───────────────────► Scheduled ──────────────────► Idle ─► one traversal
//!     ▲   sync barrier +          │      remove barrier
//!     │   frame callback          │
//!     └───────────────────────────┘
//!            unschedule() (detach): remove callback and barrier
//! ```
//!
//! The sync barrier holds back ordinary work queued on the owning thread so
//! nothing is reordered ahead of the frame. Batched input is consumed at the
//! start of every frame, before the traversal, so a frame never draws with
//! stale input; when no traversal is pending, an input-only frame callback
//! is posted for it instead.

use core::fmt;

use crate::time::HostTime;

/// Which frame-callback queue a callback goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Consume batched input.
    Input,
    /// Run the traversal.
    Traversal,
}

/// Handle to a posted frame callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(pub u64);

impl fmt::Debug for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackToken({})", self.0)
    }
}

/// Handle to a sync barrier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarrierToken(pub u64);

impl fmt::Debug for BarrierToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BarrierToken({})", self.0)
    }
}

/// Delivered when a posted frame callback fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTick {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Frame start time.
    pub now: HostTime,
}

/// Source of frame-aligned one-shot callbacks.
///
/// When a posted callback fires the host calls
/// [`ViewRoot::do_frame`](crate::root::ViewRoot::do_frame).
pub trait FrameClock {
    /// Current host time, used to timestamp diagnostics and timers.
    fn now(&self) -> HostTime;

    /// Posts a one-shot callback for the next frame.
    fn post_frame_callback(&mut self, kind: CallbackKind) -> CallbackToken;

    /// Withdraws a callback that has not fired.
    fn remove_frame_callback(&mut self, token: CallbackToken);
}

/// The owning thread's message queue.
pub trait Looper {
    /// Inserts a barrier that holds back ordinary messages until removed.
    fn post_sync_barrier(&mut self) -> BarrierToken;

    /// Removes a barrier.
    fn remove_sync_barrier(&mut self, token: BarrierToken);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Scheduled {
        callback: CallbackToken,
        barrier: BarrierToken,
    },
}

/// Coalesces traversal requests into one pass per frame.
#[derive(Debug)]
pub struct TraversalScheduler {
    state: State,
    input_callback: Option<CallbackToken>,
}

impl Default for TraversalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TraversalScheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            input_callback: None,
        }
    }

    /// Returns `true` while a traversal is pending.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        matches!(self.state, State::Scheduled { .. })
    }

    /// Schedules a traversal for the next frame. Returns `false` if one
    /// was already pending.
    pub fn schedule(&mut self, clock: &mut dyn FrameClock, looper: &mut dyn Looper) -> bool {
        if self.is_scheduled() {
            return false;
        }
        let barrier = looper.post_sync_barrier();
        let callback = clock.post_frame_callback(CallbackKind::Traversal);
        self.state = State::Scheduled { callback, barrier };
        true
    }

    /// Makes sure batched input is consumed on the next frame.
    ///
    /// A pending traversal already does that; otherwise an input callback
    /// is posted once.
    pub fn schedule_input(&mut self, clock: &mut dyn FrameClock) {
        if self.is_scheduled() || self.input_callback.is_some() {
            return;
        }
        self.input_callback = Some(clock.post_frame_callback(CallbackKind::Input));
    }

    /// Called at the start of a frame. Drops the barrier and returns `true`
    /// if a traversal should run now.
    pub fn begin(&mut self, looper: &mut dyn Looper) -> bool {
        self.input_callback = None;
        match core::mem::replace(&mut self.state, State::Idle) {
            State::Scheduled { barrier, .. } => {
                looper.remove_sync_barrier(barrier);
                true
            }
            State::Idle => false,
        }
    }

    /// Withdraws everything pending. Returns `true` if a traversal was
    /// pending.
    pub fn unschedule(&mut self, clock: &mut dyn FrameClock, looper: &mut dyn Looper) -> bool {
        if let Some(token) = self.input_callback.take() {
            clock.remove_frame_callback(token);
        }
        match core::mem::replace(&mut self.state, State::Idle) {
            State::Scheduled { callback, barrier } => {
                clock.remove_frame_callback(callback);
                looper.remove_sync_barrier(barrier);
                true
            }
            State::Idle => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[derive(Default)]
    struct Fake {
        next: u64,
        callbacks: Vec<(CallbackToken, CallbackKind)>,
        barriers: Vec<BarrierToken>,
    }

    impl FrameClock for Fake {
        fn now(&self) -> HostTime {
            HostTime::ZERO
        }

        fn post_frame_callback(&mut self, kind: CallbackKind) -> CallbackToken {
            self.next += 1;
            let token = CallbackToken(self.next);
            self.callbacks.push((token, kind));
            token
        }

        fn remove_frame_callback(&mut self, token: CallbackToken) {
            self.callbacks.retain(|(t, _)| *t != token);
        }
    }

    impl Looper for Fake {
        fn post_sync_barrier(&mut self) -> BarrierToken {
            self.next += 1;
            let token = BarrierToken(self.next);
            self.barriers.push(token);
            token
        }

        fn remove_sync_barrier(&mut self, token: BarrierToken) {
            self.barriers.retain(|t| *t != token);
        }
    }

    #[test]
    fn repeated_schedule_posts_once() {
        let (mut clock, mut looper) = (Fake::default(), Fake::default());
        let mut s = TraversalScheduler::new();
        assert!(s.schedule(&mut clock, &mut looper));
        for _ in 0..5 {
            assert!(!s.schedule(&mut clock, &mut looper));
        }
        assert_eq!(clock.callbacks.len(), 1);
        assert_eq!(looper.barriers.len(), 1);
    }

    #[test]
    fn begin_removes_barrier_and_goes_idle() {
        let (mut clock, mut looper) = (Fake::default(), Fake::default());
        let mut s = TraversalScheduler::new();
        s.schedule(&mut clock, &mut looper);
        assert!(s.begin(&mut looper));
        assert!(looper.barriers.is_empty());
        assert!(!s.is_scheduled());
        assert!(
            !s.begin(&mut looper),
            "second begin in the same frame runs nothing"
        );
    }

    #[test]
    fn unschedule_withdraws_callback_and_barrier() {
        let (mut clock, mut looper) = (Fake::default(), Fake::default());
        let mut s = TraversalScheduler::new();
        s.schedule(&mut clock, &mut looper);
        assert!(s.unschedule(&mut clock, &mut looper));
        assert!(clock.callbacks.is_empty());
        assert!(looper.barriers.is_empty());
    }

    #[test]
    fn input_callback_only_when_idle() {
        let (mut clock, mut looper) = (Fake::default(), Fake::default());
        let mut s = TraversalScheduler::new();
        s.schedule_input(&mut clock);
        s.schedule_input(&mut clock);
        assert_eq!(clock.callbacks.len(), 1);
        assert_eq!(clock.callbacks[0].1, CallbackKind::Input);

        let mut s = TraversalScheduler::new();
        let mut clock = Fake::default();
        s.schedule(&mut clock, &mut looper);
        s.schedule_input(&mut clock);
        assert_eq!(clock.callbacks.len(), 1);
        assert_eq!(clock.callbacks[0].1, CallbackKind::Traversal);
    }
}
