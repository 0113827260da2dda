// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batched pointer motion.
//!
//! High-rate pointer moves are not delivered one by one. The input source
//! hands them to [`MotionBatcher`], which folds consecutive moves from the
//! same device and source into a single event whose older samples become
//! history. The root consumes the batch on the next input frame callback,
//! and always before a traversal so a frame never draws with stale input.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::event::{InputEvent, MotionAction, MotionEvent, MotionSample};
use crate::record::Completion;

/// A coalesced motion event and the completions of every event folded in.
pub struct Batch {
    /// The coalesced event.
    pub event: MotionEvent,
    /// Folded events that carry a completion, oldest first.
    pub completions: Vec<(MotionEvent, Completion)>,
}

impl core::fmt::Debug for Batch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Batch")
            .field("event", &self.event)
            .field("completions", &self.completions.len())
            .finish()
    }
}

impl Batch {
    /// Merges the folded completions into one.
    ///
    /// Every folded event's source hears the outcome of the batch, reported
    /// against the event it enqueued.
    #[must_use]
    pub fn into_parts(self) -> (MotionEvent, Option<Completion>) {
        let Self { event, completions } = self;
        if completions.is_empty() {
            return (event, None);
        }
        let merged: Completion = Box::new(move |_: &InputEvent, handled: bool| {
            for (original, completion) in completions {
                completion(&InputEvent::Motion(original), handled);
            }
        });
        (event, Some(merged))
    }
}

/// Coalesces consecutive pointer moves.
#[derive(Debug, Default)]
pub struct MotionBatcher {
    pending: Vec<Batch>,
}

impl MotionBatcher {
    /// Creates an empty batcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a motion event.
    ///
    /// A move joins the newest batch when that batch is a move from the
    /// same device and source; anything else starts a new batch.
    pub fn push(&mut self, event: MotionEvent, completion: Option<Completion>) {
        if event.action == MotionAction::Move
            && let Some(last) = self.pending.last_mut()
            && last.event.action == MotionAction::Move
            && last.event.device == event.device
            && last.event.source == event.source
            && last.event.pointers.len() == event.pointers.len()
        {
            last.completions.extend(completion.map(|c| (event.clone(), c)));
            let e = &mut last.event;
            let previous = MotionSample {
                time: e.event_time,
                pointers: core::mem::replace(&mut e.pointers, event.pointers),
            };
            e.history.push(previous);
            e.history.extend(event.history);
            e.event_time = event.event_time;
            e.axes = event.axes;
            e.meta = event.meta;
            return;
        }
        let completions = completion.map(|c| (event.clone(), c)).into_iter().collect();
        self.pending.push(Batch { event, completions });
    }

    /// Returns `true` if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every batch, oldest first.
    pub fn take(&mut self) -> Vec<Batch> {
        core::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeviceId, Source};
    use crate::time::HostTime;
    use alloc::sync::Arc;
    use std::sync::Mutex;
    use kurbo::Point;

    fn mv(device: i32, x: f64, ms: u64) -> MotionEvent {
        MotionEvent::new(
            DeviceId(device),
            Source::Touchscreen,
            MotionAction::Move,
            Point::new(x, 0.0),
            HostTime::from_millis(ms),
        )
    }

    #[test]
    fn consecutive_moves_fold_into_history() {
        let mut b = MotionBatcher::new();
        b.push(mv(1, 1.0, 0), None);
        b.push(mv(1, 2.0, 8), None);
        b.push(mv(1, 3.0, 16), None);
        let batches = b.take();
        assert_eq!(batches.len(), 1);
        let e = &batches[0].event;
        assert_eq!(e.position(), Point::new(3.0, 0.0));
        assert_eq!(e.event_time, HostTime::from_millis(16));
        let history: Vec<_> = e.history.iter().map(|s| s.time).collect();
        assert_eq!(
            history,
            [HostTime::from_millis(0), HostTime::from_millis(8)]
        );
        assert!(b.is_empty());
    }

    #[test]
    fn other_devices_and_actions_split_batches() {
        let mut b = MotionBatcher::new();
        b.push(mv(1, 1.0, 0), None);
        b.push(mv(2, 1.0, 1), None);
        let mut up = mv(2, 1.0, 2);
        up.action = MotionAction::Up;
        b.push(up, None);
        b.push(mv(2, 1.0, 3), None);
        assert_eq!(b.take().len(), 4);
    }

    #[test]
    fn merged_completion_reports_each_enqueued_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut b = MotionBatcher::new();
        for i in 0..3_u32 {
            let seen = Arc::clone(&seen);
            let completion: Completion = Box::new(move |event: &InputEvent, handled| {
                assert!(handled);
                let motion = event.as_motion().unwrap();
                let entry = (motion.position().x, motion.history.len());
                seen.lock().unwrap().push(entry);
            });
            b.push(mv(1, f64::from(i), u64::from(i)), Some(completion));
        }
        let batch = b.take().pop().unwrap();
        let (event, completion) = batch.into_parts();
        assert_eq!(event.history.len(), 2);
        completion.unwrap()(&InputEvent::Motion(event), true);
        assert_eq!(*seen.lock().unwrap(), [(0.0, 0), (1.0, 0), (2.0, 0)]);
    }
}
