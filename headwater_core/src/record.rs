// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event records and the pending-input FIFO.
//!
//! An [`EventRecord`] wraps one [`InputEvent`] with its dispatch-state
//! [`RecordFlags`] and the completion that reports the outcome back to the
//! event's source. Records are owned values: at any instant a record lives
//! in exactly one place (the [`PendingInput`] FIFO, an async stage queue, or
//! the stack frame currently delivering it).

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::fmt;

use bitflags::bitflags;

use crate::event::InputEvent;

bitflags! {
    /// Dispatch-state flags carried by an [`EventRecord`].
    ///
    /// All flags are monotone except [`DEFERRED`](Self::DEFERRED), which is
    /// cleared when an async stage forwards the record.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RecordFlags: u32 {
        /// Skip the pre-IME stages; delivery starts at the first post-IME
        /// stage.
        const POST_IME_ONLY = 1 << 0;
        /// Parked in an async stage queue awaiting completion.
        const DEFERRED = 1 << 1;
        /// Dispatch has concluded; remaining stages only forward.
        const FINISHED = 1 << 2;
        /// Dispatch concluded and the event was consumed.
        const FINISHED_HANDLED = 1 << 3;
        /// The record reached the synthetic stage.
        const RESYNTHESIZED = 1 << 4;
        /// A fallback key produced for an unconsumed key; it is not offered
        /// to the fallback generator again.
        const UNHANDLED_PASS = 1 << 5;
        /// The payload was rewritten for compatibility; the completion
        /// receives the original event.
        const MODIFIED_FOR_COMPAT = 1 << 6;
    }
}

/// Identifies a record while it waits on an async peer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub u64);

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

/// Reports the outcome of dispatch to the event's source.
///
/// Called exactly once with the event as the source enqueued it and whether
/// it was handled.
pub type Completion = Box<dyn FnOnce(&InputEvent, bool) + Send>;

/// One queued input event plus its dispatch state.
pub struct EventRecord {
    id: RecordId,
    event: InputEvent,
    original: Option<InputEvent>,
    flags: RecordFlags,
    completion: Option<Completion>,
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("original", &self.original)
            .field("flags", &self.flags)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

impl EventRecord {
    /// Creates a record.
    ///
    /// Only [`POST_IME_ONLY`](RecordFlags::POST_IME_ONLY),
    /// [`UNHANDLED_PASS`](RecordFlags::UNHANDLED_PASS) and
    /// [`MODIFIED_FOR_COMPAT`](RecordFlags::MODIFIED_FOR_COMPAT) are honored
    /// from `flags`; dispatch-state flags start clear.
    #[must_use]
    pub fn new(
        id: RecordId,
        event: InputEvent,
        flags: RecordFlags,
        completion: Option<Completion>,
    ) -> Self {
        Self {
            id,
            event,
            original: None,
            flags: flags
                & (RecordFlags::POST_IME_ONLY
                    | RecordFlags::UNHANDLED_PASS
                    | RecordFlags::MODIFIED_FOR_COMPAT),
            completion,
        }
    }

    /// Replaces the payload with a compatibility rewrite, keeping the
    /// original for the completion.
    pub fn rewrite_for_compat(&mut self, rewritten: InputEvent) {
        let original = core::mem::replace(&mut self.event, rewritten);
        self.original.get_or_insert(original);
        self.flags.insert(RecordFlags::MODIFIED_FOR_COMPAT);
    }

    /// Record id.
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The event as dispatched.
    #[must_use]
    pub fn event(&self) -> &InputEvent {
        &self.event
    }

    /// The event as dispatched, for in-place cancellation.
    pub(crate) fn event_mut(&mut self) -> &mut InputEvent {
        &mut self.event
    }

    /// Current flags.
    #[must_use]
    pub fn flags(&self) -> RecordFlags {
        self.flags
    }

    /// Returns `true` once dispatch has concluded.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.flags.contains(RecordFlags::FINISHED)
    }

    /// Returns `true` while parked awaiting an async completion.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.flags.contains(RecordFlags::DEFERRED)
    }

    /// Returns `true` if delivery starts after the IME.
    ///
    /// Pointer gestures never visit the IME.
    #[must_use]
    pub fn skips_ime(&self) -> bool {
        self.flags.contains(RecordFlags::POST_IME_ONLY)
            || matches!(&self.event, InputEvent::Motion(m) if m.source.is_pointer())
    }

    pub(crate) fn set_deferred(&mut self, deferred: bool) {
        self.flags.set(RecordFlags::DEFERRED, deferred);
    }

    pub(crate) fn mark_resynthesized(&mut self) {
        self.flags.insert(RecordFlags::RESYNTHESIZED);
    }

    /// Concludes dispatch.
    ///
    /// # Panics
    ///
    /// Panics if the record was already finished.
    pub fn finish(&mut self, handled: bool) {
        assert!(
            !self.is_finished(),
            "event record {:?} finished twice",
            self.id
        );
        self.flags.insert(RecordFlags::FINISHED);
        if handled {
            self.flags.insert(RecordFlags::FINISHED_HANDLED);
        }
    }

    /// Runs the completion and consumes the record.
    ///
    /// The completion receives the original event when the payload was
    /// rewritten for compatibility.
    pub fn complete(mut self) -> bool {
        let handled = self.flags.contains(RecordFlags::FINISHED_HANDLED);
        if let Some(completion) = self.completion.take() {
            let event = match &self.original {
                Some(original) if self.flags.contains(RecordFlags::MODIFIED_FOR_COMPAT) => original,
                _ => &self.event,
            };
            completion(event, handled);
        }
        handled
    }

    /// Finishes as not handled (unless already finished) and completes.
    pub(crate) fn abandon(mut self) {
        if !self.is_finished() {
            self.finish(false);
        }
        self.complete();
    }
}

// ---------------------------------------------------------------------------
// PendingInput
// ---------------------------------------------------------------------------

/// FIFO of records waiting for delivery.
#[derive(Debug, Default)]
pub struct PendingInput {
    queue: VecDeque<EventRecord>,
}

impl PendingInput {
    /// Creates an empty FIFO.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, record: EventRecord) {
        self.queue.push_back(record);
    }

    /// Removes the oldest record.
    pub fn pop(&mut self) -> Option<EventRecord> {
        self.queue.pop_front()
    }

    /// Number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes every queued record, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = EventRecord> + '_ {
        self.queue.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeviceId, KeyAction, KeyCode, KeyEvent, MotionAction, MotionEvent, Source};
    use crate::time::HostTime;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use kurbo::Point;
    use std::sync::Mutex;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::from(KeyEvent::new(
            DeviceId(1),
            Source::Keyboard,
            code,
            KeyAction::Down,
            HostTime::ZERO,
        ))
    }

    fn recording() -> (Arc<Mutex<Vec<(InputEvent, bool)>>>, Completion) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let completion: Completion = Box::new(move |event: &InputEvent, handled| {
            sink.lock().unwrap().push((event.clone(), handled));
        });
        (log, completion)
    }

    #[test]
    fn dispatch_state_flags_start_clear() {
        let r = EventRecord::new(
            RecordId(1),
            key(KeyCode::ENTER),
            RecordFlags::FINISHED | RecordFlags::POST_IME_ONLY,
            None,
        );
        assert!(!r.is_finished());
        assert!(r.skips_ime());
    }

    #[test]
    fn complete_reports_handled_once() {
        let (log, completion) = recording();
        let mut r = EventRecord::new(
            RecordId(1),
            key(KeyCode::ENTER),
            RecordFlags::empty(),
            Some(completion),
        );
        r.finish(true);
        assert!(r.complete());
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].1);
    }

    #[test]
    #[should_panic(expected = "finished twice")]
    fn double_finish_panics() {
        let mut r = EventRecord::new(RecordId(9), key(KeyCode::ENTER), RecordFlags::empty(), None);
        r.finish(false);
        r.finish(true);
    }

    #[test]
    fn compat_rewrite_reports_original() {
        let (log, completion) = recording();
        let original = key(KeyCode::ENTER);
        let mut r = EventRecord::new(
            RecordId(2),
            original.clone(),
            RecordFlags::empty(),
            Some(completion),
        );
        r.rewrite_for_compat(key(KeyCode::SPACE));
        assert_eq!(r.event(), &key(KeyCode::SPACE));
        r.finish(false);
        r.complete();
        assert_eq!(log.lock().unwrap()[0].0, original);
    }

    #[test]
    fn pointer_motion_skips_ime() {
        let touch = MotionEvent::new(
            DeviceId(2),
            Source::Touchscreen,
            MotionAction::Down,
            Point::ZERO,
            HostTime::ZERO,
        );
        let r = EventRecord::new(RecordId(3), touch.into(), RecordFlags::empty(), None);
        assert!(r.skips_ime());

        let ball = MotionEvent::new(
            DeviceId(2),
            Source::Trackball,
            MotionAction::Move,
            Point::ZERO,
            HostTime::ZERO,
        );
        let r = EventRecord::new(RecordId(4), ball.into(), RecordFlags::empty(), None);
        assert!(!r.skips_ime());
    }

    #[test]
    fn pending_is_fifo() {
        let mut q = PendingInput::new();
        for i in 0..3 {
            q.push(EventRecord::new(
                RecordId(i),
                key(KeyCode::ENTER),
                RecordFlags::empty(),
                None,
            ));
        }
        let ids: Vec<_> = q.drain().map(|r| r.id().0).collect();
        assert_eq!(ids, [0, 1, 2]);
        assert!(q.is_empty());
    }
}
