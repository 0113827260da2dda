// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-device reordering for async stages.
//!
//! An async stage hands a record to a peer and parks it here until the peer
//! answers. Records from other devices keep flowing; records from the same
//! device queue up behind the parked one so they cannot overtake it.
//!
//! ```text
//!   queue: [ A1(deferred) ][ B1(deferred) ][ A2 ][ A3(deferred) ][ A4 ]
//!
//!   resume(A1) ─► releases A1, then A2; stops at A3 (still deferred)
//!   resume(B1) ─► releases B1 (no earlier B record)
//! ```
//!
//! Each operation is a linear scan; the queue length is bounded in practice
//! by the number of concurrently active devices.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::event::DeviceId;
use crate::record::{EventRecord, RecordId};

/// Reordering queue owned by one async stage.
#[derive(Debug, Default)]
pub struct AsyncStageQueue {
    queue: VecDeque<EventRecord>,
}

impl AsyncStageQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a record until [`resume`](Self::resume) is called with its id.
    pub fn defer(&mut self, mut record: EventRecord) {
        record.set_deferred(true);
        self.queue.push_back(record);
    }

    /// Leaves the stage with a record that was not deferred.
    ///
    /// Returns the record if it may continue now, or keeps it queued behind
    /// an earlier record from the same device.
    pub fn forward(&mut self, mut record: EventRecord) -> Option<EventRecord> {
        record.set_deferred(false);
        if self.has_record_for(record.event().device()) {
            self.queue.push_back(record);
            None
        } else {
            Some(record)
        }
    }

    /// Completes a parked record.
    ///
    /// `outcome` finishes the record when the peer reached a verdict;
    /// `None` lets it continue through the chain. Returns the records that
    /// may now continue, in order, or `None` if no record has that id (it
    /// was already resumed, or the queue was torn down).
    pub fn resume(&mut self, id: RecordId, outcome: Option<bool>) -> Option<Vec<EventRecord>> {
        let index = self.queue.iter().position(|r| r.id() == id)?;
        let device = {
            let record = &mut self.queue[index];
            assert!(
                record.is_deferred(),
                "async completion for {id:?} delivered twice"
            );
            record.set_deferred(false);
            if let Some(handled) = outcome {
                record.finish(handled);
            }
            record.event().device()
        };

        let earlier = self.queue.iter().take(index);
        if earlier.map(|r| r.event().device()).any(|d| d == device) {
            return Some(Vec::new());
        }

        let mut released = Vec::new();
        released.extend(self.queue.remove(index));
        let mut i = index;
        while i < self.queue.len() {
            if self.queue[i].event().device() != device {
                i += 1;
                continue;
            }
            if self.queue[i].is_deferred() {
                break;
            }
            released.extend(self.queue.remove(i));
        }
        Some(released)
    }

    /// Returns `true` if a record for `device` is queued.
    #[must_use]
    pub fn has_record_for(&self, device: DeviceId) -> bool {
        self.queue.iter().any(|r| r.event().device() == device)
    }

    /// Returns `true` if a record with this id is parked here.
    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.queue.iter().any(|r| r.id() == id)
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

    /// Removes every record, oldest first.
    pub fn take_all(&mut self) -> Vec<EventRecord> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeyAction, KeyCode, KeyEvent, Source};
    use crate::record::RecordFlags;
    use crate::time::HostTime;

    fn record(id: u64, device: i32) -> EventRecord {
        let ev = KeyEvent::new(
            DeviceId(device),
            Source::Keyboard,
            KeyCode::ENTER,
            KeyAction::Down,
            HostTime::ZERO,
        );
        EventRecord::new(RecordId(id), ev.into(), RecordFlags::empty(), None)
    }

    fn ids(records: &[EventRecord]) -> Vec<u64> {
        records.iter().map(|r| r.id().0).collect()
    }

    #[test]
    fn forward_passes_through_when_device_idle() {
        let mut q = AsyncStageQueue::new();
        q.defer(record(1, 7));
        let out = q.forward(record(2, 8));
        assert_eq!(out.map(|r| r.id()), Some(RecordId(2)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn same_device_waits_behind_deferred_record() {
        let mut q = AsyncStageQueue::new();
        q.defer(record(1, 7));
        assert!(
            q.forward(record(2, 7)).is_none(),
            "later same-device record must not overtake"
        );

        let released = q.resume(RecordId(1), None).unwrap();
        assert_eq!(ids(&released), [1, 2]);
        assert!(q.is_empty());
    }

    #[test]
    fn out_of_order_completion_keeps_device_order() {
        let mut q = AsyncStageQueue::new();
        q.defer(record(1, 7));
        q.defer(record(2, 7));
        q.defer(record(3, 9));

        // Second record answers first: held behind the first.
        let released = q.resume(RecordId(2), Some(true)).unwrap();
        assert!(released.is_empty());

        // Other device is unaffected.
        let released = q.resume(RecordId(3), Some(false)).unwrap();
        assert_eq!(ids(&released), [3]);

        let released = q.resume(RecordId(1), None).unwrap();
        assert_eq!(ids(&released), [1, 2]);
        assert!(released[1].is_finished());
    }

    #[test]
    fn release_stops_at_next_deferred_record() {
        let mut q = AsyncStageQueue::new();
        q.defer(record(1, 7));
        assert!(q.forward(record(2, 7)).is_none());
        q.defer(record(3, 7));
        assert!(q.forward(record(4, 7)).is_none());

        let released = q.resume(RecordId(1), None).unwrap();
        assert_eq!(ids(&released), [1, 2]);
        assert_eq!(q.len(), 2);

        let released = q.resume(RecordId(3), None).unwrap();
        assert_eq!(ids(&released), [3, 4]);
    }

    #[test]
    fn unknown_id_is_none() {
        let mut q = AsyncStageQueue::new();
        assert!(q.resume(RecordId(5), None).is_none());
    }

    #[test]
    #[should_panic(expected = "delivered twice")]
    fn second_completion_of_held_record_panics() {
        let mut q = AsyncStageQueue::new();
        q.defer(record(1, 7));
        q.defer(record(2, 7));
        let _ = q.resume(RecordId(2), None);
        let _ = q.resume(RecordId(2), None);
    }
}
