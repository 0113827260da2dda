// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use headwater_core::event::{DeviceId, Source};
use headwater_core::record::RecordId;
use headwater_core::stage::StageKind;
use headwater_core::time::HostTime;
use headwater_core::trace::{
    DrawCommittedEvent, DrawSubmittedEvent, EventKind, FinishEvent, InputEnqueuedEvent,
    PhaseBeginEvent, PhaseEndEvent, RelayoutEvent, StageEvent, TraceSink, TraversalPhase,
    TraversalSummary,
};
use kurbo::{Rect, Size};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_INPUT_ENQUEUED: u8 = 1;
const TAG_STAGE: u8 = 2;
const TAG_DEFERRED: u8 = 3;
const TAG_FINISHED: u8 = 4;
const TAG_TRAVERSAL_SCHEDULED: u8 = 5;
const TAG_PHASE_BEGIN: u8 = 6;
const TAG_PHASE_END: u8 = 7;
const TAG_RELAYOUT: u8 = 8;
const TAG_DRAW_SUBMITTED: u8 = 9;
const TAG_DRAW_COMMITTED: u8 = 10;
const TAG_TRAVERSAL_SUMMARY: u8 = 11;

const SOURCES: [Source; 9] = [
    Source::Keyboard,
    Source::Dpad,
    Source::Gamepad,
    Source::Touchscreen,
    Source::Mouse,
    Source::Stylus,
    Source::Trackball,
    Source::TouchNavigation,
    Source::Joystick,
];

/// Position of `value` in `table`, as a one-byte code.
fn code_of<T: PartialEq>(table: &[T], value: &T) -> u8 {
    table
        .iter()
        .position(|v| v == value)
        .and_then(|i| u8::try_from(i).ok())
        .unwrap_or(u8::MAX)
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.nanos());
    }

    fn write_size(&mut self, s: Size) {
        self.write_f64(s.width);
        self.write_f64(s.height);
    }

    fn write_stage_event(&mut self, tag: u8, e: &StageEvent) {
        self.write_u8(tag);
        self.write_u64(e.record.0);
        self.write_u8(code_of(&StageKind::ALL, &e.stage));
        self.write_time(e.timestamp);
    }

    fn write_phase(
        &mut self,
        tag: u8,
        frame_index: u64,
        phase: TraversalPhase,
        timestamp: HostTime,
    ) {
        self.write_u8(tag);
        self.write_u64(frame_index);
        self.write_u8(code_of(&TraversalPhase::ALL, &phase));
        self.write_time(timestamp);
    }
}

impl TraceSink for RecorderSink {
    fn on_input_enqueued(&mut self, e: &InputEnqueuedEvent) {
        self.write_u8(TAG_INPUT_ENQUEUED);
        self.write_u64(e.record.0);
        self.buf.extend_from_slice(&e.device.0.to_le_bytes());
        self.write_u8(code_of(&SOURCES, &e.source));
        self.write_bool(e.kind == EventKind::Motion);
        self.write_time(e.timestamp);
    }

    fn on_stage(&mut self, e: &StageEvent) {
        self.write_stage_event(TAG_STAGE, e);
    }

    fn on_deferred(&mut self, e: &StageEvent) {
        self.write_stage_event(TAG_DEFERRED, e);
    }

    fn on_finished(&mut self, e: &FinishEvent) {
        self.write_u8(TAG_FINISHED);
        self.write_u64(e.record.0);
        self.write_bool(e.handled);
        self.write_time(e.timestamp);
    }

    fn on_traversal_scheduled(&mut self, timestamp: HostTime) {
        self.write_u8(TAG_TRAVERSAL_SCHEDULED);
        self.write_time(timestamp);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_phase(TAG_PHASE_BEGIN, e.frame_index, e.phase, e.timestamp);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_phase(TAG_PHASE_END, e.frame_index, e.phase, e.timestamp);
    }

    fn on_relayout(&mut self, e: &RelayoutEvent) {
        self.write_u8(TAG_RELAYOUT);
        self.write_u64(e.frame_index);
        self.write_size(e.requested);
        match e.frame {
            Some(frame) => {
                self.write_u8(1);
                for v in [frame.x0, frame.y0, frame.x1, frame.y1] {
                    self.write_f64(v);
                }
            }
            None => self.write_u8(0),
        }
        self.write_time(e.timestamp);
    }

    fn on_draw_submitted(&mut self, e: &DrawSubmittedEvent) {
        self.write_u8(TAG_DRAW_SUBMITTED);
        self.write_u64(e.frame_index);
        self.write_u32(e.painted);
        self.write_bool(e.full);
        self.write_bool(e.sync);
        self.write_time(e.timestamp);
    }

    fn on_draw_committed(&mut self, e: &DrawCommittedEvent) {
        self.write_u8(TAG_DRAW_COMMITTED);
        self.write_u64(e.frame_index);
        self.write_time(e.timestamp);
    }

    fn on_traversal_summary(&mut self, s: &TraversalSummary) {
        self.write_u8(TAG_TRAVERSAL_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_time(s.now);
        self.write_u8(s.layout_passes);
        self.write_bool(s.relayout);
        self.write_bool(s.drew);
        for nanos in s.phase_nanos {
            self.write_u64(nanos);
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An [`InputEnqueuedEvent`].
    InputEnqueued(InputEnqueuedEvent),
    /// A [`StageEvent`] delivered to a stage.
    Stage(StageEvent),
    /// A [`StageEvent`] parked at an async stage.
    Deferred(StageEvent),
    /// A [`FinishEvent`].
    Finished(FinishEvent),
    /// A traversal was scheduled at this time.
    TraversalScheduled(HostTime),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`RelayoutEvent`].
    Relayout(RelayoutEvent),
    /// A [`DrawSubmittedEvent`].
    DrawSubmitted(DrawSubmittedEvent),
    /// A [`DrawCommittedEvent`].
    DrawCommitted(DrawCommittedEvent),
    /// A [`TraversalSummary`].
    TraversalSummary(TraversalSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[v]| v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_stage(&mut self) -> Option<StageKind> {
        StageKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_phase(&mut self) -> Option<TraversalPhase> {
        let index = usize::from(self.read_u8()?);
        TraversalPhase::ALL.get(index).copied()
    }

    fn decode_input_enqueued(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::InputEnqueued(InputEnqueuedEvent {
            record: RecordId(self.read_u64()?),
            device: DeviceId(self.read_i32()?),
            source: SOURCES.get(usize::from(self.read_u8()?)).copied()?,
            kind: if self.read_bool()? {
                EventKind::Motion
            } else {
                EventKind::Key
            },
            timestamp: self.read_time()?,
        }))
    }

    fn decode_stage_event(&mut self) -> Option<StageEvent> {
        Some(StageEvent {
            record: RecordId(self.read_u64()?),
            stage: self.read_stage()?,
            timestamp: self.read_time()?,
        })
    }

    fn decode_finished(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Finished(FinishEvent {
            record: RecordId(self.read_u64()?),
            handled: self.read_bool()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_relayout(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let requested = Size::new(self.read_f64()?, self.read_f64()?);
        let frame = if self.read_bool()? {
            Some(Rect::new(
                self.read_f64()?,
                self.read_f64()?,
                self.read_f64()?,
                self.read_f64()?,
            ))
        } else {
            None
        };
        Some(RecordedEvent::Relayout(RelayoutEvent {
            frame_index,
            requested,
            frame,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_draw_submitted(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DrawSubmitted(DrawSubmittedEvent {
            frame_index: self.read_u64()?,
            painted: self.read_u32()?,
            full: self.read_bool()?,
            sync: self.read_bool()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_draw_committed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DrawCommitted(DrawCommittedEvent {
            frame_index: self.read_u64()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_traversal_summary(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let now = self.read_time()?;
        let layout_passes = self.read_u8()?;
        let relayout = self.read_bool()?;
        let drew = self.read_bool()?;
        let mut phase_nanos = [0; 6];
        for slot in &mut phase_nanos {
            *slot = self.read_u64()?;
        }
        Some(RecordedEvent::TraversalSummary(TraversalSummary {
            frame_index,
            now,
            layout_passes,
            relayout,
            drew,
            phase_nanos,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_INPUT_ENQUEUED => self.decode_input_enqueued(),
            TAG_STAGE => self.decode_stage_event().map(RecordedEvent::Stage),
            TAG_DEFERRED => self.decode_stage_event().map(RecordedEvent::Deferred),
            TAG_FINISHED => self.decode_finished(),
            TAG_TRAVERSAL_SCHEDULED => self.read_time().map(RecordedEvent::TraversalScheduled),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_RELAYOUT => self.decode_relayout(),
            TAG_DRAW_SUBMITTED => self.decode_draw_submitted(),
            TAG_DRAW_COMMITTED => self.decode_draw_committed(),
            TAG_TRAVERSAL_SUMMARY => self.decode_traversal_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_lifecycle_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_input_enqueued(&InputEnqueuedEvent {
            record: RecordId(1),
            device: DeviceId(-1),
            source: Source::TouchNavigation,
            kind: EventKind::Motion,
            timestamp: HostTime(10),
        });
        rec.on_deferred(&StageEvent {
            record: RecordId(1),
            stage: StageKind::Ime,
            timestamp: HostTime(20),
        });
        rec.on_finished(&FinishEvent {
            record: RecordId(1),
            handled: true,
            timestamp: HostTime(30),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 3);
        match &events[0] {
            RecordedEvent::InputEnqueued(e) => {
                assert_eq!(e.device, DeviceId(-1));
                assert_eq!(e.source, Source::TouchNavigation);
                assert_eq!(e.kind, EventKind::Motion);
            }
            other => panic!("expected InputEnqueued, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Deferred(e) => assert_eq!(e.stage, StageKind::Ime),
            other => panic!("expected Deferred, got {other:?}"),
        }
        match &events[2] {
            RecordedEvent::Finished(e) => assert!(e.handled),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn failed_relayout_keeps_no_frame() {
        let mut rec = RecorderSink::new();
        rec.on_relayout(&RelayoutEvent {
            frame_index: 3,
            requested: Size::new(720.0, 100.0),
            frame: None,
            timestamp: HostTime(5),
        });
        rec.on_relayout(&RelayoutEvent {
            frame_index: 4,
            requested: Size::new(720.0, 100.0),
            frame: Some(Rect::new(0.0, 24.0, 720.0, 124.0)),
            timestamp: HostTime(6),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::Relayout(e) => assert!(e.frame.is_none()),
            other => panic!("expected Relayout, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Relayout(e) => {
                assert_eq!(e.frame, Some(Rect::new(0.0, 24.0, 720.0, 124.0)));
                assert_eq!(e.timestamp, HostTime(6));
            }
            other => panic!("expected Relayout, got {other:?}"),
        }
    }

    #[test]
    fn summary_keeps_phase_durations() {
        let mut rec = RecorderSink::new();
        rec.on_traversal_scheduled(HostTime(1));
        rec.on_traversal_summary(&TraversalSummary {
            frame_index: 9,
            now: HostTime(100),
            layout_passes: 2,
            relayout: true,
            drew: false,
            phase_nanos: [1, 2, 3, 4, 5, 6],
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match &events[0] {
            RecordedEvent::TraversalScheduled(at) => assert_eq!(*at, HostTime(1)),
            other => panic!("expected TraversalScheduled, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::TraversalSummary(s) => {
                assert_eq!(s.layout_passes, 2);
                assert!(s.relayout && !s.drew);
                assert_eq!(s.phase(TraversalPhase::Layout), 4);
            }
            other => panic!("expected TraversalSummary, got {other:?}"),
        }
    }

    #[test]
    fn truncated_buffer_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_draw_committed(&DrawCommittedEvent {
            frame_index: 1,
            timestamp: HostTime(2),
        });
        let bytes = rec.into_bytes();
        assert_eq!(decode(&bytes[..bytes.len() - 1]).count(), 0);
        assert!(decode(&[]).next().is_none());
    }
}
