// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for input dispatch and traversal.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the root calls as records move through the stage chain and as each
//! traversal runs its phases. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed [`TraceSink`]. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! A sink shared as `Rc<RefCell<S>>` is itself a sink, so a caller can hand
//! one clone to the root and keep another to inspect what was recorded.
//!
//! [`TraversalSummaryBuilder`] collects phase timestamps during a traversal
//! and produces a [`TraversalSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use kurbo::{Rect, Size};

use crate::event::{DeviceId, InputEvent, Source};
use crate::record::RecordId;
use crate::stage::StageKind;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a traversal is being measured.
///
/// Phases are ordered as they run; the order also decides whether a request
/// raised mid-traversal can still be folded into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TraversalPhase {
    /// Window attribute aggregation.
    Attributes,
    /// Tree measurement.
    Measure,
    /// Window-manager round trip.
    Relayout,
    /// Tree layout, including the corrective pass.
    Layout,
    /// Insets dispatch.
    Insets,
    /// Drawing and frame submission.
    Draw,
}

impl TraversalPhase {
    /// Every phase in running order.
    pub const ALL: [Self; 6] = [
        Self::Attributes,
        Self::Measure,
        Self::Relayout,
        Self::Layout,
        Self::Insets,
        Self::Draw,
    ];

    /// Short stable name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Attributes => "attributes",
            Self::Measure => "measure",
            Self::Relayout => "relayout",
            Self::Layout => "layout",
            Self::Insets => "insets",
            Self::Draw => "draw",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Attributes => 0,
            Self::Measure => 1,
            Self::Relayout => 2,
            Self::Layout => 3,
            Self::Insets => 4,
            Self::Draw => 5,
        }
    }
}

/// Key or motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A key event.
    Key,
    /// A motion event.
    Motion,
}

impl From<&InputEvent> for EventKind {
    fn from(event: &InputEvent) -> Self {
        match event {
            InputEvent::Key(_) => Self::Key,
            InputEvent::Motion(_) => Self::Motion,
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an input event becomes a record.
#[derive(Clone, Copy, Debug)]
pub struct InputEnqueuedEvent {
    /// The new record.
    pub record: RecordId,
    /// Originating device.
    pub device: DeviceId,
    /// Originating source.
    pub source: Source,
    /// Key or motion.
    pub kind: EventKind,
    /// Host time of the enqueue.
    pub timestamp: HostTime,
}

/// Emitted when a record is handed to a stage.
#[derive(Clone, Copy, Debug)]
pub struct StageEvent {
    /// The record.
    pub record: RecordId,
    /// The stage.
    pub stage: StageKind,
    /// Host time of delivery.
    pub timestamp: HostTime,
}

/// Emitted when a record concludes dispatch and its completion runs.
#[derive(Clone, Copy, Debug)]
pub struct FinishEvent {
    /// The record.
    pub record: RecordId,
    /// Whether the event was consumed.
    pub handled: bool,
    /// Host time of completion.
    pub timestamp: HostTime,
}

/// Marks the beginning of a traversal phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: TraversalPhase,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a traversal phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: TraversalPhase,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted after a relayout round trip.
#[derive(Clone, Copy, Debug)]
pub struct RelayoutEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Size the tree asked for.
    pub requested: Size,
    /// Frame granted by the window manager, or `None` if the call failed.
    pub frame: Option<Rect>,
    /// Host time when the answer arrived.
    pub timestamp: HostTime,
}

/// Emitted when a frame is handed to the compositor.
#[derive(Clone, Copy, Debug)]
pub struct DrawSubmittedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Number of views with new content.
    pub painted: u32,
    /// The whole surface was redrawn.
    pub full: bool,
    /// The draw blocks until committed.
    pub sync: bool,
    /// Host time of submission.
    pub timestamp: HostTime,
}

/// Emitted when the compositor reports a commit.
#[derive(Clone, Copy, Debug)]
pub struct DrawCommittedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time the commit was observed on the owning thread.
    pub timestamp: HostTime,
}

/// Per-traversal summary produced by [`TraversalSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct TraversalSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Frame start time.
    pub now: HostTime,
    /// Layout passes run (1, or 2 with a corrective pass).
    pub layout_passes: u8,
    /// A relayout round trip happened.
    pub relayout: bool,
    /// A frame was submitted.
    pub drew: bool,
    /// Duration of each phase in nanoseconds, in [`TraversalPhase::ALL`]
    /// order (0 if the phase did not run).
    pub phase_nanos: [u64; 6],
}

impl TraversalSummary {
    /// Duration of one phase in nanoseconds.
    #[must_use]
    pub const fn phase(&self, phase: TraversalPhase) -> u64 {
        self.phase_nanos[phase.index()]
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the root.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an input event becomes a record.
    fn on_input_enqueued(&mut self, e: &InputEnqueuedEvent) {
        _ = e;
    }

    /// Called when a record is handed to a stage.
    fn on_stage(&mut self, e: &StageEvent) {
        _ = e;
    }

    /// Called when an async stage parks a record.
    fn on_deferred(&mut self, e: &StageEvent) {
        _ = e;
    }

    /// Called when a record completes.
    fn on_finished(&mut self, e: &FinishEvent) {
        _ = e;
    }

    /// Called when a traversal is scheduled.
    fn on_traversal_scheduled(&mut self, timestamp: HostTime) {
        _ = timestamp;
    }

    /// Called at the beginning of a traversal phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a traversal phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after a relayout round trip.
    fn on_relayout(&mut self, e: &RelayoutEvent) {
        _ = e;
    }

    /// Called when a frame is submitted.
    fn on_draw_submitted(&mut self, e: &DrawSubmittedEvent) {
        _ = e;
    }

    /// Called when a frame commit is observed.
    fn on_draw_committed(&mut self, e: &DrawCommittedEvent) {
        _ = e;
    }

    /// Called with a per-traversal summary.
    fn on_traversal_summary(&mut self, s: &TraversalSummary) {
        _ = s;
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_input_enqueued(&mut self, e: &InputEnqueuedEvent) {
        self.borrow_mut().on_input_enqueued(e);
    }

    fn on_stage(&mut self, e: &StageEvent) {
        self.borrow_mut().on_stage(e);
    }

    fn on_deferred(&mut self, e: &StageEvent) {
        self.borrow_mut().on_deferred(e);
    }

    fn on_finished(&mut self, e: &FinishEvent) {
        self.borrow_mut().on_finished(e);
    }

    fn on_traversal_scheduled(&mut self, timestamp: HostTime) {
        self.borrow_mut().on_traversal_scheduled(timestamp);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.borrow_mut().on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.borrow_mut().on_phase_end(e);
    }

    fn on_relayout(&mut self, e: &RelayoutEvent) {
        self.borrow_mut().on_relayout(e);
    }

    fn on_draw_submitted(&mut self, e: &DrawSubmittedEvent) {
        self.borrow_mut().on_draw_submitted(e);
    }

    fn on_draw_committed(&mut self, e: &DrawCommittedEvent) {
        self.borrow_mut().on_draw_committed(e);
    }

    fn on_traversal_summary(&mut self, s: &TraversalSummary) {
        self.borrow_mut().on_traversal_summary(s);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owner of an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing and
/// a sink passed to [`new`](Self::new) is dropped immediately.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

/// Expands to a `Tracer` method that forwards one event to the sink.
macro_rules! emit {
    ($(#[$meta:meta])* $name:ident => $hook:ident($ty:ty)) => {
        $(#[$meta])*
        #[inline]
        pub fn $name(&mut self, e: $ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$hook(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            drop(sink);
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    emit!(
        /// Emits an [`InputEnqueuedEvent`].
        input_enqueued => on_input_enqueued(&InputEnqueuedEvent)
    );
    emit!(
        /// Emits a stage delivery.
        stage => on_stage(&StageEvent)
    );
    emit!(
        /// Emits a deferral.
        deferred => on_deferred(&StageEvent)
    );
    emit!(
        /// Emits a [`FinishEvent`].
        finished => on_finished(&FinishEvent)
    );
    emit!(
        /// Emits a scheduling event.
        traversal_scheduled => on_traversal_scheduled(HostTime)
    );
    emit!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(&PhaseBeginEvent)
    );
    emit!(
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(&PhaseEndEvent)
    );
    emit!(
        /// Emits a [`RelayoutEvent`].
        relayout => on_relayout(&RelayoutEvent)
    );
    emit!(
        /// Emits a [`DrawSubmittedEvent`].
        draw_submitted => on_draw_submitted(&DrawSubmittedEvent)
    );
    emit!(
        /// Emits a [`DrawCommittedEvent`].
        draw_committed => on_draw_committed(&DrawCommittedEvent)
    );
    emit!(
        /// Emits a [`TraversalSummary`].
        traversal_summary => on_traversal_summary(&TraversalSummary)
    );
}

// ---------------------------------------------------------------------------
// TraversalSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a traversal and produces a
/// [`TraversalSummary`].
#[derive(Debug)]
pub struct TraversalSummaryBuilder {
    frame_index: u64,
    now: HostTime,
    phase_starts: [Option<HostTime>; 6],
    phase_ends: [Option<HostTime>; 6],
    layout_passes: u8,
    relayout: bool,
    drew: bool,
}

impl TraversalSummaryBuilder {
    /// Starts building a summary for one traversal.
    #[must_use]
    pub fn new(frame_index: u64, now: HostTime) -> Self {
        Self {
            frame_index,
            now,
            phase_starts: [None; 6],
            phase_ends: [None; 6],
            layout_passes: 0,
            relayout: false,
            drew: false,
        }
    }

    /// Records the start of a phase. A repeated phase keeps its first start.
    pub fn phase_begin(&mut self, phase: TraversalPhase, t: HostTime) {
        self.phase_starts[phase.index()].get_or_insert(t);
    }

    /// Records the end of a phase. A repeated phase keeps its last end.
    pub fn phase_end(&mut self, phase: TraversalPhase, t: HostTime) {
        self.phase_ends[phase.index()] = Some(t);
    }

    /// Counts one layout pass.
    pub fn layout_pass(&mut self) {
        self.layout_passes = self.layout_passes.saturating_add(1);
    }

    /// Notes that a relayout happened.
    pub fn set_relayout(&mut self) {
        self.relayout = true;
    }

    /// Notes that a frame was submitted.
    pub fn set_drew(&mut self) {
        self.drew = true;
    }

    /// Consumes the builder and produces the final [`TraversalSummary`].
    #[must_use]
    pub fn finish(self) -> TraversalSummary {
        let mut phase_nanos = [0; 6];
        for phase in TraversalPhase::ALL {
            let i = phase.index();
            if let (Some(start), Some(end)) = (self.phase_starts[i], self.phase_ends[i]) {
                let nanos = end.saturating_duration_since(start).as_nanos();
                phase_nanos[i] = u64::try_from(nanos).unwrap_or(u64::MAX);
            }
        }
        TraversalSummary {
            frame_index: self.frame_index,
            now: self.now,
            layout_passes: self.layout_passes,
            relayout: self.relayout,
            drew: self.drew,
            phase_nanos,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
