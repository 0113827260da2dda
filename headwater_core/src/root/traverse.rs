// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The traversal pass.
//!
//! One pass runs per scheduled frame, in phase order:
//!
//! ```text
//! Attributes ─► Measure ─► Relayout ─► Layout (+ corrective) ─► Insets ─► Draw
//! ```
//!
//! Work is driven by [`TraversalFlags`]. A flag raised while a pass is
//! running folds into that pass when the phase that consumes it has not
//! started yet; otherwise it schedules the next frame.

use alloc::boxed::Box;
use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::{Insets, Point, Rect, Size};

use crate::dirty;
use crate::error::SurfaceError;
use crate::latch::DrawLatch;
use crate::peer::{
    CommitCallback, RelayoutFlags, RelayoutRequest, RelayoutResult, SurfaceChange, SurfaceFrame,
    SurfaceId,
};
use crate::scheduler::FrameTick;
use crate::trace::{
    DrawCommittedEvent, DrawSubmittedEvent, PhaseBeginEvent, PhaseEndEvent, RelayoutEvent,
    TraversalPhase, TraversalSummaryBuilder,
};
use crate::tree::{
    Dimension, DrawRequest, GivenInsets, MeasureSpec, SizeMode, TreeRequests, ViewId, Visibility,
    WindowAttributes,
};

use super::ViewRoot;

bitflags! {
    /// Traversal work waiting for a pass.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TraversalFlags: u16 {
        /// Measure and lay out.
        const NEEDS_LAYOUT = 1 << 0;
        /// Draw.
        const NEEDS_DRAW = 1 << 1;
        /// Dispatch insets to the tree.
        const NEEDS_APPLY_INSETS = 1 << 2;
        /// Recompute window attributes.
        const ATTRIBUTES_CHANGED = 1 << 3;
        /// Effective visibility changed; tell the window manager.
        const VISIBILITY_CHANGED = 1 << 4;
        /// Relayout even if nothing the window manager sees changed.
        const FORCE_RELAYOUT = 1 << 5;
        /// Draw synchronously and report the draw to the window manager.
        const REPORT_NEXT_DRAW = 1 << 6;
    }
}

impl TraversalFlags {
    /// Everything the first pass after attach does.
    pub const FIRST_PASS: Self = Self::NEEDS_LAYOUT
        .union(Self::NEEDS_DRAW)
        .union(Self::NEEDS_APPLY_INSETS)
        .union(Self::ATTRIBUTES_CHANGED);

    /// Translates requests raised by the tree.
    #[must_use]
    pub fn from_requests(requests: TreeRequests) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::NEEDS_LAYOUT, requests.contains(TreeRequests::LAYOUT));
        flags.set(Self::NEEDS_DRAW, requests.contains(TreeRequests::DRAW));
        flags.set(
            Self::NEEDS_APPLY_INSETS,
            requests.contains(TreeRequests::APPLY_INSETS),
        );
        flags.set(
            Self::ATTRIBUTES_CHANGED,
            requests.contains(TreeRequests::ATTRIBUTES),
        );
        flags
    }

    /// The earliest phase that consumes any of these flags.
    fn consumed_in(self) -> TraversalPhase {
        let order = [
            (Self::ATTRIBUTES_CHANGED, TraversalPhase::Attributes),
            (Self::NEEDS_LAYOUT, TraversalPhase::Measure),
            (
                Self::VISIBILITY_CHANGED | Self::FORCE_RELAYOUT,
                TraversalPhase::Relayout,
            ),
            (Self::NEEDS_APPLY_INSETS, TraversalPhase::Insets),
            (Self::NEEDS_DRAW | Self::REPORT_NEXT_DRAW, TraversalPhase::Draw),
        ];
        order
            .iter()
            .find(|(flags, _)| self.intersects(*flags))
            .map_or(TraversalPhase::Draw, |(_, phase)| *phase)
    }
}

/// Window geometry and pass bookkeeping carried between frames.
#[derive(Debug)]
pub(super) struct TraversalState {
    pub(super) flags: TraversalFlags,
    first: bool,
    /// Phase of the running pass, `None` between passes.
    phase: Option<TraversalPhase>,
    pub(super) frame: Rect,
    pub(super) pending_frame: Option<Rect>,
    insets: Insets,
    pub(super) pending_insets: Option<Insets>,
    last_given: Option<GivenInsets>,
    attributes: WindowAttributes,
    measured: Size,
    last_requested: Option<Size>,
    pub(super) surface: Option<SurfaceId>,
    pub(super) full_redraw: bool,
}

impl TraversalState {
    pub(super) fn new() -> Self {
        Self {
            flags: TraversalFlags::empty(),
            first: true,
            phase: None,
            frame: Rect::ZERO,
            pending_frame: None,
            insets: Insets::ZERO,
            pending_insets: None,
            last_given: None,
            attributes: WindowAttributes::default(),
            measured: Size::ZERO,
            last_requested: None,
            surface: None,
            full_redraw: true,
        }
    }

    /// Clears `flag`, returning whether it was set.
    fn take_flag(&mut self, flag: TraversalFlags) -> bool {
        let set = self.flags.contains(flag);
        self.flags.remove(flag);
        set
    }

    /// Geometry reported before attach is kept; everything derived from a
    /// tree is not.
    pub(super) fn reset_for_attach(&mut self) {
        self.first = true;
        self.phase = None;
        self.last_given = None;
        self.last_requested = None;
        self.measured = Size::ZERO;
        self.full_redraw = true;
    }
}

/// Why a relayout ended the pass early.
enum RelayoutAbort {
    Session,
    Surface(SurfaceError),
}

/// Per-pass bookkeeping.
struct Pass {
    index: u64,
    summary: TraversalSummaryBuilder,
}

fn local_bounds(size: Size) -> Rect {
    Rect::from_origin_size(Point::ORIGIN, size)
}

impl ViewRoot {
    /// Adds traversal work, scheduling a frame unless the running pass
    /// will still pick it up.
    pub(super) fn raise(&mut self, flags: TraversalFlags) {
        if flags.is_empty() {
            return;
        }
        self.traversal.flags |= flags;
        if let Some(phase) = self.traversal.phase
            && phase < flags.consumed_in()
        {
            return;
        }
        self.schedule_traversal();
    }

    pub(super) fn schedule_traversal(&mut self) {
        if !self.is_attached() {
            return;
        }
        if self.scheduler.schedule(&mut *self.clock, &mut *self.looper) {
            let now = self.clock.now();
            self.tracer.traversal_scheduled(now);
        }
    }

    fn begin_phase(&mut self, pass: &mut Pass, phase: TraversalPhase) {
        self.traversal.phase = Some(phase);
        let timestamp = self.clock.now();
        pass.summary.phase_begin(phase, timestamp);
        self.tracer.phase_begin(&PhaseBeginEvent {
            frame_index: pass.index,
            phase,
            timestamp,
        });
    }

    fn end_phase(&mut self, pass: &mut Pass, phase: TraversalPhase) {
        let timestamp = self.clock.now();
        pass.summary.phase_end(phase, timestamp);
        self.tracer.phase_end(&PhaseEndEvent {
            frame_index: pass.index,
            phase,
            timestamp,
        });
    }

    fn end_traversal(&mut self, pass: Pass) {
        self.traversal.phase = None;
        let summary = pass.summary.finish();
        self.tracer.traversal_summary(&summary);
    }

    fn effective_visibility(&self) -> Visibility {
        if self.state.app_visible {
            self.traversal.attributes.visibility
        } else {
            Visibility::Gone
        }
    }

    /// Runs one traversal.
    pub(super) fn perform_traversal(&mut self, tick: FrameTick) {
        if !self.is_attached() {
            return;
        }
        let mut pass = Pass {
            index: tick.frame_index,
            summary: TraversalSummaryBuilder::new(tick.frame_index, tick.now),
        };
        let first = self.traversal.first;
        self.traversal.phase = Some(TraversalPhase::Attributes);

        let mut frame_changed = false;
        if let Some(frame) = self.traversal.pending_frame.take() {
            if frame.size() != self.traversal.frame.size() {
                frame_changed = true;
                self.traversal.full_redraw = true;
            }
            self.traversal.frame = frame;
        }
        let mut insets_changed = first;
        if let Some(insets) = self.traversal.pending_insets.take()
            && insets != self.traversal.insets
        {
            self.traversal.insets = insets;
            self.traversal.flags |= TraversalFlags::NEEDS_APPLY_INSETS;
            insets_changed = true;
        }

        // -- attributes --
        let mut attributes_changed = false;
        if self.traversal.take_flag(TraversalFlags::ATTRIBUTES_CHANGED) || first {
            self.begin_phase(&mut pass, TraversalPhase::Attributes);
            let attributes = self
                .tree
                .as_deref_mut()
                .map_or_else(WindowAttributes::default, |tree| tree.collect_attributes());
            if first || attributes != self.traversal.attributes {
                if attributes.visibility != self.traversal.attributes.visibility {
                    self.traversal.flags |= TraversalFlags::VISIBILITY_CHANGED;
                }
                self.traversal.attributes = attributes;
                attributes_changed = true;
            }
            self.end_phase(&mut pass, TraversalPhase::Attributes);
        }

        let report_pending = self.traversal_flags().contains(TraversalFlags::REPORT_NEXT_DRAW);
        if self.state.stopped && !report_pending {
            tracing::debug!(
                frame_index = pass.index,
                "window stopped; skipping traversal"
            );
            self.end_traversal(pass);
            return;
        }

        // -- measure --
        let mut layout_needed = frame_changed;
        if self.traversal.take_flag(TraversalFlags::NEEDS_LAYOUT) || first {
            self.begin_phase(&mut pass, TraversalPhase::Measure);
            self.traversal.measured = self.measure_hierarchy();
            layout_needed = true;
            self.end_phase(&mut pass, TraversalPhase::Measure);
        }

        // -- relayout --
        let flags = self.traversal.flags;
        let requested = self.traversal.measured;
        let forced = TraversalFlags::VISIBILITY_CHANGED | TraversalFlags::FORCE_RELAYOUT;
        if first
            || self.traversal.last_requested != Some(requested)
            || insets_changed
            || attributes_changed
            || flags.intersects(forced)
        {
            self.begin_phase(&mut pass, TraversalPhase::Relayout);
            let request = RelayoutRequest {
                attributes: self.traversal.attributes,
                requested_size: requested,
                visibility: self.effective_visibility(),
            };
            let result = self.session.relayout(&request);
            let timestamp = self.clock.now();
            self.tracer.relayout(&RelayoutEvent {
                frame_index: pass.index,
                requested,
                frame: result.as_ref().ok().map(|r| r.frame),
                timestamp,
            });
            let applied = match result {
                Ok(result) => {
                    pass.summary.set_relayout();
                    self.traversal.last_requested = Some(requested);
                    self.apply_relayout(result)
                }
                Err(error) => {
                    tracing::warn!(%error, "relayout failed; retrying next frame");
                    Err(RelayoutAbort::Session)
                }
            };
            self.end_phase(&mut pass, TraversalPhase::Relayout);
            match applied {
                Ok(resized) => layout_needed |= resized,
                Err(abort) => {
                    self.traversal.flags |=
                        TraversalFlags::FORCE_RELAYOUT | TraversalFlags::NEEDS_LAYOUT;
                    match abort {
                        RelayoutAbort::Surface(error) => self.surface_failed(error),
                        RelayoutAbort::Session => self.schedule_traversal(),
                    }
                    self.end_traversal(pass);
                    return;
                }
            }
        }

        // The window manager may have given a different size than measured.
        let frame_size = self.traversal.frame.size();
        if layout_needed
            && !self.traversal.frame.is_zero_area()
            && frame_size != self.traversal.measured
        {
            self.begin_phase(&mut pass, TraversalPhase::Measure);
            let spec = MeasureSpec {
                width: Dimension::Exactly(frame_size.width),
                height: Dimension::Exactly(frame_size.height),
            };
            self.traversal.measured = self.tree_call(|tree, cx| tree.measure(cx, spec)).size;
            self.end_phase(&mut pass, TraversalPhase::Measure);
        }

        // -- layout --
        if layout_needed {
            self.begin_phase(&mut pass, TraversalPhase::Layout);
            self.layout_with_correction(&mut pass);
            for transition in self.cx.take_transitions() {
                self.tree_call(|tree, cx| tree.start_transition(cx, transition));
            }
            self.end_phase(&mut pass, TraversalPhase::Layout);
        }

        // -- insets --
        if self.traversal.take_flag(TraversalFlags::NEEDS_APPLY_INSETS) || first {
            self.begin_phase(&mut pass, TraversalPhase::Insets);
            drop(self.cx.drain_marked(dirty::INSETS));
            let insets = self.traversal.insets;
            self.tree_call(|tree, cx| tree.dispatch_apply_insets(cx, insets));
            self.end_phase(&mut pass, TraversalPhase::Insets);
        }
        if layout_needed
            && let Some(tree) = self.tree.as_deref_mut()
            && let Some(given) = tree.given_insets()
            && self.traversal.last_given != Some(given)
        {
            self.session.set_insets(&given);
            self.traversal.last_given = Some(given);
        }

        // -- draw --
        let flags = self.traversal.flags;
        let report = flags.contains(TraversalFlags::REPORT_NEXT_DRAW);
        if self.effective_visibility() != Visibility::Visible || self.state.stopped {
            if report {
                self.traversal.flags -= TraversalFlags::REPORT_NEXT_DRAW;
                self.session.report_draw_complete(pass.index);
            }
            self.traversal.full_redraw = true;
        } else if self.traversal.surface.is_none() {
            tracing::debug!(frame_index = pass.index, "no surface; draw stays pending");
        } else if report
            || flags.contains(TraversalFlags::NEEDS_DRAW)
            || self.traversal.full_redraw
        {
            self.draw(&mut pass, report);
        }

        self.traversal.first = false;
        self.end_traversal(pass);
    }

    /// Measures against the display or the current frame.
    fn measure_hierarchy(&mut self) -> Size {
        let attributes = self.traversal.attributes;
        let display = self.config.traversal.display_size;
        let frame = self.traversal.frame;
        let available = |mode: SizeMode, frame_extent: f64, display_extent: f64| match mode {
            SizeMode::WrapContent => display_extent,
            SizeMode::Fill if frame.is_zero_area() => display_extent,
            SizeMode::Fill => frame_extent,
        };
        let width = available(attributes.width, frame.width(), display.width);
        let height = available(attributes.height, frame.height(), display.height);
        let height = match attributes.height {
            SizeMode::Fill => Dimension::Exactly(height),
            SizeMode::WrapContent => Dimension::AtMost(height),
        };

        if attributes.width == SizeMode::WrapContent {
            let preferred = self.config.traversal.preferred_wrap_width;
            if preferred < width {
                for candidate in [preferred, (preferred + width) / 2.0] {
                    let spec = MeasureSpec {
                        width: Dimension::AtMost(candidate),
                        height,
                    };
                    let result = self.tree_call(|tree, cx| tree.measure(cx, spec));
                    if !result.too_small {
                        return result.size;
                    }
                }
            }
            let spec = MeasureSpec {
                width: Dimension::AtMost(width),
                height,
            };
            return self.tree_call(|tree, cx| tree.measure(cx, spec)).size;
        }

        let spec = MeasureSpec {
            width: Dimension::Exactly(width),
            height,
        };
        self.tree_call(|tree, cx| tree.measure(cx, spec)).size
    }

    /// Applies the window manager's answer. Returns whether the frame size
    /// changed.
    fn apply_relayout(&mut self, result: RelayoutResult) -> Result<bool, RelayoutAbort> {
        let resized = result.frame.size() != self.traversal.frame.size();
        if resized {
            self.traversal.full_redraw = true;
        }
        self.traversal.frame = result.frame;
        if result.insets != self.traversal.insets {
            self.traversal.insets = result.insets;
            self.traversal.flags |= TraversalFlags::NEEDS_APPLY_INSETS;
        }
        self.set_touch_mode(result.flags.contains(RelayoutFlags::IN_TOUCH_MODE), false);
        let settled = TraversalFlags::FORCE_RELAYOUT | TraversalFlags::VISIBILITY_CHANGED;
        self.traversal.flags.remove(settled);

        let size = result.frame.size();
        match result.surface {
            SurfaceChange::Created(surface) => {
                self.traversal.surface = Some(surface);
                self.traversal.full_redraw = true;
                self.sink
                    .configure_surface(surface, size)
                    .map_err(RelayoutAbort::Surface)?;
            }
            SurfaceChange::Destroyed => {
                if self.traversal.surface.take().is_some() {
                    self.sink.release_surface();
                }
            }
            SurfaceChange::Unchanged => {
                if (resized || result.flags.contains(RelayoutFlags::SURFACE_CHANGED))
                    && let Some(surface) = self.traversal.surface
                {
                    self.traversal.full_redraw = true;
                    self.sink
                    .configure_surface(surface, size)
                    .map_err(RelayoutAbort::Surface)?;
                }
            }
        }
        Ok(resized)
    }

    /// Lays out, then runs corrective passes for views that requested
    /// layout while being laid out.
    fn layout_with_correction(&mut self, pass: &mut Pass) {
        let bounds = local_bounds(self.traversal.frame.size());
        // Requests raised before layout were folded or scheduled already.
        drop(self.cx.drain_marked(dirty::LAYOUT));
        self.tree_call_raw(|tree, cx| tree.layout(cx, bounds));
        pass.summary.layout_pass();

        let mut budget = self.config.traversal.corrective_layout_passes;
        loop {
            self.absorb_capture_request();
            let requests = self.cx.take_requests();
            let others = TraversalFlags::from_requests(requests - TreeRequests::LAYOUT);
            self.raise(others);
            if !requests.contains(TreeRequests::LAYOUT) {
                break;
            }
            let marked = self.cx.drain_marked(dirty::LAYOUT);
            let requesters: Vec<ViewId> = marked
                .into_iter()
                .filter(|view| self.view_attached(*view))
                .collect();
            if requesters.is_empty() {
                break;
            }
            if budget == 0 {
                tracing::debug!(
                    frame_index = pass.index,
                    views = requesters.len(),
                    "layout requested during corrective pass; deferring to next frame"
                );
                self.traversal.flags.insert(TraversalFlags::NEEDS_LAYOUT);
                self.schedule_traversal();
                break;
            }
            budget -= 1;

            if let Some(tree) = self.tree.as_deref_mut() {
                for view in &requesters {
                    tree.force_layout(*view);
                }
            }
            let spec = MeasureSpec {
                width: Dimension::Exactly(bounds.width()),
                height: Dimension::Exactly(bounds.height()),
            };
            self.tree_call_raw(|tree, cx| tree.measure(cx, spec));
            self.tree_call_raw(|tree, cx| tree.layout(cx, bounds));
            pass.summary.layout_pass();
        }
    }

    fn draw(&mut self, pass: &mut Pass, sync: bool) {
        self.begin_phase(pass, TraversalPhase::Draw);
        let drawn = TraversalFlags::NEEDS_DRAW | TraversalFlags::REPORT_NEXT_DRAW;
        self.traversal.flags.remove(drawn);
        let full = core::mem::take(&mut self.traversal.full_redraw);
        let marked = self.cx.drain_marked(dirty::DRAW);
        let dirty = marked
            .into_iter()
            .filter(|view| self.view_attached(*view))
            .collect();
        let size = self.traversal.frame.size();
        let request = DrawRequest {
            frame_index: pass.index,
            bounds: local_bounds(size),
            dirty,
            full,
        };
        let outcome = self.tree_call(|tree, cx| tree.draw(cx, &request));

        let painted = u32::try_from(outcome.painted.len()).unwrap_or(u32::MAX);
        let frame = SurfaceFrame {
            frame_index: pass.index,
            size,
            painted: outcome.painted,
            full,
        };
        let commit_callbacks = self.sink.supports_commit_callback();
        let waiters = self.draw_listeners.len() + usize::from(commit_callbacks);
        let latch = sync.then(|| DrawLatch::new(waiters));
        if let Some(latch) = &latch {
            for listener in &mut self.draw_listeners {
                listener(pass.index, latch.clone());
            }
        }
        let handle = self.handle.clone();
        let commit_latch = latch.clone();
        let on_commit: CommitCallback = Box::new(move |frame_index| {
            if let Some(latch) = commit_latch {
                latch.signal();
            }
            handle.draw_committed(frame_index);
        });

        match self.sink.submit(frame, on_commit) {
            Ok(()) => {
                pass.summary.set_drew();
                let timestamp = self.clock.now();
                self.tracer.draw_submitted(&DrawSubmittedEvent {
                    frame_index: pass.index,
                    painted,
                    full,
                    sync,
                    timestamp,
                });
                if !commit_callbacks {
                    self.tracer.draw_committed(&DrawCommittedEvent {
                        frame_index: pass.index,
                        timestamp,
                    });
                }
                if let Some(latch) = latch {
                    if !latch.wait_timeout(self.config.traversal.draw_wait_timeout) {
                        tracing::warn!(
                            frame_index = pass.index,
                            remaining = latch.remaining(),
                            "timed out waiting for a synchronous draw"
                        );
                    }
                    self.session.report_draw_complete(pass.index);
                }
            }
            Err(error) => {
                if sync {
                    self.traversal.flags |= TraversalFlags::REPORT_NEXT_DRAW;
                }
                self.surface_failed(error);
            }
        }
        self.end_phase(pass, TraversalPhase::Draw);
    }

    /// Forces a relayout and full redraw on the next frame. Ends the
    /// process when graphics memory is exhausted and cannot be reclaimed.
    fn surface_failed(&mut self, error: SurfaceError) {
        tracing::warn!(%error, "surface failure; forcing relayout");
        self.traversal.flags |= TraversalFlags::FORCE_RELAYOUT | TraversalFlags::NEEDS_DRAW;
        self.traversal.full_redraw = true;
        if error.is_memory_pressure() && !self.session.out_of_memory() {
            tracing::warn!("graphics memory could not be reclaimed; terminating");
            self.host.terminate();
        }
        self.schedule_traversal();
    }
}
