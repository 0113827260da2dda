// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The root coordinator.
//!
//! A [`ViewRoot`] hosts one [`ViewTree`] in one window. It owns the input
//! pipeline and the traversal cycle, and talks to the outside world only
//! through the peers handed to it in [`RootParts`].
//!
//! ```text
//!   input source ──► RootHandle ──► mailbox ─┐
//!                                            ▼
//!   enqueue_input_event ───────────────► PendingInput ──► stage chain ──► completion
//!                                            ▲                 │
//!                       synthesized keys ────┘◄── generators ◄─┘ (unconsumed)
//!
//!   TreeCx requests ──► TraversalFlags ──► TraversalScheduler ──► do_frame
//!                                                                   │
//!                       batched input, pending input ◄──────────────┤
//!                       attributes, measure, relayout, layout,  ◄───┘
//!                       insets, draw
//! ```
//!
//! # Threading
//!
//! A root is confined to the thread that created it; every public method
//! asserts this. Other threads use [`RootHandle`]. The host drives the root
//! by calling [`ViewRoot::pump`] when the mailbox is woken or a timer is
//! due ([`ViewRoot::next_deadline`]), and [`ViewRoot::do_frame`] when a
//! posted frame callback fires.
//!
//! # Completion
//!
//! Every enqueued event completes exactly once: when dispatch concludes, when
//! it is dropped, when the root detaches before delivering it, or when the
//! root is dropped while the event waits on an async peer.

mod input;
mod traverse;

pub use traverse::TraversalFlags;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use std::sync::mpsc::Receiver;
use std::thread::{self, ThreadId};

use kurbo::{Insets, Rect};

use crate::async_queue::AsyncStageQueue;
use crate::batch::MotionBatcher;
use crate::capture::UnhandledKeyCapture;
use crate::config::RootConfig;
use crate::device::{DeviceRegistry, InputDeviceInfo};
use crate::event::{DeviceId, InputEvent, MotionEvent, Source};
use crate::latch::DrawLatch;
use crate::mailbox::{self, RootHandle, RootMessage};
use crate::peer::{AsyncToken, FrameSink, ImePeer, NativeInputPeer, ProcessHost, WindowSession};
use crate::record::{Completion, EventRecord, PendingInput, RecordFlags, RecordId};
use crate::scheduler::{FrameClock, FrameTick, Looper, TraversalScheduler};
use crate::stage::StageChain;
use crate::synthetic::joystick::JoystickSynthesizer;
use crate::synthetic::keyboard::FallbackKeyboard;
use crate::synthetic::touch_nav::TouchNavigationSynthesizer;
use crate::synthetic::trackball::TrackballSynthesizer;
use crate::time::HostTime;
use crate::timer::TimerQueue;
use crate::trace::{DrawCommittedEvent, FinishEvent, InputEnqueuedEvent, TraceSink, Tracer};
use crate::tree::{PointerCaptureRequest, TreeCx, ViewId, ViewTree};
use traverse::TraversalState;

/// The peers a root talks to.
pub struct RootParts {
    /// Window manager.
    pub session: Box<dyn WindowSession>,
    /// Input method.
    pub ime: Box<dyn ImePeer>,
    /// Native input interceptor.
    pub native: Box<dyn NativeInputPeer>,
    /// Compositor.
    pub sink: Box<dyn FrameSink>,
    /// Frame-aligned callbacks.
    pub clock: Box<dyn FrameClock>,
    /// The owning thread's message queue.
    pub looper: Box<dyn Looper>,
    /// The hosting process.
    pub host: Box<dyn ProcessHost>,
    /// Called after every post to the root's mailbox, from the posting
    /// thread. The host uses it to schedule a [`ViewRoot::pump`].
    pub wake: Option<Box<dyn Fn() + Send + Sync>>,
}

impl fmt::Debug for RootParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootParts").finish_non_exhaustive()
    }
}

/// Observes synchronous draws.
///
/// Called with the frame index and a latch the listener must signal once
/// it has finished its part of the frame, from any thread.
pub type DrawListener = Box<dyn FnMut(u64, DrawLatch)>;

#[derive(Clone, Copy, Debug)]
struct WindowState {
    added: bool,
    removed: bool,
    focused: bool,
    stopped: bool,
    paused_for_transition: bool,
    ambient: bool,
    app_visible: bool,
    in_touch_mode: bool,
}

/// Coordinates input dispatch and traversal for one hosted tree.
pub struct ViewRoot {
    config: RootConfig,
    owner: ThreadId,

    tree: Option<Box<dyn ViewTree>>,
    cx: TreeCx,

    session: Box<dyn WindowSession>,
    ime: Box<dyn ImePeer>,
    native: Box<dyn NativeInputPeer>,
    sink: Box<dyn FrameSink>,
    clock: Box<dyn FrameClock>,
    looper: Box<dyn Looper>,
    host: Box<dyn ProcessHost>,

    handle: RootHandle,
    mailbox: Receiver<RootMessage>,
    state: WindowState,

    // -- input --
    chain: StageChain,
    pending: PendingInput,
    async_queues: [AsyncStageQueue; 3],
    next_record: u64,
    batcher: MotionBatcher,
    capture: UnhandledKeyCapture,
    pointer_capture: Option<ViewId>,
    devices: DeviceRegistry,
    timers: TimerQueue,
    trackball: TrackballSynthesizer,
    joystick: JoystickSynthesizer,
    touch_nav: TouchNavigationSynthesizer,
    fallback: FallbackKeyboard,

    // -- traversal --
    scheduler: TraversalScheduler,
    traversal: TraversalState,
    draw_listeners: Vec<DrawListener>,

    tracer: Tracer,
}

impl fmt::Debug for ViewRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRoot")
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("scheduler", &self.scheduler)
            .field("traversal", &self.traversal)
            .field("pointer_capture", &self.pointer_capture)
            .finish_non_exhaustive()
    }
}

impl ViewRoot {
    /// Creates a root bound to the calling thread. No tree is attached yet.
    #[must_use]
    pub fn new(config: RootConfig, parts: RootParts) -> Self {
        let RootParts {
            session,
            ime,
            native,
            sink,
            clock,
            looper,
            host,
            wake,
        } = parts;
        let (handle, mailbox) = mailbox::channel(wake);
        let mut cx = TreeCx::new();
        cx.set_in_touch_mode(config.initial_touch_mode);
        let input = config.input;
        Self {
            config,
            owner: thread::current().id(),
            tree: None,
            cx,
            session,
            ime,
            native,
            sink,
            clock,
            looper,
            host,
            handle,
            mailbox,
            state: WindowState {
                added: false,
                removed: false,
                focused: false,
                stopped: false,
                paused_for_transition: false,
                ambient: false,
                app_visible: true,
                in_touch_mode: config.initial_touch_mode,
            },
            chain: StageChain::new(),
            pending: PendingInput::new(),
            async_queues: core::array::from_fn(|_| AsyncStageQueue::new()),
            next_record: 0,
            batcher: MotionBatcher::new(),
            capture: UnhandledKeyCapture::new(),
            pointer_capture: None,
            devices: DeviceRegistry::new(),
            timers: TimerQueue::new(),
            trackball: TrackballSynthesizer::new(input.trackball),
            joystick: JoystickSynthesizer::new(input.joystick),
            touch_nav: TouchNavigationSynthesizer::new(input.touch_navigation),
            fallback: FallbackKeyboard::new(input.fallback_keys),
            scheduler: TraversalScheduler::new(),
            traversal: TraversalState::new(),
            draw_listeners: Vec::new(),
            tracer: Tracer::none(),
        }
    }

    #[track_caller]
    fn assert_owner(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "ViewRoot used off its owning thread"
        );
    }

    /// Routes trace events to `sink`.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.assert_owner();
        self.tracer = Tracer::new(sink);
    }

    /// Returns a handle for posting to this root from any thread.
    #[must_use]
    pub fn handle(&self) -> RootHandle {
        self.handle.clone()
    }

    /// Attaches the tree and schedules the first traversal.
    ///
    /// # Panics
    ///
    /// Panics if a tree is already attached or the root has detached.
    pub fn set_view(&mut self, tree: Box<dyn ViewTree>) {
        self.assert_owner();
        assert!(
            self.tree.is_none() && !self.state.removed,
            "ViewRoot can host one tree once"
        );
        self.tree = Some(tree);
        self.state.added = true;
        self.traversal.reset_for_attach();
        self.tree_call(|tree, cx| tree.dispatch_attached(cx));
        self.raise(TraversalFlags::FIRST_PASS);
    }

    /// Returns `true` while a tree is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.added && !self.state.removed
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Drains the mailbox, fires due timers, and delivers pending input.
    pub fn pump(&mut self, now: HostTime) {
        self.assert_owner();
        while let Ok(message) = self.mailbox.try_recv() {
            self.handle_message(message);
        }
        self.fire_timers(now);
        self.deliver_pending();
    }

    /// Earliest time [`pump`](Self::pump) has timer work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        self.timers.next_deadline()
    }

    /// Runs one frame: batched and pending input first, then the scheduled
    /// traversal, if any.
    pub fn do_frame(&mut self, tick: FrameTick) {
        self.assert_owner();
        self.consume_batched_input();
        self.deliver_pending();
        if self.scheduler.begin(&mut *self.looper) {
            self.perform_traversal(tick);
        }
    }

    fn handle_message(&mut self, message: RootMessage) {
        match message {
            RootMessage::Input {
                event,
                completion,
                flags,
            } => {
                self.queue_input(event, completion, flags);
            }
            RootMessage::BatchedMotion { event, completion } => {
                self.enqueue_batched_motion(event, completion);
            }
            RootMessage::Resized { frame, report_draw } => self.resized(frame, report_draw),
            RootMessage::InsetsChanged(insets) => self.insets_changed(insets),
            RootMessage::WindowFocusChanged {
                focused,
                in_touch_mode,
            } => self.window_focus_changed(focused, in_touch_mode),
            RootMessage::AppVisibility(visible) => self.set_app_visibility(visible),
            RootMessage::AsyncFinished { token, handled } => self.finish_async(token, handled),
            RootMessage::DrawCommitted { frame_index } => {
                let timestamp = self.clock.now();
                self.tracer.draw_committed(&DrawCommittedEvent {
                    frame_index,
                    timestamp,
                });
            }
            RootMessage::Die => self.die(),
        }
    }

    // -----------------------------------------------------------------------
    // Input entry points
    // -----------------------------------------------------------------------

    /// Enqueues an input event.
    ///
    /// Batched moves still waiting for a frame are queued ahead of the
    /// event, so input keeps its arrival order. With `immediate` the event
    /// (and anything queued before it) is delivered before returning;
    /// otherwise delivery happens on the next [`pump`](Self::pump) or frame.
    pub fn enqueue_input_event(
        &mut self,
        event: InputEvent,
        completion: Option<Completion>,
        flags: RecordFlags,
        immediate: bool,
    ) {
        self.assert_owner();
        self.queue_input(event, completion, flags);
        if immediate {
            self.deliver_pending();
        }
    }

    /// Enqueues a pointer move to be coalesced and consumed on the next
    /// frame, or sooner if a non-batched event arrives first.
    ///
    /// Each folded move's completion receives the move it was enqueued
    /// with, together with the outcome of the coalesced dispatch.
    pub fn enqueue_batched_motion(&mut self, event: MotionEvent, completion: Option<Completion>) {
        self.assert_owner();
        if !self.is_attached() {
            if let Some(completion) = completion {
                completion(&InputEvent::Motion(event), false);
            }
            return;
        }
        self.batcher.push(event, completion);
        self.scheduler.schedule_input(&mut *self.clock);
    }

    /// Completes a record parked at an async stage.
    ///
    /// A handled answer finishes the record; otherwise it continues down the
    /// chain. Completions for records that are no longer parked (for
    /// example after the root was dropped) are ignored.
    ///
    /// # Panics
    ///
    /// Panics if the same completion is delivered twice while the record is
    /// still queued behind an earlier record.
    pub fn finish_async(&mut self, token: AsyncToken, handled: bool) {
        self.assert_owner();
        self.resume_async(token, handled);
        self.deliver_pending();
    }

    /// Registers a device so synthesizers can read its geometry.
    pub fn register_input_device(&mut self, info: InputDeviceInfo) {
        self.assert_owner();
        self.devices.register(info);
    }

    /// Forgets a device.
    pub fn unregister_input_device(&mut self, id: DeviceId) {
        self.assert_owner();
        self.devices.unregister(id);
    }

    fn make_record(
        &mut self,
        event: InputEvent,
        completion: Option<Completion>,
        flags: RecordFlags,
    ) -> EventRecord {
        self.next_record += 1;
        let id = RecordId(self.next_record);
        let mut record = EventRecord::new(id, event, flags, completion);
        if self.config.compat_mouse_as_touch
            && let InputEvent::Motion(m) = record.event()
            && m.source == Source::Mouse
        {
            let mut rewritten = m.clone();
            rewritten.source = Source::Touchscreen;
            record.rewrite_for_compat(InputEvent::Motion(rewritten));
        }
        let event = record.event();
        self.tracer.input_enqueued(&InputEnqueuedEvent {
            record: id,
            device: event.device(),
            source: event.source(),
            kind: event.into(),
            timestamp: self.clock.now(),
        });
        record
    }

    /// Queues a non-batched event behind any batched moves that arrived
    /// before it.
    fn queue_input(
        &mut self,
        event: InputEvent,
        completion: Option<Completion>,
        flags: RecordFlags,
    ) {
        self.consume_batched_input();
        let record = self.make_record(event, completion, flags);
        self.pending.push(record);
    }

    fn consume_batched_input(&mut self) {
        for batch in self.batcher.take() {
            let (event, completion) = batch.into_parts();
            let record =
                self.make_record(InputEvent::Motion(event), completion, RecordFlags::empty());
            self.pending.push(record);
        }
    }

    fn complete(&mut self, mut record: EventRecord) {
        if !record.is_finished() {
            record.finish(false);
        }
        let id = record.id();
        let handled = record.complete();
        let timestamp = self.clock.now();
        self.tracer.finished(&FinishEvent {
            record: id,
            handled,
            timestamp,
        });
    }

    // -----------------------------------------------------------------------
    // Window events
    // -----------------------------------------------------------------------

    /// The window gained or lost input focus.
    pub fn window_focus_changed(&mut self, focused: bool, in_touch_mode: bool) {
        self.assert_owner();
        if !self.is_attached() {
            return;
        }
        self.set_touch_mode(in_touch_mode, false);
        self.state.focused = focused;
        self.cx.set_has_window_focus(focused);
        self.ime.window_focus_changed(focused);
        self.tree_call(|tree, cx| tree.dispatch_window_focus_changed(cx, focused));
        if !focused {
            self.release_pointer_capture();
            let now = self.clock.now();
            let out = self.joystick.cancel_all(now);
            self.apply_synth(out);
        }
        self.deliver_pending();
    }

    /// The window manager moved or resized the window.
    pub fn resized(&mut self, frame: Rect, report_draw: bool) {
        self.assert_owner();
        self.traversal.pending_frame = Some(frame);
        let mut flags = TraversalFlags::NEEDS_LAYOUT;
        if report_draw {
            flags |= TraversalFlags::REPORT_NEXT_DRAW | TraversalFlags::FORCE_RELAYOUT;
        }
        self.raise(flags);
    }

    /// System insets changed.
    pub fn insets_changed(&mut self, insets: Insets) {
        self.assert_owner();
        self.traversal.pending_insets = Some(insets);
        self.raise(TraversalFlags::NEEDS_LAYOUT);
    }

    /// The window stopped or resumed. Input is dropped and traversals skip
    /// layout and drawing while stopped.
    pub fn set_stopped(&mut self, stopped: bool) {
        self.assert_owner();
        if self.state.stopped == stopped {
            return;
        }
        self.state.stopped = stopped;
        if !stopped {
            self.traversal.full_redraw = true;
            self.raise(TraversalFlags::NEEDS_DRAW);
        }
    }

    /// While paused for an activity transition only BACK keys are
    /// delivered.
    pub fn set_paused_for_transition(&mut self, paused: bool) {
        self.assert_owner();
        self.state.paused_for_transition = paused;
    }

    /// In ambient mode only button input is delivered.
    pub fn set_ambient_mode(&mut self, ambient: bool) {
        self.assert_owner();
        self.state.ambient = ambient;
    }

    /// The application became visible or hidden.
    pub fn set_app_visibility(&mut self, visible: bool) {
        self.assert_owner();
        if self.state.app_visible == visible {
            return;
        }
        self.state.app_visible = visible;
        self.raise(TraversalFlags::VISIBILITY_CHANGED);
    }

    /// Detaches the tree.
    ///
    /// Scheduled callbacks are withdrawn and undelivered input completes as
    /// not handled. Records parked at async peers stay parked; their late
    /// completions are honored without reaching the tree.
    pub fn die(&mut self) {
        self.assert_owner();
        if !self.is_attached() {
            return;
        }
        self.release_pointer_capture();
        self.tree_call(|tree, cx| tree.dispatch_detached(cx));
        self.state.removed = true;
        self.scheduler.unschedule(&mut *self.clock, &mut *self.looper);
        self.timers.clear();
        self.capture.clear();
        self.fallback.clear();
        self.draw_listeners.clear();
        self.sink.release_surface();
        self.traversal.surface = None;
        self.tree = None;

        for batch in self.batcher.take() {
            let (event, completion) = batch.into_parts();
            if let Some(completion) = completion {
                completion(&InputEvent::Motion(event), false);
            }
        }
        let pending: Vec<_> = self.pending.drain().collect();
        for record in pending {
            tracing::debug!(record = ?record.id(), "dropping input queued before detach");
            self.complete(record);
        }
    }

    // -----------------------------------------------------------------------
    // Traversal requests from outside the tree
    // -----------------------------------------------------------------------

    /// Requests a measure and layout.
    pub fn request_layout(&mut self) {
        self.assert_owner();
        self.raise(TraversalFlags::NEEDS_LAYOUT);
    }

    /// Requests a redraw.
    pub fn invalidate(&mut self) {
        self.assert_owner();
        self.raise(TraversalFlags::NEEDS_DRAW);
    }

    /// Requests an insets dispatch.
    pub fn request_apply_insets(&mut self) {
        self.assert_owner();
        self.raise(TraversalFlags::NEEDS_APPLY_INSETS);
    }

    /// Makes the next draw synchronous and reported to the window manager.
    pub fn request_draw_report(&mut self) {
        self.assert_owner();
        let flags = TraversalFlags::REPORT_NEXT_DRAW | TraversalFlags::NEEDS_DRAW;
        self.raise(flags);
    }

    /// Adds a listener that takes part in every synchronous draw.
    pub fn register_draw_listener(&mut self, listener: DrawListener) {
        self.assert_owner();
        self.draw_listeners.push(listener);
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Whether the window is in touch mode.
    #[must_use]
    pub fn in_touch_mode(&self) -> bool {
        self.state.in_touch_mode
    }

    /// Whether the window has input focus.
    #[must_use]
    pub fn has_window_focus(&self) -> bool {
        self.state.focused
    }

    /// The view holding pointer capture.
    #[must_use]
    pub fn pointer_capture(&self) -> Option<ViewId> {
        self.pointer_capture
    }

    /// Whether a traversal is scheduled.
    #[must_use]
    pub fn is_traversal_scheduled(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    /// Traversal work not yet done.
    #[must_use]
    pub fn traversal_flags(&self) -> TraversalFlags {
        self.traversal.flags
    }

    /// Current window frame.
    #[must_use]
    pub fn frame(&self) -> Rect {
        self.traversal.frame
    }

    /// Records waiting for delivery.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.pending.len()
    }

    /// Records parked at async peers.
    #[must_use]
    pub fn parked_input(&self) -> usize {
        self.async_queues.iter().map(AsyncStageQueue::len).sum()
    }

    // -----------------------------------------------------------------------
    // Tree plumbing
    // -----------------------------------------------------------------------

    /// Calls into the tree and folds whatever it requested.
    ///
    /// Returns `R::default()` when no tree is attached.
    fn tree_call<R: Default>(&mut self, f: impl FnOnce(&mut dyn ViewTree, &mut TreeCx) -> R) -> R {
        let r = self.tree_call_raw(f);
        self.absorb_requests();
        r
    }

    /// Calls into the tree, leaving its requests in the context.
    fn tree_call_raw<R: Default>(
        &mut self,
        f: impl FnOnce(&mut dyn ViewTree, &mut TreeCx) -> R,
    ) -> R {
        match self.tree.as_deref_mut() {
            Some(tree) => f(tree, &mut self.cx),
            None => R::default(),
        }
    }

    fn view_attached(&self, view: ViewId) -> bool {
        self.tree
            .as_deref()
            .is_some_and(|tree| tree.is_attached(view))
    }

    fn absorb_requests(&mut self) {
        self.absorb_capture_request();
        let requests = self.cx.take_requests();
        self.raise(TraversalFlags::from_requests(requests));
    }

    fn absorb_capture_request(&mut self) {
        match self.cx.take_capture_request() {
            Some(PointerCaptureRequest::Capture(view)) => self.capture_pointer(view),
            Some(PointerCaptureRequest::Release) => self.release_pointer_capture(),
            None => {}
        }
    }

    fn capture_pointer(&mut self, view: ViewId) {
        if !self.state.focused {
            tracing::debug!(?view, "pointer capture refused without window focus");
            return;
        }
        let was_captured = self.pointer_capture.replace(view).is_some();
        if !was_captured {
            self.tree_call(|tree, cx| tree.dispatch_pointer_capture_changed(cx, true));
        }
    }

    fn release_pointer_capture(&mut self) {
        if self.pointer_capture.take().is_some() {
            self.tree_call(|tree, cx| tree.dispatch_pointer_capture_changed(cx, false));
        }
    }

    /// Enters or leaves touch mode. Returns `true` if leaving touch mode
    /// moved focus into the tree.
    fn set_touch_mode(&mut self, in_touch_mode: bool, report: bool) -> bool {
        if self.state.in_touch_mode == in_touch_mode || !self.is_attached() {
            return false;
        }
        self.state.in_touch_mode = in_touch_mode;
        self.cx.set_in_touch_mode(in_touch_mode);
        if report {
            self.session.set_in_touch_mode(in_touch_mode);
        }
        self.tree_call(|tree, cx| {
            tree.dispatch_touch_mode_changed(cx, in_touch_mode);
        });
        !in_touch_mode && self.tree_call(|tree, cx| tree.restore_default_focus(cx))
    }
}

impl Drop for ViewRoot {
    fn drop(&mut self) {
        for queue in &mut self.async_queues {
            for record in queue.take_all() {
                record.abandon();
            }
        }
        for record in self.pending.drain() {
            record.abandon();
        }
        for batch in self.batcher.take() {
            let (event, completion) = batch.into_parts();
            if let Some(completion) = completion {
                completion(&InputEvent::Motion(event), false);
            }
        }
    }
}
