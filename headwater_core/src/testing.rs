// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording fakes for the root's peers and tree.
//!
//! Every fake shares one [`World`]: knobs the test sets up front and a log
//! of everything the root did.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use std::sync::Mutex;

use kurbo::{Insets, Rect, Size};

use crate::config::RootConfig;
use crate::error::{SessionError, SurfaceError};
use crate::event::{InputEvent, KeyAction, KeyCode, KeyEvent, MotionAction, MotionEvent};
use crate::peer::{
    AsyncToken, CommitCallback, FrameSink, ImePeer, NoNativeInput, PeerDispatch, ProcessHost,
    RelayoutFlags, RelayoutRequest, RelayoutResult, SurfaceChange, SurfaceFrame, SurfaceId,
    WindowSession,
};
use crate::record::Completion;
use crate::root::{RootParts, ViewRoot};
use crate::scheduler::{BarrierToken, CallbackKind, CallbackToken, FrameClock, FrameTick, Looper};
use crate::time::HostTime;
use crate::tree::{
    Dimension, DrawOutcome, DrawRequest, FocusDirection, GivenInsets, MeasureResult, MeasureSpec,
    TransitionId, TreeCx, ViewId, ViewTree, WindowAttributes,
};

/// A tree call, as seen by the fake tree.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Attached,
    Detached,
    WindowFocus(bool),
    TouchMode(bool),
    PointerCapture(bool),
    PreImeKey(KeyCode, KeyAction),
    Key(KeyCode, KeyAction),
    KeyTo(ViewId, KeyCode, KeyAction),
    UnhandledKey(KeyCode),
    Pointer(MotionAction),
    CapturedPointer(ViewId, MotionAction),
    Trackball,
    GenericMotion,
    MoveFocus(FocusDirection),
    Measure(MeasureSpec),
    Layout(Rect),
    ApplyInsets(Insets),
    StartTransition(TransitionId),
    Draw(u64),
}

/// Knobs and logs shared by every fake.
#[derive(Debug)]
pub(crate) struct World {
    // -- tree knobs --
    pub(crate) consume_keys: bool,
    pub(crate) consume_pointer: bool,
    pub(crate) unhandled_key_target: Option<ViewId>,
    pub(crate) attached_views: Vec<ViewId>,
    /// Layout passes that will ask `ViewId(1)` to be laid out again.
    pub(crate) layout_requests: u32,
    /// Invalidate `ViewId(1)` during the next layout.
    pub(crate) invalidate_during_layout: bool,
    /// Queue this transition during the next layout.
    pub(crate) transition_on_layout: Option<TransitionId>,
    /// Request pointer capture for this view on the next pointer event.
    pub(crate) capture_on_pointer: Option<ViewId>,
    pub(crate) content: Size,
    pub(crate) attributes: WindowAttributes,
    pub(crate) given_insets: Option<GivenInsets>,

    // -- peer knobs --
    pub(crate) ime_answers: VecDeque<PeerDispatch>,
    pub(crate) relayout_errors: VecDeque<SessionError>,
    pub(crate) window_frame: Rect,
    pub(crate) window_insets: Insets,
    /// Touch mode the window manager reports on relayout.
    pub(crate) wm_touch_mode: bool,
    pub(crate) submit_errors: VecDeque<SurfaceError>,
    pub(crate) reclaims_memory: bool,
    pub(crate) commit_callbacks: bool,

    // -- logs --
    pub(crate) calls: Vec<Call>,
    pub(crate) ime_tokens: Vec<AsyncToken>,
    pub(crate) ime_focus: Vec<bool>,
    pub(crate) relayouts: Vec<RelayoutRequest>,
    pub(crate) draw_reports: Vec<u64>,
    pub(crate) insets_reports: Vec<GivenInsets>,
    pub(crate) touch_mode_reports: Vec<bool>,
    pub(crate) configured: Vec<(SurfaceId, Size)>,
    pub(crate) released: u32,
    pub(crate) frames: Vec<SurfaceFrame>,
    pub(crate) terminated: bool,
    pub(crate) callbacks: Vec<(CallbackToken, CallbackKind)>,
    pub(crate) barriers: Vec<BarrierToken>,
    pub(crate) posted: u32,
    next_token: u64,
    surface_handed_out: bool,
    pub(crate) now: HostTime,
}

impl Default for World {
    fn default() -> Self {
        Self {
            consume_keys: false,
            consume_pointer: false,
            unhandled_key_target: None,
            attached_views: alloc::vec![ViewId(1), ViewId(2), ViewId(7)],
            layout_requests: 0,
            invalidate_during_layout: false,
            transition_on_layout: None,
            capture_on_pointer: None,
            content: Size::new(200.0, 100.0),
            attributes: WindowAttributes::default(),
            given_insets: None,
            ime_answers: VecDeque::new(),
            relayout_errors: VecDeque::new(),
            window_frame: Rect::new(0.0, 0.0, 400.0, 800.0),
            window_insets: Insets::ZERO,
            wm_touch_mode: true,
            submit_errors: VecDeque::new(),
            reclaims_memory: false,
            commit_callbacks: true,
            calls: Vec::new(),
            ime_tokens: Vec::new(),
            ime_focus: Vec::new(),
            relayouts: Vec::new(),
            draw_reports: Vec::new(),
            insets_reports: Vec::new(),
            touch_mode_reports: Vec::new(),
            configured: Vec::new(),
            released: 0,
            frames: Vec::new(),
            terminated: false,
            callbacks: Vec::new(),
            barriers: Vec::new(),
            posted: 0,
            next_token: 0,
            surface_handed_out: false,
            now: HostTime::ZERO,
        }
    }
}

impl World {
    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Key calls that reached the focused path, in order.
    pub(crate) fn keys(&self) -> Vec<(KeyCode, KeyAction)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Key(code, action) => Some((*code, *action)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

pub(crate) type Shared = Rc<RefCell<World>>;

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

pub(crate) struct FakeTree(pub(crate) Shared);

impl FakeTree {
    fn log(&self, call: Call) {
        self.0.borrow_mut().calls.push(call);
    }
}

impl ViewTree for FakeTree {
    fn dispatch_attached(&mut self, cx: &mut TreeCx) {
        _ = cx;
        self.log(Call::Attached);
    }

    fn dispatch_detached(&mut self, cx: &mut TreeCx) {
        _ = cx;
        self.log(Call::Detached);
    }

    fn dispatch_window_focus_changed(&mut self, cx: &mut TreeCx, focused: bool) {
        _ = cx;
        self.log(Call::WindowFocus(focused));
    }

    fn dispatch_touch_mode_changed(&mut self, cx: &mut TreeCx, in_touch_mode: bool) {
        _ = cx;
        self.log(Call::TouchMode(in_touch_mode));
    }

    fn dispatch_pointer_capture_changed(&mut self, cx: &mut TreeCx, captured: bool) {
        _ = cx;
        self.log(Call::PointerCapture(captured));
    }

    fn dispatch_key_pre_ime(&mut self, cx: &mut TreeCx, event: &KeyEvent) -> bool {
        _ = cx;
        self.log(Call::PreImeKey(event.code, event.action));
        false
    }

    fn dispatch_key(&mut self, cx: &mut TreeCx, event: &KeyEvent) -> bool {
        _ = cx;
        self.log(Call::Key(event.code, event.action));
        self.0.borrow().consume_keys
    }

    fn dispatch_key_to(&mut self, cx: &mut TreeCx, target: ViewId, event: &KeyEvent) -> bool {
        _ = cx;
        self.log(Call::KeyTo(target, event.code, event.action));
        true
    }

    fn dispatch_unhandled_key(&mut self, cx: &mut TreeCx, event: &KeyEvent) -> Option<ViewId> {
        _ = cx;
        self.log(Call::UnhandledKey(event.code));
        self.0.borrow().unhandled_key_target
    }

    fn dispatch_pointer(&mut self, cx: &mut TreeCx, event: &MotionEvent) -> bool {
        self.log(Call::Pointer(event.action));
        if let Some(view) = self.0.borrow_mut().capture_on_pointer.take() {
            cx.request_pointer_capture(view);
        }
        self.0.borrow().consume_pointer
    }

    fn dispatch_captured_pointer(
        &mut self,
        cx: &mut TreeCx,
        target: ViewId,
        event: &MotionEvent,
    ) -> bool {
        _ = cx;
        self.log(Call::CapturedPointer(target, event.action));
        true
    }

    fn dispatch_trackball(&mut self, cx: &mut TreeCx, event: &MotionEvent) -> bool {
        _ = (cx, event);
        self.log(Call::Trackball);
        false
    }

    fn dispatch_generic_motion(&mut self, cx: &mut TreeCx, event: &MotionEvent) -> bool {
        _ = (cx, event);
        self.log(Call::GenericMotion);
        false
    }

    fn move_focus(&mut self, cx: &mut TreeCx, direction: FocusDirection) -> bool {
        _ = cx;
        self.log(Call::MoveFocus(direction));
        false
    }

    fn is_attached(&self, view: ViewId) -> bool {
        self.0.borrow().attached_views.contains(&view)
    }

    fn collect_attributes(&mut self) -> WindowAttributes {
        self.0.borrow().attributes
    }

    fn measure(&mut self, cx: &mut TreeCx, spec: MeasureSpec) -> MeasureResult {
        _ = cx;
        self.log(Call::Measure(spec));
        let content = self.0.borrow().content;
        let fit = |extent: f64, dim: Dimension| match dim {
            Dimension::Exactly(v) => v,
            Dimension::AtMost(v) => extent.min(v),
        };
        let width = fit(content.width, spec.width);
        let height = fit(content.height, spec.height);
        MeasureResult {
            size: Size::new(width, height),
            too_small: content.width > spec.width.extent(),
        }
    }

    fn layout(&mut self, cx: &mut TreeCx, frame: Rect) {
        self.log(Call::Layout(frame));
        let mut world = self.0.borrow_mut();
        if world.layout_requests > 0 {
            world.layout_requests -= 1;
            cx.request_layout(ViewId(1));
        }
        if core::mem::take(&mut world.invalidate_during_layout) {
            cx.invalidate(ViewId(1));
        }
        if let Some(transition) = world.transition_on_layout.take() {
            cx.add_pending_transition(transition);
        }
    }

    fn dispatch_apply_insets(&mut self, cx: &mut TreeCx, insets: Insets) {
        _ = cx;
        self.log(Call::ApplyInsets(insets));
    }

    fn start_transition(&mut self, cx: &mut TreeCx, transition: TransitionId) {
        _ = cx;
        self.log(Call::StartTransition(transition));
    }

    fn draw(&mut self, cx: &mut TreeCx, request: &DrawRequest) -> DrawOutcome {
        _ = cx;
        self.log(Call::Draw(request.frame_index));
        DrawOutcome {
            painted: request.dirty.clone(),
        }
    }

    fn given_insets(&mut self) -> Option<GivenInsets> {
        self.0.borrow().given_insets
    }
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

struct FakeSession(Shared);

impl WindowSession for FakeSession {
    fn relayout(&mut self, request: &RelayoutRequest) -> Result<RelayoutResult, SessionError> {
        let mut world = self.0.borrow_mut();
        world.relayouts.push(*request);
        if let Some(error) = world.relayout_errors.pop_front() {
            return Err(error);
        }
        let surface = if world.surface_handed_out {
            SurfaceChange::Unchanged
        } else {
            world.surface_handed_out = true;
            SurfaceChange::Created(SurfaceId(1))
        };
        Ok(RelayoutResult {
            frame: world.window_frame,
            insets: world.window_insets,
            surface,
            flags: if world.wm_touch_mode {
                RelayoutFlags::IN_TOUCH_MODE
            } else {
                RelayoutFlags::empty()
            },
        })
    }

    fn report_draw_complete(&mut self, frame_index: u64) {
        self.0.borrow_mut().draw_reports.push(frame_index);
    }

    fn set_insets(&mut self, insets: &GivenInsets) {
        self.0.borrow_mut().insets_reports.push(*insets);
    }

    fn set_in_touch_mode(&mut self, in_touch_mode: bool) {
        self.0.borrow_mut().touch_mode_reports.push(in_touch_mode);
    }

    fn out_of_memory(&mut self) -> bool {
        self.0.borrow().reclaims_memory
    }
}

struct FakeIme(Shared);

impl ImePeer for FakeIme {
    fn dispatch_input_event(&mut self, event: &InputEvent, token: AsyncToken) -> PeerDispatch {
        _ = event;
        let mut world = self.0.borrow_mut();
        world.ime_tokens.push(token);
        world
            .ime_answers
            .pop_front()
            .unwrap_or(PeerDispatch::NotHandled)
    }

    fn window_focus_changed(&mut self, focused: bool) {
        self.0.borrow_mut().ime_focus.push(focused);
    }
}

struct FakeSink(Shared);

impl FrameSink for FakeSink {
    fn configure_surface(&mut self, surface: SurfaceId, size: Size) -> Result<(), SurfaceError> {
        self.0.borrow_mut().configured.push((surface, size));
        Ok(())
    }

    fn release_surface(&mut self) {
        self.0.borrow_mut().released += 1;
    }

    fn supports_commit_callback(&self) -> bool {
        self.0.borrow().commit_callbacks
    }

    fn submit(
        &mut self,
        frame: SurfaceFrame,
        on_commit: CommitCallback,
    ) -> Result<(), SurfaceError> {
        let frame_index = frame.frame_index;
        {
            let mut world = self.0.borrow_mut();
            if let Some(error) = world.submit_errors.pop_front() {
                return Err(error);
            }
            world.frames.push(frame);
            if !world.commit_callbacks {
                return Ok(());
            }
        }
        // Commits right away, from the compositor's thread.
        std::thread::spawn(move || on_commit(frame_index))
            .join()
            .unwrap();
        Ok(())
    }
}

struct FakeClock(Shared);

impl FrameClock for FakeClock {
    fn now(&self) -> HostTime {
        self.0.borrow().now
    }

    fn post_frame_callback(&mut self, kind: CallbackKind) -> CallbackToken {
        let mut world = self.0.borrow_mut();
        let token = CallbackToken(world.token());
        world.callbacks.push((token, kind));
        world.posted += 1;
        token
    }

    fn remove_frame_callback(&mut self, token: CallbackToken) {
        self.0.borrow_mut().callbacks.retain(|(t, _)| *t != token);
    }
}

struct FakeLooper(Shared);

impl Looper for FakeLooper {
    fn post_sync_barrier(&mut self) -> BarrierToken {
        let mut world = self.0.borrow_mut();
        let token = BarrierToken(world.token());
        world.barriers.push(token);
        token
    }

    fn remove_sync_barrier(&mut self, token: BarrierToken) {
        self.0.borrow_mut().barriers.retain(|t| *t != token);
    }
}

struct FakeHost(Shared);

impl ProcessHost for FakeHost {
    fn terminate(&mut self) {
        self.0.borrow_mut().terminated = true;
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A root wired to fakes.
pub(crate) struct Harness {
    pub(crate) root: ViewRoot,
    pub(crate) world: Shared,
    frame_index: u64,
}

impl Harness {
    pub(crate) fn new(config: RootConfig) -> Self {
        let world = Shared::default();
        let parts = RootParts {
            session: Box::new(FakeSession(world.clone())),
            ime: Box::new(FakeIme(world.clone())),
            native: Box::new(NoNativeInput),
            sink: Box::new(FakeSink(world.clone())),
            clock: Box::new(FakeClock(world.clone())),
            looper: Box::new(FakeLooper(world.clone())),
            host: Box::new(FakeHost(world.clone())),
            wake: None,
        };
        Self {
            root: ViewRoot::new(config, parts),
            world,
            frame_index: 0,
        }
    }

    /// Attaches a fake tree, focuses the window, and runs the first frame.
    pub(crate) fn attached(config: RootConfig) -> Self {
        let mut h = Self::new(config);
        h.world_mut().wm_touch_mode = config.initial_touch_mode;
        h.root.set_view(Box::new(FakeTree(h.world.clone())));
        h.root.window_focus_changed(true, config.initial_touch_mode);
        h.frame();
        h
    }

    /// Fires every posted frame callback as one frame.
    pub(crate) fn frame(&mut self) -> u64 {
        self.frame_index += 1;
        self.world.borrow_mut().callbacks.clear();
        let now = self.world.borrow().now;
        self.root.do_frame(FrameTick {
            frame_index: self.frame_index,
            now,
        });
        self.frame_index
    }

    /// Advances the fake clock and pumps.
    pub(crate) fn advance_to(&mut self, now: HostTime) {
        self.world.borrow_mut().now = now;
        self.root.pump(now);
    }

    pub(crate) fn world(&self) -> core::cell::Ref<'_, World> {
        self.world.borrow()
    }

    pub(crate) fn world_mut(&self) -> core::cell::RefMut<'_, World> {
        self.world.borrow_mut()
    }

    /// Number of posted, unfired traversal callbacks.
    pub(crate) fn pending_traversals(&self) -> usize {
        self.world()
            .callbacks
            .iter()
            .filter(|(_, kind)| *kind == CallbackKind::Traversal)
            .count()
    }
}

/// Completion outcomes, shared with the completion closures.
pub(crate) type Outcomes = Arc<Mutex<Vec<(InputEvent, bool)>>>;

/// A completion that appends to `outcomes`.
pub(crate) fn recorder(outcomes: &Outcomes) -> Option<Completion> {
    let outcomes = Arc::clone(outcomes);
    Some(Box::new(move |event: &InputEvent, handled: bool| {
        outcomes.lock().unwrap().push((event.clone(), handled));
    }))
}
