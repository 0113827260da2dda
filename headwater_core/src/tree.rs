// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract between the root coordinator and the UI tree it hosts.
//!
//! The root never looks inside the tree. It calls [`ViewTree`] methods to
//! dispatch input, measure, lay out, and draw, and the tree calls back into
//! the root only through the [`TreeCx`] it is handed: requesting layout,
//! invalidating pixels, asking for insets, capturing the pointer, or queuing
//! a transition. The root drains those requests after each call and turns
//! them into traversal scheduling.
//!
//! Views are named by [`ViewId`]. The root holds ids weakly: before routing
//! to a remembered view it asks [`ViewTree::is_attached`].

use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;
use kurbo::{Insets, Rect, Size};
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::dirty;
use crate::event::{KeyEvent, MotionEvent};

/// Identifies a view in the hosted tree.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub u32);

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self.0)
    }
}

/// Identifies a queued layout transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransitionId(pub u32);

/// Direction for keyboard focus navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FocusDirection {
    /// Toward the top of the window.
    Up,
    /// Toward the bottom of the window.
    Down,
    /// Toward the left edge.
    Left,
    /// Toward the right edge.
    Right,
    /// Next in tab order.
    Forward,
    /// Previous in tab order.
    Backward,
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// One axis of a measurement constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dimension {
    /// The tree must take exactly this extent.
    Exactly(f64),
    /// The tree may take up to this extent.
    AtMost(f64),
}

impl Dimension {
    /// The extent carried by the constraint.
    #[must_use]
    pub const fn extent(self) -> f64 {
        match self {
            Self::Exactly(v) | Self::AtMost(v) => v,
        }
    }
}

/// Constraints for measuring the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasureSpec {
    /// Horizontal constraint.
    pub width: Dimension,
    /// Vertical constraint.
    pub height: Dimension,
}

/// What measuring the tree produced.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasureResult {
    /// Desired size.
    pub size: Size,
    /// The content did not fit the constraint and wants more room.
    pub too_small: bool,
}

// ---------------------------------------------------------------------------
// Window attributes
// ---------------------------------------------------------------------------

/// How the window sizes itself along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SizeMode {
    /// Take all the space the display offers.
    #[default]
    Fill,
    /// Take only what the content needs.
    WrapContent,
}

/// Visibility the tree requests for its window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Shown.
    #[default]
    Visible,
    /// Hidden but still sized.
    Invisible,
    /// Hidden and not taking space.
    Gone,
}

bitflags! {
    /// System bars the tree asks to hide.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SystemBars: u8 {
        /// Status bar.
        const STATUS = 1 << 0;
        /// Navigation bar.
        const NAVIGATION = 1 << 1;
    }
}

/// Window-level attributes aggregated from the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowAttributes {
    /// Horizontal sizing.
    pub width: SizeMode,
    /// Vertical sizing.
    pub height: SizeMode,
    /// Some view wants the display kept awake.
    pub keep_screen_on: bool,
    /// Bars the tree wants hidden.
    pub hidden_bars: SystemBars,
    /// Requested window visibility.
    pub visibility: Visibility,
}

/// Insets the tree gives back to the window manager.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GivenInsets {
    /// Area covered by content the window manager should avoid.
    pub content: Insets,
    /// Area actually visible to the user.
    pub visible: Insets,
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Parameters for one draw of the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRequest {
    /// Frame counter of the traversal.
    pub frame_index: u64,
    /// Window bounds, in window coordinates.
    pub bounds: Rect,
    /// Views that invalidated since the last draw.
    pub dirty: Vec<ViewId>,
    /// Redraw everything (new surface, size change).
    pub full: bool,
}

/// What the tree painted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawOutcome {
    /// Views that produced new content.
    pub painted: Vec<ViewId>,
}

// ---------------------------------------------------------------------------
// TreeCx
// ---------------------------------------------------------------------------

bitflags! {
    /// Requests raised by the tree during a call.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TreeRequests: u8 {
        /// Measure and lay out again.
        const LAYOUT = 1 << 0;
        /// Draw again.
        const DRAW = 1 << 1;
        /// Dispatch insets again.
        const APPLY_INSETS = 1 << 2;
        /// Recompute window attributes.
        const ATTRIBUTES = 1 << 3;
    }
}

/// A pointer-capture change requested by the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerCaptureRequest {
    /// Route pointer events to this view.
    Capture(ViewId),
    /// Stop capturing.
    Release,
}

/// The tree's handle back into the root.
pub struct TreeCx {
    pub(crate) dirty: DirtyTracker<u32>,
    requests: TreeRequests,
    capture_request: Option<PointerCaptureRequest>,
    transitions: Vec<TransitionId>,
    in_touch_mode: bool,
    has_window_focus: bool,
}

impl fmt::Debug for TreeCx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeCx")
            .field("requests", &self.requests)
            .field("capture_request", &self.capture_request)
            .field("transitions", &self.transitions)
            .field("in_touch_mode", &self.in_touch_mode)
            .field("has_window_focus", &self.has_window_focus)
            .finish_non_exhaustive()
    }
}

impl Default for TreeCx {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeCx {
    /// Creates a context with no pending requests.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            requests: TreeRequests::empty(),
            capture_request: None,
            transitions: Vec::new(),
            in_touch_mode: true,
            has_window_focus: false,
        }
    }

    /// `view` needs to be measured and laid out again.
    pub fn request_layout(&mut self, view: ViewId) {
        self.dirty.mark(view.0, dirty::LAYOUT);
        self.requests.insert(TreeRequests::LAYOUT);
    }

    /// `view` needs to be redrawn.
    pub fn invalidate(&mut self, view: ViewId) {
        self.dirty.mark(view.0, dirty::DRAW);
        self.requests.insert(TreeRequests::DRAW);
    }

    /// `view` wants insets dispatched again.
    pub fn request_apply_insets(&mut self, view: ViewId) {
        self.dirty.mark(view.0, dirty::INSETS);
        self.requests.insert(TreeRequests::APPLY_INSETS);
    }

    /// Window-level attributes (keep-awake, bars, sizing) changed.
    pub fn attributes_changed(&mut self) {
        self.requests.insert(TreeRequests::ATTRIBUTES);
    }

    /// Routes subsequent pointer events to `view`.
    pub fn request_pointer_capture(&mut self, view: ViewId) {
        self.capture_request = Some(PointerCaptureRequest::Capture(view));
    }

    /// Ends pointer capture.
    pub fn release_pointer_capture(&mut self) {
        self.capture_request = Some(PointerCaptureRequest::Release);
    }

    /// Queues a transition to start after the next layout.
    pub fn add_pending_transition(&mut self, transition: TransitionId) {
        self.transitions.push(transition);
        self.requests.insert(TreeRequests::LAYOUT);
    }

    /// Whether the window is in touch mode.
    #[must_use]
    pub fn in_touch_mode(&self) -> bool {
        self.in_touch_mode
    }

    /// Whether the window has input focus.
    #[must_use]
    pub fn has_window_focus(&self) -> bool {
        self.has_window_focus
    }

    // -- root side --

    pub(crate) fn take_requests(&mut self) -> TreeRequests {
        core::mem::take(&mut self.requests)
    }

    pub(crate) fn take_capture_request(&mut self) -> Option<PointerCaptureRequest> {
        self.capture_request.take()
    }

    pub(crate) fn take_transitions(&mut self) -> Vec<TransitionId> {
        core::mem::take(&mut self.transitions)
    }

    pub(crate) fn set_in_touch_mode(&mut self, in_touch_mode: bool) {
        self.in_touch_mode = in_touch_mode;
    }

    pub(crate) fn set_has_window_focus(&mut self, focused: bool) {
        self.has_window_focus = focused;
    }

    /// Drains the views marked on `channel`, in deterministic order.
    pub(crate) fn drain_marked(&mut self, channel: understory_dirty::Channel) -> Vec<ViewId> {
        self.dirty
            .drain(channel)
            .deterministic()
            .run()
            .map(ViewId)
            .collect()
    }

    /// Forgets a view that left the tree.
    pub fn forget(&mut self, view: ViewId) {
        self.dirty.remove_key(view.0);
    }
}

// ---------------------------------------------------------------------------
// ViewTree
// ---------------------------------------------------------------------------

/// The hosted UI tree.
///
/// Every call happens on the root's owning thread. Dispatch methods return
/// `true` when the event was consumed. Methods with default bodies are
/// hooks a minimal tree may ignore.
pub trait ViewTree {
    /// The tree was attached to a window.
    fn dispatch_attached(&mut self, cx: &mut TreeCx) {
        _ = cx;
    }

    /// The tree is leaving its window.
    fn dispatch_detached(&mut self, cx: &mut TreeCx) {
        _ = cx;
    }

    /// The window gained or lost input focus.
    fn dispatch_window_focus_changed(&mut self, cx: &mut TreeCx, focused: bool) {
        _ = (cx, focused);
    }

    /// The window entered or left touch mode.
    fn dispatch_touch_mode_changed(&mut self, cx: &mut TreeCx, in_touch_mode: bool) {
        _ = (cx, in_touch_mode);
    }

    /// Pointer capture started or ended.
    fn dispatch_pointer_capture_changed(&mut self, cx: &mut TreeCx, captured: bool) {
        _ = (cx, captured);
    }

    /// Offers a key to the tree before the input method sees it.
    fn dispatch_key_pre_ime(&mut self, cx: &mut TreeCx, event: &KeyEvent) -> bool {
        _ = (cx, event);
        false
    }

    /// Ordinary key dispatch through the focused path.
    fn dispatch_key(&mut self, cx: &mut TreeCx, event: &KeyEvent) -> bool;

    /// Delivers a key straight to `target`.
    fn dispatch_key_to(&mut self, cx: &mut TreeCx, target: ViewId, event: &KeyEvent) -> bool {
        _ = (cx, target, event);
        false
    }

    /// Offers an unconsumed key to unhandled-key listeners. Returns the view
    /// that consumed it, which then receives the key's repeats and release.
    fn dispatch_unhandled_key(&mut self, cx: &mut TreeCx, event: &KeyEvent) -> Option<ViewId> {
        _ = (cx, event);
        None
    }

    /// Pointer (touch, mouse, stylus) dispatch by hit testing.
    fn dispatch_pointer(&mut self, cx: &mut TreeCx, event: &MotionEvent) -> bool;

    /// Pointer dispatch to the view holding pointer capture.
    fn dispatch_captured_pointer(
        &mut self,
        cx: &mut TreeCx,
        target: ViewId,
        event: &MotionEvent,
    ) -> bool {
        _ = (cx, target, event);
        false
    }

    /// Trackball dispatch through the focused path.
    fn dispatch_trackball(&mut self, cx: &mut TreeCx, event: &MotionEvent) -> bool {
        _ = (cx, event);
        false
    }

    /// Joystick, scroll, hover, and other non-pointer motion.
    fn dispatch_generic_motion(&mut self, cx: &mut TreeCx, event: &MotionEvent) -> bool {
        _ = (cx, event);
        false
    }

    /// Moves keyboard focus. Returns `true` if focus moved.
    fn move_focus(&mut self, cx: &mut TreeCx, direction: FocusDirection) -> bool {
        _ = (cx, direction);
        false
    }

    /// Restores focus after leaving touch mode. Returns `true` if a view
    /// took focus.
    fn restore_default_focus(&mut self, cx: &mut TreeCx) -> bool {
        _ = cx;
        false
    }

    /// Returns `true` while `view` is part of the attached tree.
    fn is_attached(&self, view: ViewId) -> bool;

    /// Aggregates window-level attributes.
    fn collect_attributes(&mut self) -> WindowAttributes {
        WindowAttributes::default()
    }

    /// Measures the tree.
    fn measure(&mut self, cx: &mut TreeCx, spec: MeasureSpec) -> MeasureResult;

    /// Forces `view` to be laid out in the next layout pass.
    fn force_layout(&mut self, view: ViewId) {
        _ = view;
    }

    /// Lays out the tree inside `frame`.
    fn layout(&mut self, cx: &mut TreeCx, frame: Rect);

    /// Dispatches window insets.
    fn dispatch_apply_insets(&mut self, cx: &mut TreeCx, insets: Insets) {
        _ = (cx, insets);
    }

    /// Starts a queued transition.
    fn start_transition(&mut self, cx: &mut TreeCx, transition: TransitionId) {
        _ = (cx, transition);
    }

    /// Draws the tree.
    fn draw(&mut self, cx: &mut TreeCx, request: &DrawRequest) -> DrawOutcome;

    /// Insets the tree reserves for itself, reported to the window manager.
    fn given_insets(&mut self) -> Option<GivenInsets> {
        None
    }
}
