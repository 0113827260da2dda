// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contracts for the root's external peers.
//!
//! The root talks to four services besides the tree:
//!
//! - **[`WindowSession`]**: the window manager. `relayout` is the one
//!   blocking round trip in the system; everything else is fire-and-forget.
//! - **[`ImePeer`]** and **[`NativeInputPeer`]**: services that see input
//!   before or after the tree and may answer asynchronously. A
//!   [`PeerDispatch::Pending`] answer is completed later through
//!   [`ViewRoot::finish_async`](crate::root::ViewRoot::finish_async) or
//!   [`RootHandle::finish_async`](crate::mailbox::RootHandle::finish_async).
//! - **[`FrameSink`]**: the compositor. Frames are opaque to the root; the
//!   sink calls back once a frame is committed.
//! - **[`ProcessHost`]**: last-resort termination under memory pressure.
//!
//! All calls happen on the root's owning thread. Only the commit callback
//! handed to [`FrameSink::submit`] may run elsewhere.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;
use kurbo::{Insets, Rect, Size};

use crate::error::{SessionError, SurfaceError};
use crate::event::InputEvent;
use crate::record::RecordId;
use crate::stage::StageKind;
use crate::tree::{GivenInsets, ViewId, Visibility, WindowAttributes};

// ---------------------------------------------------------------------------
// Window session
// ---------------------------------------------------------------------------

/// Identifies a drawing surface handed out by the window manager.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}

/// What a relayout did to the window's surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SurfaceChange {
    /// Same surface as before.
    #[default]
    Unchanged,
    /// A surface now exists where there was none, or it was replaced.
    Created(SurfaceId),
    /// The surface went away.
    Destroyed,
}

bitflags! {
    /// Extra facts reported by a relayout.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RelayoutFlags: u8 {
        /// The window manager considers the window in touch mode.
        const IN_TOUCH_MODE = 1 << 0;
        /// First relayout of this window.
        const FIRST_TIME = 1 << 1;
        /// The existing surface must be reconfigured.
        const SURFACE_CHANGED = 1 << 2;
    }
}

/// Parameters of a relayout round trip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelayoutRequest {
    /// Window attributes aggregated from the tree.
    pub attributes: WindowAttributes,
    /// Size the tree measured itself to.
    pub requested_size: Size,
    /// Effective window visibility.
    pub visibility: Visibility,
}

/// The window manager's answer to a relayout.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RelayoutResult {
    /// Window frame in display coordinates.
    pub frame: Rect,
    /// Insets covered by system decorations.
    pub insets: Insets,
    /// Surface lifecycle change.
    pub surface: SurfaceChange,
    /// Extra facts.
    pub flags: RelayoutFlags,
}

/// The window manager, as seen by one window.
pub trait WindowSession {
    /// Asks for a new frame, insets, and surface. Blocks until answered.
    fn relayout(&mut self, request: &RelayoutRequest) -> Result<RelayoutResult, SessionError>;

    /// Reports that the frame the window manager is waiting for was drawn.
    fn report_draw_complete(&mut self, frame_index: u64);

    /// Reports insets the tree reserves.
    fn set_insets(&mut self, insets: &GivenInsets);

    /// Reports a touch-mode change.
    fn set_in_touch_mode(&mut self, in_touch_mode: bool) {
        _ = in_touch_mode;
    }

    /// Asks the system to reclaim memory. Returns `true` if it did.
    fn out_of_memory(&mut self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Input peers
// ---------------------------------------------------------------------------

/// Names a record parked at an async stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AsyncToken {
    /// The stage holding the record.
    pub stage: StageKind,
    /// The parked record.
    pub record: RecordId,
}

/// A peer's immediate answer to an offered event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerDispatch {
    /// Consumed; dispatch ends here.
    Handled,
    /// Not consumed; the event continues down the chain.
    NotHandled,
    /// The answer will arrive later for this token.
    Pending,
}

/// The input method.
pub trait ImePeer {
    /// Offers an event to the input method.
    fn dispatch_input_event(&mut self, event: &InputEvent, token: AsyncToken) -> PeerDispatch;

    /// The window gained or lost focus.
    fn window_focus_changed(&mut self, focused: bool) {
        _ = focused;
    }
}

/// A native input interceptor that sees events around the input method.
pub trait NativeInputPeer {
    /// Offers a key before the input method.
    fn dispatch_pre_ime(&mut self, event: &InputEvent, token: AsyncToken) -> PeerDispatch {
        _ = (event, token);
        PeerDispatch::NotHandled
    }

    /// Offers an event after the input method.
    fn dispatch_post_ime(&mut self, event: &InputEvent, token: AsyncToken) -> PeerDispatch {
        _ = (event, token);
        PeerDispatch::NotHandled
    }
}

/// A [`NativeInputPeer`] that declines everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoNativeInput;

impl NativeInputPeer for NoNativeInput {}

// ---------------------------------------------------------------------------
// Frame sink
// ---------------------------------------------------------------------------

/// One drawn frame, opaque to the root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceFrame {
    /// Traversal frame counter.
    pub frame_index: u64,
    /// Surface size.
    pub size: Size,
    /// Views with new content.
    pub painted: Vec<ViewId>,
    /// The whole surface was redrawn.
    pub full: bool,
}

/// Called once the compositor committed a frame. May run on any thread.
pub type CommitCallback = Box<dyn FnOnce(u64) + Send>;

/// The compositor.
pub trait FrameSink {
    /// Binds the sink to a (new) surface.
    fn configure_surface(&mut self, surface: SurfaceId, size: Size) -> Result<(), SurfaceError>;

    /// Drops the current surface.
    fn release_surface(&mut self);

    /// Returns `true` if [`submit`](Self::submit) invokes its callback on
    /// commit. Sinks that cannot tell commit immediately on submit.
    fn supports_commit_callback(&self) -> bool {
        true
    }

    /// Submits a frame.
    fn submit(
        &mut self,
        frame: SurfaceFrame,
        on_commit: CommitCallback,
    ) -> Result<(), SurfaceError>;
}

// ---------------------------------------------------------------------------
// Process host
// ---------------------------------------------------------------------------

/// The process hosting the root.
pub trait ProcessHost {
    /// Ends the process. Called only when graphics memory cannot be
    /// reclaimed.
    fn terminate(&mut self);
}
