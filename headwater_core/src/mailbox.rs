// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-thread traffic into the root.
//!
//! The root is confined to its owning thread. Input sources, the window
//! manager, the input method, and the compositor reach it from other
//! threads through a [`RootHandle`]: a cheap, cloneable `Send + Sync`
//! handle that posts [`RootMessage`]s into an `mpsc` mailbox. The owning
//! thread drains the mailbox in [`ViewRoot::pump`](crate::root::ViewRoot::pump).
//!
//! An optional wake callback is invoked after every post so the host can
//! schedule a pump on the owning thread's loop.
//!
//! Once the root is dropped every send is silently discarded, except that
//! an undeliverable input event is still completed with `handled = false`.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use kurbo::{Insets, Rect};

use crate::event::{InputEvent, MotionEvent};
use crate::peer::AsyncToken;
use crate::record::{Completion, RecordFlags};

/// A message for the root's owning thread.
pub enum RootMessage {
    /// An input event to enqueue.
    Input {
        /// The event.
        event: InputEvent,
        /// Reports the outcome to the source.
        completion: Option<Completion>,
        /// Initial record flags.
        flags: RecordFlags,
    },
    /// A pointer move to coalesce until the next frame.
    BatchedMotion {
        /// The move.
        event: MotionEvent,
        /// Reports the outcome to the source.
        completion: Option<Completion>,
    },
    /// The window manager moved or resized the window.
    Resized {
        /// New frame.
        frame: Rect,
        /// The window manager waits for a draw report.
        report_draw: bool,
    },
    /// System insets changed.
    InsetsChanged(Insets),
    /// Window focus changed.
    WindowFocusChanged {
        /// The window has input focus.
        focused: bool,
        /// Touch mode as known to the window manager.
        in_touch_mode: bool,
    },
    /// The application became visible or hidden.
    AppVisibility(bool),
    /// An async peer answered.
    AsyncFinished {
        /// The parked record.
        token: AsyncToken,
        /// Whether the peer consumed the event.
        handled: bool,
    },
    /// The compositor committed a frame.
    DrawCommitted {
        /// Committed frame.
        frame_index: u64,
    },
    /// Detach from the window.
    Die,
}

impl fmt::Debug for RootMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { event, flags, .. } => f
                .debug_struct("Input")
                .field("event", event)
                .field("flags", flags)
                .finish_non_exhaustive(),
            Self::BatchedMotion { event, .. } => f
                .debug_struct("BatchedMotion")
                .field("event", event)
                .finish_non_exhaustive(),
            Self::Resized { frame, report_draw } => f
                .debug_struct("Resized")
                .field("frame", frame)
                .field("report_draw", report_draw)
                .finish(),
            Self::InsetsChanged(insets) => f.debug_tuple("InsetsChanged").field(insets).finish(),
            Self::WindowFocusChanged {
                focused,
                in_touch_mode,
            } => f
                .debug_struct("WindowFocusChanged")
                .field("focused", focused)
                .field("in_touch_mode", in_touch_mode)
                .finish(),
            Self::AppVisibility(visible) => f.debug_tuple("AppVisibility").field(visible).finish(),
            Self::AsyncFinished { token, handled } => f
                .debug_struct("AsyncFinished")
                .field("token", token)
                .field("handled", handled)
                .finish(),
            Self::DrawCommitted { frame_index } => f
                .debug_struct("DrawCommitted")
                .field("frame_index", frame_index)
                .finish(),
            Self::Die => f.write_str("Die"),
        }
    }
}

type Wake = Arc<dyn Fn() + Send + Sync>;

/// A `Send + Sync` handle that posts messages to the root.
///
/// Obtained from [`ViewRoot::handle`](crate::root::ViewRoot::handle).
/// Cloning is cheap.
#[derive(Clone)]
pub struct RootHandle {
    tx: Sender<RootMessage>,
    wake: Option<Wake>,
}

impl fmt::Debug for RootHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootHandle")
            .field("wake", &self.wake.is_some())
            .finish_non_exhaustive()
    }
}

/// Creates a connected handle and receiver.
pub(crate) fn channel(
    wake: Option<Box<dyn Fn() + Send + Sync>>,
) -> (RootHandle, Receiver<RootMessage>) {
    let (tx, rx) = mpsc::channel();
    let wake = wake.map(Arc::from);
    (RootHandle { tx, wake }, rx)
}

impl RootHandle {
    /// Posts a message.
    ///
    /// Returns `false` if the root is gone. An undeliverable input event is
    /// completed as not handled.
    pub fn post(&self, message: RootMessage) -> bool {
        match self.tx.send(message) {
            Ok(()) => {
                if let Some(wake) = &self.wake {
                    wake();
                }
                true
            }
            Err(mpsc::SendError(message)) => {
                match message {
                    RootMessage::Input {
                        event,
                        completion: Some(completion),
                        ..
                    } => completion(&event, false),
                    RootMessage::BatchedMotion {
                        event,
                        completion: Some(completion),
                    } => completion(&InputEvent::Motion(event), false),
                    _ => {}
                }
                false
            }
        }
    }

    /// Enqueues an input event.
    pub fn enqueue_input(
        &self,
        event: InputEvent,
        completion: Option<Completion>,
        flags: RecordFlags,
    ) {
        self.post(RootMessage::Input {
            event,
            completion,
            flags,
        });
    }

    /// Enqueues a pointer move for coalescing.
    pub fn enqueue_batched_motion(&self, event: MotionEvent, completion: Option<Completion>) {
        self.post(RootMessage::BatchedMotion { event, completion });
    }

    /// Reports a new window frame.
    pub fn resized(&self, frame: Rect, report_draw: bool) {
        self.post(RootMessage::Resized { frame, report_draw });
    }

    /// Reports new system insets.
    pub fn insets_changed(&self, insets: Insets) {
        self.post(RootMessage::InsetsChanged(insets));
    }

    /// Reports a window focus change.
    pub fn window_focus_changed(&self, focused: bool, in_touch_mode: bool) {
        self.post(RootMessage::WindowFocusChanged {
            focused,
            in_touch_mode,
        });
    }

    /// Reports an application visibility change.
    pub fn app_visibility_changed(&self, visible: bool) {
        self.post(RootMessage::AppVisibility(visible));
    }

    /// Completes a record parked at an async stage.
    pub fn finish_async(&self, token: AsyncToken, handled: bool) {
        self.post(RootMessage::AsyncFinished { token, handled });
    }

    /// Asks the root to detach.
    pub fn die(&self) {
        self.post(RootMessage::Die);
    }

    pub(crate) fn draw_committed(&self, frame_index: u64) {
        self.post(RootMessage::DrawCommitted { frame_index });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeviceId, KeyAction, KeyCode, KeyEvent, Source};
    use crate::time::HostTime;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn key() -> InputEvent {
        InputEvent::from(KeyEvent::new(
            DeviceId(1),
            Source::Keyboard,
            KeyCode::ENTER,
            KeyAction::Down,
            HostTime::ZERO,
        ))
    }

    #[test]
    fn messages_arrive_in_order_and_wake() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let (handle, rx) = channel(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        let remote = handle.clone();
        std::thread::spawn(move || {
            remote.app_visibility_changed(false);
            remote.die();
        })
        .join()
        .unwrap();
        assert!(matches!(
            rx.recv().unwrap(),
            RootMessage::AppVisibility(false)
        ));
        assert!(matches!(rx.recv().unwrap(), RootMessage::Die));
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn input_to_a_dropped_root_completes_unhandled() {
        let (handle, rx) = channel(None);
        drop(rx);
        let completed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&completed);
        handle.enqueue_input(
            key(),
            Some(Box::new(move |_: &InputEvent, handled: bool| {
                assert!(!handled);
                flag.store(true, Ordering::SeqCst);
            })),
            RecordFlags::empty(),
        );
        assert!(completed.load(Ordering::SeqCst));
        assert!(!handle.post(RootMessage::Die));
    }
}
