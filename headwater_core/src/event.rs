// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input event payloads.
//!
//! An [`InputEvent`] is either a [`KeyEvent`] or a [`MotionEvent`]. Payloads
//! are plain values: once an event is wrapped in an
//! [`EventRecord`](crate::record::EventRecord) the only mutation the
//! coordinator performs is [cancellation](InputEvent::cancel).

use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;
use kurbo::Point;

use crate::time::HostTime;

/// Identifies the device an event came from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceId(pub i32);

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

/// The kind of hardware that produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// Alphanumeric keyboard.
    Keyboard,
    /// Directional pad.
    Dpad,
    /// Game controller buttons.
    Gamepad,
    /// Direct touch screen.
    Touchscreen,
    /// Mouse or touch pad in absolute mode.
    Mouse,
    /// Stylus on a digitizer.
    Stylus,
    /// Trackball reporting relative movement.
    Trackball,
    /// Touch pad reporting navigation gestures (no on-screen pointer).
    TouchNavigation,
    /// Joystick or game controller axes.
    Joystick,
}

impl Source {
    /// Returns `true` for sources that report an on-screen pointer.
    #[must_use]
    pub const fn is_pointer(self) -> bool {
        matches!(self, Self::Touchscreen | Self::Mouse | Self::Stylus)
    }

    /// Returns `true` for button sources.
    #[must_use]
    pub const fn is_button(self) -> bool {
        matches!(self, Self::Keyboard | Self::Dpad | Self::Gamepad)
    }
}

/// A key code.
///
/// Values follow the widely used numeric layout for hardware keys; codes
/// without a named constant are still valid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KeyCode(pub u32);

#[expect(missing_docs, reason = "key names are self-describing")]
impl KeyCode {
    pub const UNKNOWN: Self = Self(0);
    pub const BACK: Self = Self(4);
    pub const DPAD_UP: Self = Self(19);
    pub const DPAD_DOWN: Self = Self(20);
    pub const DPAD_LEFT: Self = Self(21);
    pub const DPAD_RIGHT: Self = Self(22);
    pub const DPAD_CENTER: Self = Self(23);
    pub const ALT_LEFT: Self = Self(57);
    pub const ALT_RIGHT: Self = Self(58);
    pub const SHIFT_LEFT: Self = Self(59);
    pub const SHIFT_RIGHT: Self = Self(60);
    pub const TAB: Self = Self(61);
    pub const SPACE: Self = Self(62);
    pub const SYM: Self = Self(63);
    pub const ENTER: Self = Self(66);
    pub const BUTTON_A: Self = Self(96);
    pub const BUTTON_B: Self = Self(97);
    pub const ESCAPE: Self = Self(111);
    pub const CTRL_LEFT: Self = Self(113);
    pub const CTRL_RIGHT: Self = Self(114);
    pub const CAPS_LOCK: Self = Self(115);
    pub const META_LEFT: Self = Self(117);
    pub const META_RIGHT: Self = Self(118);
    pub const FUNCTION: Self = Self(119);
    pub const NUM_LOCK: Self = Self(143);
}

impl KeyCode {
    /// Returns `true` for modifier keys.
    #[must_use]
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::ALT_LEFT
                | Self::ALT_RIGHT
                | Self::SHIFT_LEFT
                | Self::SHIFT_RIGHT
                | Self::SYM
                | Self::CTRL_LEFT
                | Self::CTRL_RIGHT
                | Self::CAPS_LOCK
                | Self::META_LEFT
                | Self::META_RIGHT
                | Self::FUNCTION
                | Self::NUM_LOCK
        )
    }

    /// Returns `true` for the four directional keys.
    #[must_use]
    pub const fn is_direction(self) -> bool {
        matches!(
            self,
            Self::DPAD_UP | Self::DPAD_DOWN | Self::DPAD_LEFT | Self::DPAD_RIGHT
        )
    }

    /// Returns `true` for keys that move focus when unconsumed.
    #[must_use]
    pub const fn is_navigation(self) -> bool {
        self.is_direction() || matches!(self, Self::TAB)
    }
}

impl fmt::Debug for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyCode({})", self.0)
    }
}

bitflags! {
    /// Modifier state attached to key and motion events.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MetaState: u32 {
        /// A shift key is down.
        const SHIFT = 1 << 0;
        /// An alt key is down.
        const ALT = 1 << 1;
        /// A control key is down.
        const CTRL = 1 << 2;
        /// A meta key is down.
        const META = 1 << 3;
        /// The function key is down.
        const FUNCTION = 1 << 4;
    }
}

bitflags! {
    /// Per-event key flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyFlags: u32 {
        /// The key press was canceled; the UP must not trigger an action.
        const CANCELED = 1 << 0;
        /// The key has been held long enough to count as a long press.
        const LONG_PRESS = 1 << 1;
        /// The event is a fallback for an unconsumed key.
        const FALLBACK = 1 << 2;
        /// The event was synthesized from analog or continuous input.
        const SYNTHESIZED = 1 << 3;
    }
}

/// What a key event reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Key pressed (or auto-repeated when `repeat_count > 0`).
    Down,
    /// Key released.
    Up,
    /// `repeat_count` presses of the key batched into one event.
    Multiple,
}

/// A key event.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyEvent {
    /// Originating device.
    pub device: DeviceId,
    /// Originating source.
    pub source: Source,
    /// Key code.
    pub code: KeyCode,
    /// Action.
    pub action: KeyAction,
    /// Auto-repeat count for `Down`, batch size for `Multiple`.
    pub repeat_count: u32,
    /// Modifier state.
    pub meta: MetaState,
    /// Flags.
    pub flags: KeyFlags,
    /// Time of the initial press.
    pub down_time: HostTime,
    /// Time of this event.
    pub event_time: HostTime,
}

impl KeyEvent {
    /// Creates a key event whose press started at `time`.
    #[must_use]
    pub fn new(
        device: DeviceId,
        source: Source,
        code: KeyCode,
        action: KeyAction,
        time: HostTime,
    ) -> Self {
        Self {
            device,
            source,
            code,
            action,
            repeat_count: 0,
            meta: MetaState::empty(),
            flags: KeyFlags::empty(),
            down_time: time,
            event_time: time,
        }
    }

    /// Returns `true` for an initial (non-repeat) press.
    #[must_use]
    pub fn is_initial_down(&self) -> bool {
        self.action == KeyAction::Down && self.repeat_count == 0
    }

    /// Returns `true` if the press was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.flags.contains(KeyFlags::CANCELED)
    }
}

/// What a motion event reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MotionAction {
    /// First pointer went down.
    Down,
    /// Last pointer went up.
    Up,
    /// Pointers or axes moved.
    Move,
    /// The gesture was aborted.
    Cancel,
    /// An additional pointer went down.
    PointerDown,
    /// A non-final pointer went up.
    PointerUp,
    /// A hovering pointer entered the window.
    HoverEnter,
    /// A hovering pointer moved.
    HoverMove,
    /// A hovering pointer left the window.
    HoverExit,
    /// A scroll wheel or axis moved.
    Scroll,
}

/// One pointer in a motion sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer {
    /// Stable pointer id for the duration of a gesture.
    pub id: u32,
    /// Position; relative deltas for trackballs, absolute otherwise.
    pub position: Point,
}

/// Joystick and hat axis values, each in `-1.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Axes {
    /// Primary stick, horizontal.
    pub x: f32,
    /// Primary stick, vertical.
    pub y: f32,
    /// Hat switch, horizontal.
    pub hat_x: f32,
    /// Hat switch, vertical.
    pub hat_y: f32,
}

/// A coalesced historical sample carried by a batched motion event.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionSample {
    /// Sample time.
    pub time: HostTime,
    /// Pointer positions at that time.
    pub pointers: Vec<Pointer>,
}

/// A pointer, trackball, joystick, or touch-navigation event.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionEvent {
    /// Originating device.
    pub device: DeviceId,
    /// Originating source.
    pub source: Source,
    /// Action.
    pub action: MotionAction,
    /// Modifier state.
    pub meta: MetaState,
    /// Pointers in the current sample.
    pub pointers: Vec<Pointer>,
    /// Axis values.
    pub axes: Axes,
    /// Older samples coalesced into this event, oldest first.
    pub history: Vec<MotionSample>,
    /// Start of the gesture.
    pub down_time: HostTime,
    /// Time of the current sample.
    pub event_time: HostTime,
}

impl MotionEvent {
    /// Creates a single-pointer motion event.
    #[must_use]
    pub fn new(
        device: DeviceId,
        source: Source,
        action: MotionAction,
        position: Point,
        time: HostTime,
    ) -> Self {
        Self {
            device,
            source,
            action,
            meta: MetaState::empty(),
            pointers: alloc::vec![Pointer { id: 0, position }],
            axes: Axes::default(),
            history: Vec::new(),
            down_time: time,
            event_time: time,
        }
    }

    /// Creates a joystick axis event.
    #[must_use]
    pub fn axes(device: DeviceId, axes: Axes, time: HostTime) -> Self {
        Self {
            device,
            source: Source::Joystick,
            action: MotionAction::Move,
            meta: MetaState::empty(),
            pointers: Vec::new(),
            axes,
            history: Vec::new(),
            down_time: time,
            event_time: time,
        }
    }

    /// Position of the first pointer, or the origin when there is none.
    #[must_use]
    pub fn position(&self) -> Point {
        self.pointers.first().map_or(Point::ORIGIN, |p| p.position)
    }

    /// Id of the first pointer.
    #[must_use]
    pub fn pointer_id(&self) -> Option<u32> {
        self.pointers.first().map(|p| p.id)
    }
}

/// An input event.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Key event.
    Key(KeyEvent),
    /// Motion event.
    Motion(MotionEvent),
}

impl InputEvent {
    /// Originating device.
    #[must_use]
    pub fn device(&self) -> DeviceId {
        match self {
            Self::Key(k) => k.device,
            Self::Motion(m) => m.device,
        }
    }

    /// Originating source.
    #[must_use]
    pub fn source(&self) -> Source {
        match self {
            Self::Key(k) => k.source,
            Self::Motion(m) => m.source,
        }
    }

    /// Event time.
    #[must_use]
    pub fn event_time(&self) -> HostTime {
        match self {
            Self::Key(k) => k.event_time,
            Self::Motion(m) => m.event_time,
        }
    }

    /// Returns the key event, if this is one.
    #[must_use]
    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(k) => Some(k),
            Self::Motion(_) => None,
        }
    }

    /// Returns the motion event, if this is one.
    #[must_use]
    pub fn as_motion(&self) -> Option<&MotionEvent> {
        match self {
            Self::Motion(m) => Some(m),
            Self::Key(_) => None,
        }
    }

    /// Returns `true` for actions that end a gesture or press.
    ///
    /// Such events are canceled rather than dropped when input is
    /// suppressed, so receivers are never left in a pressed state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Key(k) => k.action == KeyAction::Up,
            Self::Motion(m) => matches!(
                m.action,
                MotionAction::Up | MotionAction::Cancel | MotionAction::HoverExit
            ),
        }
    }

    /// Returns `true` for a BACK key event.
    #[must_use]
    pub fn is_back_key(&self) -> bool {
        matches!(self, Self::Key(k) if k.code == KeyCode::BACK)
    }

    /// Cancels the event in place.
    ///
    /// Keys gain [`KeyFlags::CANCELED`]; motion events become
    /// [`MotionAction::Cancel`] (hover exits are left as they are).
    pub fn cancel(&mut self) {
        match self {
            Self::Key(k) => k.flags.insert(KeyFlags::CANCELED),
            Self::Motion(m) => {
                if m.action != MotionAction::HoverExit {
                    m.action = MotionAction::Cancel;
                }
            }
        }
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(key: KeyEvent) -> Self {
        Self::Key(key)
    }
}

impl From<MotionEvent> for InputEvent {
    fn from(motion: MotionEvent) -> Self {
        Self::Motion(motion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(action: MotionAction) -> InputEvent {
        InputEvent::from(MotionEvent::new(
            DeviceId(1),
            Source::Touchscreen,
            action,
            Point::new(4.0, 5.0),
            HostTime::ZERO,
        ))
    }

    #[test]
    fn terminal_actions() {
        assert!(touch(MotionAction::Up).is_terminal());
        assert!(touch(MotionAction::Cancel).is_terminal());
        assert!(!touch(MotionAction::Move).is_terminal());

        let up = KeyEvent::new(
            DeviceId(0),
            Source::Keyboard,
            KeyCode::ENTER,
            KeyAction::Up,
            HostTime::ZERO,
        );
        assert!(InputEvent::from(up).is_terminal());
    }

    #[test]
    fn cancel_marks_keys_and_rewrites_motion() {
        let mut up = InputEvent::from(KeyEvent::new(
            DeviceId(0),
            Source::Keyboard,
            KeyCode::ENTER,
            KeyAction::Up,
            HostTime::ZERO,
        ));
        up.cancel();
        assert!(up.as_key().is_some_and(KeyEvent::is_canceled));

        let mut lift = touch(MotionAction::Up);
        lift.cancel();
        assert_eq!(
            lift.as_motion().map(|m| m.action),
            Some(MotionAction::Cancel)
        );
    }

    #[test]
    fn modifiers_are_not_navigation() {
        assert!(KeyCode::SHIFT_LEFT.is_modifier());
        assert!(!KeyCode::SHIFT_LEFT.is_navigation());
        assert!(KeyCode::TAB.is_navigation());
        assert!(KeyCode::DPAD_LEFT.is_direction());
        assert!(!KeyCode::DPAD_CENTER.is_direction());
    }
}
