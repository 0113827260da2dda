// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Record delivery through the stage chain.
//!
//! Each stage either forwards the record, finishes it, or (async stages
//! only) parks it with a peer. Every exit from an async stage goes through
//! that stage's [`AsyncStageQueue`](crate::async_queue::AsyncStageQueue) so
//! records from one device leave in the order they arrived.

use alloc::vec::Vec;

use crate::event::{
    InputEvent, KeyAction, KeyCode, KeyEvent, MetaState, MotionAction, MotionEvent, Source,
};
use crate::peer::{AsyncToken, PeerDispatch};
use crate::record::{EventRecord, RecordFlags};
use crate::stage::{StageKind, StageResult};
use crate::synthetic::{SynthOutput, TimerOp};
use crate::time::HostTime;
use crate::timer::TimerKind;
use crate::trace::StageEvent;
use crate::tree::FocusDirection;

use super::ViewRoot;

/// Why the drop policy rejected an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DropReason {
    Detached,
    Unfocused,
    Stopped,
    Ambient,
    PausedForTransition,
}

const fn peer_result(answer: PeerDispatch) -> StageResult {
    match answer {
        PeerDispatch::Handled => StageResult::FinishHandled,
        PeerDispatch::NotHandled => StageResult::Forward,
        PeerDispatch::Pending => StageResult::Defer,
    }
}

fn focus_direction(key: &KeyEvent) -> Option<FocusDirection> {
    match key.code {
        KeyCode::DPAD_LEFT => Some(FocusDirection::Left),
        KeyCode::DPAD_RIGHT => Some(FocusDirection::Right),
        KeyCode::DPAD_UP => Some(FocusDirection::Up),
        KeyCode::DPAD_DOWN => Some(FocusDirection::Down),
        KeyCode::TAB if key.meta.is_empty() => Some(FocusDirection::Forward),
        KeyCode::TAB if key.meta == MetaState::SHIFT => Some(FocusDirection::Backward),
        _ => None,
    }
}

impl ViewRoot {
    /// Delivers every queued record, including keys synthesized on the way.
    pub(super) fn deliver_pending(&mut self) {
        while let Some(record) = self.pending.pop() {
            let stage = self.chain.entry(record.skips_ime());
            self.deliver(record, stage);
        }
    }

    /// Walks `record` down the chain starting at `stage`.
    fn deliver(&mut self, mut record: EventRecord, mut stage: StageKind) {
        loop {
            match self.run_stage(stage, &mut record) {
                StageResult::Defer => {
                    let Some(slot) = stage.async_slot() else {
                        panic!(
                            "synchronous stage `{}` deferred {:?}",
                            stage.name(),
                            record.id()
                        );
                    };
                    let timestamp = self.clock.now();
                    self.tracer.deferred(&StageEvent {
                        record: record.id(),
                        stage,
                        timestamp,
                    });
                    self.async_queues[slot].defer(record);
                    return;
                }
                StageResult::FinishHandled => record.finish(true),
                StageResult::FinishNotHandled => record.finish(false),
                StageResult::Forward => {}
            }
            let Some(next) = self.leave_stage(stage, record) else {
                // Queued behind an earlier record from the same device.
                return;
            };
            record = next;
            match stage.next() {
                Some(next_stage) => stage = next_stage,
                None => {
                    self.complete(record);
                    return;
                }
            }
        }
    }

    fn leave_stage(&mut self, stage: StageKind, record: EventRecord) -> Option<EventRecord> {
        if stage == StageKind::Synthetic
            && !record.flags().contains(RecordFlags::RESYNTHESIZED)
            && let InputEvent::Motion(motion) = record.event()
        {
            self.cancel_synthesizer(motion);
        }
        match stage.async_slot() {
            Some(slot) => self.async_queues[slot].forward(record),
            None => Some(record),
        }
    }

    /// Continues records released by an async completion.
    pub(super) fn resume_async(&mut self, token: AsyncToken, handled: bool) {
        let Some(slot) = token.stage.async_slot() else {
            tracing::warn!(
                stage = token.stage.name(),
                "async completion for a synchronous stage"
            );
            return;
        };
        let outcome = handled.then_some(true);
        let Some(released) = self.async_queues[slot].resume(token.record, outcome) else {
            tracing::debug!(
                record = ?token.record,
                "async completion for a record no longer parked"
            );
            return;
        };
        for record in released {
            match token.stage.next() {
                Some(next) => self.deliver(record, next),
                None => self.complete(record),
            }
        }
    }

    fn drop_reason(&self, event: &InputEvent) -> Option<DropReason> {
        let source = event.source();
        if !self.is_attached() || self.tree.is_none() {
            Some(DropReason::Detached)
        } else if !self.state.focused && !source.is_pointer() {
            Some(DropReason::Unfocused)
        } else if self.state.stopped {
            Some(DropReason::Stopped)
        } else if self.state.ambient && !source.is_button() {
            Some(DropReason::Ambient)
        } else if self.state.paused_for_transition && !event.is_back_key() {
            Some(DropReason::PausedForTransition)
        } else {
            None
        }
    }

    fn run_stage(&mut self, stage: StageKind, record: &mut EventRecord) -> StageResult {
        if record.is_finished() {
            return StageResult::Forward;
        }
        if let Some(reason) = self.drop_reason(record.event()) {
            // Terminal actions still run so gestures and key presses close.
            // A detached root never dispatches into the tree.
            if reason != DropReason::Detached && record.event().is_terminal() {
                tracing::debug!(?reason, record = ?record.id(), "canceling terminal input event");
                record.event_mut().cancel();
            } else {
                tracing::debug!(
                    ?reason,
                    record = ?record.id(),
                    stage = stage.name(),
                    "dropping input event"
                );
                return StageResult::FinishNotHandled;
            }
        }

        let timestamp = self.clock.now();
        self.tracer.stage(&StageEvent {
            record: record.id(),
            stage,
            timestamp,
        });
        match stage {
            StageKind::NativePreIme => self.native_pre_ime(record),
            StageKind::ViewPreIme => self.view_pre_ime(record),
            StageKind::Ime => self.ime_stage(record),
            StageKind::EarlyPostIme => self.early_post_ime(record),
            StageKind::NativePostIme => self.native_post_ime(record),
            StageKind::ViewPostIme => self.view_post_ime(record),
            StageKind::Synthetic => self.synthetic(record),
        }
    }

    // -- stages --

    fn native_pre_ime(&mut self, record: &EventRecord) -> StageResult {
        if record.event().as_key().is_none() {
            return StageResult::Forward;
        }
        let token = AsyncToken {
            stage: StageKind::NativePreIme,
            record: record.id(),
        };
        peer_result(self.native.dispatch_pre_ime(record.event(), token))
    }

    fn view_pre_ime(&mut self, record: &EventRecord) -> StageResult {
        let Some(key) = record.event().as_key() else {
            return StageResult::Forward;
        };
        if self.tree_call(|tree, cx| tree.dispatch_key_pre_ime(cx, key)) {
            StageResult::FinishHandled
        } else {
            StageResult::Forward
        }
    }

    fn ime_stage(&mut self, record: &EventRecord) -> StageResult {
        if !self.state.focused {
            return StageResult::Forward;
        }
        let token = AsyncToken {
            stage: StageKind::Ime,
            record: record.id(),
        };
        peer_result(self.ime.dispatch_input_event(record.event(), token))
    }

    fn early_post_ime(&mut self, record: &EventRecord) -> StageResult {
        match record.event() {
            InputEvent::Key(key) => {
                if self.state.in_touch_mode
                    && key.action != KeyAction::Up
                    && key.code.is_navigation()
                    && !key.is_canceled()
                    && self.set_touch_mode(false, true)
                {
                    return StageResult::FinishHandled;
                }
            }
            InputEvent::Motion(motion) => {
                if motion.source.is_pointer() {
                    if let Some(target) = self.pointer_capture
                        && !self.view_attached(target)
                    {
                        self.release_pointer_capture();
                    }
                    if matches!(motion.source, Source::Touchscreen | Source::Stylus)
                        && matches!(motion.action, MotionAction::Down | MotionAction::Scroll)
                    {
                        self.set_touch_mode(true, true);
                    }
                } else if motion.source == Source::TouchNavigation
                    && motion.action == MotionAction::Down
                {
                    self.set_touch_mode(false, true);
                }
            }
        }
        StageResult::Forward
    }

    fn native_post_ime(&mut self, record: &EventRecord) -> StageResult {
        let token = AsyncToken {
            stage: StageKind::NativePostIme,
            record: record.id(),
        };
        peer_result(self.native.dispatch_post_ime(record.event(), token))
    }

    fn view_post_ime(&mut self, record: &EventRecord) -> StageResult {
        let handled = match record.event() {
            InputEvent::Key(key) => self.view_post_ime_key(key),
            InputEvent::Motion(motion) => self.view_post_ime_motion(motion),
        };
        if handled {
            StageResult::FinishHandled
        } else {
            StageResult::Forward
        }
    }

    fn view_post_ime_key(&mut self, key: &KeyEvent) -> bool {
        if let Some(target) = self.capture.route(key) {
            if self.view_attached(target) {
                self.tree_call(|tree, cx| tree.dispatch_key_to(cx, target, key));
                return true;
            }
            tracing::debug!(?target, "unhandled-key target left the tree");
        }

        if self.tree_call(|tree, cx| tree.dispatch_key(cx, key)) {
            return true;
        }

        if key.is_initial_down()
            && !key.code.is_modifier()
            && let Some(target) = self.tree_call(|tree, cx| tree.dispatch_unhandled_key(cx, key))
        {
            self.capture.capture(key, target);
            return true;
        }

        key.action == KeyAction::Down
            && !key.is_canceled()
            && focus_direction(key).is_some_and(|direction| {
                self.tree_call(|tree, cx| tree.move_focus(cx, direction))
            })
    }

    fn view_post_ime_motion(&mut self, motion: &MotionEvent) -> bool {
        if motion.source.is_pointer() {
            match self.pointer_capture {
                Some(target) => self.tree_call(|tree, cx| {
                    tree.dispatch_captured_pointer(cx, target, motion)
                }),
                None => self.tree_call(|tree, cx| tree.dispatch_pointer(cx, motion)),
            }
        } else if motion.source == Source::Trackball {
            self.tree_call(|tree, cx| tree.dispatch_trackball(cx, motion))
        } else {
            self.tree_call(|tree, cx| tree.dispatch_generic_motion(cx, motion))
        }
    }

    fn synthetic(&mut self, record: &mut EventRecord) -> StageResult {
        record.mark_resynthesized();
        match record.event() {
            InputEvent::Motion(motion) => {
                let out = match motion.source {
                    Source::Trackball => self.trackball.process(motion),
                    Source::Joystick | Source::Gamepad => self.joystick.process(motion),
                    Source::TouchNavigation => {
                        self.touch_nav.process(motion, self.devices.get(motion.device))
                    }
                    _ => return StageResult::Forward,
                };
                self.apply_synth(out);
                StageResult::FinishHandled
            }
            InputEvent::Key(key) => {
                if record.flags().contains(RecordFlags::UNHANDLED_PASS) {
                    return StageResult::Forward;
                }
                match self.fallback.process(key) {
                    Some(fallback) => {
                        self.enqueue_synthesized(fallback, RecordFlags::UNHANDLED_PASS);
                        StageResult::FinishHandled
                    }
                    None => StageResult::Forward,
                }
            }
        }
    }

    // -- synthesizers --

    /// An earlier stage consumed a motion event; release whatever its
    /// synthesizer holds.
    fn cancel_synthesizer(&mut self, motion: &MotionEvent) {
        let out = match motion.source {
            Source::Trackball => self.trackball.cancel(),
            Source::Joystick | Source::Gamepad => self.joystick.cancel_all(motion.event_time),
            Source::TouchNavigation => self.touch_nav.cancel(motion),
            _ => return,
        };
        self.apply_synth(out);
    }

    /// Applies timer changes and queues synthesized keys.
    pub(super) fn apply_synth(&mut self, out: SynthOutput) {
        for op in out.timers {
            match op {
                TimerOp::Schedule(kind, deadline) => self.timers.schedule(kind, deadline),
                TimerOp::Cancel(kind) => {
                    self.timers.cancel(kind);
                }
            }
        }
        if out.leave_touch_mode {
            self.set_touch_mode(false, true);
        }
        for key in out.keys {
            self.enqueue_synthesized(key, RecordFlags::empty());
        }
    }

    fn enqueue_synthesized(&mut self, key: KeyEvent, flags: RecordFlags) {
        let record = self.make_record(InputEvent::Key(key), None, flags);
        self.pending.push(record);
    }

    /// Fires every timer due at `now`. Timers re-armed while firing wait
    /// for the next pump.
    pub(super) fn fire_timers(&mut self, now: HostTime) {
        let mut due = Vec::new();
        while let Some((_, kind)) = self.timers.pop_due(now) {
            due.push(kind);
        }
        for kind in due {
            let out = match kind {
                TimerKind::JoystickRepeat(device) => {
                    self.joystick.repeat(device, now, self.state.focused)
                }
                TimerKind::TouchNavigationFling => self.touch_nav.fling_tick(now),
            };
            self.apply_synth(out);
        }
    }
}
