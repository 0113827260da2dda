// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unhandled-key capture table.
//!
//! When an unconsumed key press is claimed by an unhandled-key listener, the
//! listener's view is remembered against the key code. The key's repeats
//! and its release then go straight to that view, even if focus moved in
//! the meantime, so press and release stay symmetric.

use hashbrown::HashMap;

use crate::event::{KeyAction, KeyCode, KeyEvent};
use crate::tree::ViewId;

/// Key code to the view that claimed the key's press.
#[derive(Debug, Default)]
pub struct UnhandledKeyCapture {
    targets: HashMap<KeyCode, ViewId>,
}

impl UnhandledKeyCapture {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `target` as the consumer of `event`'s press.
    ///
    /// Only initial presses of non-modifier keys are recorded. Returns
    /// `true` if an entry was written.
    pub fn capture(&mut self, event: &KeyEvent, target: ViewId) -> bool {
        if !event.is_initial_down() || event.code.is_modifier() {
            return false;
        }
        self.targets.insert(event.code, target);
        true
    }

    /// Returns the view that should receive `event` directly, if any.
    ///
    /// The release of a captured key clears its entry. A fresh press clears
    /// a leftover entry from a release that never arrived.
    pub fn route(&mut self, event: &KeyEvent) -> Option<ViewId> {
        match event.action {
            KeyAction::Up => self.targets.remove(&event.code),
            KeyAction::Down if event.repeat_count == 0 => {
                self.targets.remove(&event.code);
                None
            }
            KeyAction::Down | KeyAction::Multiple => self.targets.get(&event.code).copied(),
        }
    }

    /// Drops the entry for `code`.
    pub fn forget(&mut self, code: KeyCode) {
        self.targets.remove(&code);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.targets.clear();
    }

    /// Number of captured keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` if no key is captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
