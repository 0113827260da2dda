// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fallback keys for unconsumed presses.
//!
//! When nothing consumed a key press that has a configured fallback (escape
//! acting as back, for instance), the fallback key is pressed in its place.
//! The original key's release then releases the fallback, so the pair stays
//! balanced even if the fallback table changes in between.

use hashbrown::HashMap;

use crate::event::{KeyAction, KeyCode, KeyEvent, KeyFlags};

/// Produces fallback keys for unconsumed key events.
#[derive(Clone, Debug)]
pub struct FallbackKeyboard {
    table: &'static [(KeyCode, KeyCode)],
    active: HashMap<KeyCode, KeyCode>,
}

impl FallbackKeyboard {
    /// Creates a generator over a fallback table of `(key, fallback)` pairs.
    #[must_use]
    pub fn new(table: &'static [(KeyCode, KeyCode)]) -> Self {
        Self {
            table,
            active: HashMap::new(),
        }
    }

    fn lookup(&self, code: KeyCode) -> Option<KeyCode> {
        self.table.iter().find(|(k, _)| *k == code).map(|&(_, f)| f)
    }

    /// Returns the fallback for an unconsumed key, if any.
    pub fn process(&mut self, event: &KeyEvent) -> Option<KeyEvent> {
        if event.flags.contains(KeyFlags::FALLBACK) {
            return None;
        }
        let fallback = match event.action {
            KeyAction::Down => {
                let code = if event.repeat_count == 0 {
                    let code = self.lookup(event.code)?;
                    self.active.insert(event.code, code);
                    code
                } else {
                    *self.active.get(&event.code)?
                };
                code
            }
            KeyAction::Up => self.active.remove(&event.code)?,
            KeyAction::Multiple => return None,
        };
        let mut key = event.clone();
        key.code = fallback;
        key.flags |= KeyFlags::FALLBACK;
        Some(key)
    }

    /// Releases every active fallback, for teardown.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FALLBACK_KEYS;
    use crate::event::{DeviceId, Source};
    use crate::time::HostTime;

    fn key(code: KeyCode, action: KeyAction) -> KeyEvent {
        KeyEvent::new(DeviceId(0), Source::Gamepad, code, action, HostTime::ZERO)
    }

    #[test]
    fn press_and_release_map_through_the_table() {
        let mut kb = FallbackKeyboard::new(DEFAULT_FALLBACK_KEYS);
        let down = kb.process(&key(KeyCode::BUTTON_B, KeyAction::Down)).unwrap();
        assert_eq!(down.code, KeyCode::BACK);
        assert!(down.flags.contains(KeyFlags::FALLBACK));

        let up = kb.process(&key(KeyCode::BUTTON_B, KeyAction::Up)).unwrap();
        assert_eq!((up.code, up.action), (KeyCode::BACK, KeyAction::Up));
        assert!(kb.process(&key(KeyCode::BUTTON_B, KeyAction::Up)).is_none());
    }

    #[test]
    fn keys_without_fallback_pass() {
        let mut kb = FallbackKeyboard::new(DEFAULT_FALLBACK_KEYS);
        assert!(kb.process(&key(KeyCode::ENTER, KeyAction::Down)).is_none());
    }

    #[test]
    fn fallbacks_are_not_chained() {
        let mut kb = FallbackKeyboard::new(DEFAULT_FALLBACK_KEYS);
        let mut k = key(KeyCode::ESCAPE, KeyAction::Down);
        k.flags = KeyFlags::FALLBACK;
        assert!(kb.process(&k).is_none());
    }

    #[test]
    fn repeats_follow_the_active_fallback() {
        let mut kb = FallbackKeyboard::new(DEFAULT_FALLBACK_KEYS);
        kb.process(&key(KeyCode::BUTTON_A, KeyAction::Down));
        let mut repeat = key(KeyCode::BUTTON_A, KeyAction::Down);
        repeat.repeat_count = 1;
        assert_eq!(
            kb.process(&repeat).map(|k| k.code),
            Some(KeyCode::DPAD_CENTER)
        );
    }
}
