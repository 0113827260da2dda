// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fixed input stage chain.
//!
//! Every record walks the same ordered list of stages:
//!
//! ```text
//!   NativePreIme ─► ViewPreIme ─► Ime ─► EarlyPostIme ─► NativePostIme ─► ViewPostIme ─► Synthetic ─► finish
//!   (async)         (sync)        (async) (sync)         (async)          (sync)         (sync)
//! ```
//!
//! Records that skip the IME enter at [`StageKind::EarlyPostIme`]. The
//! per-stage processing lives with the coordinator in
//! [`root`](crate::root); this module only fixes the order and the result
//! vocabulary.

/// One stage of the input chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Native peer, before the IME.
    NativePreIme,
    /// The tree's pre-IME key hook.
    ViewPreIme,
    /// The input method.
    Ime,
    /// Touch-mode and pointer-capture triage.
    EarlyPostIme,
    /// Native peer, after the IME.
    NativePostIme,
    /// Ordinary dispatch into the tree plus focus navigation.
    ViewPostIme,
    /// Synthetic key generation for unconsumed input.
    Synthetic,
}

impl StageKind {
    /// Every stage in chain order.
    pub const ALL: [Self; 7] = [
        Self::NativePreIme,
        Self::ViewPreIme,
        Self::Ime,
        Self::EarlyPostIme,
        Self::NativePostIme,
        Self::ViewPostIme,
        Self::Synthetic,
    ];

    /// The stage after this one, or `None` for the terminal stage.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NativePreIme => Some(Self::ViewPreIme),
            Self::ViewPreIme => Some(Self::Ime),
            Self::Ime => Some(Self::EarlyPostIme),
            Self::EarlyPostIme => Some(Self::NativePostIme),
            Self::NativePostIme => Some(Self::ViewPostIme),
            Self::ViewPostIme => Some(Self::Synthetic),
            Self::Synthetic => None,
        }
    }

    /// Returns `true` for stages that may defer a record.
    #[must_use]
    pub const fn is_async(self) -> bool {
        matches!(self, Self::NativePreIme | Self::Ime | Self::NativePostIme)
    }

    /// Index of the async queue owned by this stage.
    pub(crate) const fn async_slot(self) -> Option<usize> {
        match self {
            Self::NativePreIme => Some(0),
            Self::Ime => Some(1),
            Self::NativePostIme => Some(2),
            _ => None,
        }
    }

    /// Short stable name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NativePreIme => "native-pre-ime",
            Self::ViewPreIme => "view-pre-ime",
            Self::Ime => "ime",
            Self::EarlyPostIme => "early-post-ime",
            Self::NativePostIme => "native-post-ime",
            Self::ViewPostIme => "view-post-ime",
            Self::Synthetic => "synthetic",
        }
    }
}

/// What a stage decided for a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageResult {
    /// Pass the record to the next stage unchanged.
    Forward,
    /// Dispatch concluded; the event was consumed.
    FinishHandled,
    /// Dispatch concluded; the event was not consumed.
    FinishNotHandled,
    /// Park the record until an async peer completes it. Only async stages
    /// may return this.
    Defer,
}

/// The chain entry points, fixed when the root attaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageChain {
    first: StageKind,
    first_post_ime: StageKind,
}

impl Default for StageChain {
    fn default() -> Self {
        Self::new()
    }
}

impl StageChain {
    /// Builds the standard chain.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            first: StageKind::NativePreIme,
            first_post_ime: StageKind::EarlyPostIme,
        }
    }

    /// The stage a record enters at.
    #[must_use]
    pub const fn entry(&self, skips_ime: bool) -> StageKind {
        if skips_ime {
            self.first_post_ime
        } else {
            self.first
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_visits_every_stage_once() {
        let mut order = alloc::vec::Vec::new();
        let mut stage = Some(StageChain::new().entry(false));
        while let Some(s) = stage {
            order.push(s);
            stage = s.next();
        }
        assert_eq!(order, StageKind::ALL);
    }

    #[test]
    fn post_ime_entry_skips_ime() {
        let entry = StageChain::new().entry(true);
        assert_eq!(entry, StageKind::EarlyPostIme);
        assert!(
            entry > StageKind::Ime,
            "post-IME entry must come after the IME"
        );
    }

    #[test]
    fn async_stages_own_distinct_slots() {
        let slots: alloc::vec::Vec<_> = StageKind::ALL
            .iter()
            .filter_map(|s| s.async_slot())
            .collect();
        assert_eq!(slots, [0, 1, 2]);
        for s in StageKind::ALL {
            assert_eq!(s.is_async(), s.async_slot().is_some(), "{}", s.name());
        }
    }
}
