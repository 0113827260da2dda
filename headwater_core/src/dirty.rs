// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Views report invalidation through [`TreeCx`](crate::tree::TreeCx), which
//! records the requesting [`ViewId`](crate::tree::ViewId) in a
//! [`understory_dirty`] tracker keyed by the raw view id. Each channel is an
//! independent category of change and is local-only: only the view that
//! asked appears in the drain output.
//!
//! # Consumption
//!
//! The traversal pass drains [`LAYOUT`] after each layout pass to learn
//! which views asked for layout *during* it (the corrective-pass trigger),
//! and drains [`DRAW`] when it draws. [`INSETS`] is drained when insets are
//! dispatched.

use understory_dirty::Channel;

/// A view asked to be measured and laid out again.
pub const LAYOUT: Channel = Channel::new(0);

/// A view's pixels are stale.
pub const DRAW: Channel = Channel::new(1);

/// A view asked for insets to be dispatched again.
pub const INSETS: Channel = Channel::new(2);
