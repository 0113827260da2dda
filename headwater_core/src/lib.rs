// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root coordinator for retained-mode UI trees.
//!
//! `headwater_core` sits between a window and the tree of views hosted in
//! it. It owns two loops: a staged input pipeline that carries every event
//! through interceptors, the input method, and the tree, and a traversal
//! cycle that coalesces layout and draw requests into one pass per frame.
//!
//! # Architecture
//!
//! ```text
//!   RootHandle (any thread) ──► mailbox ──┐
//!                                         ▼
//!   ViewRoot::enqueue_input_event ──► PendingInput ──► StageChain ──► Completion
//!                                                         │   ▲
//!                                      AsyncStageQueue ◄──┘   │ synthesized keys
//!                                                             │
//!                                      synthetic generators ──┘
//!
//!   TreeCx requests ──► TraversalFlags ──► TraversalScheduler ──► perform_traversal
//! ```
//!
//! **[`root`]**: [`ViewRoot`](root::ViewRoot), the coordinator itself, and
//! [`TraversalFlags`](root::TraversalFlags).
//!
//! **[`event`]**, **[`record`]**: input events and the per-event dispatch
//! record that guarantees each event completes exactly once.
//!
//! **[`stage`]**, **[`async_queue`]**: the fixed stage chain and the
//! per-stage queues that keep same-device events in order while a peer
//! answers asynchronously.
//!
//! **[`synthetic`]**: key generators for trackballs, joysticks, touch
//! navigation pads, and fallback keys.
//!
//! **[`capture`]**: routing of key releases to the view that claimed the
//! press.
//!
//! **[`scheduler`]**, **[`timer`]**: frame-callback scheduling with a sync
//! barrier, and the timer queue that drives key repeat and flings.
//!
//! **[`tree`]**, **[`peer`]**: the traits the hosted tree and the outside
//! world implement.
//!
//! **[`dirty`]**: per-view dirty channels via `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) and the zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod async_queue;
pub mod batch;
pub mod capture;
pub mod config;
pub mod device;
pub mod dirty;
pub mod error;
pub mod event;
pub mod latch;
pub mod mailbox;
pub mod peer;
pub mod record;
pub mod root;
pub mod scheduler;
pub mod stage;
pub mod synthetic;
pub mod time;
pub mod timer;
pub mod trace;
pub mod tree;

#[cfg(test)]
mod testing;
