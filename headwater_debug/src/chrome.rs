// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Traversal phases land on thread 0 as duration slices. Input records land
//! on thread 1: each record is an async slice from enqueue to finish, with
//! stage deliveries as instants inside it.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use headwater_core::time::HostTime;
use headwater_core::trace::TraversalPhase;
use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

const TRAVERSAL_TID: u32 = 0;
const INPUT_TID: u32 = 1;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::InputEnqueued(e) => {
                events.push(json!({
                    "ph": "b",
                    "name": format!("{:?}", e.kind),
                    "cat": "Input",
                    "id": e.record.0,
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": INPUT_TID,
                    "args": {
                        "device": e.device.0,
                        "source": format!("{:?}", e.source),
                    }
                }));
            }
            RecordedEvent::Stage(e) => {
                events.push(json!({
                    "ph": "n",
                    "name": e.stage.name(),
                    "cat": "Input",
                    "id": e.record.0,
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": INPUT_TID,
                }));
            }
            RecordedEvent::Deferred(e) => {
                events.push(json!({
                    "ph": "n",
                    "name": format!("{} (deferred)", e.stage.name()),
                    "cat": "Input",
                    "id": e.record.0,
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": INPUT_TID,
                }));
            }
            RecordedEvent::Finished(e) => {
                events.push(json!({
                    "ph": "e",
                    "cat": "Input",
                    "id": e.record.0,
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": INPUT_TID,
                    "args": {
                        "handled": e.handled,
                    }
                }));
            }
            RecordedEvent::TraversalScheduled(timestamp) => {
                events.push(json!({
                    "ph": "i",
                    "name": "TraversalScheduled",
                    "cat": "Traversal",
                    "ts": us(timestamp),
                    "pid": 0,
                    "tid": TRAVERSAL_TID,
                    "s": "t",
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Traversal",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TRAVERSAL_TID,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Traversal",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TRAVERSAL_TID,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Relayout(e) => {
                let granted = e.frame.map(|frame| [frame.x0, frame.y0, frame.x1, frame.y1]);
                events.push(json!({
                    "ph": "i",
                    "name": "Relayout",
                    "cat": "Traversal",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TRAVERSAL_TID,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "requested": [e.requested.width, e.requested.height],
                        "granted": granted,
                    }
                }));
            }
            RecordedEvent::DrawSubmitted(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "DrawSubmitted",
                    "cat": "Traversal",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TRAVERSAL_TID,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "painted": e.painted,
                        "full": e.full,
                        "sync": e.sync,
                    }
                }));
            }
            RecordedEvent::DrawCommitted(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "DrawCommitted",
                    "cat": "Traversal",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": TRAVERSAL_TID,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::TraversalSummary(s) => {
                let phases: serde_json::Map<String, Value> = TraversalPhase::ALL
                    .iter()
                    .map(|phase| {
                        (
                            format!("{}_us", phase.name()),
                            json!(nanos_to_us(s.phase(*phase))),
                        )
                    })
                    .collect();
                events.push(json!({
                    "ph": "i",
                    "name": "TraversalSummary",
                    "cat": "Summary",
                    "ts": us(s.now),
                    "pid": 0,
                    "tid": TRAVERSAL_TID,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "layout_passes": s.layout_passes,
                        "relayout": s.relayout,
                        "drew": s.drew,
                        "phases": phases,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn us(t: HostTime) -> f64 {
    nanos_to_us(t.nanos())
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}
