// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in microseconds.

use std::io::Write;

use headwater_core::time::HostTime;
use headwater_core::trace::{
    DrawCommittedEvent, DrawSubmittedEvent, FinishEvent, InputEnqueuedEvent, PhaseBeginEvent,
    PhaseEndEvent, RelayoutEvent, StageEvent, TraceSink, TraversalPhase, TraversalSummary,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    nanos_to_us(t.nanos())
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_input_enqueued(&mut self, e: &InputEnqueuedEvent) {
        let _ = writeln!(
            self.writer,
            "[input] record={} {:?} device={} source={:?} at {:.1}µs",
            e.record.0,
            e.kind,
            e.device.0,
            e.source,
            us(e.timestamp),
        );
    }

    fn on_stage(&mut self, e: &StageEvent) {
        let _ = writeln!(
            self.writer,
            "[stage] record={} {} at {:.1}µs",
            e.record.0,
            e.stage.name(),
            us(e.timestamp),
        );
    }

    fn on_deferred(&mut self, e: &StageEvent) {
        let _ = writeln!(
            self.writer,
            "[defer] record={} {} at {:.1}µs",
            e.record.0,
            e.stage.name(),
            us(e.timestamp),
        );
    }

    fn on_finished(&mut self, e: &FinishEvent) {
        let outcome = if e.handled { "handled" } else { "unhandled" };
        let _ = writeln!(
            self.writer,
            "[finish] record={} {outcome} at {:.1}µs",
            e.record.0,
            us(e.timestamp),
        );
    }

    fn on_traversal_scheduled(&mut self, timestamp: HostTime) {
        let _ = writeln!(self.writer, "[schedule] at {:.1}µs", us(timestamp));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_relayout(&mut self, e: &RelayoutEvent) {
        let granted = match e.frame {
            Some(frame) => format!("{}x{}", frame.width(), frame.height()),
            None => "FAILED".to_owned(),
        };
        let _ = writeln!(
            self.writer,
            "[relayout] frame={} requested={}x{} granted={granted}",
            e.frame_index, e.requested.width, e.requested.height,
        );
    }

    fn on_draw_submitted(&mut self, e: &DrawSubmittedEvent) {
        let _ = writeln!(
            self.writer,
            "[submit] frame={} painted={} full={} sync={} at {:.1}µs",
            e.frame_index,
            e.painted,
            e.full,
            e.sync,
            us(e.timestamp),
        );
    }

    fn on_draw_committed(&mut self, e: &DrawCommittedEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] frame={} at {:.1}µs",
            e.frame_index,
            us(e.timestamp),
        );
    }

    fn on_traversal_summary(&mut self, s: &TraversalSummary) {
        let _ = write!(
            self.writer,
            "[summary] frame={} passes={} relayout={} drew={}",
            s.frame_index, s.layout_passes, s.relayout, s.drew,
        );
        for phase in TraversalPhase::ALL {
            let _ = write!(
                self.writer,
                " {}={:.1}µs",
                phase.name(),
                nanos_to_us(s.phase(phase)),
            );
        }
        let _ = writeln!(self.writer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use headwater_core::record::RecordId;
    use headwater_core::stage::StageKind;

    #[test]
    fn pretty_print_stage() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_stage(&StageEvent {
            record: RecordId(3),
            stage: StageKind::Ime,
            timestamp: HostTime(2_000),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[stage]"), "got: {output}");
        assert!(output.contains("record=3 ime"), "got: {output}");
        assert!(output.contains("2.0µs"), "got: {output}");
    }

    #[test]
    fn summary_lists_every_phase() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_traversal_summary(&TraversalSummary {
            frame_index: 4,
            now: HostTime::ZERO,
            layout_passes: 2,
            relayout: false,
            drew: true,
            phase_nanos: [0, 1_000, 0, 5_000, 0, 3_000],
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("passes=2"), "got: {output}");
        assert!(output.contains("layout=5.0µs"), "got: {output}");
        assert_eq!(output.lines().count(), 1, "got: {output}");
    }
}
