// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::root::{PaintPath, SlowPathReason};
use lamina_core::trace::{
    ChildOrderEvent, FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    SlowPathEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    lines: u64,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer, lines: 0 }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Returns how many lines were written.
    #[must_use]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if writeln!(self.writer, "{args}").is_ok() {
            self.lines += 1;
        }
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::PreUpdate => "pre-update",
        PhaseKind::Prepass => "prepass",
        PhaseKind::PostUpdate => "post-update",
        PhaseKind::Paint => "paint",
        PhaseKind::SlowPath => "slow-path",
    }
}

fn slow_path_name(reason: SlowPathReason) -> &'static str {
    match reason {
        SlowPathReason::Requested => "requested",
        SlowPathReason::ChildOrder => "root-child-order",
        SlowPathReason::Layout => "root-layout",
        SlowPathReason::RootChanged => "root-changed",
        SlowPathReason::FastPathDisallowed => "fast-path-disallowed",
        SlowPathReason::RootResized => "root-resized",
        SlowPathReason::VerificationFailed => "verification-failed",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.line(format_args!(
            "[frame] frame={} root={} fast-path={}",
            e.frame_index,
            e.root.to_raw(),
            if e.fast_path_allowed { "allowed" } else { "off" },
        ));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.line(format_args!(
            "[phase:begin] frame={} {}",
            e.frame_index,
            phase_name(e.phase),
        ));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.line(format_args!(
            "[phase:end] frame={} {} processed={}",
            e.frame_index,
            phase_name(e.phase),
            e.processed,
        ));
    }

    fn on_slow_path(&mut self, e: &SlowPathEvent) {
        self.line(format_args!(
            "[slow-path] frame={} reason={}",
            e.frame_index,
            slow_path_name(e.reason),
        ));
    }

    fn on_child_order(&mut self, e: &ChildOrderEvent) {
        self.line(format_args!(
            "[child-order] frame={} widget={} removed={} rebuilt={}",
            e.frame_index, e.widget, e.removed, e.rebuilt,
        ));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let path = match s.stats.path {
            PaintPath::Fast => "fast",
            PaintPath::Slow => "slow",
        };
        self.line(format_args!(
            "[summary] frame={} root={} path={path} pre={} prepass={} post={} \
             painted={} final={} max-layer={} repainted={}",
            s.frame_index,
            s.root.to_raw(),
            s.stats.pre_update,
            s.stats.prepass,
            s.stats.post_update,
            s.stats.painted,
            s.stats.final_list,
            s.max_layer_id,
            s.repainted,
        ));
    }
}
