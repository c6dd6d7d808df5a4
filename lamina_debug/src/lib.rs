// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and text dumps for lamina diagnostics.
//!
//! This crate provides development aids on top of `lamina_core`:
//!
//! - [`pretty::PrettyPrintSink`]: a [`TraceSink`](lamina_core::trace::TraceSink)
//!   writing one human-readable line per frame event.
//! - [`dump`]: renders a root's widget list, queued heaps and final update
//!   list as indented text.

pub mod dump;
pub mod pretty;
