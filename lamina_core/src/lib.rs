// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental invalidation and repaint scheduling for retained widget trees.
//!
//! `lamina_core` decides, once per frame, which widgets of a retained tree
//! must be restructured, laid out, repainted or ticked, and paints only
//! those, reusing the cached output of everything else. It is `no_std`
//! compatible (with `alloc`) and keeps per-widget state in segmented arrays
//! addressed by stable indices.
//!
//! # Architecture
//!
//! Widgets report *why* they changed; the root turns that into queued work
//! and resolves it in tree order:
//!
//! ```text
//!   widget mutation ──► InvalidateReason ──► InvalidationRoot::invalidate_widget
//!                                                   │
//!                      ┌────────────────────────────┤
//!                      ▼                            ▼
//!             pre-update heap ─► prepass heap ─► post-update heap
//!                                                   │
//!                                                   ▼
//!                         final update list ──► paint / tick / timers
//!                                                   │
//!                                                   ▼
//!                                            CachedElements
//! ```
//!
//! **[`root`]**: [`InvalidationRoot`](root::InvalidationRoot), the
//! per-frame driver. Takes the fast path when it can and falls back to a
//! full rebuild and repaint (the slow path) when it cannot.
//!
//! **[`list`]**: the segmented [`WidgetList`](list::WidgetList) of proxies
//! in tree pre-order, with O(1) ancestry tests through packed sort orders
//! and partial rebuilds when a widget's children change.
//!
//! **[`heap`]**: the three update queues, keyed by sort order.
//!
//! **[`proxy`]**: the per-widget scheduling state the root keeps.
//!
//! **[`reason`]**: [`InvalidateReason`](reason::InvalidateReason) and
//! [`UpdateFlags`](reason::UpdateFlags).
//!
//! **[`host`]**: the [`WidgetHost`](host::WidgetHost) and
//! [`InvalidationHost`](host::InvalidationHost) traits a widget tree
//! implements to be scheduled.
//!
//! **[`arena`]**: a reference widget tree implementing both host traits.
//!
//! **[`paint`]**: cached draw elements kept between frames.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod arena;
pub mod error;
pub mod heap;
pub mod host;
pub mod list;
pub mod paint;
pub mod proxy;
pub mod reason;
pub mod root;
pub mod trace;
pub mod visibility;
