// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference widget tree.
//!
//! [`WidgetArena`] is a small retained widget tree that implements
//! [`WidgetHost`](crate::host::WidgetHost) and
//! [`InvalidationHost`](crate::host::InvalidationHost). Each widget has:
//!
//! - An identity ([`WidgetId`]): a generational handle that becomes stale
//!   when the widget is destroyed, which is how the scheduler's proxies
//!   detect widgets that went away behind their back.
//! - Topology: parent, first-child, and sibling links forming an ordered
//!   tree.
//! - **Properties** set by the caller: content size, visibility, volatility,
//!   tick and timer flags, paint style, bound attributes and
//!   [`WidgetFlags`].
//! - **Layout state** written by prepass and paint: desired size, layout
//!   scale and on-screen origin.
//!
//! Widgets are stored in struct-of-arrays layout with index-based handles.
//!
//! # Recorded invalidations
//!
//! Every mutation records the invalidation reason it implies, drained with
//! [`take_invalidations`](WidgetArena::take_invalidations):
//!
//! - size → `LAYOUT`, visibility → `VISIBILITY`, volatility → `VOLATILITY`,
//!   color or element kind → `PAINT`;
//! - any topology change → `CHILD_ORDER` on the affected parent;
//! - first attribute bound or last one unbound → `ATTRIBUTE_REGISTRATION`;
//! - tick or timer flag change → an empty reason, which only refreshes the
//!   widget's update flags.

mod id;
mod layout;
mod store;
mod traverse;

pub use id::{INVALID, WidgetId};
pub use store::{WidgetArena, WidgetFlags};
pub use traverse::{Children, LaidOutChildren};
