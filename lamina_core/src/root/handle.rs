// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Externally held references to proxies.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::list::WidgetIndex;
use crate::proxy::WidgetProxy;

use super::InvalidationRoot;

static NEXT_ROOT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies one [`InvalidationRoot`] for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u32);

impl RootId {
    /// Returns a fresh id, distinct from every id handed out before.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ROOT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

/// A proxy reference that survives across frames.
///
/// A [`WidgetIndex`] is only meaningful until the list restructures. The
/// handle remembers the list generation it was taken at and stops resolving
/// once the list moves on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProxyHandle {
    root: RootId,
    index: WidgetIndex,
    generation: u32,
}

impl ProxyHandle {
    pub(crate) fn new(root: RootId, index: WidgetIndex, generation: u32) -> Self {
        Self {
            root,
            index,
            generation,
        }
    }

    /// The root the handle was taken from.
    #[must_use]
    pub fn root_id(&self) -> RootId {
        self.root
    }

    /// The index the proxy had when the handle was taken.
    #[must_use]
    pub fn index(&self) -> WidgetIndex {
        self.index
    }

    /// Returns `true` if the handle still resolves in `root`.
    #[must_use]
    pub fn is_valid(&self, root: &InvalidationRoot) -> bool {
        self.root == root.id()
            && self.generation == root.list().generation()
            && root.list().proxy(self.index).is_some()
    }

    /// Resolves the handle, or `None` if it went stale.
    #[must_use]
    pub fn proxy<'a>(&self, root: &'a InvalidationRoot) -> Option<&'a WidgetProxy> {
        if self.is_valid(root) {
            root.list().proxy(self.index)
        } else {
            None
        }
    }
}
