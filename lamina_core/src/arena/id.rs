// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget identity.

use core::fmt;

/// Sentinel value indicating "no widget" in raw index fields.
pub const INVALID: u32 = u32::MAX;

/// A non-owning handle to a widget.
///
/// Contains both a slot index and a generation counter so that a handle to a
/// destroyed widget is detected (it no longer resolves) instead of silently
/// addressing whatever widget reuses the slot. This is the scheduler's only
/// reference to a widget: it never owns one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId {
    /// Slot index into the owning tree's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the tree's generation for this slot.
    pub(crate) generation: u32,
}

impl WidgetId {
    /// Creates a handle from raw parts.
    ///
    /// Intended for [`WidgetHost`](crate::host::WidgetHost) implementations
    /// that keep their own storage; [`WidgetArena`](super::WidgetArena)
    /// hands out handles itself.
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Returns `true` if `self` names a widget created in the slot of
    /// `older` after `older` was destroyed.
    ///
    /// Proxies and cached elements keyed by `older` must not be carried
    /// over to `self`, even though both address the same arrays.
    #[inline]
    #[must_use]
    pub const fn supersedes(self, older: Self) -> bool {
        self.idx == older.idx && self.generation > older.generation
    }
}

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetId({}@gen{})", self.idx, self.generation)
    }
}

/// Compact form for dumps: `#slot` for a first-generation widget and
/// `#slot'gen` once the slot has been reused.
impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.idx)
        } else {
            write!(f, "#{}'{}", self.idx, self.generation)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn reused_slot_supersedes_the_destroyed_widget() {
        let old = WidgetId::from_raw_parts(3, 0);
        let new = WidgetId::from_raw_parts(3, 1);
        assert!(new.supersedes(old));
        assert!(!old.supersedes(new));
        assert!(!old.supersedes(old));
        assert!(!WidgetId::from_raw_parts(4, 1).supersedes(old));
    }

    #[test]
    fn display_shows_generation_only_after_reuse() {
        assert_eq!(format!("{}", WidgetId::from_raw_parts(7, 0)), "#7");
        assert_eq!(format!("{}", WidgetId::from_raw_parts(7, 2)), "#7'2");
    }
}
