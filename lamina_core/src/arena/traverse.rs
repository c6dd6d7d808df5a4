// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, WidgetId};
use super::store::WidgetArena;

/// An iterator over the direct children of a widget.
///
/// Created by [`WidgetArena::children`].
#[derive(Clone, Debug)]
pub struct Children<'a> {
    arena: &'a WidgetArena,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(arena: &'a WidgetArena, first: u32) -> Self {
        Self {
            arena,
            current: first,
        }
    }

    /// Restricts the walk to children that take up space in layout.
    ///
    /// Collapsed children are skipped; hidden ones still occupy their slot.
    #[must_use]
    pub fn laid_out(self) -> LaidOutChildren<'a> {
        LaidOutChildren(self)
    }
}

impl Iterator for Children<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.arena.next_sibling[idx as usize];
        Some(self.arena.id_at(idx))
    }
}

/// The children of a widget that are not collapsed.
///
/// Created by [`Children::laid_out`].
#[derive(Clone, Debug)]
pub struct LaidOutChildren<'a>(Children<'a>);

impl Iterator for LaidOutChildren<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        let arena = self.0.arena;
        self.0
            .by_ref()
            .find(|child| !arena.visibility[child.idx as usize].is_collapsed())
    }
}

/// Raw slots of a subtree in depth-first pre-order, root first.
pub(crate) struct PreOrder<'a> {
    arena: &'a WidgetArena,
    stack: Vec<u32>,
}

impl<'a> PreOrder<'a> {
    pub(crate) fn new(arena: &'a WidgetArena, root: u32) -> Self {
        Self {
            arena,
            stack: alloc::vec![root],
        }
    }
}

impl Iterator for PreOrder<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let idx = self.stack.pop()?;
        self.arena.push_children_reversed(idx, &mut self.stack);
        Some(idx)
    }
}
