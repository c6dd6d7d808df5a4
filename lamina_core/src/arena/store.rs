// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays widget storage with allocation, topology, and property
//! management.

use alloc::vec::Vec;

use kurbo::{Point, Size};

use super::id::{INVALID, WidgetId};
use super::traverse::{Children, PreOrder};
use crate::paint::ElementKind;
use crate::reason::{InvalidateReason, UpdateFlags};
use crate::visibility::Visibility;

/// Per-widget structural flags.
///
/// Both flags change which widgets an invalidation root lists, so setting
/// them records a child-order invalidation on the parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WidgetFlags {
    /// The widget is an empty-slot placeholder and gets no proxy.
    pub null_widget: bool,
    /// The widget owns a nested invalidation root; its children are not
    /// listed by the enclosing root.
    pub invalidation_root: bool,
}

/// Struct-of-arrays storage for a retained widget tree.
///
/// Widgets are addressed by [`WidgetId`] handles. Internally, each widget
/// occupies a slot in parallel arrays. Destroyed widgets are recycled via a
/// free list, and generation counters prevent stale handle access.
///
/// Every mutation records the invalidation it implies; the owner forwards
/// them to its [`InvalidationRoot`](crate::root::InvalidationRoot) after
/// draining them with [`take_invalidations`](Self::take_invalidations).
#[derive(Debug)]
pub struct WidgetArena {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Properties (set by callers) --
    pub(crate) content_size: Vec<Size>,
    pub(crate) visibility: Vec<Visibility>,
    pub(crate) volatile: Vec<bool>,
    pub(crate) volatile_prepass: Vec<bool>,
    pub(crate) update_flags: Vec<UpdateFlags>,
    pub(crate) kind: Vec<ElementKind>,
    pub(crate) color: Vec<u32>,
    pub(crate) flags: Vec<WidgetFlags>,
    pub(crate) bound_attributes: Vec<u32>,
    pub(crate) pending_attribute_reason: Vec<InvalidateReason>,

    // -- Layout state (written by prepass and paint) --
    pub(crate) desired_size: Vec<Size>,
    pub(crate) prepass_dirty: Vec<bool>,
    pub(crate) layout_scale: Vec<Option<f32>>,
    pub(crate) origin: Vec<Point>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    pub(crate) root: u32,

    // -- Recording --
    pub(crate) pending_invalidations: Vec<(WidgetId, InvalidateReason)>,
    pub(crate) pending_destroyed: Vec<WidgetId>,
    pub(crate) paint_log: Vec<WidgetId>,
    pub(crate) tick_log: Vec<WidgetId>,
    pub(crate) timer_log: Vec<WidgetId>,
    pub(crate) removed_log: Vec<WidgetId>,
}

impl Default for WidgetArena {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            content_size: Vec::new(),
            visibility: Vec::new(),
            volatile: Vec::new(),
            volatile_prepass: Vec::new(),
            update_flags: Vec::new(),
            kind: Vec::new(),
            color: Vec::new(),
            flags: Vec::new(),
            bound_attributes: Vec::new(),
            pending_attribute_reason: Vec::new(),
            desired_size: Vec::new(),
            prepass_dirty: Vec::new(),
            layout_scale: Vec::new(),
            origin: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            root: INVALID,
            pending_invalidations: Vec::new(),
            pending_destroyed: Vec::new(),
            paint_log: Vec::new(),
            tick_log: Vec::new(),
            timer_log: Vec::new(),
            removed_log: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new detached widget and returns its handle.
    ///
    /// The widget starts visible, non-volatile, with zero content size and
    /// no layout.
    pub fn create_widget(&mut self) -> WidgetId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.content_size[i] = Size::ZERO;
            self.visibility[i] = Visibility::Visible;
            self.volatile[i] = false;
            self.volatile_prepass[i] = false;
            self.update_flags[i] = UpdateFlags::empty();
            self.kind[i] = ElementKind::Box;
            self.color[i] = 0;
            self.flags[i] = WidgetFlags::default();
            self.bound_attributes[i] = 0;
            self.pending_attribute_reason[i] = InvalidateReason::empty();
            self.desired_size[i] = Size::ZERO;
            self.prepass_dirty[i] = true;
            self.layout_scale[i] = None;
            self.origin[i] = Point::ZERO;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.content_size.push(Size::ZERO);
            self.visibility.push(Visibility::Visible);
            self.volatile.push(false);
            self.volatile_prepass.push(false);
            self.update_flags.push(UpdateFlags::empty());
            self.kind.push(ElementKind::Box);
            self.color.push(0);
            self.flags.push(WidgetFlags::default());
            self.bound_attributes.push(0);
            self.pending_attribute_reason.push(InvalidateReason::empty());
            self.desired_size.push(Size::ZERO);
            self.prepass_dirty.push(true);
            self.layout_scale.push(None);
            self.origin.push(Point::ZERO);
            self.generation.push(0);
            idx
        };

        self.id_at(idx)
    }

    /// Creates a widget with the given content size and appends it to
    /// `parent`.
    pub fn create_child(&mut self, parent: WidgetId, content_size: Size) -> WidgetId {
        let id = self.create_widget();
        self.content_size[id.idx as usize] = content_size;
        self.add_child(parent, id);
        id
    }

    /// Destroys a widget, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the widget has children (remove them first) or if the
    /// handle is stale.
    pub fn destroy_widget(&mut self, id: WidgetId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy widget with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }
        if self.root == idx {
            self.root = INVALID;
        }

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.pending_destroyed.push(id);
    }

    /// Destroys a widget and its whole subtree, children first.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_subtree(&mut self, id: WidgetId) {
        self.validate(id);
        let pre_order: Vec<u32> = PreOrder::new(self, id.idx).collect();
        // Reversed pre-order visits every child before its parent.
        for &idx in pre_order.iter().rev() {
            let child = self.id_at(idx);
            self.destroy_widget(child);
        }
    }

    /// Returns whether the given handle refers to a live widget.
    #[must_use]
    pub fn is_alive(&self, id: WidgetId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the number of live widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Returns `true` if no widget is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Root --

    /// Sets the widget painted by the arena's invalidation root.
    pub fn set_root(&mut self, id: Option<WidgetId>) {
        self.root = match id {
            Some(id) => {
                self.validate(id);
                id.idx
            }
            None => INVALID,
        };
    }

    /// Returns the widget painted by the arena's invalidation root.
    #[must_use]
    pub fn root(&self) -> Option<WidgetId> {
        (self.root != INVALID).then(|| self.id_at(self.root))
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: WidgetId, child: WidgetId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] == INVALID,
            "child already has a parent"
        );
        self.link_last(parent.idx, child.idx);
        self.invalidate(parent.idx, InvalidateReason::CHILD_ORDER);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the widget has no parent.
    pub fn remove_from_parent(&mut self, child: WidgetId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "widget has no parent");
        self.unlink_from_parent(c);
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is removed first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent(&mut self, child: WidgetId, new_parent: WidgetId) {
        self.validate(child);
        self.validate(new_parent);
        if self.parent[child.idx as usize] != INVALID {
            self.unlink_from_parent(child.idx);
        }
        self.link_last(new_parent.idx, child.idx);
        self.invalidate(new_parent.idx, InvalidateReason::CHILD_ORDER);
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or
    /// `sibling` has no parent.
    pub fn insert_before(&mut self, child: WidgetId, sibling: WidgetId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.prepass_dirty[p as usize] = true;
        self.invalidate(p, InvalidateReason::CHILD_ORDER);
    }

    /// Returns the parent of a widget, if any.
    #[must_use]
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a widget.
    #[must_use]
    pub fn children(&self, id: WidgetId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the live widgets of the subtree rooted at `id` in depth-first
    /// pre-order.
    #[must_use]
    pub fn subtree(&self, id: WidgetId) -> Vec<WidgetId> {
        self.validate(id);
        PreOrder::new(self, id.idx)
            .map(|idx| self.id_at(idx))
            .collect()
    }

    // -- Property getters --

    /// Returns the content size of a widget.
    #[must_use]
    pub fn content_size(&self, id: WidgetId) -> Size {
        self.validate(id);
        self.content_size[id.idx as usize]
    }

    /// Returns the flags of a widget.
    #[must_use]
    pub fn flags(&self, id: WidgetId) -> WidgetFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the color a widget paints with.
    #[must_use]
    pub fn color(&self, id: WidgetId) -> u32 {
        self.validate(id);
        self.color[id.idx as usize]
    }

    /// Returns where the widget was last laid out on screen.
    #[must_use]
    pub fn origin(&self, id: WidgetId) -> Point {
        self.validate(id);
        self.origin[id.idx as usize]
    }

    /// Returns the number of attributes bound on a widget.
    #[must_use]
    pub fn bound_attributes(&self, id: WidgetId) -> u32 {
        self.validate(id);
        self.bound_attributes[id.idx as usize]
    }

    /// Returns the attribute changes not yet polled by a root.
    #[must_use]
    pub fn pending_attribute_reason(&self, id: WidgetId) -> InvalidateReason {
        self.validate(id);
        self.pending_attribute_reason[id.idx as usize]
    }

    // -- Mutation API (records invalidations) --

    /// Sets the intrinsic size of a widget.
    ///
    /// Records a [`LAYOUT`](InvalidateReason::LAYOUT) invalidation.
    pub fn set_content_size(&mut self, id: WidgetId, size: Size) {
        self.validate(id);
        self.content_size[id.idx as usize] = size;
        self.prepass_dirty[id.idx as usize] = true;
        self.invalidate(id.idx, InvalidateReason::LAYOUT);
    }

    /// Sets the visibility of a widget.
    ///
    /// Records a [`VISIBILITY`](InvalidateReason::VISIBILITY) invalidation.
    pub fn set_visibility(&mut self, id: WidgetId, visibility: Visibility) {
        self.validate(id);
        let old = self.visibility[id.idx as usize];
        self.visibility[id.idx as usize] = visibility;
        if old.is_collapsed() != visibility.is_collapsed() {
            self.prepass_dirty[id.idx as usize] = true;
        }
        self.invalidate(id.idx, InvalidateReason::VISIBILITY);
    }

    /// Sets whether a widget caches its paint output.
    ///
    /// Records a [`VOLATILITY`](InvalidateReason::VOLATILITY) invalidation.
    pub fn set_volatile(&mut self, id: WidgetId, volatile: bool) {
        self.validate(id);
        self.volatile[id.idx as usize] = volatile;
        self.invalidate(id.idx, InvalidateReason::VOLATILITY);
    }

    /// Sets whether a volatile widget prepasses every frame.
    pub fn set_volatile_prepass(&mut self, id: WidgetId, prepass: bool) {
        self.validate(id);
        self.volatile_prepass[id.idx as usize] = prepass;
    }

    /// Sets whether a widget wants its tick every frame.
    ///
    /// Records an empty invalidation so the root refreshes the widget's
    /// update flags.
    pub fn set_needs_tick(&mut self, id: WidgetId, tick: bool) {
        self.validate(id);
        self.update_flags[id.idx as usize].set(UpdateFlags::NEEDS_TICK, tick);
        self.invalidate(id.idx, InvalidateReason::empty());
    }

    /// Sets whether a widget has active timers.
    ///
    /// Records an empty invalidation so the root refreshes the widget's
    /// update flags.
    pub fn set_active_timer(&mut self, id: WidgetId, active: bool) {
        self.validate(id);
        self.update_flags[id.idx as usize].set(UpdateFlags::NEEDS_ACTIVE_TIMER_UPDATE, active);
        self.invalidate(id.idx, InvalidateReason::empty());
    }

    /// Sets the color a widget paints with.
    ///
    /// Records a [`PAINT`](InvalidateReason::PAINT) invalidation.
    pub fn set_color(&mut self, id: WidgetId, color: u32) {
        self.validate(id);
        self.color[id.idx as usize] = color;
        self.invalidate(id.idx, InvalidateReason::PAINT);
    }

    /// Sets what kind of element a widget paints.
    ///
    /// Records a [`PAINT`](InvalidateReason::PAINT) invalidation.
    pub fn set_kind(&mut self, id: WidgetId, kind: ElementKind) {
        self.validate(id);
        self.kind[id.idx as usize] = kind;
        self.invalidate(id.idx, InvalidateReason::PAINT);
    }

    /// Sets the structural flags of a widget.
    ///
    /// Records a [`CHILD_ORDER`](InvalidateReason::CHILD_ORDER) invalidation
    /// on the parent, since the set of listed widgets changes.
    pub fn set_flags(&mut self, id: WidgetId, flags: WidgetFlags) {
        self.validate(id);
        self.flags[id.idx as usize] = flags;
        let p = self.parent[id.idx as usize];
        if p != INVALID {
            self.invalidate(p, InvalidateReason::CHILD_ORDER);
        }
    }

    /// Binds an attribute that must be polled every frame.
    ///
    /// The first binding records an
    /// [`ATTRIBUTE_REGISTRATION`](InvalidateReason::ATTRIBUTE_REGISTRATION)
    /// invalidation.
    pub fn bind_attribute(&mut self, id: WidgetId) {
        self.validate(id);
        let count = &mut self.bound_attributes[id.idx as usize];
        *count += 1;
        if *count == 1 {
            self.invalidate(id.idx, InvalidateReason::ATTRIBUTE_REGISTRATION);
        }
    }

    /// Unbinds one attribute.
    ///
    /// Unbinding the last one records an
    /// [`ATTRIBUTE_REGISTRATION`](InvalidateReason::ATTRIBUTE_REGISTRATION)
    /// invalidation.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or no attribute is bound.
    pub fn unbind_attribute(&mut self, id: WidgetId) {
        self.validate(id);
        let count = &mut self.bound_attributes[id.idx as usize];
        assert!(*count > 0, "no attribute bound");
        *count -= 1;
        if *count == 0 {
            self.pending_attribute_reason[id.idx as usize] = InvalidateReason::empty();
            self.invalidate(id.idx, InvalidateReason::ATTRIBUTE_REGISTRATION);
        }
    }

    /// Changes the value behind a bound attribute.
    ///
    /// Nothing is recorded: the change surfaces the next time the root polls
    /// the widget's attributes, as `reason`.
    pub fn set_attribute_value(&mut self, id: WidgetId, reason: InvalidateReason) {
        self.validate(id);
        if self.bound_attributes[id.idx as usize] > 0 {
            self.pending_attribute_reason[id.idx as usize] |= reason;
        }
    }

    // -- Recording --

    /// Drains the invalidations recorded since the last call, oldest first.
    pub fn take_invalidations(&mut self) -> Vec<(WidgetId, InvalidateReason)> {
        core::mem::take(&mut self.pending_invalidations)
    }

    /// Drains the handles of widgets destroyed since the last call.
    pub fn take_destroyed(&mut self) -> Vec<WidgetId> {
        core::mem::take(&mut self.pending_destroyed)
    }

    /// Drains the widgets whose paint entry point ran since the last call.
    pub fn take_paint_log(&mut self) -> Vec<WidgetId> {
        core::mem::take(&mut self.paint_log)
    }

    /// Drains the widgets whose tick ran since the last call.
    pub fn take_tick_log(&mut self) -> Vec<WidgetId> {
        core::mem::take(&mut self.tick_log)
    }

    /// Drains the widgets whose active timers ran since the last call.
    pub fn take_timer_log(&mut self) -> Vec<WidgetId> {
        core::mem::take(&mut self.timer_log)
    }

    /// Drains the widgets reported as removed from the root since the last
    /// call.
    pub fn take_removed_log(&mut self) -> Vec<WidgetId> {
        core::mem::take(&mut self.removed_log)
    }

    // -- Internal helpers --

    /// Returns the live handle for raw slot `idx`.
    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> WidgetId {
        WidgetId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: WidgetId) {
        assert!(id.idx < self.len, "WidgetId {id:?} was never allocated");
        let current = self.id_at(id.idx);
        if current == id {
            return;
        }
        if current.supersedes(id) && !self.free_list.contains(&id.idx) {
            panic!("stale WidgetId {id:?}: slot now holds {current}");
        }
        panic!("stale WidgetId {id:?} (current gen: {})", current.generation);
    }

    /// Pushes the children of `idx` so that the first child pops first.
    pub(crate) fn push_children_reversed(&self, idx: u32, stack: &mut Vec<u32>) {
        let start = stack.len();
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            stack.push(child);
            child = self.next_sibling[child as usize];
        }
        stack[start..].reverse();
    }

    fn invalidate(&mut self, idx: u32, reason: InvalidateReason) {
        let id = self.id_at(idx);
        self.pending_invalidations.push((id, reason));
    }

    /// Appends `c` to `p`'s child list.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
        self.prepass_dirty[p as usize] = true;
    }

    /// Removes `idx` from its parent's child list and records a child-order
    /// invalidation on the parent.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
        self.prepass_dirty[p as usize] = true;
        self.invalidate(p, InvalidateReason::CHILD_ORDER);
    }
}
