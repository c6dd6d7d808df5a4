// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached draw elements: the paint output an invalidation root keeps between
//! frames.
//!
//! Each widget owns the elements it emitted the last time it painted. A
//! fast-path repaint of a widget discards the cached elements of its whole
//! subtree and lets the widget paint them again; everything else is reused
//! untouched. The slow path clears the cache entirely.

use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Rect, Vec2};

use crate::arena::WidgetId;

/// What a draw element renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A filled box.
    #[default]
    Box,
    /// A border outline.
    Border,
    /// A run of shaped text.
    Text,
    /// An image.
    Image,
}

/// A single draw command emitted by a widget's paint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawElement {
    /// Layer the element is drawn on; higher layers draw on top.
    pub layer_id: i32,
    /// Bounds in window space.
    pub bounds: Rect,
    /// What to draw.
    pub kind: ElementKind,
    /// Packed `0xRRGGBBAA` color.
    pub color: u32,
}

/// Per-widget storage of painted elements.
#[derive(Clone, Debug, Default)]
pub struct CachedElements {
    by_widget: HashMap<WidgetId, Vec<DrawElement>>,
    max_layer_id: i32,
}

impl CachedElements {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the elements `widget` emitted when it last painted.
    #[must_use]
    pub fn elements_for(&self, widget: WidgetId) -> &[DrawElement] {
        self.by_widget.get(&widget).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of cached elements across all widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_widget.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_widget.values().all(Vec::is_empty)
    }

    /// Returns the highest layer id ever cached since the last [`clear`](Self::clear).
    #[must_use]
    pub fn max_layer_id(&self) -> i32 {
        self.max_layer_id
    }

    /// Discards the elements of one widget.
    pub fn clear_widget(&mut self, widget: WidgetId) {
        if let Some(elements) = self.by_widget.get_mut(&widget) {
            elements.clear();
        }
    }

    /// Forgets a widget entirely.
    pub fn remove_widget(&mut self, widget: WidgetId) {
        self.by_widget.remove(&widget);
    }

    /// Discards everything.
    pub fn clear(&mut self) {
        self.by_widget.clear();
        self.max_layer_id = 0;
    }

    /// Moves every cached element by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        for element in self.by_widget.values_mut().flatten() {
            element.bounds = element.bounds + delta;
        }
    }

    /// Returns all cached elements sorted back-to-front by layer.
    #[must_use]
    pub fn sorted_by_layer(&self) -> Vec<(WidgetId, DrawElement)> {
        let mut all: Vec<_> = self
            .by_widget
            .iter()
            .flat_map(|(&widget, elements)| elements.iter().map(move |&e| (widget, e)))
            .collect();
        all.sort_by_key(|(widget, e)| (e.layer_id, *widget));
        all
    }

    /// Returns a sink that appends to this cache.
    pub fn sink(&mut self) -> ElementSink<'_> {
        ElementSink {
            cache: self,
            pushed: 0,
        }
    }
}

/// Write access to a [`CachedElements`] handed to widget paint calls.
#[derive(Debug)]
pub struct ElementSink<'a> {
    cache: &'a mut CachedElements,
    pushed: usize,
}

impl ElementSink<'_> {
    /// Records an element emitted by `widget`.
    pub fn push(&mut self, widget: WidgetId, element: DrawElement) {
        self.cache.max_layer_id = self.cache.max_layer_id.max(element.layer_id);
        self.cache.by_widget.entry(widget).or_default().push(element);
        self.pushed += 1;
    }

    /// Returns the number of elements pushed through this sink.
    #[must_use]
    pub fn pushed(&self) -> usize {
        self.pushed
    }
}
