// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text dumps of an invalidation root.
//!
//! [`write_list`] renders the widget list as an indented tree, one proxy
//! per line with its index, sort order, flags and queued heaps.
//! [`write_root`] adds the three heaps and the final update list.

use std::collections::HashMap;
use std::fmt::{self, Write};

use lamina_core::heap::{HeapKind, WidgetHeap};
use lamina_core::list::{WidgetIndex, WidgetList};
use lamina_core::root::InvalidationRoot;

/// Writes the widget list as an indented tree.
pub fn write_list(out: &mut impl Write, list: &WidgetList) -> fmt::Result {
    writeln!(
        out,
        "list root={:?} len={} segments={} generation={}",
        list.root(),
        list.len(),
        list.segment_count(),
        list.generation(),
    )?;
    let mut depth: HashMap<WidgetIndex, usize> = HashMap::new();
    for proxy in list.iter() {
        let level = depth.get(&proxy.parent_index()).map_or(0, |d| d + 1);
        depth.insert(proxy.index(), level);
        let indent = level * 2;
        let Some(widget) = proxy.widget() else {
            writeln!(out, "{:indent$}{:?} <inert>", "", proxy.index())?;
            continue;
        };
        write!(
            out,
            "{:indent$}{:?} {widget} order={:?} leaf={:?}",
            "",
            proxy.index(),
            list.sort_order(proxy.index()),
            proxy.leaf_most_child_index(),
        )?;
        if !proxy.update_flags().is_empty() {
            write!(out, " flags={:?}", proxy.update_flags())?;
        }
        if !proxy.current_reason().is_empty() {
            write!(out, " reason={:?}", proxy.current_reason())?;
        }
        if !proxy.heaps().is_empty() {
            write!(out, " heaps={:?}", proxy.heaps())?;
        }
        if !proxy.visibility().is_visible() {
            out.write_str(" hidden")?;
        }
        if proxy.in_update_list() {
            out.write_str(" listed")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_heap<K: HeapKind>(out: &mut impl Write, heap: &WidgetHeap<K>) -> fmt::Result {
    write!(out, "{} heap ({}):", K::NAME, heap.len())?;
    for index in heap.iter() {
        write!(out, " {index:?}")?;
    }
    writeln!(out)
}

/// Writes the list, the three heaps and the last final update list.
pub fn write_root(out: &mut impl Write, root: &InvalidationRoot) -> fmt::Result {
    writeln!(
        out,
        "root {} frame={} pending-slow-path={:?}",
        root.id().to_raw(),
        root.frame_index(),
        root.pending_slow_path(),
    )?;
    write_list(out, root.list())?;
    write_heap(out, root.pre_update_heap())?;
    write_heap(out, root.prepass_heap())?;
    write_heap(out, root.post_update_heap())?;
    write!(out, "final update list ({}):", root.final_update_list().len())?;
    for index in root.final_update_list() {
        write!(out, " {index:?}")?;
    }
    writeln!(out)
}

/// Renders [`write_root`] into a string.
#[must_use]
pub fn root_to_string(root: &InvalidationRoot) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_root(&mut out, root);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use lamina_core::arena::WidgetArena;
    use lamina_core::root::{InvalidationConfig, InvalidationContext};

    #[test]
    fn dump_indents_children() {
        let mut arena = WidgetArena::new();
        let top = arena.create_widget();
        let child = arena.create_child(top, Size::new(4.0, 4.0));
        arena.create_child(child, Size::new(1.0, 1.0));
        let mut list = WidgetList::default();
        list.build(&arena, top);

        let mut out = String::new();
        write_list(&mut out, &list).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4, "got: {out}");
        assert!(lines[0].starts_with("list root="), "got: {out}");
        assert!(lines[1].starts_with("WidgetIndex("), "got: {out}");
        assert!(lines[2].starts_with("  WidgetIndex("), "got: {out}");
        assert!(lines[3].starts_with("    WidgetIndex("), "got: {out}");
        assert!(lines[2].contains(&format!(" {child} order=")), "got: {out}");
    }

    #[test]
    fn root_dump_lists_heaps() {
        let mut arena = WidgetArena::new();
        let top = arena.create_widget();
        let leaf = arena.create_child(top, Size::ZERO);
        arena.set_root(Some(top));
        let mut root = InvalidationRoot::new(InvalidationConfig::new());
        let _ = root.paint_invalidation_root(&mut arena, &InvalidationContext::default());
        let _ = arena.take_invalidations();

        arena.set_needs_tick(leaf, true);
        for (widget, reason) in arena.take_invalidations() {
            root.invalidate_widget(&mut arena, widget, reason);
        }
        let out = root_to_string(&root);
        assert!(out.contains("pre-update heap (0):"), "got: {out}");
        assert!(out.contains("post-update heap (1):"), "got: {out}");
        assert!(out.contains("NEEDS_TICK"), "got: {out}");
        assert!(out.contains("final update list (0):"), "got: {out}");
    }
}
