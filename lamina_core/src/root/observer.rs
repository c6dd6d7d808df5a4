// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::heap::{PostUpdateHeap, PrepassHeap, PreUpdateHeap};
use crate::list::{AttributeCursor, ChildOrderObserver, IndexRange, Relocation, WidgetIndex, WidgetList};

/// Fans restructure notifications out to everything a root keeps indices in.
pub(crate) struct RootObserver<'a> {
    pub(crate) pre_update: &'a mut PreUpdateHeap,
    pub(crate) prepass: &'a mut PrepassHeap,
    pub(crate) post_update: &'a mut PostUpdateHeap,
    pub(crate) cursor: &'a mut AttributeCursor,
}

impl ChildOrderObserver for RootObserver<'_> {
    fn pre_child_remove(&mut self, list: &WidgetList, parent: WidgetIndex, removed: IndexRange) {
        self.pre_update.pre_child_remove(list, parent, removed);
        self.prepass.pre_child_remove(list, parent, removed);
        self.post_update.pre_child_remove(list, parent, removed);
        self.cursor.pre_child_remove(list, parent, removed);
    }

    fn proxies_reindexed(&mut self, list: &WidgetList, moved: &[Relocation]) {
        self.pre_update.proxies_reindexed(list, moved);
        self.prepass.proxies_reindexed(list, moved);
        self.post_update.proxies_reindexed(list, moved);
        self.cursor.proxies_reindexed(list, moved);
    }

    fn proxies_pre_resort(&mut self, list: &WidgetList) {
        self.pre_update.proxies_pre_resort(list);
        self.prepass.proxies_pre_resort(list);
        self.post_update.proxies_pre_resort(list);
        self.cursor.proxies_pre_resort(list);
    }

    fn proxies_post_resort(&mut self, list: &WidgetList) {
        self.pre_update.proxies_post_resort(list);
        self.prepass.proxies_post_resort(list);
        self.post_update.proxies_post_resort(list);
        self.cursor.proxies_post_resort(list);
    }

    fn proxies_built(&mut self, list: &WidgetList, parent: WidgetIndex, built: Option<IndexRange>) {
        self.pre_update.proxies_built(list, parent, built);
        self.prepass.proxies_built(list, parent, built);
        self.post_update.proxies_built(list, parent, built);
        self.cursor.proxies_built(list, parent, built);
    }
}
