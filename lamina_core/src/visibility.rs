// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget visibility and the per-proxy cached visibility state.

use bitflags::bitflags;

/// Visibility a widget reports for itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Painted and hit-testable.
    #[default]
    Visible,
    /// Painted; neither the widget nor its children are hit-testable.
    HitTestInvisible,
    /// Painted; the widget is not hit-testable but its children are.
    SelfHitTestInvisible,
    /// Not painted, but still occupies layout space.
    Hidden,
    /// Not painted and occupies no layout space.
    Collapsed,
}

impl Visibility {
    /// Returns `true` if the widget paints.
    #[inline]
    #[must_use]
    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::Hidden | Self::Collapsed)
    }

    /// Returns `true` if the widget takes no layout space.
    #[inline]
    #[must_use]
    pub const fn is_collapsed(self) -> bool {
        matches!(self, Self::Collapsed)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    struct Bits: u8 {
        const VISIBLE = 1 << 0;
        const ANCESTORS_VISIBLE = 1 << 1;
        const COLLAPSED = 1 << 2;
        const COLLAPSED_INDIRECTLY = 1 << 3;
    }
}

/// Visibility of a proxy, resolved against all of its ancestors.
///
/// Computed top-down whenever a subtree is built or its visibility changes,
/// so a proxy never has to walk its ancestors to know whether it paints.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WidgetVisibility(Bits);

impl WidgetVisibility {
    /// Resolves the visibility of a list root.
    #[must_use]
    pub fn root(own: Visibility) -> Self {
        Self::new(Self(Bits::VISIBLE | Bits::ANCESTORS_VISIBLE), own)
    }

    /// Resolves the visibility of a widget whose parent resolved to `parent`.
    #[must_use]
    pub fn new(parent: Self, own: Visibility) -> Self {
        let mut bits = Bits::empty();
        bits.set(Bits::VISIBLE, own.is_visible());
        bits.set(Bits::ANCESTORS_VISIBLE, parent.is_visible());
        bits.set(Bits::COLLAPSED, own.is_collapsed());
        bits.set(
            Bits::COLLAPSED_INDIRECTLY,
            parent.0.intersects(Bits::COLLAPSED | Bits::COLLAPSED_INDIRECTLY),
        );
        Self(bits)
    }

    /// Returns `true` if the widget and all of its ancestors paint.
    #[inline]
    #[must_use]
    pub fn is_visible(self) -> bool {
        self.0.contains(Bits::VISIBLE | Bits::ANCESTORS_VISIBLE)
    }

    /// Returns `true` if the widget's own visibility allows painting.
    #[inline]
    #[must_use]
    pub fn is_self_visible(self) -> bool {
        self.0.contains(Bits::VISIBLE)
    }

    /// Returns `true` if every ancestor paints.
    #[inline]
    #[must_use]
    pub fn are_ancestors_visible(self) -> bool {
        self.0.contains(Bits::ANCESTORS_VISIBLE)
    }

    /// Returns `true` if the widget itself is collapsed.
    #[inline]
    #[must_use]
    pub fn is_collapsed(self) -> bool {
        self.0.contains(Bits::COLLAPSED)
    }

    /// Returns `true` if an ancestor is collapsed.
    #[inline]
    #[must_use]
    pub fn is_collapsed_indirectly(self) -> bool {
        self.0.contains(Bits::COLLAPSED_INDIRECTLY)
    }
}

impl core::fmt::Debug for WidgetVisibility {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WidgetVisibility")
            .field("visible", &self.is_self_visible())
            .field("ancestors_visible", &self.are_ancestors_visible())
            .field("collapsed", &self.is_collapsed())
            .field("collapsed_indirectly", &self.is_collapsed_indirectly())
            .finish()
    }
}
