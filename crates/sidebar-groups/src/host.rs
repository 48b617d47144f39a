//! The boundary to the host that renders the sidebar.
//!
//! The host owns the list: it creates, orders, re-renders and destroys item
//! rows at will. The grouping crate only reads the locations described by
//! [`SidebarHost`] and writes back rendered names, synthetic headers and row
//! visibility. Hosts also provide the notification facilities the change
//! detector needs: document visibility transitions and child-list changes of
//! the list container.

use std::sync::Arc;

use sidebar_groups_core::Signal;

use crate::prefix::GroupKey;

/// Stable identity of a host item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Identity of a synthetic header element inserted into the host list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderId(pub u64);

/// Document-level visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// The document is shown (an active tab).
    #[default]
    Visible,
    /// The document is hidden (background tab, minimized window).
    Hidden,
}

/// Visibility of a row and its immediate wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowVisibility {
    /// Visible at normal height.
    #[default]
    Expanded,
    /// Hidden with zero height.
    Collapsed,
}

impl RowVisibility {
    /// The row visibility matching a header's open state.
    pub fn for_open(open: bool) -> Self {
        if open { Self::Expanded } else { Self::Collapsed }
    }
}

/// A structural change to the list container's direct children.
///
/// Attribute and text edits are never reported as child-list changes; that
/// keeps the grouping engine's own name rewrites from re-triggering it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildListChange {
    /// Number of children inserted.
    pub added: usize,
    /// Number of children removed.
    pub removed: usize,
}

/// What to render inside an item's name element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRender {
    /// The plain name, with any group styling removed.
    Plain { text: String },
    /// A grouped member: the shared prefix glyph followed by the name
    /// remainder. Rendering a member places the structural marker that
    /// [`SidebarHost::is_transformed`] reports.
    Member { prefix: String, label: String },
}

impl NameRender {
    /// `true` for [`NameRender::Member`].
    pub fn is_member(&self) -> bool {
        matches!(self, Self::Member { .. })
    }
}

/// Content of a synthetic group header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    /// The group the header governs.
    pub key: GroupKey,
    /// Label text (the prefix).
    pub label: String,
    /// Collapse state, shown by the header's expand/collapse glyph.
    pub open: bool,
}

/// The host page collaborator.
///
/// Every method must tolerate stale identities: an [`ItemId`] or
/// [`HeaderId`] the host no longer knows is ignored (writes) or reported as
/// absent (reads).
pub trait SidebarHost: Send + Sync {
    /// Item rows in document order, or `None` if the list container does not
    /// exist yet. Synthetic headers are not included.
    fn rows(&self) -> Option<Vec<ItemId>>;

    /// Current text of the item's name element, or `None` if the row has no
    /// name element.
    fn name_text(&self, item: ItemId) -> Option<String>;

    /// Whether the item's name element currently carries the member marker.
    fn is_transformed(&self, item: ItemId) -> bool;

    /// Whether the row sits inside a starred section.
    fn is_starred(&self, item: ItemId) -> bool;

    /// Rewrite the item's name element.
    fn render_name(&self, item: ItemId, render: &NameRender);

    /// Set the row's (and its wrapper's) visibility and height.
    fn set_row_visibility(&self, item: ItemId, visibility: RowVisibility);

    /// Insert a header immediately before `before`. Returns `None` if the row
    /// no longer exists.
    fn insert_header(&self, before: ItemId, view: &HeaderView) -> Option<HeaderId>;

    /// Whether the header is attached and sits immediately before `item`.
    fn header_precedes(&self, header: HeaderId, item: ItemId) -> bool;

    /// Move an attached header immediately before `before`. Returns `false` if
    /// the header is no longer attached.
    fn move_header(&self, header: HeaderId, before: ItemId) -> bool;

    /// Refresh a header's label and open/closed glyph.
    fn update_header(&self, header: HeaderId, view: &HeaderView);

    /// Remove a header from the list.
    fn remove_header(&self, header: HeaderId);

    /// Current document visibility.
    fn visibility(&self) -> Visibility;

    /// Emitted on every document visibility transition.
    fn visibility_changed(&self) -> &Signal<Visibility>;

    /// Child-list notifications for the list container, or `None` if the
    /// container does not exist.
    fn child_list(&self) -> Option<Arc<Signal<ChildListChange>>>;

    /// Emitted when the user clicks a synthetic header.
    fn header_activated(&self) -> &Signal<GroupKey>;
}
