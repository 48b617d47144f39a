//! In-memory sidebar host.
//!
//! `MemoryHost` is a complete [`SidebarHost`] that keeps the list in a vector
//! of rows and synthetic headers. It stands in for a real page in tests and
//! demos, and its "host-side" methods (`push_row`, `remove_row`,
//! `rerender_all`, `set_visibility`, `click_header`, ...) simulate what an
//! uncontrolled front end does to the list.
//!
//! # Example
//!
//! ```
//! use sidebar_groups::memory::MemoryHost;
//! use sidebar_groups::host::SidebarHost;
//!
//! let host = MemoryHost::new();
//! let a = host.push_row("foo-a", false);
//! host.push_row("foo-b", false);
//!
//! assert_eq!(host.rows().map(|rows| rows.len()), Some(2));
//! assert_eq!(host.name_text(a).as_deref(), Some("foo-a"));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use sidebar_groups_core::Signal;

use crate::host::{
    ChildListChange, HeaderId, HeaderView, ItemId, NameRender, RowVisibility, SidebarHost,
    Visibility,
};
use crate::prefix::GroupKey;

#[derive(Debug, Clone)]
struct RowState {
    id: ItemId,
    /// Host-provided name; `None` when the row has no name element.
    name: Option<String>,
    starred: bool,
    /// What the grouping side rendered; `None` until it touches the row.
    render: Option<NameRender>,
    visibility: RowVisibility,
}

impl RowState {
    fn displayed_text(&self) -> Option<String> {
        match (&self.render, &self.name) {
            (_, None) => None,
            (Some(NameRender::Plain { text }), _) => Some(text.clone()),
            (Some(NameRender::Member { prefix, label }), _) => Some(format!("{prefix} {label}")),
            (None, Some(name)) => Some(name.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct HeaderState {
    id: HeaderId,
    view: HeaderView,
}

#[derive(Debug, Clone)]
enum Entry {
    Row(RowState),
    Header(HeaderState),
}

#[derive(Debug)]
struct MemoryState {
    container: bool,
    visibility: Visibility,
    entries: Vec<Entry>,
    next_item: u64,
    next_header: u64,
    writes: usize,
}

impl MemoryState {
    fn row_index(&self, id: ItemId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| matches!(entry, Entry::Row(row) if row.id == id))
    }

    fn header_index(&self, id: HeaderId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| matches!(entry, Entry::Header(header) if header.id == id))
    }

    fn row(&self, id: ItemId) -> Option<&RowState> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Row(row) if row.id == id => Some(row),
            _ => None,
        })
    }

    fn row_mut(&mut self, id: ItemId) -> Option<&mut RowState> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Row(row) if row.id == id => Some(row),
            _ => None,
        })
    }

    fn new_row(&mut self, name: Option<String>, starred: bool) -> RowState {
        self.next_item += 1;
        RowState {
            id: ItemId(self.next_item),
            name,
            starred,
            render: None,
            visibility: RowVisibility::Expanded,
        }
    }
}

/// One line of a [`MemoryHost::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarLine {
    /// A synthetic header.
    Header {
        id: HeaderId,
        key: GroupKey,
        label: String,
        open: bool,
    },
    /// A host row as currently displayed.
    Row {
        id: ItemId,
        text: Option<String>,
        member: bool,
        visibility: RowVisibility,
    },
}

/// A [`SidebarHost`] backed by plain memory.
pub struct MemoryHost {
    state: Mutex<MemoryState>,
    visibility_changed: Signal<Visibility>,
    child_list: Arc<Signal<ChildListChange>>,
    header_activated: Signal<GroupKey>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryHost")
            .field("container", &state.container)
            .field("visibility", &state.visibility)
            .field("entries", &state.entries.len())
            .finish()
    }
}

impl MemoryHost {
    /// An empty, visible list whose container exists.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                container: true,
                visibility: Visibility::Visible,
                entries: Vec::new(),
                next_item: 0,
                next_header: 0,
                writes: 0,
            }),
            visibility_changed: Signal::new(),
            child_list: Arc::new(Signal::new()),
            header_activated: Signal::new(),
        }
    }

    /// A host whose list container has not been rendered yet.
    pub fn without_container() -> Self {
        let host = Self::new();
        host.state.lock().container = false;
        host
    }

    fn notify(&self, added: usize, removed: usize) {
        let container = self.state.lock().container;
        if container && (added > 0 || removed > 0) {
            self.child_list.emit(ChildListChange { added, removed });
        }
    }

    /// Append a named row.
    pub fn push_row(&self, name: impl Into<String>, starred: bool) -> ItemId {
        let id = {
            let mut state = self.state.lock();
            let row = state.new_row(Some(name.into()), starred);
            let id = row.id;
            state.entries.push(Entry::Row(row));
            id
        };
        self.notify(1, 0);
        id
    }

    /// Append a row that has no name element.
    pub fn push_row_without_name(&self, starred: bool) -> ItemId {
        let id = {
            let mut state = self.state.lock();
            let row = state.new_row(None, starred);
            let id = row.id;
            state.entries.push(Entry::Row(row));
            id
        };
        self.notify(1, 0);
        id
    }

    /// Insert a named row immediately before `before` (or at the end when
    /// `before` is unknown).
    pub fn insert_row_before(&self, before: ItemId, name: impl Into<String>, starred: bool) -> ItemId {
        let id = {
            let mut state = self.state.lock();
            let row = state.new_row(Some(name.into()), starred);
            let id = row.id;
            match state.row_index(before) {
                Some(index) => state.entries.insert(index, Entry::Row(row)),
                None => state.entries.push(Entry::Row(row)),
            }
            id
        };
        self.notify(1, 0);
        id
    }

    /// Remove a row. Returns `false` if it did not exist.
    pub fn remove_row(&self, id: ItemId) -> bool {
        let removed = {
            let mut state = self.state.lock();
            match state.row_index(id) {
                Some(index) => {
                    state.entries.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notify(0, 1);
        }
        removed
    }

    /// Re-render one row with a new name, discarding anything written to it.
    pub fn rename_row(&self, id: ItemId, name: impl Into<String>) -> bool {
        let renamed = {
            let mut state = self.state.lock();
            match state.row_mut(id) {
                Some(row) => {
                    row.name = Some(name.into());
                    row.render = None;
                    row.visibility = RowVisibility::Expanded;
                    true
                }
                None => false,
            }
        };
        if renamed {
            self.notify(1, 1);
        }
        renamed
    }

    /// Re-render the whole list from scratch: every row loses its rendered
    /// name and visibility, and every synthetic header is dropped.
    pub fn rerender_all(&self) {
        let (added, removed) = {
            let mut state = self.state.lock();
            let removed = state.entries.len();
            state.entries.retain(|entry| matches!(entry, Entry::Row(_)));
            for entry in &mut state.entries {
                if let Entry::Row(row) = entry {
                    row.render = None;
                    row.visibility = RowVisibility::Expanded;
                }
            }
            (state.entries.len(), removed)
        };
        self.notify(added, removed);
    }

    /// Create or tear down the list container.
    pub fn set_container_present(&self, present: bool) {
        self.state.lock().container = present;
    }

    /// Change document visibility, notifying on transitions.
    pub fn set_visibility(&self, visibility: Visibility) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.visibility != visibility;
            state.visibility = visibility;
            changed
        };
        if changed {
            self.visibility_changed.emit(visibility);
        }
    }

    /// Simulate a user click on a header. Returns `false` if it is not attached.
    pub fn click_header(&self, id: HeaderId) -> bool {
        let key = {
            let state = self.state.lock();
            state.header_index(id).and_then(|index| match &state.entries[index] {
                Entry::Header(header) => Some(header.view.key.clone()),
                Entry::Row(_) => None,
            })
        };
        match key {
            Some(key) => {
                self.header_activated.emit(key);
                true
            }
            None => false,
        }
    }

    /// The attached header for `key`, if any.
    pub fn header_for(&self, key: &GroupKey) -> Option<HeaderId> {
        self.state.lock().entries.iter().find_map(|entry| match entry {
            Entry::Header(header) if &header.view.key == key => Some(header.id),
            _ => None,
        })
    }

    /// Number of attached headers.
    pub fn header_count(&self) -> usize {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|entry| matches!(entry, Entry::Header(_)))
            .count()
    }

    /// Current visibility of a row.
    pub fn row_visibility(&self, id: ItemId) -> Option<RowVisibility> {
        self.state.lock().row(id).map(|row| row.visibility)
    }

    /// What the grouping side last rendered into a row.
    pub fn rendered(&self, id: ItemId) -> Option<NameRender> {
        self.state.lock().row(id).and_then(|row| row.render.clone())
    }

    /// Text currently displayed by a row.
    pub fn displayed_text(&self, id: ItemId) -> Option<String> {
        self.state.lock().row(id).and_then(RowState::displayed_text)
    }

    /// Number of effective writes made through the [`SidebarHost`] interface.
    ///
    /// Writes that leave the list unchanged are not counted.
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    /// The full list as currently displayed.
    pub fn snapshot(&self) -> Vec<SidebarLine> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|entry| match entry {
                Entry::Header(header) => SidebarLine::Header {
                    id: header.id,
                    key: header.view.key.clone(),
                    label: header.view.label.clone(),
                    open: header.view.open,
                },
                Entry::Row(row) => SidebarLine::Row {
                    id: row.id,
                    text: row.displayed_text(),
                    member: row.render.as_ref().is_some_and(NameRender::is_member),
                    visibility: row.visibility,
                },
            })
            .collect()
    }
}

impl SidebarHost for MemoryHost {
    fn rows(&self) -> Option<Vec<ItemId>> {
        let state = self.state.lock();
        if !state.container {
            return None;
        }
        Some(
            state
                .entries
                .iter()
                .filter_map(|entry| match entry {
                    Entry::Row(row) => Some(row.id),
                    Entry::Header(_) => None,
                })
                .collect(),
        )
    }

    fn name_text(&self, item: ItemId) -> Option<String> {
        self.state.lock().row(item).and_then(RowState::displayed_text)
    }

    fn is_transformed(&self, item: ItemId) -> bool {
        self.state
            .lock()
            .row(item)
            .and_then(|row| row.render.as_ref())
            .is_some_and(NameRender::is_member)
    }

    fn is_starred(&self, item: ItemId) -> bool {
        self.state.lock().row(item).is_some_and(|row| row.starred)
    }

    fn render_name(&self, item: ItemId, render: &NameRender) {
        let mut state = self.state.lock();
        let Some(row) = state.row_mut(item) else {
            return;
        };
        if row.name.is_none() || row.render.as_ref() == Some(render) {
            return;
        }
        // A plain render of the host's own name is indistinguishable from
        // never having been touched.
        if row.render.is_none()
            && matches!(render, NameRender::Plain { text } if Some(text) == row.name.as_ref())
        {
            return;
        }
        row.render = Some(render.clone());
        state.writes += 1;
    }

    fn set_row_visibility(&self, item: ItemId, visibility: RowVisibility) {
        let mut state = self.state.lock();
        let Some(row) = state.row_mut(item) else {
            return;
        };
        if row.visibility != visibility {
            row.visibility = visibility;
            state.writes += 1;
        }
    }

    fn insert_header(&self, before: ItemId, view: &HeaderView) -> Option<HeaderId> {
        let id = {
            let mut state = self.state.lock();
            let index = state.row_index(before)?;
            state.next_header += 1;
            let id = HeaderId(state.next_header);
            state.entries.insert(
                index,
                Entry::Header(HeaderState {
                    id,
                    view: view.clone(),
                }),
            );
            state.writes += 1;
            id
        };
        self.notify(1, 0);
        Some(id)
    }

    fn header_precedes(&self, header: HeaderId, item: ItemId) -> bool {
        let state = self.state.lock();
        match state.row_index(item) {
            Some(index) if index > 0 => {
                matches!(&state.entries[index - 1], Entry::Header(h) if h.id == header)
            }
            _ => false,
        }
    }

    fn move_header(&self, header: HeaderId, before: ItemId) -> bool {
        let moved = {
            let mut state = self.state.lock();
            let Some(from) = state.header_index(header) else {
                return false;
            };
            if state.row_index(before).is_none() {
                return false;
            }
            let entry = state.entries.remove(from);
            // Row index shifts when the header sat above it.
            let to = state.row_index(before).unwrap_or(state.entries.len());
            state.entries.insert(to, entry);
            state.writes += 1;
            true
        };
        if moved {
            self.notify(1, 1);
        }
        moved
    }

    fn update_header(&self, header: HeaderId, view: &HeaderView) {
        let mut state = self.state.lock();
        let Some(index) = state.header_index(header) else {
            return;
        };
        if let Entry::Header(h) = &mut state.entries[index]
            && h.view != *view
        {
            h.view = view.clone();
            state.writes += 1;
        }
    }

    fn remove_header(&self, header: HeaderId) {
        let removed = {
            let mut state = self.state.lock();
            match state.header_index(header) {
                Some(index) => {
                    state.entries.remove(index);
                    state.writes += 1;
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notify(0, 1);
        }
    }

    fn visibility(&self) -> Visibility {
        self.state.lock().visibility
    }

    fn visibility_changed(&self) -> &Signal<Visibility> {
        &self.visibility_changed
    }

    fn child_list(&self) -> Option<Arc<Signal<ChildListChange>>> {
        if self.state.lock().container {
            Some(self.child_list.clone())
        } else {
            None
        }
    }

    fn header_activated(&self) -> &Signal<GroupKey> {
        &self.header_activated
    }
}

static_assertions::assert_impl_all!(MemoryHost: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_exclude_headers() {
        let host = MemoryHost::new();
        let a = host.push_row("foo-a", false);
        let b = host.push_row("foo-b", false);

        let view = HeaderView {
            key: GroupKey::new("foo", false),
            label: "foo".into(),
            open: true,
        };
        let header = host.insert_header(a, &view).unwrap();

        assert_eq!(host.rows(), Some(vec![a, b]));
        assert!(host.header_precedes(header, a));
        assert!(!host.header_precedes(header, b));
        assert_eq!(host.header_count(), 1);
    }

    #[test]
    fn test_missing_container_hides_rows_and_notifications() {
        let host = MemoryHost::without_container();
        host.push_row("foo-a", false);

        assert_eq!(host.rows(), None);
        assert!(host.child_list().is_none());

        host.set_container_present(true);
        assert_eq!(host.rows().map(|r| r.len()), Some(1));
        assert!(host.child_list().is_some());
    }

    #[test]
    fn test_child_list_reports_structural_changes_only() {
        let host = MemoryHost::new();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let recv = changes.clone();
        host.child_list()
            .unwrap()
            .connect(move |change| recv.lock().push(*change));

        let a = host.push_row("foo-a", false);
        host.render_name(
            a,
            &NameRender::Member {
                prefix: "foo".into(),
                label: "a".into(),
            },
        );
        host.set_row_visibility(a, RowVisibility::Collapsed);
        host.remove_row(a);

        assert_eq!(
            *changes.lock(),
            vec![
                ChildListChange { added: 1, removed: 0 },
                ChildListChange { added: 0, removed: 1 },
            ]
        );
    }

    #[test]
    fn test_writes_skip_no_op_renders() {
        let host = MemoryHost::new();
        let a = host.push_row("general", false);

        host.render_name(a, &NameRender::Plain { text: "general".into() });
        host.set_row_visibility(a, RowVisibility::Expanded);
        assert_eq!(host.writes(), 0);

        let member = NameRender::Member {
            prefix: "gen".into(),
            label: "eral".into(),
        };
        host.render_name(a, &member);
        host.render_name(a, &member);
        assert_eq!(host.writes(), 1);
        assert!(host.is_transformed(a));
    }

    #[test]
    fn test_rename_discards_rendering() {
        let host = MemoryHost::new();
        let a = host.push_row("foo-a", false);
        host.render_name(
            a,
            &NameRender::Member {
                prefix: "foo".into(),
                label: "a".into(),
            },
        );
        host.set_row_visibility(a, RowVisibility::Collapsed);

        host.rename_row(a, "foo-z");

        assert!(!host.is_transformed(a));
        assert_eq!(host.name_text(a).as_deref(), Some("foo-z"));
        assert_eq!(host.row_visibility(a), Some(RowVisibility::Expanded));
    }

    #[test]
    fn test_move_header() {
        let host = MemoryHost::new();
        let a = host.push_row("x", false);
        let b = host.push_row("y", false);
        let view = HeaderView {
            key: GroupKey::new("y", false),
            label: "y".into(),
            open: true,
        };
        let header = host.insert_header(a, &view).unwrap();

        assert!(host.move_header(header, b));
        assert!(host.header_precedes(header, b));

        host.remove_header(header);
        assert!(!host.move_header(header, a));
        assert!(!host.click_header(header));
    }

    #[test]
    fn test_visibility_notifies_on_transition_only() {
        let host = MemoryHost::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recv = seen.clone();
        host.visibility_changed()
            .connect(move |v| recv.lock().push(*v));

        host.set_visibility(Visibility::Visible);
        host.set_visibility(Visibility::Hidden);
        host.set_visibility(Visibility::Hidden);
        host.set_visibility(Visibility::Visible);

        assert_eq!(*seen.lock(), vec![Visibility::Hidden, Visibility::Visible]);
    }
}
