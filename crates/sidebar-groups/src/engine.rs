//! The prefix grouping engine.
//!
//! Each pass re-derives the grouped presentation from the host's current
//! list:
//!
//! 1. **Prefix extraction**: every item gets a [`GroupKey`]. Items already
//!    rendered as members by an earlier pass reuse their cached annotation,
//!    because their displayed text is no longer the raw name.
//! 2. **Root promotion**: an item whose whole name is the prefix of the item
//!    right after it becomes the head of that group (`foo` before `foo-a`).
//! 3. **Classification and render**: an item whose key matches neither
//!    neighbor is rendered standalone; the first item of a run gets the
//!    group's header inserted before it; every item of a run is rendered as a
//!    member (prefix glyph plus the remainder of its name), shown or hidden
//!    according to its group's stored open state.
//! 4. **Cleanup**: headers whose group has no run this pass are removed.
//!
//! Passes are idempotent: running one twice on an unchanged list writes
//! nothing the second time. Collapse state is the only thing that carries
//! over between passes for a given key.
//!
//! Passes are normally requested through [`GroupingEngine::group_on_idle`],
//! which keeps at most one pass pending in the [`Dispatcher`]'s idle queue,
//! so a burst of change notifications costs a single pass that sees the
//! latest list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sidebar_groups_core::{Dispatcher, IdleTaskId, Signal};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::host::{HeaderId, HeaderView, ItemId, NameRender, RowVisibility, SidebarHost};
use crate::prefix::{GroupKey, PrefixMatcher};

/// Cached per-item annotation, keyed by [`ItemId`] in the engine's side-table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAnnotation {
    raw_name: String,
    prefix: String,
    display_name: String,
    root: bool,
    rendered_key: Option<GroupKey>,
}

impl ItemAnnotation {
    fn from_raw(raw_name: String, matcher: &PrefixMatcher) -> Self {
        let prefix = matcher.prefix_of(&raw_name).to_string();
        Self {
            display_name: raw_name.clone(),
            raw_name,
            prefix,
            root: false,
            rendered_key: None,
        }
    }

    fn promote_to_root(&mut self, marker: &str) {
        self.prefix = self.raw_name.clone();
        self.display_name = format!("{}{marker}", self.raw_name);
        self.root = true;
    }

    /// Text shown after the prefix glyph when rendered as a member. Roots
    /// keep their whole display name, marker included.
    fn member_label(&self, matcher: &PrefixMatcher) -> String {
        if self.root {
            self.display_name.clone()
        } else {
            matcher.strip(&self.display_name).to_string()
        }
    }

    /// The item's name as the host rendered it before any grouping.
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// The item's prefix; empty when no grouping applies.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The raw name, with the root marker appended for root items.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the item was promoted to head its own group.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// The group the item was last rendered into, if any.
    pub fn rendered_key(&self) -> Option<&GroupKey> {
        self.rendered_key.as_ref()
    }
}

#[derive(Debug, Clone)]
struct HeaderRecord {
    id: HeaderId,
    anchor: ItemId,
    is_open: bool,
}

#[derive(Debug, Default)]
struct EngineState {
    annotations: HashMap<ItemId, ItemAnnotation>,
    headers: HashMap<GroupKey, HeaderRecord>,
}

/// Summary of one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Sequence number of the pass, starting at 1.
    pub pass: u64,
    /// The list container was absent; nothing was done.
    pub container_missing: bool,
    /// Rows scanned.
    pub items: usize,
    /// Rows with no prefix or no name element.
    pub ungrouped: usize,
    /// Rows rendered standalone because no neighbor shares their key.
    pub standalone: usize,
    /// Rows rendered as group members.
    pub members: usize,
    /// Groups with a header this pass.
    pub groups: usize,
    /// Items promoted to root this pass.
    pub roots_promoted: usize,
    /// Headers inserted into the host (new or re-inserted).
    pub headers_inserted: usize,
    /// Headers removed because their group had no run.
    pub headers_removed: usize,
}

/// One entry of [`GroupingEngine::outline`], in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineEntry {
    /// A synthetic group header.
    Header {
        key: GroupKey,
        label: String,
        open: bool,
    },
    /// A row rendered inside a group.
    Member {
        item: ItemId,
        key: GroupKey,
        label: String,
        root: bool,
    },
    /// A row left as a plain item.
    Standalone { item: ItemId, name: Option<String> },
}

fn header_view(key: &GroupKey, open: bool) -> HeaderView {
    HeaderView {
        key: key.clone(),
        label: key.prefix().to_string(),
        open,
    }
}

/// Groups host rows by prefix under synthetic, collapsible headers.
pub struct GroupingEngine {
    host: Arc<dyn SidebarHost>,
    dispatcher: Arc<Dispatcher>,
    config: EngineConfig,
    matcher: PrefixMatcher,
    state: Mutex<EngineState>,
    pending: Mutex<Option<IdleTaskId>>,
    passes: AtomicU64,
    pass_completed: Signal<PassReport>,
    group_toggled: Signal<(GroupKey, bool)>,
}

impl std::fmt::Debug for GroupingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("GroupingEngine")
            .field("annotations", &state.annotations.len())
            .field("headers", &state.headers.len())
            .field("passes", &self.passes.load(Ordering::SeqCst))
            .finish()
    }
}

impl GroupingEngine {
    /// Create an engine for `host`, scheduling deferred passes on `dispatcher`.
    pub fn new(
        host: Arc<dyn SidebarHost>,
        dispatcher: Arc<Dispatcher>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let matcher = PrefixMatcher::new(&config.prefix_pattern)?;
        Ok(Self {
            host,
            dispatcher,
            config,
            matcher,
            state: Mutex::new(EngineState::default()),
            pending: Mutex::new(None),
            passes: AtomicU64::new(0),
            pass_completed: Signal::new(),
            group_toggled: Signal::new(),
        })
    }

    /// Emitted after every pass.
    pub fn pass_completed(&self) -> &Signal<PassReport> {
        &self.pass_completed
    }

    /// Emitted with the new state whenever a group is collapsed or expanded.
    pub fn group_toggled(&self) -> &Signal<(GroupKey, bool)> {
        &self.group_toggled
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of passes run so far.
    pub fn pass_count(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Request a pass at the next idle opportunity, bounded by
    /// [`EngineConfig::idle_timeout`].
    ///
    /// Returns `false` if a pass is already pending; that pass will observe
    /// whatever the list looks like when it runs.
    pub fn group_on_idle(self: &Arc<Self>) -> bool {
        let mut pending = self.pending.lock();
        if pending.is_some() {
            tracing::trace!(target: "sidebar_groups::engine", "pass already pending, coalescing");
            return false;
        }

        let engine = Arc::downgrade(self);
        let id = self
            .dispatcher
            .request_idle(self.config.idle_timeout, move |deadline| {
                let Some(engine) = engine.upgrade() else {
                    return;
                };
                engine.pending.lock().take();
                tracing::trace!(
                    target: "sidebar_groups::engine",
                    did_timeout = deadline.did_timeout(),
                    "running deferred pass"
                );
                engine.group_all();
            });
        *pending = Some(id);
        true
    }

    /// Whether a deferred pass is waiting to run.
    pub fn has_pending_pass(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Drop the pending deferred pass. Returns `false` if none was pending.
    pub fn cancel_pending(&self) -> Result<bool> {
        match self.pending.lock().take() {
            Some(id) => {
                self.dispatcher.cancel_idle(id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run a grouping pass now.
    #[tracing::instrument(skip(self), target = "sidebar_groups::engine", level = "trace")]
    pub fn group_all(&self) -> PassReport {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let mut report = PassReport {
            pass,
            ..PassReport::default()
        };

        match self.host.rows() {
            None => {
                tracing::debug!(target: "sidebar_groups::engine", pass, "list container missing, skipping pass");
                report.container_missing = true;
            }
            Some(rows) => {
                report.items = rows.len();
                let mut state = self.state.lock();
                let present: HashSet<ItemId> = rows.iter().copied().collect();
                state.annotations.retain(|id, _| present.contains(id));

                let mut keys = self.extract_keys(&mut state, &rows);
                report.roots_promoted = self.promote_roots(&mut state, &rows, &mut keys);
                let placed = self.apply_grouping(&mut state, &rows, &keys, &mut report);
                self.collect_empty_headers(&mut state, &placed, &mut report);
            }
        }

        tracing::debug!(
            target: "sidebar_groups::engine",
            pass,
            items = report.items,
            groups = report.groups,
            members = report.members,
            standalone = report.standalone,
            headers_inserted = report.headers_inserted,
            headers_removed = report.headers_removed,
            "grouping pass complete"
        );
        self.pass_completed.emit(report.clone());
        report
    }

    /// Compute the positional key array, refreshing stale annotations.
    fn extract_keys(&self, state: &mut EngineState, rows: &[ItemId]) -> Vec<GroupKey> {
        rows.iter()
            .map(|&id| {
                let starred = self.host.is_starred(id);
                let reusable =
                    state.annotations.contains_key(&id) && self.host.is_transformed(id);
                if !reusable {
                    match self.host.name_text(id).filter(|text| !text.trim().is_empty()) {
                        Some(raw) => {
                            state
                                .annotations
                                .insert(id, ItemAnnotation::from_raw(raw, &self.matcher));
                        }
                        None => {
                            tracing::debug!(target: "sidebar_groups::engine", item = ?id, "row has no name, skipping");
                            state.annotations.remove(&id);
                        }
                    }
                }
                let prefix = state
                    .annotations
                    .get(&id)
                    .map(|annotation| annotation.prefix.clone())
                    .unwrap_or_default();
                GroupKey::new(prefix, starred)
            })
            .collect()
    }

    /// Promote items whose whole name is the next item's prefix.
    fn promote_roots(&self, state: &mut EngineState, rows: &[ItemId], keys: &mut [GroupKey]) -> usize {
        let mut promoted = 0;
        for i in 0..rows.len().saturating_sub(1) {
            let next = &keys[i + 1];
            if next.is_ungrouped() || next.is_starred() != keys[i].is_starred() {
                continue;
            }
            let Some(annotation) = state.annotations.get_mut(&rows[i]) else {
                continue;
            };
            if annotation.root || annotation.display_name != next.prefix() {
                continue;
            }

            annotation.promote_to_root(&self.config.root_marker);
            tracing::trace!(target: "sidebar_groups::engine", item = ?rows[i], name = %annotation.raw_name, "promoted root item");
            keys[i] = GroupKey::new(annotation.prefix.clone(), keys[i].is_starred());
            promoted += 1;
        }
        promoted
    }

    /// Classify every row against its neighbors and render it. Returns the
    /// keys that got a header this pass.
    fn apply_grouping(
        &self,
        state: &mut EngineState,
        rows: &[ItemId],
        keys: &[GroupKey],
        report: &mut PassReport,
    ) -> HashSet<GroupKey> {
        let EngineState {
            annotations,
            headers,
        } = state;
        let mut placed = HashSet::new();

        for (i, &id) in rows.iter().enumerate() {
            let key = &keys[i];
            if key.is_ungrouped() {
                report.ungrouped += 1;
                continue;
            }
            let Some(annotation) = annotations.get_mut(&id) else {
                report.ungrouped += 1;
                continue;
            };

            let prev_same = i > 0 && keys[i - 1] == *key;
            let next_same = keys.get(i + 1) == Some(key);

            if !prev_same && !next_same {
                self.host.render_name(
                    id,
                    &NameRender::Plain {
                        text: annotation.raw_name.clone(),
                    },
                );
                self.host.set_row_visibility(id, RowVisibility::Expanded);
                annotation.rendered_key = None;
                report.standalone += 1;
                continue;
            }

            // Only the first run of a key in list order owns the header.
            if !prev_same && placed.insert(key.clone()) {
                self.place_header(headers, key, id, report);
                report.groups += 1;
            }

            let label = annotation.member_label(&self.matcher);
            self.host.render_name(
                id,
                &NameRender::Member {
                    prefix: key.prefix().to_string(),
                    label,
                },
            );
            // Members follow their group's stored state; new groups start open.
            let open = headers.get(key).is_none_or(|record| record.is_open);
            self.host
                .set_row_visibility(id, RowVisibility::for_open(open));
            annotation.rendered_key = Some(key.clone());
            report.members += 1;
        }

        placed
    }

    /// Make sure the header for `key` exists and sits right before `anchor`.
    fn place_header(
        &self,
        headers: &mut HashMap<GroupKey, HeaderRecord>,
        key: &GroupKey,
        anchor: ItemId,
        report: &mut PassReport,
    ) {
        match headers.get_mut(key) {
            Some(record) => {
                record.anchor = anchor;
                if self.host.header_precedes(record.id, anchor)
                    || self.host.move_header(record.id, anchor)
                {
                    return;
                }
                // The host dropped the header element; put it back as it was.
                if let Some(id) = self.host.insert_header(anchor, &header_view(key, record.is_open)) {
                    tracing::debug!(target: "sidebar_groups::engine", %key, "re-inserted dropped header");
                    record.id = id;
                    report.headers_inserted += 1;
                }
            }
            None => {
                if let Some(id) = self.host.insert_header(anchor, &header_view(key, true)) {
                    tracing::debug!(target: "sidebar_groups::engine", %key, "created header");
                    headers.insert(
                        key.clone(),
                        HeaderRecord {
                            id,
                            anchor,
                            is_open: true,
                        },
                    );
                    report.headers_inserted += 1;
                }
            }
        }
    }

    /// Remove headers whose group had no run this pass.
    fn collect_empty_headers(
        &self,
        state: &mut EngineState,
        placed: &HashSet<GroupKey>,
        report: &mut PassReport,
    ) {
        if !self.config.gc_empty_headers {
            return;
        }
        let stale: Vec<GroupKey> = state
            .headers
            .keys()
            .filter(|key| !placed.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(record) = state.headers.remove(&key) {
                tracing::debug!(target: "sidebar_groups::engine", %key, "removed empty header");
                self.host.remove_header(record.id);
                report.headers_removed += 1;
            }
        }
    }

    /// Apply a group's open state to every row currently rendered into it.
    fn sweep(
        &self,
        annotations: &HashMap<ItemId, ItemAnnotation>,
        rows: &[ItemId],
        key: &GroupKey,
        open: bool,
    ) -> usize {
        let visibility = RowVisibility::for_open(open);
        let mut count = 0;
        for &id in rows {
            let member = annotations
                .get(&id)
                .and_then(ItemAnnotation::rendered_key)
                .is_some_and(|rendered| rendered == key);
            if member && self.host.is_transformed(id) {
                self.host.set_row_visibility(id, visibility);
                count += 1;
            }
        }
        count
    }

    /// Collapse or expand a group. Returns `false` if the group has no header.
    pub fn set_open(&self, key: &GroupKey, open: bool) -> bool {
        {
            let mut state = self.state.lock();
            let Some(record) = state.headers.get_mut(key) else {
                return false;
            };
            record.is_open = open;
            let header = record.id;

            self.host.update_header(header, &header_view(key, open));
            let rows = self.host.rows().unwrap_or_default();
            let swept = self.sweep(&state.annotations, &rows, key, open);
            tracing::debug!(target: "sidebar_groups::engine", %key, open, rows = swept, "group toggled");
        }
        self.group_toggled.emit((key.clone(), open));
        true
    }

    /// Flip a group's open state, as a header click does. Returns the new
    /// state, or `None` if the group has no header.
    pub fn toggle(&self, key: &GroupKey) -> Option<bool> {
        let open = !self.is_open(key)?;
        self.set_open(key, open).then_some(open)
    }

    /// Whether a group is expanded, or `None` if it has no header.
    pub fn is_open(&self, key: &GroupKey) -> Option<bool> {
        self.state.lock().headers.get(key).map(|record| record.is_open)
    }

    /// Number of headers the engine currently owns.
    pub fn header_count(&self) -> usize {
        self.state.lock().headers.len()
    }

    /// The cached annotation for an item.
    pub fn annotation(&self, item: ItemId) -> Option<ItemAnnotation> {
        self.state.lock().annotations.get(&item).cloned()
    }

    /// The grouped list in display order, as of the last pass.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let rows = self.host.rows().unwrap_or_default();
        let state = self.state.lock();
        let anchors: HashMap<ItemId, (&GroupKey, &HeaderRecord)> = state
            .headers
            .iter()
            .map(|(key, record)| (record.anchor, (key, record)))
            .collect();

        let mut outline = Vec::with_capacity(rows.len() + anchors.len());
        for id in rows {
            if let Some((key, record)) = anchors.get(&id) {
                outline.push(OutlineEntry::Header {
                    key: (*key).clone(),
                    label: key.prefix().to_string(),
                    open: record.is_open,
                });
            }

            let annotation = state.annotations.get(&id);
            match annotation.and_then(|a| a.rendered_key.as_ref().map(|key| (a, key))) {
                Some((annotation, key)) if self.host.is_transformed(id) => {
                    outline.push(OutlineEntry::Member {
                        item: id,
                        key: key.clone(),
                        label: annotation.member_label(&self.matcher),
                        root: annotation.root,
                    });
                }
                _ => outline.push(OutlineEntry::Standalone {
                    item: id,
                    name: annotation
                        .map(|a| a.raw_name.clone())
                        .or_else(|| self.host.name_text(id)),
                }),
            }
        }
        outline
    }
}

static_assertions::assert_impl_all!(GroupingEngine: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryHost, SidebarLine};
    use sidebar_groups_core::ManualClock;
    use std::time::Duration;

    fn engine_for(host: &Arc<MemoryHost>) -> Arc<GroupingEngine> {
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(ManualClock::new())));
        Arc::new(GroupingEngine::new(host.clone(), dispatcher, EngineConfig::default()).unwrap())
    }

    fn host_with(names: &[&str]) -> (Arc<MemoryHost>, Vec<ItemId>) {
        let host = Arc::new(MemoryHost::new());
        let ids = names.iter().map(|name| host.push_row(*name, false)).collect();
        (host, ids)
    }

    #[test]
    fn test_prefix_correctness() {
        let (host, ids) = host_with(&["foo-a", "foo-b", "bar"]);
        let engine = engine_for(&host);

        let report = engine.group_all();

        let foo = GroupKey::new("foo", false);
        assert_eq!(engine.annotation(ids[0]).unwrap().rendered_key(), Some(&foo));
        assert_eq!(engine.annotation(ids[1]).unwrap().rendered_key(), Some(&foo));
        assert_eq!(engine.annotation(ids[2]).unwrap().prefix(), "");
        assert_eq!(engine.annotation(ids[2]).unwrap().rendered_key(), None);
        assert_eq!(report.groups, 1);
        assert_eq!(report.members, 2);
        assert_eq!(report.ungrouped, 1);
        assert_eq!(
            host.rendered(ids[1]),
            Some(NameRender::Member {
                prefix: "foo".into(),
                label: "b".into()
            })
        );
        assert_eq!(host.displayed_text(ids[2]).as_deref(), Some("bar"));
    }

    #[test]
    fn test_header_inserted_before_first_member() {
        let (host, ids) = host_with(&["general", "foo-a", "foo-b"]);
        let engine = engine_for(&host);
        engine.group_all();

        let snapshot = host.snapshot();
        assert!(matches!(&snapshot[0], SidebarLine::Row { id, .. } if *id == ids[0]));
        assert!(matches!(&snapshot[1], SidebarLine::Header { label, open: true, .. } if label == "foo"));
        assert!(matches!(&snapshot[2], SidebarLine::Row { id, member: true, .. } if *id == ids[1]));
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_idempotent_pass() {
        let (host, _) = host_with(&["foo-a", "foo-b", "bar", "ops-x", "ops_y", "zed-1"]);
        let engine = engine_for(&host);

        engine.group_all();
        let first = host.snapshot();
        let writes = host.writes();

        let report = engine.group_all();

        assert_eq!(host.snapshot(), first);
        assert_eq!(host.writes(), writes);
        assert_eq!(host.header_count(), 2);
        assert_eq!(report.headers_inserted, 0);
    }

    #[test]
    fn test_lonely_item_stays_plain() {
        let (host, ids) = host_with(&["foo-a", "baz-b"]);
        let engine = engine_for(&host);

        let report = engine.group_all();

        assert_eq!(report.standalone, 2);
        assert_eq!(host.header_count(), 0);
        assert!(!host.is_transformed(ids[0]));
        assert_eq!(host.displayed_text(ids[1]).as_deref(), Some("baz-b"));
    }

    #[test]
    fn test_root_promotion() {
        let (host, ids) = host_with(&["foo", "foo-a", "foo-b"]);
        let engine = engine_for(&host);

        let report = engine.group_all();
        let foo = GroupKey::new("foo", false);

        assert_eq!(report.roots_promoted, 1);
        assert_eq!(report.groups, 1);
        assert_eq!(host.header_count(), 1);

        let root = engine.annotation(ids[0]).unwrap();
        assert!(root.is_root());
        assert_eq!(root.display_name(), "foo (root)");
        assert_eq!(root.rendered_key(), Some(&foo));
        assert_eq!(
            host.rendered(ids[0]),
            Some(NameRender::Member {
                prefix: "foo".into(),
                label: "foo (root)".into()
            })
        );
        for &id in &ids[1..] {
            assert_eq!(engine.annotation(id).unwrap().rendered_key(), Some(&foo));
        }

        // Second pass reuses the cached root annotation without re-marking it.
        engine.group_all();
        assert_eq!(engine.annotation(ids[0]).unwrap().display_name(), "foo (root)");
        assert_eq!(host.header_count(), 1);
    }

    #[test]
    fn test_root_marker_with_delimiter_keeps_name() {
        let (host, ids) = host_with(&["foo", "foo-a"]);
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(ManualClock::new())));
        let config = EngineConfig {
            root_marker: "_root".into(),
            ..EngineConfig::default()
        };
        let engine = GroupingEngine::new(host.clone(), dispatcher, config).unwrap();

        engine.group_all();

        assert_eq!(
            host.rendered(ids[0]),
            Some(NameRender::Member {
                prefix: "foo".into(),
                label: "foo_root".into()
            })
        );
        assert!(engine.outline().contains(&OutlineEntry::Member {
            item: ids[0],
            key: GroupKey::new("foo", false),
            label: "foo_root".into(),
            root: true,
        }));

        // Reusing the cached annotation must not re-split the marker.
        let writes = host.writes();
        engine.group_all();
        assert_eq!(host.writes(), writes);
    }

    #[test]
    fn test_no_root_across_starred_boundary() {
        let host = Arc::new(MemoryHost::new());
        let starred = host.push_row("foo", true);
        let regular = [host.push_row("foo-a", false), host.push_row("foo-b", false)];
        let engine = engine_for(&host);

        let report = engine.group_all();

        assert_eq!(report.roots_promoted, 0);
        assert!(!engine.annotation(starred).unwrap().is_root());
        assert!(!host.is_transformed(starred));
        assert_eq!(host.header_count(), 1);
        assert!(host.header_for(&GroupKey::new("foo", true)).is_none());
        for id in regular {
            assert_eq!(
                engine.annotation(id).unwrap().rendered_key(),
                Some(&GroupKey::new("foo", false))
            );
        }
    }

    #[test]
    fn test_root_demoted_when_family_leaves() {
        let (host, ids) = host_with(&["foo", "foo-a", "foo-b"]);
        let engine = engine_for(&host);
        engine.group_all();

        host.remove_row(ids[1]);
        host.remove_row(ids[2]);
        engine.group_all();
        assert_eq!(host.displayed_text(ids[0]).as_deref(), Some("foo"));
        assert!(!host.is_transformed(ids[0]));
        assert_eq!(host.header_count(), 0);

        engine.group_all();
        let annotation = engine.annotation(ids[0]).unwrap();
        assert!(!annotation.is_root());
        assert_eq!(annotation.prefix(), "");
    }

    #[test]
    fn test_starred_isolation() {
        let host = Arc::new(MemoryHost::new());
        let starred = [host.push_row("foo-a", true), host.push_row("foo-b", true)];
        let regular = [host.push_row("foo-c", false), host.push_row("foo-d", false)];
        let engine = engine_for(&host);

        engine.group_all();

        let starred_key = GroupKey::new("foo", true);
        let regular_key = GroupKey::new("foo", false);
        assert_ne!(starred_key, regular_key);
        assert_eq!(host.header_count(), 2);
        for id in starred {
            assert_eq!(engine.annotation(id).unwrap().rendered_key(), Some(&starred_key));
        }
        for id in regular {
            assert_eq!(engine.annotation(id).unwrap().rendered_key(), Some(&regular_key));
        }
    }

    #[test]
    fn test_single_items_across_sections_stay_plain() {
        let host = Arc::new(MemoryHost::new());
        host.push_row("foo-a", true);
        host.push_row("foo-b", false);
        let engine = engine_for(&host);

        let report = engine.group_all();
        assert_eq!(report.standalone, 2);
        assert_eq!(host.header_count(), 0);
    }

    #[test]
    fn test_toggle_propagation() {
        let (host, ids) = host_with(&["foo-a", "foo-b", "bar-a", "bar-b", "solo"]);
        let engine = engine_for(&host);
        engine.group_all();
        let foo = GroupKey::new("foo", false);

        assert_eq!(engine.toggle(&foo), Some(false));
        assert_eq!(host.row_visibility(ids[0]), Some(RowVisibility::Collapsed));
        assert_eq!(host.row_visibility(ids[1]), Some(RowVisibility::Collapsed));
        for &id in &ids[2..] {
            assert_eq!(host.row_visibility(id), Some(RowVisibility::Expanded));
        }
        let header = host.header_for(&foo).unwrap();
        assert!(host.snapshot().iter().any(|line| matches!(
            line,
            SidebarLine::Header { id, open: false, .. } if *id == header
        )));

        assert_eq!(engine.toggle(&foo), Some(true));
        for &id in &ids {
            assert_eq!(host.row_visibility(id), Some(RowVisibility::Expanded));
        }
    }

    #[test]
    fn test_toggle_unknown_group() {
        let (host, _) = host_with(&["foo-a"]);
        let engine = engine_for(&host);
        engine.group_all();
        assert_eq!(engine.toggle(&GroupKey::new("foo", false)), None);
    }

    #[test]
    fn test_collapse_survives_passes_and_new_members() {
        let (host, ids) = host_with(&["foo-a", "foo-b", "zzz"]);
        let engine = engine_for(&host);
        engine.group_all();
        let foo = GroupKey::new("foo", false);
        engine.set_open(&foo, false);

        let newcomer = host.insert_row_before(ids[2], "foo-c", false);
        engine.group_all();

        assert_eq!(engine.is_open(&foo), Some(false));
        for id in [ids[0], ids[1], newcomer] {
            assert_eq!(host.row_visibility(id), Some(RowVisibility::Collapsed));
        }
        assert_eq!(host.row_visibility(ids[2]), Some(RowVisibility::Expanded));

        let writes = host.writes();
        engine.group_all();
        engine.group_all();
        assert_eq!(host.writes(), writes);
    }

    #[test]
    fn test_empty_header_collected() {
        let (host, ids) = host_with(&["foo-a", "foo-b", "bar"]);
        let engine = engine_for(&host);
        engine.group_all();
        assert_eq!(host.header_count(), 1);

        host.remove_row(ids[0]);
        let report = engine.group_all();

        assert_eq!(report.headers_removed, 1);
        assert_eq!(host.header_count(), 0);
        assert_eq!(engine.header_count(), 0);
        assert_eq!(host.displayed_text(ids[1]).as_deref(), Some("foo-b"));
    }

    #[test]
    fn test_empty_header_kept_without_gc() {
        let host = Arc::new(MemoryHost::new());
        let a = host.push_row("foo-a", false);
        host.push_row("foo-b", false);
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(ManualClock::new())));
        let config = EngineConfig {
            gc_empty_headers: false,
            ..EngineConfig::default()
        };
        let engine = GroupingEngine::new(host.clone(), dispatcher, config).unwrap();

        engine.group_all();
        host.remove_row(a);
        engine.group_all();

        assert_eq!(host.header_count(), 1);
        assert_eq!(engine.header_count(), 1);
    }

    #[test]
    fn test_dropped_header_reinserted_with_state() {
        let (host, ids) = host_with(&["foo-a", "foo-b"]);
        let engine = engine_for(&host);
        engine.group_all();
        let foo = GroupKey::new("foo", false);
        engine.set_open(&foo, false);

        host.rerender_all();
        let report = engine.group_all();

        assert_eq!(report.headers_inserted, 1);
        assert_eq!(host.header_count(), 1);
        assert_eq!(engine.is_open(&foo), Some(false));
        for id in ids {
            assert_eq!(host.row_visibility(id), Some(RowVisibility::Collapsed));
        }
    }

    #[test]
    fn test_second_run_shares_first_header() {
        let (host, ids) = host_with(&["foo-a", "foo-b", "bar", "foo-c", "foo-d"]);
        let engine = engine_for(&host);

        let report = engine.group_all();
        let foo = GroupKey::new("foo", false);

        assert_eq!(host.header_count(), 1);
        assert_eq!(report.groups, 1);
        assert_eq!(report.members, 4);
        assert!(host.header_precedes(host.header_for(&foo).unwrap(), ids[0]));

        engine.set_open(&foo, false);
        assert_eq!(host.row_visibility(ids[4]), Some(RowVisibility::Collapsed));
        assert_eq!(host.row_visibility(ids[2]), Some(RowVisibility::Expanded));
    }

    #[test]
    fn test_header_follows_moved_run() {
        let (host, ids) = host_with(&["foo-a", "foo-b", "foo-c"]);
        let engine = engine_for(&host);
        engine.group_all();
        let header = host.header_for(&GroupKey::new("foo", false)).unwrap();

        // The run now starts one row later.
        host.rename_row(ids[0], "aaa");
        let report = engine.group_all();

        assert!(host.header_precedes(header, ids[1]));
        assert_eq!(host.header_count(), 1);
        assert_eq!(report.headers_inserted, 0);
    }

    #[test]
    fn test_row_without_name_is_skipped() {
        let host = Arc::new(MemoryHost::new());
        let a = host.push_row("foo-a", false);
        let blank = host.push_row_without_name(false);
        let b = host.push_row("foo-b", false);
        let engine = engine_for(&host);

        let report = engine.group_all();

        assert_eq!(report.ungrouped, 1);
        assert_eq!(report.standalone, 2);
        assert!(engine.annotation(blank).is_none());
        assert!(!host.is_transformed(a));
        assert!(!host.is_transformed(b));
    }

    #[test]
    fn test_missing_container_skips_pass() {
        let host = Arc::new(MemoryHost::without_container());
        host.push_row("foo-a", false);
        host.push_row("foo-b", false);
        let engine = engine_for(&host);

        let report = engine.group_all();

        assert!(report.container_missing);
        assert_eq!(host.writes(), 0);
    }

    #[test]
    fn test_renamed_row_reclassified() {
        let (host, ids) = host_with(&["foo-a", "foo-b", "foo-c"]);
        let engine = engine_for(&host);
        engine.group_all();

        host.rename_row(ids[2], "bar-c");
        engine.group_all();

        assert_eq!(engine.annotation(ids[2]).unwrap().prefix(), "bar");
        assert!(!host.is_transformed(ids[2]));
        assert!(host.is_transformed(ids[1]));
    }

    #[test]
    fn test_group_on_idle_coalesces() {
        let host = Arc::new(MemoryHost::new());
        host.push_row("foo-a", false);
        host.push_row("foo-b", false);
        let clock = ManualClock::new();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(clock.clone())));
        let engine = Arc::new(
            GroupingEngine::new(host.clone(), dispatcher.clone(), EngineConfig::default()).unwrap(),
        );

        assert!(engine.group_on_idle());
        for _ in 0..9 {
            assert!(!engine.group_on_idle());
        }
        assert_eq!(dispatcher.pending_idle(), 1);

        dispatcher.process(true);
        assert_eq!(engine.pass_count(), 1);
        assert!(!engine.has_pending_pass());
    }

    #[test]
    fn test_cancel_pending() {
        let (host, _) = host_with(&["foo-a", "foo-b"]);
        let clock = ManualClock::new();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(clock.clone())));
        let engine = Arc::new(
            GroupingEngine::new(host.clone(), dispatcher.clone(), EngineConfig::default()).unwrap(),
        );

        engine.group_on_idle();
        assert_eq!(engine.cancel_pending(), Ok(true));
        assert_eq!(engine.cancel_pending(), Ok(false));

        clock.advance(Duration::from_secs(60));
        dispatcher.process(true);
        assert_eq!(engine.pass_count(), 0);
    }

    #[test]
    fn test_outline() {
        let (host, ids) = host_with(&["foo", "foo-a", "bar"]);
        let engine = engine_for(&host);
        engine.group_all();

        let foo = GroupKey::new("foo", false);
        assert_eq!(
            engine.outline(),
            vec![
                OutlineEntry::Header {
                    key: foo.clone(),
                    label: "foo".into(),
                    open: true
                },
                OutlineEntry::Member {
                    item: ids[0],
                    key: foo.clone(),
                    label: "foo (root)".into(),
                    root: true
                },
                OutlineEntry::Member {
                    item: ids[1],
                    key: foo,
                    label: "a".into(),
                    root: false
                },
                OutlineEntry::Standalone {
                    item: ids[2],
                    name: Some("bar".into())
                },
            ]
        );
    }
}
