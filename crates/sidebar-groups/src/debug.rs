//! Text rendering of the grouped sidebar, for logs and debugging.
//!
//! ```
//! use std::sync::Arc;
//! use sidebar_groups::{EngineConfig, GroupingEngine, MemoryHost};
//! use sidebar_groups::debug::{GroupTreeDebug, TreeFormatOptions, TreeStyle};
//! use sidebar_groups_core::Dispatcher;
//!
//! let host = Arc::new(MemoryHost::new());
//! for name in ["foo", "foo-a", "bar"] {
//!     host.push_row(name, false);
//! }
//! let engine = GroupingEngine::new(host, Arc::new(Dispatcher::default()), EngineConfig::default())?;
//! engine.group_all();
//!
//! let debug = GroupTreeDebug::with_options(TreeFormatOptions::minimal().with_style(TreeStyle::Ascii));
//! assert_eq!(debug.format_engine(&engine), "v foo\n+-- foo (root)\n`-- a\nbar\n");
//! # Ok::<(), sidebar_groups::GroupingError>(())
//! ```

use std::fmt::{self, Write};

use crate::engine::{GroupingEngine, OutlineEntry};
use crate::prefix::GroupKey;

/// Characters used to draw the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Bullets only.
    Compact,
}

impl TreeStyle {
    fn connectors(self) -> (&'static str, &'static str) {
        match self {
            Self::Ascii => ("+-- ", "`-- "),
            Self::Unicode => ("\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            Self::Compact => ("  - ", "  - "),
        }
    }

    fn glyph(self, open: bool) -> &'static str {
        match (self, open) {
            (Self::Ascii, true) => "v",
            (Self::Ascii, false) => ">",
            (Self::Unicode, true) => "\u{25be}",
            (Self::Unicode, false) => "\u{25b8}",
            (Self::Compact, true) => "[-]",
            (Self::Compact, false) => "[+]",
        }
    }
}

/// Configuration for [`GroupTreeDebug`].
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// Branch characters.
    pub style: TreeStyle,
    /// Append item ids to rows.
    pub show_ids: bool,
    /// List the members of collapsed groups instead of a hidden count.
    pub show_collapsed: bool,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_collapsed: false,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, including collapsed members.
    pub fn detailed() -> Self {
        Self {
            show_collapsed: true,
            ..Default::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            ..Default::default()
        }
    }

    /// Use a different tree style.
    pub fn with_style(mut self, style: TreeStyle) -> Self {
        self.style = style;
        self
    }
}

/// Renders an engine outline as an indented tree: headers at the top level
/// with their members beneath, standalone rows at the top level.
#[derive(Debug, Clone, Default)]
pub struct GroupTreeDebug {
    options: TreeFormatOptions,
}

impl GroupTreeDebug {
    /// A renderer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Render the engine's current outline.
    pub fn format_engine(&self, engine: &GroupingEngine) -> String {
        self.format(&engine.outline())
    }

    /// Render an outline.
    pub fn format(&self, outline: &[OutlineEntry]) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_outline(outline, &mut output);
        output
    }

    fn write_outline(&self, outline: &[OutlineEntry], out: &mut impl Write) -> fmt::Result {
        let style = self.options.style;
        let (middle, last) = style.connectors();
        let mut collapsed = false;

        for (index, entry) in outline.iter().enumerate() {
            match entry {
                OutlineEntry::Header { key, label, open } => {
                    write!(out, "{} {label}", style.glyph(*open))?;
                    if key.is_starred() {
                        out.write_str(" *")?;
                    }
                    collapsed = !open;
                    if collapsed && !self.options.show_collapsed {
                        let hidden = outline[index + 1..]
                            .iter()
                            .take_while(|next| member_of(next, key))
                            .count();
                        write!(out, " ({hidden} hidden)")?;
                    }
                    out.write_char('\n')?;
                }
                OutlineEntry::Member {
                    item, key, label, ..
                } => {
                    if collapsed && !self.options.show_collapsed {
                        continue;
                    }
                    let is_last = !outline
                        .get(index + 1)
                        .is_some_and(|next| member_of(next, key));
                    out.write_str(if is_last { last } else { middle })?;
                    out.write_str(label)?;
                    if self.options.show_ids {
                        write!(out, " [#{}]", item.0)?;
                    }
                    out.write_char('\n')?;
                }
                OutlineEntry::Standalone { item, name } => {
                    collapsed = false;
                    out.write_str(name.as_deref().unwrap_or("(unnamed)"))?;
                    if self.options.show_ids {
                        write!(out, " [#{}]", item.0)?;
                    }
                    out.write_char('\n')?;
                }
            }
        }
        Ok(())
    }
}

fn member_of(entry: &OutlineEntry, group: &GroupKey) -> bool {
    matches!(entry, OutlineEntry::Member { key, .. } if key == group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ItemId;

    fn outline(open: bool) -> Vec<OutlineEntry> {
        let foo = GroupKey::new("foo", false);
        vec![
            OutlineEntry::Header {
                key: foo.clone(),
                label: "foo".into(),
                open,
            },
            OutlineEntry::Member {
                item: ItemId(0),
                key: foo.clone(),
                label: "a".into(),
                root: false,
            },
            OutlineEntry::Member {
                item: ItemId(1),
                key: foo,
                label: "b".into(),
                root: false,
            },
            OutlineEntry::Standalone {
                item: ItemId(2),
                name: Some("bar".into()),
            },
        ]
    }

    #[test]
    fn test_unicode_with_ids() {
        let text = GroupTreeDebug::new().format(&outline(true));
        assert_eq!(
            text,
            "\u{25be} foo\n\u{251c}\u{2500}\u{2500} a [#0]\n\u{2514}\u{2500}\u{2500} b [#1]\nbar [#2]\n"
        );
    }

    #[test]
    fn test_collapsed_group_hides_members() {
        let debug = GroupTreeDebug::with_options(TreeFormatOptions::minimal().with_style(TreeStyle::Compact));
        assert_eq!(debug.format(&outline(false)), "[+] foo (2 hidden)\nbar\n");
    }

    #[test]
    fn test_detailed_lists_collapsed_members() {
        let debug = GroupTreeDebug::with_options(
            TreeFormatOptions::detailed().with_style(TreeStyle::Ascii),
        );
        assert_eq!(
            debug.format(&outline(false)),
            "> foo\n+-- a [#0]\n`-- b [#1]\nbar [#2]\n"
        );
    }

    #[test]
    fn test_starred_header_marked() {
        let key = GroupKey::new("foo", true);
        let entries = vec![OutlineEntry::Header {
            key,
            label: "foo".into(),
            open: true,
        }];
        let debug = GroupTreeDebug::with_options(TreeFormatOptions::minimal().with_style(TreeStyle::Ascii));
        assert_eq!(debug.format(&entries), "v foo *\n");
    }

    #[test]
    fn test_unnamed_row() {
        let entries = vec![OutlineEntry::Standalone {
            item: ItemId(7),
            name: None,
        }];
        assert_eq!(GroupTreeDebug::new().format(&entries), "(unnamed) [#7]\n");
    }
}
