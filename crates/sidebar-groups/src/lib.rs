//! Reactive prefix grouping for host-rendered sidebar lists.
//!
//! A host (a chat client, an IDE, any UI) renders a flat list of named items
//! and re-renders it whenever it likes. This crate keeps that list presented
//! as collapsible groups of items sharing a name prefix (`team-alpha`,
//! `team-beta` under a `team` header) without owning the list:
//!
//! - [`ChangeDetector`] notices when the list may have changed.
//! - [`GroupingEngine`] re-derives the grouping from the current list at the
//!   next idle opportunity and writes it back into the host.
//! - [`SidebarGrouper`] wires the two together and routes header clicks.
//!
//! The host is reached only through the [`SidebarHost`] trait.
//! [`MemoryHost`] is an in-memory implementation for tests and demos.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sidebar_groups::{GrouperConfig, MemoryHost, NameRender, SidebarGrouper};
//! use sidebar_groups_core::Dispatcher;
//!
//! let host = Arc::new(MemoryHost::new());
//! let ops = host.push_row("ops", false);
//! for name in ["ops-alerts", "ops-deploys", "random"] {
//!     host.push_row(name, false);
//! }
//!
//! let dispatcher = Arc::new(Dispatcher::default());
//! let grouper = SidebarGrouper::install(host.clone(), dispatcher.clone(), GrouperConfig::default())?;
//!
//! // Let the host go idle so the deferred pass runs.
//! dispatcher.process(true);
//! assert_eq!(host.header_count(), 1);
//! assert_eq!(
//!     host.rendered(ops),
//!     Some(NameRender::Member { prefix: "ops".into(), label: "ops (root)".into() })
//! );
//! # drop(grouper);
//! # Ok::<(), sidebar_groups::GroupingError>(())
//! ```
//!
//! # Logging
//!
//! Everything is logged through `tracing` under the targets listed in
//! [`sidebar_groups_core::logging::targets`]; install any subscriber to see it.

pub mod config;
pub mod debug;
pub mod detector;
pub mod engine;
mod error;
pub mod grouper;
pub mod host;
pub mod memory;
pub mod prefix;

pub use config::{DetectorConfig, EngineConfig, GrouperConfig};
pub use detector::{ChangeDetector, DetectorPhase};
pub use engine::{GroupingEngine, ItemAnnotation, OutlineEntry, PassReport};
pub use error::{GroupingError, Result};
pub use grouper::SidebarGrouper;
pub use host::{
    ChildListChange, HeaderId, HeaderView, ItemId, NameRender, RowVisibility, SidebarHost,
    Visibility,
};
pub use memory::{MemoryHost, SidebarLine};
pub use prefix::{GroupKey, PrefixMatcher};
