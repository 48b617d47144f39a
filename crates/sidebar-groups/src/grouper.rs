//! Wiring of the change detector to the grouping engine.

use std::sync::Arc;

use parking_lot::Mutex;
use sidebar_groups_core::{ConnectionId, Dispatcher};

use crate::config::GrouperConfig;
use crate::detector::ChangeDetector;
use crate::engine::GroupingEngine;
use crate::error::{GroupingError, Result};
use crate::host::SidebarHost;

#[derive(Default)]
struct Wiring {
    started: bool,
    update: Option<ConnectionId>,
    header_activated: Option<ConnectionId>,
}

/// A detector and an engine bound to one host.
///
/// Every detector update requests a deferred grouping pass, and every header
/// click toggles the clicked group.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sidebar_groups::{GrouperConfig, MemoryHost, SidebarGrouper};
/// use sidebar_groups_core::Dispatcher;
///
/// let host = Arc::new(MemoryHost::new());
/// host.push_row("team-alpha", false);
/// host.push_row("team-beta", false);
///
/// let dispatcher = Arc::new(Dispatcher::default());
/// let grouper = SidebarGrouper::install(host.clone(), dispatcher.clone(), GrouperConfig::default())?;
/// dispatcher.process(true);
/// assert_eq!(grouper.engine().header_count(), 1);
/// # Ok::<(), sidebar_groups::GroupingError>(())
/// ```
pub struct SidebarGrouper {
    host: Arc<dyn SidebarHost>,
    detector: Arc<ChangeDetector>,
    engine: Arc<GroupingEngine>,
    wiring: Mutex<Wiring>,
}

impl std::fmt::Debug for SidebarGrouper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidebarGrouper")
            .field("detector", &self.detector)
            .field("engine", &self.engine)
            .finish()
    }
}

impl SidebarGrouper {
    /// Build a grouper without starting it.
    pub fn new(
        host: Arc<dyn SidebarHost>,
        dispatcher: Arc<Dispatcher>,
        config: GrouperConfig,
    ) -> Result<Self> {
        config.validate()?;
        let detector = ChangeDetector::new(host.clone(), dispatcher.clone(), config.detector)?;
        let engine = GroupingEngine::new(host.clone(), dispatcher, config.engine)?;
        Ok(Self {
            host,
            detector: Arc::new(detector),
            engine: Arc::new(engine),
            wiring: Mutex::new(Wiring::default()),
        })
    }

    /// Build and start a grouper in one step.
    pub fn install(
        host: Arc<dyn SidebarHost>,
        dispatcher: Arc<Dispatcher>,
        config: GrouperConfig,
    ) -> Result<Self> {
        let grouper = Self::new(host, dispatcher, config)?;
        grouper.start()?;
        Ok(grouper)
    }

    /// Connect the detector to the engine and begin the initial wait.
    pub fn start(&self) -> Result<()> {
        {
            let mut wiring = self.wiring.lock();
            if wiring.started {
                return Err(GroupingError::AlreadyStarted {
                    component: "sidebar grouper",
                });
            }
            wiring.started = true;

            let engine = Arc::downgrade(&self.engine);
            wiring.update = Some(self.detector.update().connect(move |_| {
                if let Some(engine) = engine.upgrade() {
                    engine.group_on_idle();
                }
            }));

            let engine = Arc::downgrade(&self.engine);
            wiring.header_activated = Some(self.host.header_activated().connect(move |key| {
                if let Some(engine) = engine.upgrade() {
                    engine.toggle(key);
                }
            }));
        }

        tracing::info!(target: "sidebar_groups::grouper", "sidebar grouping started");
        self.detector.start()
    }

    /// Stop detecting changes, disconnect header clicks and drop any pending
    /// pass. The host list is left as the last pass rendered it.
    pub fn shutdown(&self) {
        let (update, header_activated) = {
            let mut wiring = self.wiring.lock();
            (wiring.update.take(), wiring.header_activated.take())
        };

        self.detector.stop();
        if let Some(connection) = update {
            self.detector.update().disconnect(connection);
        }
        if let Some(connection) = header_activated {
            self.host.header_activated().disconnect(connection);
        }
        if let Err(error) = self.engine.cancel_pending() {
            tracing::warn!(target: "sidebar_groups::grouper", %error, "pending pass could not be cancelled");
        }
        tracing::info!(target: "sidebar_groups::grouper", "sidebar grouping shut down");
    }

    /// The change detector.
    pub fn detector(&self) -> &Arc<ChangeDetector> {
        &self.detector
    }

    /// The grouping engine.
    pub fn engine(&self) -> &Arc<GroupingEngine> {
        &self.engine
    }
}

static_assertions::assert_impl_all!(SidebarGrouper: Send, Sync);
