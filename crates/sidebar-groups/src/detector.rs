//! Change detection for the host list.
//!
//! [`ChangeDetector`] decides *when* the list may have changed and says so
//! through its [`update`](ChangeDetector::update) signal. It knows nothing
//! about grouping.
//!
//! Lifecycle:
//!
//! 1. [`start`](ChangeDetector::start) polls the host at a fixed interval
//!    until at least one row is rendered or the hard timeout passes. Either
//!    way it then emits one update and starts observing.
//! 2. While the document is visible, every child-list change of the list
//!    container emits an update. No debouncing happens here; consumers
//!    coalesce.
//! 3. When the document is hidden observation is suspended; when it becomes
//!    visible again one update is emitted and observation resumes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use sidebar_groups_core::{ConnectionId, Dispatcher, Signal, TimerId};

use crate::config::DetectorConfig;
use crate::error::{GroupingError, Result};
use crate::host::{ChildListChange, SidebarHost, Visibility};

/// Where the detector is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    /// Not started yet.
    Idle,
    /// Polling for the first rendered row.
    Waiting,
    /// Initial wait finished; observing while visible.
    Running,
    /// Stopped; cannot be restarted.
    Stopped,
}

/// An active child-list subscription.
struct Observer {
    signal: Arc<Signal<ChildListChange>>,
    connection: ConnectionId,
}

struct DetectorState {
    phase: DetectorPhase,
    poll_timer: Option<TimerId>,
    timeout_timer: Option<TimerId>,
    observer: Option<Observer>,
    visibility_connection: Option<ConnectionId>,
}

/// Emits "list may have changed" whenever the host list likely changed.
pub struct ChangeDetector {
    host: Arc<dyn SidebarHost>,
    dispatcher: Arc<Dispatcher>,
    config: DetectorConfig,
    state: Mutex<DetectorState>,
    update: Signal<()>,
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChangeDetector")
            .field("phase", &state.phase)
            .field("observing", &state.observer.is_some())
            .finish()
    }
}

impl ChangeDetector {
    /// Create a detector for `host`, polling on `dispatcher`.
    pub fn new(
        host: Arc<dyn SidebarHost>,
        dispatcher: Arc<Dispatcher>,
        config: DetectorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            host,
            dispatcher,
            config,
            state: Mutex::new(DetectorState {
                phase: DetectorPhase::Idle,
                poll_timer: None,
                timeout_timer: None,
                observer: None,
                visibility_connection: None,
            }),
            update: Signal::new(),
        })
    }

    /// The "list may have changed" signal.
    pub fn update(&self) -> &Signal<()> {
        &self.update
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> DetectorPhase {
        self.state.lock().phase
    }

    /// Whether a child-list subscription is active.
    pub fn is_observing(&self) -> bool {
        self.state.lock().observer.is_some()
    }

    /// Begin the bounded initial wait, then observe.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.phase != DetectorPhase::Idle {
                return Err(GroupingError::AlreadyStarted {
                    component: "change detector",
                });
            }
            state.phase = DetectorPhase::Waiting;

            let detector = Arc::downgrade(self);
            state.visibility_connection = Some(self.host.visibility_changed().connect(
                move |visibility| {
                    if let Some(detector) = detector.upgrade() {
                        detector.on_visibility(*visibility);
                    }
                },
            ));
        }

        tracing::debug!(target: "sidebar_groups::detector", "waiting for first rendered row");
        if self.has_rendered_rows() {
            self.finish_wait(true);
            return Ok(());
        }

        let detector = Arc::downgrade(self);
        let poll = self
            .dispatcher
            .start_repeating(self.config.poll_interval, move || {
                if let Some(detector) = detector.upgrade()
                    && detector.has_rendered_rows()
                {
                    detector.finish_wait(true);
                }
            });
        let detector = Arc::downgrade(self);
        let timeout = self
            .dispatcher
            .start_one_shot(self.config.poll_timeout, move || {
                if let Some(detector) = detector.upgrade() {
                    detector.finish_wait(false);
                }
            });

        let mut state = self.state.lock();
        state.poll_timer = Some(poll);
        state.timeout_timer = Some(timeout);
        Ok(())
    }

    fn has_rendered_rows(&self) -> bool {
        self.host.rows().is_some_and(|rows| !rows.is_empty())
    }

    /// End the initial wait: emit once, then observe if visible.
    fn finish_wait(self: &Arc<Self>, rendered: bool) {
        {
            let mut state = self.state.lock();
            if state.phase != DetectorPhase::Waiting {
                return;
            }
            state.phase = DetectorPhase::Running;
            self.stop_wait_timers(&mut state);
        }

        if rendered {
            tracing::debug!(target: "sidebar_groups::detector", "list rendered, starting observation");
        } else {
            tracing::info!(
                target: "sidebar_groups::detector",
                timeout = ?self.config.poll_timeout,
                "no rows rendered before timeout, observing anyway"
            );
        }

        self.update.emit(());
        if self.host.visibility() == Visibility::Visible {
            self.enable_observer();
        }
    }

    fn stop_wait_timers(&self, state: &mut DetectorState) {
        // A one-shot timer that already fired is gone; stopping it fails harmlessly.
        for timer in [state.poll_timer.take(), state.timeout_timer.take()]
            .into_iter()
            .flatten()
        {
            let _ = self.dispatcher.stop_timer(timer);
        }
    }

    fn on_visibility(self: &Arc<Self>, visibility: Visibility) {
        if self.phase() != DetectorPhase::Running {
            return;
        }
        match visibility {
            Visibility::Hidden => {
                self.disable_observer();
            }
            Visibility::Visible => {
                self.update.emit(());
                self.enable_observer();
            }
        }
    }

    /// Subscribe to child-list changes of the list container.
    ///
    /// Does nothing if already observing. If the container is missing the
    /// attempt is skipped; the next call tries again. Returns whether a new
    /// subscription was made.
    pub fn enable_observer(self: &Arc<Self>) -> bool {
        let mut state = self.state.lock();
        if state.observer.is_some() {
            return false;
        }
        let Some(signal) = self.host.child_list() else {
            tracing::debug!(target: "sidebar_groups::detector", "list container missing, observer not attached");
            return false;
        };

        let detector: Weak<Self> = Arc::downgrade(self);
        let connection = signal.connect(move |change: &ChildListChange| {
            tracing::trace!(target: "sidebar_groups::detector", added = change.added, removed = change.removed, "child list changed");
            if let Some(detector) = detector.upgrade() {
                detector.update.emit(());
            }
        });
        state.observer = Some(Observer { signal, connection });
        tracing::debug!(target: "sidebar_groups::detector", "observer enabled");
        true
    }

    /// Drop the child-list subscription. Does nothing if not observing.
    /// Returns whether a subscription was dropped.
    pub fn disable_observer(&self) -> bool {
        let observer = self.state.lock().observer.take();
        match observer {
            Some(observer) => {
                observer.signal.disconnect(observer.connection);
                tracing::debug!(target: "sidebar_groups::detector", "observer disabled");
                true
            }
            None => false,
        }
    }

    /// Stop for good: cancel the initial wait, stop observing and forget the
    /// visibility subscription.
    pub fn stop(&self) {
        let visibility = {
            let mut state = self.state.lock();
            state.phase = DetectorPhase::Stopped;
            self.stop_wait_timers(&mut state);
            state.visibility_connection.take()
        };
        if let Some(connection) = visibility {
            self.host.visibility_changed().disconnect(connection);
        }
        self.disable_observer();
    }
}

static_assertions::assert_impl_all!(ChangeDetector: Send, Sync);
