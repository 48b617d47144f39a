//! Tracing targets used across the workspace.
//!
//! The crates only emit events through `tracing`; installing a subscriber is
//! left to the embedding application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("sidebar_groups=debug,sidebar_groups_core=info")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core runtime target.
    pub const CORE: &str = "sidebar_groups_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "sidebar_groups_core::signal";
    /// Timer system target.
    pub const TIMER: &str = "sidebar_groups_core::timer";
    /// Dispatcher (timers + idle callbacks) target.
    pub const SCHEDULER: &str = "sidebar_groups_core::scheduler";
    /// Change detector target.
    pub const DETECTOR: &str = "sidebar_groups::detector";
    /// Grouping engine target.
    pub const ENGINE: &str = "sidebar_groups::engine";
    /// Bootstrap wiring target.
    pub const GROUPER: &str = "sidebar_groups::grouper";
}
