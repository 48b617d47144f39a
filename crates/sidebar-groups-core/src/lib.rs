//! Core runtime for sidebar-groups.
//!
//! This crate has no knowledge of grouping. It provides the small set of
//! single-threaded runtime pieces the grouping crate is built on:
//!
//! - **Signals**: [`Signal<Args>`], a synchronous observer primitive
//! - **Clocks**: [`Clock`], with [`SystemClock`] and the test-friendly [`ManualClock`]
//! - **Dispatcher**: [`Dispatcher`], one-shot/repeating timers plus idle
//!   callbacks bounded by a maximum wait
//!
//! # Example
//!
//! ```
//! use sidebar_groups_core::{Dispatcher, ManualClock, Signal};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let dispatcher = Arc::new(Dispatcher::new(Arc::new(clock.clone())));
//! let changed = Arc::new(Signal::<()>::new());
//!
//! // Defer work triggered by the signal to idle time.
//! let d = dispatcher.clone();
//! changed.connect(move |_| {
//!     d.request_idle(Duration::from_secs(10), |_| println!("regrouping"));
//! });
//!
//! changed.emit(());
//! dispatcher.process(true);
//! ```

pub mod clock;
mod error;
pub mod logging;
pub mod scheduler;
pub mod signal;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
pub use scheduler::{Dispatcher, IdleDeadline, IdleTaskId, TurnStats};
pub use signal::{ConnectionId, Signal};
pub use timer::{TimerId, TimerKind};
