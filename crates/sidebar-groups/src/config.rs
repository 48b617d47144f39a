//! Configuration for the change detector and the grouping engine.
//!
//! With the `serde` feature enabled every type here can be loaded from JSON
//! (or any serde format). Durations are written as whole milliseconds and
//! missing fields take their defaults:
//!
//! ```ignore
//! let config: GrouperConfig = serde_json::from_str(r#"{
//!     "detector": { "poll_interval": 50 },
//!     "engine": { "root_marker": " *" }
//! }"#)?;
//! config.validate()?;
//! ```

use std::time::Duration;

use crate::error::{GroupingError, Result};
use crate::prefix::{DEFAULT_PREFIX_PATTERN, PrefixMatcher};

/// Default delay between checks while waiting for the first render.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default hard limit on the initial wait.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum delay before a deferred grouping pass runs.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default suffix that marks a root item's display name.
pub const DEFAULT_ROOT_MARKER: &str = " (root)";

/// Change detector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
    /// Delay between checks for the first rendered item.
    #[cfg_attr(feature = "serde", serde(with = "duration_ms"))]
    pub poll_interval: Duration,
    /// Give up waiting for the first item after this long.
    #[cfg_attr(feature = "serde", serde(with = "duration_ms"))]
    pub poll_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl DetectorConfig {
    /// Check the settings for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(GroupingError::invalid_config(
                "poll_interval",
                "must be greater than zero",
            ));
        }
        if self.poll_timeout < self.poll_interval {
            return Err(GroupingError::invalid_config(
                "poll_timeout",
                format!(
                    "{:?} is shorter than poll_interval {:?}",
                    self.poll_timeout, self.poll_interval
                ),
            ));
        }
        Ok(())
    }
}

/// Grouping engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Maximum time a requested pass may wait for the host to go idle.
    #[cfg_attr(feature = "serde", serde(with = "duration_ms"))]
    pub idle_timeout: Duration,
    /// Appended to a root item's display name.
    pub root_marker: String,
    /// Pattern whose first capture group is an item's prefix.
    pub prefix_pattern: String,
    /// Remove headers whose group has no run in the latest pass.
    pub gc_empty_headers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
            prefix_pattern: DEFAULT_PREFIX_PATTERN.to_string(),
            gc_empty_headers: true,
        }
    }
}

impl EngineConfig {
    /// Check the settings for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout.is_zero() {
            return Err(GroupingError::invalid_config(
                "idle_timeout",
                "must be greater than zero",
            ));
        }
        PrefixMatcher::new(&self.prefix_pattern).map(|_| ())
    }
}

/// Complete configuration for a [`SidebarGrouper`](crate::SidebarGrouper).
///
/// # Example
///
/// ```
/// use sidebar_groups::GrouperConfig;
/// use std::time::Duration;
///
/// let config = GrouperConfig::default()
///     .with_poll_interval(Duration::from_millis(50))
///     .with_idle_timeout(Duration::from_secs(2))
///     .with_root_marker(" *");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GrouperConfig {
    /// Change detector settings.
    pub detector: DetectorConfig,
    /// Grouping engine settings.
    pub engine: EngineConfig,
}

impl GrouperConfig {
    /// Set the initial-wait poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.detector.poll_interval = interval;
        self
    }

    /// Set the initial-wait hard timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.detector.poll_timeout = timeout;
        self
    }

    /// Set the idle-pass ceiling.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.engine.idle_timeout = timeout;
        self
    }

    /// Set the root marker suffix.
    pub fn with_root_marker(mut self, marker: impl Into<String>) -> Self {
        self.engine.root_marker = marker.into();
        self
    }

    /// Set the prefix pattern.
    pub fn with_prefix_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.engine.prefix_pattern = pattern.into();
        self
    }

    /// Enable or disable removal of empty headers.
    pub fn with_gc_empty_headers(mut self, enabled: bool) -> Self {
        self.engine.gc_empty_headers = enabled;
        self
    }

    /// Check both halves of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.engine.validate()
    }
}

#[cfg(feature = "serde")]
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
