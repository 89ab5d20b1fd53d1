//! Scheduler configuration.
//!
//! [`SchedulerConfig`] is plain data, deserializable from TOML:
//!
//! ```toml
//! period_ms = 20
//! conflict_resolution = "in_order"
//! report_overruns = true
//! ```
//!
//! Every field has a default, so an empty document is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;


/// Default control-loop period in milliseconds.
pub const DEFAULT_PERIOD_MS: u64 = 20;

/// Errors related to configuration parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ConfigError {
    /// TOML could not be parsed into the expected structure.
    #[error("toml error: {0}")]
    CannotParseToml(String),

    /// The loop period must be non-zero.
    #[error("scheduler period must be greater than zero")]
    ZeroPeriod,
}

/// How [`CommandScheduler::schedule`](crate::CommandScheduler::schedule)
/// resolves requirement conflicts.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Conflicting commands are visited in requirement order. `CancelSelf`
    /// commands are cancelled as they are met; the first `CancelIncoming`
    /// command aborts the attempt. Cancellations already performed during
    /// the attempt are kept.
    #[default]
    InOrder,

    /// Every conflicting command is checked first. If any is
    /// `CancelIncoming` nothing is cancelled; otherwise all are cancelled.
    CheckThenCancel,
}

/// Runtime configuration of the command scheduler.
///
/// ## Fields
/// * `period_ms` — expected control-loop period; a tick that takes longer is
///   reported as an overrun.
/// * `conflict_resolution` — see [`ConflictResolution`].
/// * `report_overruns` — whether loop overruns are logged.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Control-loop period in milliseconds.
    pub period_ms: u64,

    /// Requirement conflict policy.
    pub conflict_resolution: ConflictResolution,

    /// Whether the loop-overrun watchdog logs overruns.
    pub report_overruns: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            conflict_resolution: ConflictResolution::default(),
            report_overruns: true,
        }
    }
}

impl SchedulerConfig {
    /// Parses and validates a configuration from a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: SchedulerConfig =
            toml::from_str(source).map_err(|e| ConfigError::CannotParseToml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }

    /// Loop period as a [`Duration`].
    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}
