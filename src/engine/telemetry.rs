//! Read-only diagnostics output.
//!
//! The scheduler, subsystems and command handles can publish named values
//! describing their state to a [`TelemetrySink`]. Publishing is best-effort
//! and never influences scheduling.

use std::collections::BTreeMap;

use serde::Serialize;


/// Value published under a telemetry key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    /// Boolean flag.
    Bool(bool),
    /// Single string.
    Str(String),
    /// List of strings.
    StrArray(Vec<String>),
    /// List of integers.
    IntArray(Vec<i64>),
}

/// Destination for published telemetry.
pub trait TelemetrySink {
    /// Publishes `value` under `key`, replacing any previous value.
    fn publish(&mut self, key: &str, value: TelemetryValue);
}

/// In-memory sink keeping the latest value per key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemorySink {
    values: BTreeMap<String, TelemetryValue>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value published under `key`.
    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        self.values.get(key)
    }

    /// Number of distinct keys published.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TelemetrySink for MemorySink {
    fn publish(&mut self, key: &str, value: TelemetryValue) {
        self.values.insert(key.to_string(), value);
    }
}
