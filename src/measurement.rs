use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::PluginError;

/// Metric definition handed over by the rollout controller.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub success_condition: String,
    #[serde(default)]
    pub failure_condition: String,
    #[serde(default)]
    pub provider: MetricProvider,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricProvider {
    /// Plugin configurations keyed by plugin name.
    #[serde(default)]
    pub plugin: HashMap<String, Value>,
}

/// Terminal verdict of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Phase {
    Successful,
    Failed,
    Inconclusive,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Successful => "Successful",
            Phase::Failed => "Failed",
            Phase::Inconclusive => "Inconclusive",
            Phase::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Result of one `run` invocation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Measurement {
    /// Opens a measurement stamped with the current time.
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            value: String::new(),
            phase: None,
            message: String::new(),
        }
    }

    /// Closes the measurement with a verdict and its value snapshot.
    pub fn finish(self, value: String, phase: Phase) -> Self {
        Self {
            finished_at: Some(Utc::now()),
            value,
            phase: Some(phase),
            ..self
        }
    }

    /// Closes the measurement as an error, dropping any value.
    pub fn mark_error(self, err: &PluginError) -> Self {
        Self {
            finished_at: Some(Utc::now()),
            value: String::new(),
            phase: Some(Phase::Error),
            message: err.to_string(),
            ..self
        }
    }

    pub fn is_error(&self) -> bool {
        self.phase == Some(Phase::Error)
    }
}
