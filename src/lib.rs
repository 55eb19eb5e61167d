//! Loki metric provider for progressive-delivery rollouts.
//!
//! A run executes one LogQL query against Loki, decodes the vector result
//! into numeric samples and evaluates the metric's success and failure
//! conditions against them.

pub mod client;
pub mod condition;
pub mod config;
pub mod decode;
pub mod error;
pub mod measurement;
pub mod plugin;
pub mod types;

pub use client::LokiClient;
pub use condition::{ConditionEvaluator, ExprEvaluator};
pub use config::{QueryConfig, PLUGIN_NAME};
pub use error::{ErrorKind, PluginError};
pub use measurement::{Measurement, Metric, Phase};
pub use plugin::LokiPlugin;
