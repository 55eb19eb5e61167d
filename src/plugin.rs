use log::{debug, info, warn};
use std::collections::HashMap;

use crate::client::LokiClient;
use crate::condition::{ConditionEvaluator, ExprEvaluator};
use crate::config::QueryConfig;
use crate::decode;
use crate::error::{PluginError, Result};
use crate::measurement::{Measurement, Metric, Phase};

/// Provider type reported to the rollout controller.
pub const PROVIDER_TYPE: &str = "RpcPlugin";

/// Metadata key carrying the query that was run.
pub const RESOLVED_QUERY_KEY: &str = "ResolvedLokiQuery";

/// Loki metric provider.
///
/// Holds no per-run state, so one instance can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct LokiPlugin<E = ExprEvaluator> {
    client: LokiClient,
    evaluator: E,
}

impl LokiPlugin<ExprEvaluator> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_evaluator(LokiClient::new()?, ExprEvaluator))
    }
}

impl<E: ConditionEvaluator> LokiPlugin<E> {
    pub fn with_evaluator(client: LokiClient, evaluator: E) -> Self {
        Self { client, evaluator }
    }

    pub fn init_plugin(&self) -> Result<()> {
        Ok(())
    }

    /// Queries Loki once and evaluates the metric's conditions.
    ///
    /// Always returns a finished measurement; failures at any step yield
    /// the `Error` phase with the failure text as message.
    pub async fn run(&self, metric: &Metric) -> Measurement {
        let measurement = Measurement::start();
        match self.measure(metric).await {
            Ok((value, phase)) => {
                info!("Metric {:?} measured {} -> {}", metric.name, value, phase);
                measurement.finish(value, phase)
            }
            Err(e) => {
                warn!("Metric {:?} measurement failed: {}", metric.name, e);
                measurement.mark_error(&e)
            }
        }
    }

    async fn measure(&self, metric: &Metric) -> Result<(String, Phase)> {
        let config = QueryConfig::from_metric(metric)?;
        config.validate()?;
        debug!("Running loki query {:?}", config.query);

        let body = self.client.query(&config).await?;
        let samples = decode::extract_samples(&body)?;
        debug!("Decoded {} samples", samples.len());

        let phase = self.evaluator.evaluate(&samples.values, metric)?;
        if phase == Phase::Error {
            return Err(PluginError::Evaluation(
                "evaluator returned the Error phase".to_string(),
            ));
        }
        Ok((samples.snapshot(), phase))
    }

    /// Nothing runs between polls, so the measurement is returned as is.
    pub fn resume(&self, _metric: &Metric, measurement: Measurement) -> Measurement {
        measurement
    }

    pub fn terminate(&self, _metric: &Metric, measurement: Measurement) -> Measurement {
        measurement
    }

    pub fn garbage_collect(&self, _metric: &Metric, _limit: usize) -> Result<()> {
        Ok(())
    }

    pub fn provider_type(&self) -> &'static str {
        PROVIDER_TYPE
    }

    /// Metadata shown next to measurements; `None` if the config is unreadable.
    pub fn get_metadata(&self, metric: &Metric) -> Option<HashMap<String, String>> {
        let config = QueryConfig::from_metric(metric).ok()?;
        let mut metadata = HashMap::new();
        if !config.query.is_empty() {
            metadata.insert(RESOLVED_QUERY_KEY.to_string(), config.query);
        }
        Some(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PLUGIN_NAME;
    use serde_json::json;

    fn metric(config: serde_json::Value) -> Metric {
        let mut metric = Metric::default();
        metric.provider.plugin.insert(PLUGIN_NAME.to_string(), config);
        metric
    }

    #[test]
    fn test_metadata_exposes_query() {
        let plugin = LokiPlugin::new().unwrap();
        let metadata = plugin
            .get_metadata(&metric(json!({"address": "http://loki", "query": "sum(rate({app=\"x\"}[1m]))"})))
            .unwrap();
        assert_eq!(
            metadata.get(RESOLVED_QUERY_KEY).map(String::as_str),
            Some("sum(rate({app=\"x\"}[1m]))")
        );
    }

    #[test]
    fn test_metadata_without_query() {
        let plugin = LokiPlugin::new().unwrap();
        let metadata = plugin
            .get_metadata(&metric(json!({"address": "http://loki", "query": ""})))
            .unwrap();
        assert!(metadata.is_empty());
        assert!(plugin.get_metadata(&Metric::default()).is_none());
    }

    #[test]
    fn test_metadata_without_address() {
        let plugin = LokiPlugin::new().unwrap();
        let metadata = plugin
            .get_metadata(&metric(json!({"query": "sum(x)"})))
            .unwrap();
        assert_eq!(metadata.get(RESOLVED_QUERY_KEY).map(String::as_str), Some("sum(x)"));
    }

    #[test]
    fn test_lifecycle_hooks_are_noops() {
        let plugin = LokiPlugin::new().unwrap();
        let metric = Metric::default();
        let measurement = Measurement::start().finish("[1]".to_string(), Phase::Successful);

        assert_eq!(plugin.resume(&metric, measurement.clone()), measurement);
        assert_eq!(plugin.terminate(&metric, measurement.clone()), measurement);
        assert!(plugin.garbage_collect(&metric, 10).is_ok());
        assert!(plugin.init_plugin().is_ok());
        assert_eq!(plugin.provider_type(), "RpcPlugin");
    }

    #[tokio::test]
    async fn test_run_without_config_is_an_error() {
        let plugin = LokiPlugin::new().unwrap();
        let measurement = plugin.run(&Metric::default()).await;
        assert!(measurement.is_error());
        assert!(measurement.finished_at.is_some());
        assert!(measurement.value.is_empty());
        assert!(measurement.message.contains(PLUGIN_NAME));
    }

    #[tokio::test]
    async fn test_run_without_address_is_an_error() {
        let plugin = LokiPlugin::new().unwrap();
        let measurement = plugin.run(&metric(json!({"query": "sum(x)"}))).await;
        assert!(measurement.is_error());
        assert!(measurement.value.is_empty());
        assert!(measurement.message.contains("address"), "{}", measurement.message);
    }
}
