use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};
use crate::measurement::Metric;

/// Key under which the controller stores this plugin's configuration.
pub const PLUGIN_NAME: &str = "dromadaire54/rollouts-plugin-loki";

/// Per-invocation Loki query settings.
///
/// Every field may be absent when decoding so metadata can still be read
/// from a partial entry; `validate` guards the run path.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Full URL of the Loki query endpoint.
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Raw LogQL query, sent as the request body.
    #[serde(default)]
    pub query: String,
}

impl QueryConfig {
    /// Reads the plugin entry out of a metric definition.
    pub fn from_metric(metric: &Metric) -> Result<Self> {
        let raw = metric
            .provider
            .plugin
            .get(PLUGIN_NAME)
            .ok_or_else(|| PluginError::MissingConfiguration(PLUGIN_NAME.to_string()))?;
        serde_json::from_value(raw.clone()).map_err(PluginError::InvalidConfiguration)
    }

    /// Checks the settings a query cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(PluginError::MissingField("address"));
        }
        Ok(())
    }

    /// Basic-auth credentials, present only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            return None;
        }
        Some((&self.username, &self.password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn metric_with(config: serde_json::Value) -> Metric {
        let mut metric = Metric::default();
        metric.provider.plugin.insert(PLUGIN_NAME.to_string(), config);
        metric
    }

    #[test]
    fn test_from_metric() {
        let metric = metric_with(json!({
            "address": "http://loki:3100/loki/api/v1/query",
            "username": "myuser",
            "password": "mypassword",
            "query": "sum(rate({app=\"api\"}[5m]))"
        }));
        let config = QueryConfig::from_metric(&metric).unwrap();
        assert_eq!(config.address, "http://loki:3100/loki/api/v1/query");
        assert_eq!(config.credentials(), Some(("myuser", "mypassword")));
    }

    #[test]
    fn test_missing_plugin_entry() {
        let err = QueryConfig::from_metric(&Metric::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains(PLUGIN_NAME));
    }

    #[test]
    fn test_missing_address() {
        let config = QueryConfig::from_metric(&metric_with(json!({"query": "up"}))).unwrap();
        assert_eq!(config.query, "up");
        assert!(config.address.is_empty());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PluginError::MissingField("address")));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_wrong_field_type_is_invalid() {
        let err = QueryConfig::from_metric(&metric_with(json!({"address": 3}))).unwrap_err();
        assert!(matches!(err, PluginError::InvalidConfiguration(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_partial_credentials_are_ignored() {
        let only_user = QueryConfig {
            username: "myuser".to_string(),
            ..QueryConfig::default()
        };
        let only_password = QueryConfig {
            password: "mypassword".to_string(),
            ..QueryConfig::default()
        };
        assert_eq!(only_user.credentials(), None);
        assert_eq!(only_password.credentials(), None);
        assert_eq!(QueryConfig::default().credentials(), None);
    }
}
