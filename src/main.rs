use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use rollouts_plugin_loki::{ExprEvaluator, LokiClient, LokiPlugin, Metric, QueryConfig, PLUGIN_NAME};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate a Loki query the way a rollout analysis would", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one measurement and print it as JSON
    Run(MetricArgs),
    /// Print the metadata the controller would attach to measurements
    Metadata(MetricArgs),
}

#[derive(clap::Args, Debug)]
struct MetricArgs {
    /// Metric definition file (JSON, controller format); overrides the flags below
    #[arg(short, long)]
    metric: Option<PathBuf>,

    /// Loki query endpoint URL
    #[arg(long, env = "LOKI_ADDRESS")]
    address: Option<String>,

    #[arg(long, env = "LOKI_USERNAME", default_value = "")]
    username: String,

    #[arg(long, env = "LOKI_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Raw LogQL query
    #[arg(long, env = "LOKI_QUERY")]
    query: Option<String>,

    #[arg(long, env = "SUCCESS_CONDITION", default_value = "")]
    success_condition: String,

    #[arg(long, env = "FAILURE_CONDITION", default_value = "")]
    failure_condition: String,

    /// Overall request deadline in seconds
    #[arg(long, default_value_t = 20)]
    deadline_secs: u64,

    /// HTTP client timeout in seconds
    #[arg(long, default_value_t = 10)]
    client_timeout_secs: u64,
}

impl MetricArgs {
    fn to_metric(&self) -> Result<Metric> {
        if let Some(path) = &self.metric {
            return read_metric(path);
        }
        let config = QueryConfig {
            address: self.address.clone().context("--address or LOKI_ADDRESS is required")?,
            username: self.username.clone(),
            password: self.password.clone(),
            query: self.query.clone().context("--query or LOKI_QUERY is required")?,
        };
        let mut metric = Metric {
            name: "loki".to_string(),
            success_condition: self.success_condition.clone(),
            failure_condition: self.failure_condition.clone(),
            ..Metric::default()
        };
        metric
            .provider
            .plugin
            .insert(PLUGIN_NAME.to_string(), serde_json::to_value(config)?);
        Ok(metric)
    }

    fn plugin(&self) -> Result<LokiPlugin> {
        let client = LokiClient::with_timeouts(
            Duration::from_secs(self.deadline_secs),
            Duration::from_secs(self.client_timeout_secs),
        )?;
        Ok(LokiPlugin::with_evaluator(client, ExprEvaluator))
    }
}

fn read_metric(path: &Path) -> Result<Metric> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read metric file {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse metric file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    match args.command {
        Command::Run(metric_args) => {
            let metric = metric_args.to_metric()?;
            let plugin = metric_args.plugin()?;
            plugin.init_plugin()?;

            info!("Running metric {:?}", metric.name);
            let measurement = plugin.run(&metric).await;
            println!("{}", serde_json::to_string_pretty(&measurement)?);

            if measurement.is_error() {
                error!("Measurement failed: {}", measurement.message);
                std::process::exit(1);
            }
        }
        Command::Metadata(metric_args) => {
            let metric = metric_args.to_metric()?;
            let plugin = metric_args.plugin()?;
            let metadata = plugin
                .get_metadata(&metric)
                .context("Metric has no readable loki configuration")?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(argv: &[&str]) -> MetricArgs {
        match Args::try_parse_from(argv).unwrap().command {
            Command::Run(args) | Command::Metadata(args) => args,
        }
    }

    #[test]
    fn test_metric_from_flags() {
        let args = parse(&[
            "rollouts-plugin-loki",
            "run",
            "--address",
            "http://loki:3100/loki/api/v1/query",
            "--username",
            "myuser",
            "--password",
            "mypassword",
            "--query",
            "sum(rate({app=\"api\"}[5m]))",
            "--success-condition",
            "result[0] <= 1",
        ]);
        let metric = args.to_metric().unwrap();
        assert_eq!(metric.success_condition, "result[0] <= 1");

        let config = QueryConfig::from_metric(&metric).unwrap();
        assert_eq!(config.address, "http://loki:3100/loki/api/v1/query");
        assert_eq!(config.credentials(), Some(("myuser", "mypassword")));
    }

    #[test]
    fn test_metric_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name":"errors","successCondition":"result[0] < 5","provider":{{"plugin":{{"{}":{{"address":"http://loki","query":"up"}}}}}}}}"#,
            PLUGIN_NAME
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let args = parse(&["rollouts-plugin-loki", "metadata", "--metric", &path]);
        let metric = args.to_metric().unwrap();
        assert_eq!(metric.name, "errors");
        assert_eq!(QueryConfig::from_metric(&metric).unwrap().query, "up");
    }

    #[test]
    fn test_deadline_flags() {
        let args = parse(&["rollouts-plugin-loki", "run", "--deadline-secs", "3"]);
        assert_eq!(args.deadline_secs, 3);
        assert_eq!(args.client_timeout_secs, 10);
        assert!(args.plugin().is_ok());
    }
}
