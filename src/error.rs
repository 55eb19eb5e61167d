use std::num::ParseFloatError;
use std::time::Duration;
use thiserror::Error;

/// Broad failure categories surfaced to the rollout controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    UpstreamStatus,
    Decode,
    NumericParse,
    Evaluation,
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin configuration for {0} not found")]
    MissingConfiguration(String),

    #[error("plugin configuration is missing {0}")]
    MissingField(&'static str),

    #[error("invalid plugin configuration: {0}")]
    InvalidConfiguration(#[source] serde_json::Error),

    #[error("failed to build loki request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("loki request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("loki request deadline of {}s exceeded", .0.as_secs_f64())]
    DeadlineExceeded(Duration),

    #[error("error fetching metrics: {0}")]
    UpstreamStatus(String),

    #[error("invalid loki response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Loki log type not supported: {0}")]
    UnsupportedResultType(String),

    #[error("cannot parse sample {token:?} as a number: {source}")]
    NumericParse {
        token: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("sample {0:?} is out of range for a 64-bit float")]
    OutOfRange(String),

    #[error("condition evaluation failed: {0}")]
    Evaluation(String),
}

impl PluginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::MissingConfiguration(_)
            | PluginError::MissingField(_)
            | PluginError::InvalidConfiguration(_) => ErrorKind::Configuration,
            PluginError::Request(_) | PluginError::Transport(_) | PluginError::DeadlineExceeded(_) => {
                ErrorKind::Transport
            }
            PluginError::UpstreamStatus(_) => ErrorKind::UpstreamStatus,
            PluginError::Decode(_) | PluginError::UnsupportedResultType(_) => ErrorKind::Decode,
            PluginError::NumericParse { .. } | PluginError::OutOfRange(_) => {
                ErrorKind::NumericParse
            }
            PluginError::Evaluation(_) => ErrorKind::Evaluation,
        }
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
