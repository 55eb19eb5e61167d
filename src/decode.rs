//! Turns a Loki response body into numeric samples.
//!
//! Samples are flattened in series order and, within a series, in token
//! order. The snapshot string keeps every token exactly as decoded so the
//! controller sees what Loki returned rather than a re-rendered float.

use crate::error::{PluginError, Result};
use crate::types::{QueryResponse, ValueToken, VECTOR_RESULT_TYPE};

/// Normalised samples of one response plus their textual snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub values: Vec<f64>,
    tokens: Vec<String>,
}

impl SampleSet {
    /// Renders the decoded tokens as `[v1,v2,...]`.
    pub fn snapshot(&self) -> String {
        format!("[{}]", self.tokens.join(","))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parses a response body; only vector results are accepted.
pub fn decode_response(body: &[u8]) -> Result<QueryResponse> {
    let response: QueryResponse = serde_json::from_slice(body).map_err(PluginError::Decode)?;
    if response.data.result_type != VECTOR_RESULT_TYPE {
        return Err(PluginError::UnsupportedResultType(
            response.data.result_type,
        ));
    }
    Ok(response)
}

/// Converts every value token of every series into an `f64`.
///
/// A single unparsable token fails the whole set.
pub fn normalize(response: &QueryResponse) -> Result<SampleSet> {
    let mut values = Vec::with_capacity(response.data.result.len());
    let mut tokens = Vec::with_capacity(response.data.result.len());

    for series in &response.data.result {
        for raw in series.raw_values() {
            let token = ValueToken::decode(raw);
            let text = token.as_str();
            let value = text
                .parse::<f64>()
                .map_err(|source| PluginError::NumericParse {
                    token: text.to_string(),
                    source,
                })?;
            if !value.is_finite() && !spells_non_finite(text) {
                return Err(PluginError::OutOfRange(text.to_string()));
            }
            values.push(value);
            tokens.push(text.to_string());
        }
    }

    Ok(SampleSet { values, tokens })
}

/// NaN and infinities are only accepted when the token names them.
fn spells_non_finite(text: &str) -> bool {
    let name = text.trim_start_matches(['+', '-']);
    ["nan", "inf", "infinity"]
        .iter()
        .any(|n| name.eq_ignore_ascii_case(n))
}

/// Decodes and normalises a body in one pass.
pub fn extract_samples(body: &[u8]) -> Result<SampleSet> {
    normalize(&decode_response(body)?)
}
