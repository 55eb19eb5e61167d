use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::HashMap;

/// The only result type the plugin knows how to evaluate.
pub const VECTOR_RESULT_TYPE: &str = "vector";

/// Loki query response envelope.
#[derive(Debug, Deserialize, Serialize)]
pub struct QueryResponse {
    pub status: String,
    pub data: QueryData,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Vec<QueryResult>,
}

/// One labelled series of a vector result.
///
/// Value tuples mix encodings (the timestamp is usually a JSON number, the
/// sample a JSON string), so each element is kept raw and decoded later by
/// [`ValueToken::decode`].
#[derive(Debug, Deserialize, Serialize)]
pub struct QueryResult {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub value: Option<Vec<Box<RawValue>>>,
}

impl QueryResult {
    /// Raw value tokens of the series, empty when the series carries none.
    pub fn raw_values(&self) -> &[Box<RawValue>] {
        self.value.as_deref().unwrap_or_default()
    }
}

/// A decoded value token, tagged with the encoding it was read as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueToken {
    /// JSON string; holds the unescaped content.
    Text(String),
    /// JSON number; holds the literal as written upstream.
    Number(String),
    /// Neither; holds the verbatim token text.
    Raw(String),
}

impl ValueToken {
    /// Decodes a raw token, trying string, then number, then verbatim text.
    pub fn decode(raw: &RawValue) -> Self {
        let text = raw.get();
        if let Ok(s) = serde_json::from_str::<String>(text) {
            return ValueToken::Text(s);
        }
        if serde_json::from_str::<serde_json::Number>(text).is_ok() {
            return ValueToken::Number(text.trim().to_string());
        }
        ValueToken::Raw(text.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ValueToken::Text(s) | ValueToken::Number(s) | ValueToken::Raw(s) => s,
        }
    }
}
