use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Caller supplied correlation id, echoed back unmodified.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestId {
    Int(i64),
    Str(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Int(id) => write!(f, "{id}"),
            RequestId::Str(id) => f.write_str(id),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PredictionRequest {
    pub id: RequestId,
    pub query: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PredictionResponse {
    pub id: RequestId,
    /// 1-based option index, `None` when the query had no options.
    pub answer: Option<u32>,
    pub reasoning: String,
    pub sources: Vec<Url>,
}
