use std::time::Duration;

use thiserror::Error;

/// Failures of the search step. All of them are fatal to the request.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search service answered with status {0}")]
    Status(u16),

    #[error("could not parse search response: {0}")]
    Parse(String),

    #[error("search service error {code}: {message}")]
    Service { code: String, message: String },
}

/// The model output broke the structured answer contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed or empty model output: {0}")]
    Malformed(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unexpected field `{0}`")]
    UnexpectedField(String),

    #[error("invalid source url `{url}`: {reason}")]
    InvalidSource { url: String, reason: String },

    #[error("answer {answer} is out of range, the query lists {options} options")]
    AnswerOutOfRange { answer: u32, options: usize },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("request did not complete within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Failures talking to the completion service. The answer engine turns these
/// into an empty answer, they never reach the caller directly.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion service returned no alternatives")]
    EmptyResponse,
}
