use serde_json::{Map, Value};
use url::Url;

use crate::data_models::{PredictionResponse, RequestId};
use crate::error::ValidationError;

pub const DEFAULT_ATTRIBUTION: &str = " Информация была получена с помощью YandexGPT.";

const FIELDS: [&str; 3] = ["answer", "reasoning", "sources"];

#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    /// Sentence appended to every reasoning.
    pub attribution: String,
    /// Reject answer indices above the number of options listed in the query.
    pub strict_option_bounds: bool,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            strict_option_bounds: false,
        }
    }
}

/// Turns the model's structured payload into a [`PredictionResponse`].
/// Any contract violation fails the whole response.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    settings: ValidatorSettings,
}

impl ResponseValidator {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self { settings }
    }

    pub fn parse(&self, raw: &str, id: RequestId) -> Result<PredictionResponse, ValidationError> {
        self.parse_with_options(raw, id, None)
    }

    /// Validates against the query too, when bounds checking is enabled.
    pub fn parse_for_query(
        &self,
        raw: &str,
        id: RequestId,
        query: &str,
    ) -> Result<PredictionResponse, ValidationError> {
        let options = self
            .settings
            .strict_option_bounds
            .then(|| count_options(query));
        self.parse_with_options(raw, id, options)
    }

    fn parse_with_options(
        &self,
        raw: &str,
        id: RequestId,
        options: Option<usize>,
    ) -> Result<PredictionResponse, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::Malformed("empty output".to_string()));
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(ValidationError::Malformed(
                "expected a JSON object".to_string(),
            ));
        };

        for field in FIELDS {
            if !object.contains_key(field) {
                return Err(ValidationError::MissingField(field));
            }
        }
        if let Some(extra) = object.keys().find(|k| !FIELDS.contains(&k.as_str())) {
            return Err(ValidationError::UnexpectedField(extra.clone()));
        }

        let answer = parse_answer(&object)?;
        if let (Some(answer), Some(options)) = (answer, options) {
            if answer as usize > options {
                return Err(ValidationError::AnswerOutOfRange { answer, options });
            }
        }

        let reasoning = self.attribute(parse_reasoning(&object)?);
        let sources = parse_sources(&object)?;

        Ok(PredictionResponse {
            id,
            answer,
            reasoning,
            sources,
        })
    }

    fn attribute(&self, reasoning: &str) -> String {
        let attribution = self.settings.attribution.trim();
        if attribution.is_empty() || reasoning.trim_end().ends_with(attribution) {
            reasoning.to_string()
        } else {
            format!("{reasoning}{}", self.settings.attribution)
        }
    }
}

fn parse_answer(object: &Map<String, Value>) -> Result<Option<u32>, ValidationError> {
    let invalid = || ValidationError::InvalidField {
        field: "answer",
        reason: "expected a non-negative integer or null".to_string(),
    };
    match &object["answer"] {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let n = n.as_u64().ok_or_else(invalid)?;
            let n = u32::try_from(n).map_err(|_| invalid())?;
            Ok((n != 0).then_some(n))
        }
        _ => Err(invalid()),
    }
}

fn parse_reasoning(object: &Map<String, Value>) -> Result<&str, ValidationError> {
    match &object["reasoning"] {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::String(_) => Err(ValidationError::InvalidField {
            field: "reasoning",
            reason: "must not be empty".to_string(),
        }),
        _ => Err(ValidationError::InvalidField {
            field: "reasoning",
            reason: "expected a string".to_string(),
        }),
    }
}

fn parse_sources(object: &Map<String, Value>) -> Result<Vec<Url>, ValidationError> {
    let Value::Array(items) = &object["sources"] else {
        return Err(ValidationError::InvalidField {
            field: "sources",
            reason: "expected a list of urls".to_string(),
        });
    };

    items
        .iter()
        .map(|item| {
            let Value::String(raw) = item else {
                return Err(ValidationError::InvalidField {
                    field: "sources",
                    reason: format!("expected a string, got {item}"),
                });
            };
            parse_source_url(raw)
        })
        .collect()
}

/// Accepts absolute `http`/`https` urls with a host.
pub fn parse_source_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidSource {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Number of enumerated options in a query: the non-empty lines after the
/// question line.
pub fn count_options(query: &str) -> usize {
    query
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .skip(1)
        .count()
}
