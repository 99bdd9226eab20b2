use std::str::FromStr;

use crate::error::ConfigError;
use crate::fetcher::{FetchOutcome, SourceText};

/// What goes into the prompt for a page that could not be fetched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailedSourcePolicy {
    /// `Error fetching <url>: <reason>` in place of the page text.
    #[default]
    Placeholder,
    /// `[unavailable] <reason>`, marked so the model can tell it apart from content.
    Tag,
    /// Leave the source out of the prompt.
    Drop,
}

impl FromStr for FailedSourcePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "tag" => Ok(Self::Tag),
            "drop" => Ok(Self::Drop),
            other => Err(ConfigError::Invalid {
                key: "FAILED_SOURCE_POLICY",
                value: other.to_string(),
                reason: "expected one of placeholder, tag, drop".to_string(),
            }),
        }
    }
}

/// Builds the user message: the query, a blank line, then every source as a
/// url line followed by its text and a blank line. Sources keep search order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextAssembler {
    policy: FailedSourcePolicy,
}

impl ContextAssembler {
    pub fn new(policy: FailedSourcePolicy) -> Self {
        Self { policy }
    }

    pub fn assemble(&self, query: &str, sources: &[SourceText]) -> String {
        let mut text = String::with_capacity(query.len() + 2);
        text.push_str(query);
        text.push_str("\n\n");

        for source in sources {
            let body = match (&source.outcome, self.policy) {
                (FetchOutcome::Fetched(body), _) => body.clone(),
                (FetchOutcome::Failed(reason), FailedSourcePolicy::Placeholder) => {
                    format!("Error fetching {}: {}", source.url, reason)
                }
                (FetchOutcome::Failed(reason), FailedSourcePolicy::Tag) => {
                    format!("[unavailable] {reason}")
                }
                (FetchOutcome::Failed(_), FailedSourcePolicy::Drop) => continue,
            };
            text.push_str(&source.url);
            text.push('\n');
            text.push_str(&body);
            text.push_str("\n\n");
        }
        text
    }
}
