use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }
}

/// A chat completion service. Implementations sample deterministically and
/// return the text of the first candidate.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: &'a [Message],
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    max_tokens: String,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Deserialize, Debug)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize, Debug)]
struct Alternative {
    message: Message,
}

/// Client for the YandexGPT foundation models completion endpoint.
pub struct YandexGptClient {
    client: reqwest::Client,
    endpoint: Url,
    folder_id: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl YandexGptClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: Url,
        folder_id: String,
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint,
            folder_id,
            api_key,
            model,
            max_tokens,
            timeout,
        }
    }

    pub fn model_uri(&self) -> String {
        format!("gpt://{}/{}", self.folder_id, self.model)
    }
}

#[async_trait]
impl CompletionClient for YandexGptClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model_uri: self.model_uri(),
            completion_options: CompletionOptions {
                stream: false,
                temperature: 0.0,
                max_tokens: self.max_tokens.to_string(),
            },
            messages,
        };

        let res = self
            .client
            .post(self.endpoint.clone())
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .header("x-folder-id", &self.folder_id)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: CompletionResponse = res.json().await?;
        response
            .result
            .alternatives
            .into_iter()
            .next()
            .map(|alt| alt.message.text)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let request = CompletionRequest {
            model_uri: "gpt://folder/yandexgpt/latest".into(),
            completion_options: CompletionOptions {
                stream: false,
                temperature: 0.0,
                max_tokens: "2000".into(),
            },
            messages: &messages,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "modelUri": "gpt://folder/yandexgpt/latest",
                "completionOptions": {"stream": false, "temperature": 0.0, "maxTokens": "2000"},
                "messages": [
                    {"role": "system", "text": "sys"},
                    {"role": "user", "text": "hi"}
                ]
            })
        );
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{"result":{"alternatives":[{"message":{"role":"assistant","text":"{}"},"status":"ALTERNATIVE_STATUS_FINAL"}],"usage":{"inputTextTokens":"10"},"modelVersion":"23.10.2024"}}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.result.alternatives[0].message.text, "{}");
    }
}
