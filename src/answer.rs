use std::sync::Arc;

use crate::llm::{CompletionClient, Message};

/// Instruction sent ahead of every prompt. Overridable through
/// `SYSTEM_PROMPT_PATH`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Ты помощник, который отвечает на вопросы об университете ИТМО, опираясь на переданные источники.
На вход приходит вопрос, за ним могут идти варианты ответа (каждый на своей строке, пронумерованы от 1 до 10), а затем источники: адрес страницы и её текст.

Правила выбора ответа:
- Официальным источникам ИТМО (itmo.ru, news.itmo.ru) доверяй больше, чем остальным.
- Если в вопросе есть варианты ответа, верни номер правильного варианта ровно так, как он пронумерован в вопросе.
- Если вариантов нет, верни 0.

Ответ выдай строго одним JSON-объектом без markdown, комментариев и лишнего текста:
{
    "answer": целое число, номер верного варианта или 0,
    "reasoning": строка на русском языке с подробным объяснением по источникам; последним предложением укажи, что информация получена с помощью YandexGPT,
    "sources": список адресов (начинаются с https://), на которых найден ответ
}

Примеры:
{"answer": 2, "reasoning": "Согласно официальному сайту, ...", "sources": ["https://itmo.ru/ru/page/1"]}
{"answer": 0, "reasoning": "В новостях университета сказано, что ...", "sources": ["https://news.itmo.ru/ru/news/1"]}"#;

/// Sends the assembled prompt to the completion service and returns the raw
/// structured payload, or an empty string when no answer could be obtained.
pub struct AnswerEngine {
    client: Arc<dyn CompletionClient>,
    system_prompt: String,
}

impl AnswerEngine {
    pub fn new(client: Arc<dyn CompletionClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn with_default_prompt(client: Arc<dyn CompletionClient>) -> Self {
        Self::new(client, DEFAULT_SYSTEM_PROMPT)
    }

    pub async fn answer(&self, prompt: &str) -> String {
        tracing::info!("requesting answer from completion service");
        let messages = [Message::system(self.system_prompt.as_str()), Message::user(prompt)];

        match self.client.complete(&messages).await {
            Ok(raw) => {
                let result = strip_code_fence(&raw);
                tracing::debug!(result = %result, "completion result");
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "error in answering");
                String::new()
            }
        }
    }
}

/// Flattens newlines and removes a markdown code fence the model may wrap its
/// JSON in, including a `json` language tag right after the opening fence.
pub fn strip_code_fence(raw: &str) -> String {
    let flat = raw.replace(['\r', '\n'], " ");
    let trimmed = flat.trim_matches(|c: char| c == '`' || c.is_whitespace());

    let untagged = match trimmed.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => {
            let rest = &trimmed[4..];
            if rest.starts_with(|c: char| c == '{' || c.is_whitespace()) {
                rest
            } else {
                trimmed
            }
        }
        _ => trimmed,
    };
    untagged.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_plain() {
        assert_eq!(strip_code_fence("  {\"answer\": 1}\n"), "{\"answer\": 1}");
    }

    #[test]
    fn test_strip_code_fence_fenced() {
        assert_eq!(
            strip_code_fence("```\n{\"answer\": 1,\n\"sources\": []}\n```"),
            "{\"answer\": 1, \"sources\": []}"
        );
    }

    #[test]
    fn test_strip_code_fence_with_language_tag() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```JSON{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fence_keeps_words_starting_with_json() {
        assert_eq!(strip_code_fence("jsonify"), "jsonify");
    }

    #[test]
    fn test_strip_code_fence_empty() {
        assert_eq!(strip_code_fence(""), "");
        assert_eq!(strip_code_fence("``` ```"), "");
    }
}
