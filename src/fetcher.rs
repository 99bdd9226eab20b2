use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rand::seq::IndexedRandom;

use crate::analyzer::TextCleaner;

/// Browser user agents rotated per request so pages don't serve bot walls.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Result of fetching one page. A failure never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(String),
    Failed(String),
}

impl FetchOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub url: String,
    pub outcome: FetchOutcome,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Downloads a page, strips the markup and cleans the text, capped at
/// `max_chars` characters.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    cleaner: Arc<TextCleaner>,
    timeout: Duration,
    max_chars: usize,
}

impl HttpPageFetcher {
    pub fn new(
        client: reqwest::Client,
        cleaner: Arc<TextCleaner>,
        timeout: Duration,
        max_chars: usize,
    ) -> Self {
        Self {
            client,
            cleaner,
            timeout,
            max_chars,
        }
    }

    async fn fetch_body(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let body = match self.fetch_body(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url, error = %e, "error fetching page");
                return FetchOutcome::Failed(e.to_string());
            }
        };

        let cleaner = self.cleaner.clone();
        let max_chars = self.max_chars;
        match tokio::task::spawn_blocking(move || truncate_chars(&cleaner.clean(&body), max_chars))
            .await
        {
            Ok(text) => FetchOutcome::Fetched(text),
            Err(e) => {
                tracing::error!(url, error = %e, "page cleaning task failed");
                FetchOutcome::Failed(format!("could not extract text: {e}"))
            }
        }
    }
}

/// Fetches every url concurrently. The output keeps the input order no
/// matter which fetch finishes first.
pub async fn fetch_all(fetcher: &dyn PageFetcher, urls: &[String]) -> Vec<SourceText> {
    let outcomes = join_all(urls.iter().map(|url| fetcher.fetch(url))).await;
    urls.iter()
        .cloned()
        .zip(outcomes)
        .map(|(url, outcome)| SourceText { url, outcome })
        .collect()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("", 2), "");
        // multi-byte characters count once
        assert_eq!(truncate_chars("привет", 3), "при");
    }

    #[test]
    fn test_random_user_agent_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }
}
