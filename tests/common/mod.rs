#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use gleaner::answer::AnswerEngine;
use gleaner::context::{ContextAssembler, FailedSourcePolicy};
use gleaner::error::{LlmError, SearchError};
use gleaner::fetcher::{FetchOutcome, PageFetcher};
use gleaner::llm::{CompletionClient, Message};
use gleaner::pipeline::Pipeline;
use gleaner::search::WebSearcher;
use gleaner::validator::ResponseValidator;

pub struct FakeSearcher {
    urls: Option<Vec<String>>,
    delay: Duration,
}

impl FakeSearcher {
    pub fn returning(urls: &[&str]) -> Self {
        Self {
            urls: Some(urls.iter().map(|u| u.to_string()).collect()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            urls: None,
            delay: Duration::ZERO,
        }
    }

    /// Answers only after `delay` has passed.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl WebSearcher for FakeSearcher {
    async fn search(&self, _query: &str) -> Result<Vec<String>, SearchError> {
        tokio::time::sleep(self.delay).await;
        self.urls
            .clone()
            .ok_or_else(|| SearchError::Parse("unexpected end of document".to_string()))
    }
}

/// Serves canned page text, each after its own delay, with a per fetch timeout.
pub struct FakeFetcher {
    pages: HashMap<String, (Duration, String)>,
    timeout: Duration,
}

impl FakeFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pages: HashMap::new(),
            timeout,
        }
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages
            .insert(url.to_string(), (Duration::ZERO, text.to_string()));
        self
    }

    pub fn slow_page(mut self, url: &str, delay: Duration, text: &str) -> Self {
        self.pages.insert(url.to_string(), (delay, text.to_string()));
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let Some((delay, text)) = self.pages.get(url).cloned() else {
            return FetchOutcome::Failed("HTTP status client error (404 Not Found)".to_string());
        };
        let fetch = async move {
            tokio::time::sleep(delay).await;
            text
        };
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(text) => FetchOutcome::Fetched(text),
            Err(_) => FetchOutcome::Failed("operation timed out".to_string()),
        }
    }
}

/// Replies with a fixed text and records every conversation it was sent.
pub struct FakeLlm {
    reply: Option<String>,
    pub conversations: Mutex<Vec<Vec<Message>>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            conversations: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            conversations: Mutex::new(Vec::new()),
        })
    }

    pub fn last_prompt(&self) -> String {
        let conversations = self.conversations.lock().unwrap();
        conversations.last().unwrap()[1].text.clone()
    }
}

#[async_trait]
impl CompletionClient for FakeLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.conversations.lock().unwrap().push(messages.to_vec());
        self.reply.clone().ok_or(LlmError::EmptyResponse)
    }
}

pub fn pipeline(searcher: FakeSearcher, fetcher: FakeFetcher, llm: Arc<FakeLlm>) -> Pipeline {
    pipeline_with(searcher, fetcher, llm, ResponseValidator::default())
}

pub fn pipeline_with(
    searcher: FakeSearcher,
    fetcher: FakeFetcher,
    llm: Arc<FakeLlm>,
    validator: ResponseValidator,
) -> Pipeline {
    pipeline_within(searcher, fetcher, llm, validator, Duration::from_secs(5))
}

pub fn pipeline_within(
    searcher: FakeSearcher,
    fetcher: FakeFetcher,
    llm: Arc<FakeLlm>,
    validator: ResponseValidator,
    request_timeout: Duration,
) -> Pipeline {
    Pipeline::new(
        Arc::new(searcher),
        Arc::new(fetcher),
        ContextAssembler::new(FailedSourcePolicy::Placeholder),
        AnswerEngine::with_default_prompt(llm),
        validator,
        request_timeout,
    )
}
