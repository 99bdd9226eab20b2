use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::analyzer::TextCleaner;
use crate::answer::{AnswerEngine, DEFAULT_SYSTEM_PROMPT};
use crate::config::Config;
use crate::context::ContextAssembler;
use crate::data_models::{PredictionResponse, RequestId};
use crate::error::PipelineError;
use crate::fetcher::{HttpPageFetcher, PageFetcher, fetch_all};
use crate::llm::YandexGptClient;
use crate::search::{WebSearcher, YandexSearchClient};
use crate::validator::{ResponseValidator, ValidatorSettings};

/// search -> fetch -> assemble -> answer -> validate, for one query at a time.
/// Holds only read-only handles, so one instance serves all requests.
pub struct Pipeline {
    searcher: Arc<dyn WebSearcher>,
    fetcher: Arc<dyn PageFetcher>,
    assembler: ContextAssembler,
    engine: AnswerEngine,
    validator: ResponseValidator,
    request_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        searcher: Arc<dyn WebSearcher>,
        fetcher: Arc<dyn PageFetcher>,
        assembler: ContextAssembler,
        engine: AnswerEngine,
        validator: ResponseValidator,
        request_timeout: Duration,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            assembler,
            engine,
            validator,
            request_timeout,
        }
    }

    /// Wires the Yandex search and completion clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .context("Failed to build HTTP client")?;

        let system_prompt = match &config.system_prompt_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read system prompt from {}", path.display()))?,
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        let searcher = YandexSearchClient::new(
            client.clone(),
            config.search_endpoint.clone(),
            config.folder_id.clone(),
            config.search_api_key.clone(),
            config.search_results,
            config.search_timeout,
        );
        let fetcher = HttpPageFetcher::new(
            client.clone(),
            Arc::new(TextCleaner::for_html(config.stop_words_language)),
            config.fetch_timeout,
            config.fetch_max_chars,
        );
        let llm = YandexGptClient::new(
            client,
            config.llm_endpoint.clone(),
            config.folder_id.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
            config.llm_max_tokens,
            config.llm_timeout,
        );
        let validator = ResponseValidator::new(ValidatorSettings {
            attribution: config.attribution.clone(),
            strict_option_bounds: config.strict_option_bounds,
        });

        Ok(Self::new(
            Arc::new(searcher),
            Arc::new(fetcher),
            ContextAssembler::new(config.failed_source_policy),
            AnswerEngine::new(Arc::new(llm), system_prompt),
            validator,
            config.request_timeout,
        ))
    }

    pub async fn run(
        &self,
        id: RequestId,
        query: &str,
    ) -> Result<PredictionResponse, PipelineError> {
        tokio::time::timeout(self.request_timeout, self.search_and_answer(id, query))
            .await
            .map_err(|_| PipelineError::Timeout(self.request_timeout))?
    }

    async fn search_and_answer(
        &self,
        id: RequestId,
        query: &str,
    ) -> Result<PredictionResponse, PipelineError> {
        let urls = self.searcher.search(query).await?;

        let sources = fetch_all(self.fetcher.as_ref(), &urls).await;
        let failed = sources.iter().filter(|s| !s.outcome.is_fetched()).count();
        if failed > 0 {
            tracing::warn!(failed, total = sources.len(), "some sources could not be fetched");
        }

        let prompt = self.assembler.assemble(query, &sources);
        let raw = self.engine.answer(&prompt).await;

        let response = self.validator.parse_for_query(&raw, id, query)?;
        Ok(response)
    }
}
