use std::time::Duration;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Url;

use crate::error::SearchError;

/// Error code the XML search service uses for "nothing found".
const NO_RESULTS_CODE: &str = "15";

/// Finds candidate pages for a query, in relevance order.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError>;
}

/// Client for the Yandex XML search API.
pub struct YandexSearchClient {
    client: reqwest::Client,
    endpoint: Url,
    folder_id: String,
    api_key: String,
    max_results: usize,
    timeout: Duration,
}

impl YandexSearchClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: Url,
        folder_id: String,
        api_key: String,
        max_results: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint,
            folder_id,
            api_key,
            max_results,
            timeout,
        }
    }

    pub fn request_url(&self, query: &str) -> Url {
        let groupby = format!(
            "attr=\"\".mode=flat.groups-on-page={}.docs-in-group=1",
            self.max_results
        );
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("folderid", &self.folder_id)
            .append_pair("apikey", &self.api_key)
            .append_pair("query", query)
            .append_pair("groupby", &groupby);
        url
    }
}

#[async_trait]
impl WebSearcher for YandexSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        tracing::info!(query, "starting search");

        let res = self
            .client
            .get(self.request_url(query))
            .timeout(self.timeout)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(SearchError::Status(res.status().as_u16()));
        }
        let body = res.text().await?;

        let urls = extract_urls(&body, self.max_results)?;
        tracing::info!(count = urls.len(), "search returned urls");
        Ok(urls)
    }
}

/// Collects the text of the first `limit` `<url>` elements found inside
/// `<doc>` elements, in document order.
///
/// An `<error code="..">` element is turned into [`SearchError::Service`],
/// except the "no results" code which yields an empty list.
pub fn extract_urls(xml: &str, limit: usize) -> Result<Vec<String>, SearchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut urls: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut in_doc = false;
    let mut in_url = false;
    let mut cur_url = String::new();
    let mut error: Option<(String, String)> = None;
    let mut in_error = false;

    loop {
        if urls.len() >= limit {
            return Ok(urls);
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                depth += 1;
                saw_root = true;
                match e.name().as_ref() {
                    b"doc" => in_doc = true,
                    b"url" if in_doc => {
                        in_url = true;
                        cur_url.clear();
                    }
                    b"error" => {
                        in_error = true;
                        error = Some((error_code(&e), String::new()));
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                if e.name().as_ref() == b"error" {
                    error = Some((error_code(&e), String::new()));
                }
            }
            Ok(Event::Text(t)) => {
                let txt = t
                    .unescape()
                    .map_err(|e| SearchError::Parse(e.to_string()))?;
                if in_url {
                    cur_url.push_str(&txt);
                } else if in_error {
                    if let Some((_, message)) = error.as_mut() {
                        message.push_str(&txt);
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if in_url {
                    cur_url.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                match e.name().as_ref() {
                    b"url" if in_url => {
                        in_url = false;
                        let url = cur_url.trim();
                        if !url.is_empty() {
                            urls.push(url.to_string());
                        }
                    }
                    b"doc" => in_doc = false,
                    b"error" => in_error = false,
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(e) => {
                return Err(SearchError::Parse(format!(
                    "error at position {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SearchError::Parse("document has no root element".to_string()));
    }
    if depth != 0 {
        return Err(SearchError::Parse("unexpected end of document".to_string()));
    }
    if let Some((code, message)) = error {
        if urls.is_empty() && code == NO_RESULTS_CODE {
            tracing::info!(message = %message, "search service found nothing");
            return Ok(urls);
        }
        if urls.is_empty() {
            return Err(SearchError::Service { code, message });
        }
    }
    Ok(urls)
}

fn error_code(element: &BytesStart) -> String {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"code")
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
        .unwrap_or_default()
}
