use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::SearchConfig, error::ProviderError};

const PROVIDER: &str = "tavily";
const MAX_QUERY_CHARS: usize = 350;
const MAX_RESULTS: u8 = 5;
const MAX_TITLE_CHARS: usize = 120;
const MAX_SNIPPET_CHARS: usize = 300;
pub const CONTEXT_HEADER: &str = "[DYNAMO WEB CONTEXT]";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, deep: bool) -> Result<Vec<SearchHit>, ProviderError>;
}

#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(http: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: u8,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str, deep: bool) -> Result<Vec<SearchHit>, ProviderError> {
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: if deep { "advanced" } else { "basic" },
            max_results: MAX_RESULTS,
        };

        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let response = ProviderError::check(PROVIDER, response).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        Ok(parsed.results)
    }
}

/// Web context for the prompt. Search is auxiliary: any failure is logged
/// and yields no context.
pub async fn web_context(search: &dyn WebSearch, query: &str, deep: bool) -> Option<String> {
    let query: String = query.trim().chars().take(MAX_QUERY_CHARS).collect();
    if query.is_empty() {
        return None;
    }

    match search.search(&query, deep).await {
        Ok(hits) => {
            debug!(hits = hits.len(), deep, "web search complete");
            format_context(&hits)
        }
        Err(err) => {
            warn!(%err, "web search failed, continuing without context");
            None
        }
    }
}

pub fn format_context(hits: &[SearchHit]) -> Option<String> {
    let lines: Vec<String> = hits
        .iter()
        .filter(|hit| !hit.content.is_empty())
        .map(|hit| {
            let title: String = hit.title.chars().take(MAX_TITLE_CHARS).collect();
            let snippet: String = hit.content.chars().take(MAX_SNIPPET_CHARS).collect();
            format!("- {title}: {snippet} (Source: {})", hit.url)
        })
        .collect();

    if lines.is_empty() {
        return None;
    }

    let mut out = String::from(CONTEXT_HEADER);
    for line in lines {
        out.push('\n');
        out.push_str(&line);
    }
    Some(out)
}
