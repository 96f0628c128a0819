//! Web search used to recover a company's real website.
//!
//! When a signup's domain does not resolve to a usable page, the workflow
//! searches for the company name and lets the model pick a replacement URL
//! from the results. [`TavilySearcher`] talks to the Tavily search API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use prospector_shared::{ProspectorError, Result, SearchConfig, SearchResult, resolve_api_key};

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("Prospector/", env!("CARGO_PKG_VERSION"));

/// Returns ranked results for a free-text query.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run `query`. Provider failures are returned, never hidden.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

// ---------------------------------------------------------------------------
// Tavily wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for SearchResult {
    fn from(r: TavilyResult) -> Self {
        Self {
            title: r.title,
            snippet: r.content,
            url: r.url,
        }
    }
}

// ---------------------------------------------------------------------------
// TavilySearcher
// ---------------------------------------------------------------------------

/// [`WebSearcher`] backed by the Tavily search API.
pub struct TavilySearcher {
    config: SearchConfig,
    api_key: String,
    client: Client,
}

impl TavilySearcher {
    /// Create a searcher with an explicit API key.
    pub fn new(config: SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProspectorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a searcher, reading the API key from the env var named in config.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_key_env)?;
        Self::new(config.clone(), api_key)
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl WebSearcher for TavilySearcher {
    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.config.max_results,
            search_depth: &self.config.search_depth,
            include_answer: false,
        };

        debug!(endpoint = %self.endpoint(), max_results = request.max_results, "searching");

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProspectorError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(ProspectorError::Search(format!("HTTP {status}: {excerpt}")));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ProspectorError::Search(format!("invalid response body: {e}")))?;

        let results: Vec<SearchResult> = parsed.results.into_iter().map(Into::into).collect();
        info!(results = results.len(), "search complete");

        Ok(results)
    }
}
