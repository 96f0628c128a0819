//! Mock collaborators that record how they were called.
//!
//! Built for this crate's tests and, behind the `testing` feature, for
//! downstream crates that drive a [`crate::Workflow`] without the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use prospector_fetcher::PageFetcher;
use prospector_llm::{LanguageModel, ModelReply, ModelRequest, ToolCall};
use prospector_search::WebSearcher;
use prospector_shared::{PageContent, ProspectorError, Result, SearchResult};

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// What [`MockFetcher`] answers for a domain.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Page(String),
    Empty,
    Fail,
}

/// Answers per domain; unknown domains are empty.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, FetchOutcome>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: &str, outcome: FetchOutcome) -> Self {
        self.pages.insert(domain.to_string(), outcome);
        self
    }

    /// Domains fetched, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, domain: &str) -> Result<Option<PageContent>> {
        self.calls.lock().unwrap().push(domain.to_string());
        match self.pages.get(domain) {
            Some(FetchOutcome::Page(text)) => {
                Ok(Some(PageContent::new(format!("https://{domain}/"), text.clone())))
            }
            Some(FetchOutcome::Fail) => {
                Err(ProspectorError::Fetch(format!("https://{domain}/: connection refused")))
            }
            Some(FetchOutcome::Empty) | None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Searcher
// ---------------------------------------------------------------------------

/// Returns the same results for every query, or always fails.
pub struct MockSearcher {
    results: Option<Vec<SearchResult>>,
    queries: Mutex<Vec<String>>,
}

impl MockSearcher {
    pub fn returning(results: Vec<SearchResult>) -> Self {
        Self {
            results: Some(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            results: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.results {
            Some(results) => Ok(results.clone()),
            None => Err(ProspectorError::Search("HTTP 500 Internal Server Error".into())),
        }
    }
}

pub fn search_result(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.into(),
        snippet: snippet.into(),
        url: url.into(),
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Plays back replies in order and records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<ModelReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProspectorError::Model("no scripted reply left".into())))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// A reply carrying one `Info` call.
pub fn info_reply(prospect: &str, score: i64) -> ModelReply {
    ModelReply {
        text: String::new(),
        tool_calls: vec![ToolCall {
            name: "Info".into(),
            input: json!({
                "language": "eng",
                "prospect": prospect,
                "horizontal": false,
                "interest_reasoning": "vertical agent startup",
                "interest_score": score
            }),
        }],
    }
}

/// A reply carrying one `NewUrl` call.
pub fn new_url_reply(url: &str) -> ModelReply {
    ModelReply {
        text: String::new(),
        tool_calls: vec![ToolCall {
            name: "NewUrl".into(),
            input: json!({ "url": url }),
        }],
    }
}

/// A reply carrying one `Nothing` call.
pub fn nothing_reply() -> ModelReply {
    ModelReply {
        text: String::new(),
        tool_calls: vec![ToolCall {
            name: "Nothing".into(),
            input: json!({ "nothing": true }),
        }],
    }
}
