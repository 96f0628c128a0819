//! The enrichment workflow: fetch, fall back to search and URL recovery,
//! then classify.
//!
//! A run is a loop over [`RunState`]. Each step performs one collaborator
//! call and reports an [`Event`]; the [`Transitions`] table picks the next
//! phase and the step's output becomes that phase's state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use prospector_fetcher::{HttpPageFetcher, PageFetcher, page_url};
use prospector_llm::{AnthropicModel, LanguageModel};
use prospector_search::{TavilySearcher, WebSearcher};
use prospector_shared::{
    AppConfig, CompanyClassification, CompanyRecord, FailurePolicy, FetcherConfig, PageContent,
    PolicyConfig,
    ProspectingConfig, ProspectorError, RecoveryDecision, Result, SearchResult,
};

use crate::extractor::InfoExtractor;
use crate::recovery::UrlRecoveryDecider;
use crate::transitions::{Event, Phase, Transitions};

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Classified {
        /// URL of the page the classification was based on.
        source_url: String,
        /// Whether that page came from URL recovery.
        recovered: bool,
        classification: CompanyClassification,
    },
    GaveUp,
}

/// Everything the caller gets back from one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub record: CompanyRecord,
    pub outcome: RunOutcome,
    /// Phases visited, starting with [`Phase::Start`].
    pub phases: Vec<Phase>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn classification(&self) -> Option<&CompanyClassification> {
        match &self.outcome {
            RunOutcome::Classified { classification, .. } => Some(classification),
            RunOutcome::GaveUp => None,
        }
    }

    pub fn into_classification(self) -> Option<CompanyClassification> {
        match self.outcome {
            RunOutcome::Classified { classification, .. } => Some(classification),
            RunOutcome::GaveUp => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Per-phase data. The record itself is fixed for the whole run and is
/// passed alongside.
#[derive(Debug)]
enum RunState {
    Start,
    FetchingOriginal,
    Searching,
    RecoveringUrl {
        results: Vec<SearchResult>,
    },
    FetchingRecovered {
        url: String,
    },
    Extracting {
        page: PageContent,
        recovered: bool,
    },
    Done {
        source_url: String,
        recovered: bool,
        classification: CompanyClassification,
    },
    GaveUp,
}

impl RunState {
    fn phase(&self) -> Phase {
        match self {
            Self::Start => Phase::Start,
            Self::FetchingOriginal => Phase::FetchingOriginal,
            Self::Searching => Phase::Searching,
            Self::RecoveringUrl { .. } => Phase::RecoveringUrl,
            Self::FetchingRecovered { .. } => Phase::FetchingRecovered,
            Self::Extracting { .. } => Phase::Extracting,
            Self::Done { .. } => Phase::Done,
            Self::GaveUp => Phase::GaveUp,
        }
    }

    /// Build the state for `next` from what the previous step produced.
    fn enter(next: Phase, from: Phase, event: Event, output: StepOutput) -> Result<Self> {
        let state = match (next, output) {
            (Phase::FetchingOriginal, StepOutput::Nothing) => Self::FetchingOriginal,
            (Phase::Searching, StepOutput::Nothing) => Self::Searching,
            (Phase::RecoveringUrl, StepOutput::Results(results)) => Self::RecoveringUrl { results },
            (Phase::FetchingRecovered, StepOutput::Url(url)) => Self::FetchingRecovered { url },
            (Phase::Extracting, StepOutput::Page(page)) => Self::Extracting {
                page,
                recovered: from == Phase::FetchingRecovered,
            },
            (
                Phase::Done,
                StepOutput::Classified {
                    source_url,
                    recovered,
                    classification,
                },
            ) => Self::Done {
                source_url,
                recovered,
                classification,
            },
            (Phase::GaveUp, _) => Self::GaveUp,
            (phase, _) => {
                return Err(ProspectorError::InvalidTransition {
                    phase: phase.to_string(),
                    event: event.to_string(),
                });
            }
        };
        Ok(state)
    }
}

/// What a step hands to the next phase.
#[derive(Debug)]
enum StepOutput {
    Nothing,
    Page(PageContent),
    Results(Vec<SearchResult>),
    Url(String),
    Classified {
        source_url: String,
        recovered: bool,
        classification: CompanyClassification,
    },
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Classifies one [`CompanyRecord`] per call. Holds no per-run state, so
/// independent runs may share one instance.
pub struct Workflow {
    fetcher: Arc<dyn PageFetcher>,
    searcher: Arc<dyn WebSearcher>,
    decider: UrlRecoveryDecider,
    extractor: InfoExtractor,
    policy: PolicyConfig,
    transitions: Transitions,
    /// Scheme the fetcher puts in front of bare domains.
    scheme: String,
}

impl Workflow {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        searcher: Arc<dyn WebSearcher>,
        model: Arc<dyn LanguageModel>,
        prospecting: ProspectingConfig,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            fetcher,
            searcher,
            decider: UrlRecoveryDecider::new(model.clone()),
            extractor: InfoExtractor::new(model, prospecting),
            transitions: Transitions::new(policy.recovered_page),
            policy,
            scheme: FetcherConfig::default().scheme,
        }
    }

    /// Scheme used when reporting the URL of a page that yielded no text.
    /// Should match the fetcher's.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Wire up the HTTP fetcher, Tavily and Anthropic from configuration.
    /// Fails if either API key env var is unset.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher = HttpPageFetcher::new(config.fetcher.clone())?;
        let searcher = TavilySearcher::from_config(&config.search)?;
        let model = AnthropicModel::from_config(&config.model)?;

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(searcher),
            Arc::new(model),
            config.prospecting.clone(),
            config.policy.clone(),
        )
        .with_scheme(config.fetcher.scheme.clone()))
    }

    /// Run the workflow and return the classification, or `None` if no
    /// usable website was found.
    pub async fn classify(&self, record: &CompanyRecord) -> Result<Option<CompanyClassification>> {
        Ok(self.run(record).await?.into_classification())
    }

    /// Run the workflow and return the full report.
    pub async fn run(&self, record: &CompanyRecord) -> Result<RunReport> {
        let run_id = Uuid::now_v7();
        let span = info_span!(
            "run",
            %run_id,
            domain = %record.domain,
            company = %record.company_name
        );
        self.drive(run_id, record).instrument(span).await
    }

    async fn drive(&self, run_id: Uuid, record: &CompanyRecord) -> Result<RunReport> {
        record.validate()?;

        let started_at = Utc::now();
        info!("starting run");

        let mut state = RunState::Start;
        let mut phases = vec![Phase::Start];

        while !state.phase().is_terminal() {
            let from = state.phase();
            let (event, output) = self.step(record, state).await?;
            let next = self.transitions.next(from, event)?;
            debug!(%from, %event, %next, "transition");

            phases.push(next);
            state = RunState::enter(next, from, event, output)?;
        }

        let outcome = match state {
            RunState::Done {
                source_url,
                recovered,
                classification,
            } => RunOutcome::Classified {
                source_url,
                recovered,
                classification,
            },
            _ => RunOutcome::GaveUp,
        };

        match &outcome {
            RunOutcome::Classified { source_url, .. } => info!(%source_url, "run complete"),
            RunOutcome::GaveUp => info!("run gave up without a classification"),
        }

        Ok(RunReport {
            run_id,
            record: record.clone(),
            outcome,
            phases,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Execute the work of `state` and report what happened.
    async fn step(&self, record: &CompanyRecord, state: RunState) -> Result<(Event, StepOutput)> {
        let result = match state {
            RunState::Start => (Event::RecordReceived, StepOutput::Nothing),

            RunState::FetchingOriginal => match self.fetch_page(&record.domain).await? {
                Some(page) => (Event::ContentFetched, StepOutput::Page(page)),
                None => {
                    info!(domain = %record.domain, "original site unusable, searching");
                    (Event::ContentEmpty, StepOutput::Nothing)
                }
            },

            RunState::Searching => {
                let results = self.search(&record.company_name).await?;
                (Event::SearchCompleted, StepOutput::Results(results))
            }

            RunState::RecoveringUrl { results } => {
                match self
                    .decider
                    .decide(&record.domain, &record.company_name, &results)
                    .await?
                {
                    RecoveryDecision::NewUrl(url) => (Event::UrlRecovered, StepOutput::Url(url)),
                    RecoveryDecision::GiveUp => (Event::RecoveryAbandoned, StepOutput::Nothing),
                }
            }

            RunState::FetchingRecovered { url } => match self.fetch_page(&url).await? {
                Some(page) => (Event::ContentFetched, StepOutput::Page(page)),
                None => {
                    warn!(%url, "recovered site is unusable too");
                    let source_url = self.source_url_of(&url);
                    (Event::ContentEmpty, StepOutput::Page(PageContent::new(source_url, "")))
                }
            },

            RunState::Extracting { page, recovered } => {
                let classification = self
                    .extractor
                    .extract(&record.company_name, &page.text, &record.hint)
                    .await?;
                (
                    Event::Classified,
                    StepOutput::Classified {
                        source_url: page.source_url,
                        recovered,
                        classification,
                    },
                )
            }

            terminal @ (RunState::Done { .. } | RunState::GaveUp) => {
                return Err(ProspectorError::InvalidTransition {
                    phase: terminal.phase().to_string(),
                    event: "step".into(),
                });
            }
        };

        Ok(result)
    }

    /// Fetch `domain`, treating whitespace-only pages as empty and applying
    /// the fetch failure policy.
    async fn fetch_page(&self, domain: &str) -> Result<Option<PageContent>> {
        match self.fetcher.fetch(domain).await {
            Ok(Some(page)) if !page.is_empty() => Ok(Some(page)),
            Ok(_) => Ok(None),
            Err(e) => match self.policy.fetch_failure {
                FailurePolicy::Swallow => {
                    warn!(%domain, error = %e, "fetch failed, treating page as empty");
                    Ok(None)
                }
                FailurePolicy::Propagate => Err(e),
            },
        }
    }

    /// The URL the fetcher requests for `domain`, for pages that produced no
    /// content of their own.
    fn source_url_of(&self, domain: &str) -> String {
        page_url(domain, &self.scheme)
            .map(String::from)
            .unwrap_or_else(|_| domain.to_string())
    }

    /// Search for `query`, applying the search failure policy.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        match self.searcher.search(query).await {
            Ok(results) => Ok(results),
            Err(e) => match self.policy.search_failure {
                FailurePolicy::Swallow => {
                    warn!(%query, error = %e, "search failed, continuing with no results");
                    Ok(Vec::new())
                }
                FailurePolicy::Propagate => Err(e),
            },
        }
    }
}
