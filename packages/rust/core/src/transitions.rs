//! Workflow phases and the `(phase, event) -> phase` transition table.
//!
//! The table is pure: it never touches a collaborator, so it can be checked
//! exhaustively on its own.

use std::fmt;

use serde::{Deserialize, Serialize};

use prospector_shared::{ProspectorError, RecoveredPagePolicy, Result};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    FetchingOriginal,
    Searching,
    RecoveringUrl,
    FetchingRecovered,
    Extracting,
    /// Terminal: a classification was produced.
    Done,
    /// Terminal: no usable website was found.
    GaveUp,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Self::Start,
        Self::FetchingOriginal,
        Self::Searching,
        Self::RecoveringUrl,
        Self::FetchingRecovered,
        Self::Extracting,
        Self::Done,
        Self::GaveUp,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::GaveUp)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FetchingOriginal => "fetching_original",
            Self::Searching => "searching",
            Self::RecoveringUrl => "recovering_url",
            Self::FetchingRecovered => "fetching_recovered",
            Self::Extracting => "extracting",
            Self::Done => "done",
            Self::GaveUp => "gave_up",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step reported when it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    RecordReceived,
    ContentFetched,
    ContentEmpty,
    SearchCompleted,
    UrlRecovered,
    RecoveryAbandoned,
    Classified,
}

impl Event {
    pub const ALL: [Event; 7] = [
        Self::RecordReceived,
        Self::ContentFetched,
        Self::ContentEmpty,
        Self::SearchCompleted,
        Self::UrlRecovered,
        Self::RecoveryAbandoned,
        Self::Classified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecordReceived => "record_received",
            Self::ContentFetched => "content_fetched",
            Self::ContentEmpty => "content_empty",
            Self::SearchCompleted => "search_completed",
            Self::UrlRecovered => "url_recovered",
            Self::RecoveryAbandoned => "recovery_abandoned",
            Self::Classified => "classified",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition table, parameterized by what to do when the recovered
/// page is empty as well.
#[derive(Debug, Clone, Copy)]
pub struct Transitions {
    recovered_page: RecoveredPagePolicy,
}

impl Transitions {
    pub fn new(recovered_page: RecoveredPagePolicy) -> Self {
        Self { recovered_page }
    }

    /// Next phase for `event` in `phase`. Pairs outside the table are an
    /// [`ProspectorError::InvalidTransition`].
    pub fn next(&self, phase: Phase, event: Event) -> Result<Phase> {
        use Event as E;
        use Phase as P;

        let next = match (phase, event) {
            (P::Start, E::RecordReceived) => P::FetchingOriginal,
            (P::FetchingOriginal, E::ContentFetched) => P::Extracting,
            (P::FetchingOriginal, E::ContentEmpty) => P::Searching,
            (P::Searching, E::SearchCompleted) => P::RecoveringUrl,
            (P::RecoveringUrl, E::UrlRecovered) => P::FetchingRecovered,
            (P::RecoveringUrl, E::RecoveryAbandoned) => P::GaveUp,
            (P::FetchingRecovered, E::ContentFetched) => P::Extracting,
            (P::FetchingRecovered, E::ContentEmpty) => match self.recovered_page {
                RecoveredPagePolicy::Extract => P::Extracting,
                RecoveredPagePolicy::GiveUp => P::GaveUp,
            },
            (P::Extracting, E::Classified) => P::Done,
            _ => {
                return Err(ProspectorError::InvalidTransition {
                    phase: phase.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }
}

impl Default for Transitions {
    fn default() -> Self {
        Self::new(RecoveredPagePolicy::Extract)
    }
}
