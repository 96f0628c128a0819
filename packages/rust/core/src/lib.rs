//! Workflow orchestration and domain logic for Prospector.
//!
//! This crate ties the page fetcher, web search and language model together
//! into the classification workflow (`Workflow::run`).

pub mod extractor;
pub mod prompts;
pub mod recovery;
pub mod transitions;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use extractor::InfoExtractor;
pub use recovery::UrlRecoveryDecider;
pub use transitions::{Event, Phase, Transitions};
pub use workflow::{RunOutcome, RunReport, Workflow};
