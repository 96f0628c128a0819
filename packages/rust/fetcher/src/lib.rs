//! Website fetching for the prospecting workflow.
//!
//! This crate provides:
//! - [`PageFetcher`]: the fetch seam the workflow depends on
//! - [`HttpPageFetcher`]: reqwest-backed implementation with SSRF guards
//! - [`html_to_text`]: HTML → prompt-ready text conversion

pub mod engine;
pub mod text;

use async_trait::async_trait;

use prospector_shared::{PageContent, Result};

pub use engine::{HttpPageFetcher, bare_domain, page_url};
pub use text::{html_to_text, truncate_text};

/// Retrieves the textual content of a company website.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page at `domain` (a bare domain; the scheme is added here).
    ///
    /// Returns `Ok(None)` when the page was reachable but had no text, and
    /// `Err` on transport, status, or parse failure. Whether an error is
    /// absorbed is the caller's decision.
    async fn fetch(&self, domain: &str) -> Result<Option<PageContent>>;
}
