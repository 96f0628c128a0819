//! Core domain types for the prospecting workflow.

use serde::{Deserialize, Serialize};

use crate::error::{ProspectorError, Result};

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// A waitlist signup to classify. Immutable once created.
///
/// Accepts the field names used by common waitlist exports (`url`, `info`,
/// camelCase variants) in addition to its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Bare domain as entered at signup (e.g. `acme.com`).
    #[serde(alias = "url")]
    pub domain: String,
    /// Company name as entered at signup.
    #[serde(alias = "companyName")]
    pub company_name: String,
    /// Optional free text about intended use.
    #[serde(default, alias = "info", alias = "freeTextHint")]
    pub hint: String,
}

impl CompanyRecord {
    pub fn new(
        domain: impl Into<String>,
        company_name: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            company_name: company_name.into(),
            hint: hint.into(),
        }
    }

    /// Reject records the workflow cannot do anything useful with.
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(ProspectorError::validation("record has an empty domain"));
        }
        if self.company_name.trim().is_empty() {
            return Err(ProspectorError::validation(format!(
                "record for {} has an empty company name",
                self.domain
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PageContent / SearchResult / RecoveryDecision
// ---------------------------------------------------------------------------

/// Text of a fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// URL the text was retrieved from (after scheme prefixing).
    pub source_url: String,
    /// Plain-text/Markdown rendering of the page.
    pub text: String,
}

impl PageContent {
    pub fn new(source_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            text: text.into(),
        }
    }

    /// A page with only whitespace counts as no content.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One ranked hit from the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Outcome of asking the model for a replacement URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "url", rename_all = "snake_case")]
pub enum RecoveryDecision {
    /// Try this bare domain/URL instead.
    NewUrl(String),
    /// Nothing usable was found.
    GiveUp,
}

// ---------------------------------------------------------------------------
// ProspectCategory
// ---------------------------------------------------------------------------

/// Maturity/funding profile of a company. Serialized with the exact labels
/// the model is asked to choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProspectCategory {
    #[serde(rename = "Public Company")]
    PublicCompany,
    #[serde(rename = "Large Private Company")]
    LargePrivateCompany,
    #[serde(rename = "AI Native Early Legit Startup")]
    AiNativeEarlyLegitStartup,
    #[serde(rename = "Early Legit Startup")]
    EarlyLegitStartup,
    #[serde(rename = "AI Native Early Startup")]
    AiNativeEarlyStartup,
    #[serde(rename = "Early Startup")]
    EarlyStartup,
    #[serde(rename = "AI Native Pre-Company")]
    AiNativePreCompany,
    #[serde(rename = "Other")]
    Other,
    #[serde(rename = "Personal")]
    Personal,
    #[serde(rename = "Consultancy")]
    Consultancy,
    #[serde(rename = "Education")]
    Education,
}

impl ProspectCategory {
    /// Every category, in prompt order.
    pub const ALL: [ProspectCategory; 11] = [
        Self::PublicCompany,
        Self::LargePrivateCompany,
        Self::AiNativeEarlyLegitStartup,
        Self::EarlyLegitStartup,
        Self::EarlyStartup,
        Self::AiNativeEarlyStartup,
        Self::AiNativePreCompany,
        Self::Other,
        Self::Personal,
        Self::Consultancy,
        Self::Education,
    ];

    /// The label used on the wire and in prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicCompany => "Public Company",
            Self::LargePrivateCompany => "Large Private Company",
            Self::AiNativeEarlyLegitStartup => "AI Native Early Legit Startup",
            Self::EarlyLegitStartup => "Early Legit Startup",
            Self::AiNativeEarlyStartup => "AI Native Early Startup",
            Self::EarlyStartup => "Early Startup",
            Self::AiNativePreCompany => "AI Native Pre-Company",
            Self::Other => "Other",
            Self::Personal => "Personal",
            Self::Consultancy => "Consultancy",
            Self::Education => "Education",
        }
    }
}

impl std::fmt::Display for ProspectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InterestScore
// ---------------------------------------------------------------------------

/// A 1–10 interest score. Out-of-range values cannot be constructed or
/// deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct InterestScore(u8);

impl InterestScore {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for InterestScore {
    type Error = ProspectorError;

    fn try_from(value: i64) -> Result<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ProspectorError::schema(format!(
                "interest score {value} is outside {}..={}",
                Self::MIN,
                Self::MAX
            )))
        }
    }
}

impl From<InterestScore> for u8 {
    fn from(score: InterestScore) -> Self {
        score.0
    }
}

// ---------------------------------------------------------------------------
// CompanyClassification
// ---------------------------------------------------------------------------

/// The terminal output of a successful workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyClassification {
    /// ISO 639-2 three-letter code of the website's language.
    pub language: String,
    #[serde(rename = "prospect")]
    pub prospect_category: ProspectCategory,
    #[serde(rename = "horizontal")]
    pub is_horizontal: bool,
    pub interest_reasoning: String,
    pub interest_score: InterestScore,
}

impl CompanyClassification {
    /// Whether `language` looks like a three-letter ISO 639 code. The model is
    /// asked for one but nothing enforces it.
    pub fn has_iso639_language(&self) -> bool {
        self.language.len() == 3 && self.language.chars().all(|c| c.is_ascii_lowercase())
    }
}
