//! Prompt templates for the two model calls.

use std::fmt::Write;

use prospector_shared::{ProspectCategory, ProspectingConfig, SearchResult};

/// Shown in place of the search results when the provider returned none.
const NO_RESULTS: &str = "(no results)";

/// Guidance shown next to each category label.
fn category_guidance(category: ProspectCategory) -> &'static str {
    match category {
        ProspectCategory::PublicCompany => "publicly traded",
        ProspectCategory::LargePrivateCompany => "private, valued above $1B",
        ProspectCategory::AiNativeEarlyLegitStartup => {
            "startup backed by top-tier investors whose product is built around AI"
        }
        ProspectCategory::EarlyLegitStartup => {
            "startup backed by top-tier investors whose product is NOT built around AI"
        }
        ProspectCategory::EarlyStartup => {
            "early startup with some investment or revenue but no top-tier investors"
        }
        ProspectCategory::AiNativeEarlyStartup => {
            "early AI startup with some investment or revenue but no top-tier investors"
        }
        ProspectCategory::AiNativePreCompany => {
            "very early AI project without meaningful investment or revenue"
        }
        ProspectCategory::Other => "does not fit any other category",
        ProspectCategory::Personal => "a personal website",
        ProspectCategory::Consultancy => "a consulting or services business",
        ProspectCategory::Education => "a school, university, or course",
    }
}

/// Prompt for the classification call.
pub fn classification_prompt(
    prospecting: &ProspectingConfig,
    company_name: &str,
    page_text: &str,
    hint: &str,
) -> String {
    let vendor = &prospecting.vendor_name;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are researching companies that signed up for the {vendor} waitlist. \
         {vendor} is {}. Fill out the information below so the team can decide \
         which signups are worth a closer look.",
        prospecting.vendor_description
    );
    out.push('\n');

    out.push_str(
        "language: the primary language of the website as an ISO 639-2 \
         three-letter code (eng, fra, deu, ...).\n\n",
    );
    out.push_str(
        "horizontal: true if this is a horizontal AI company, such as a low-code \
         platform for building generic LLM applications; false otherwise.\n\n",
    );

    out.push_str("prospect: exactly one of the following labels:\n");
    for category in ProspectCategory::ALL {
        let _ = writeln!(out, "- {}: {}", category.as_str(), category_guidance(category));
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "interest_reasoning and interest_score: how interesting this company is \
         for {vendor} to engage, with a score from 1 to 10 (10 is most \
         interesting). Companies close to {vendor} (based in {}), hot and \
         fast-moving vertical startups, and large private companies are more \
         interesting. So is any company whose logo would look good on the \
         {vendor} website. A signup that wrote more about its intended use is \
         likely more engaged. Horizontal companies and consultancies are less \
         interesting.",
        prospecting.home_city
    );
    out.push('\n');

    out.push_str(
        "At signup they could optionally describe how they hope to use the \
         product. They wrote:\n\n",
    );
    let _ = writeln!(out, "<info>\n{hint}\n</info>");
    out.push('\n');

    let _ = writeln!(
        out,
        "Based on the website below, fill out the information for {company_name}."
    );
    out.push('\n');
    out.push_str(page_text);

    out
}

/// Prompt for the URL recovery call.
pub fn recovery_prompt(domain: &str, company_name: &str, results: &[SearchResult]) -> String {
    format!(
        "You are trying to find the correct website for a company.\n\n\
         name: {company_name}\n\
         domain: {domain}\n\n\
         The domain could not be loaded, so it is probably wrong. A web search \
         for the company name returned:\n\n\
         {}\n\n\
         Based on these results, either call NewUrl with a better URL or call \
         Nothing to give up. When giving a URL, leave out the scheme (return \
         `foo.com`, not `https://foo.com`).",
        render_results(results)
    )
}

/// Numbered `title / url / snippet` listing.
pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}. {}", i + 1, r.title);
        let _ = writeln!(out, "   url: {}", r.url);
        let _ = writeln!(out, "   {}", r.snippet);
    }
    out.trim_end().to_string()
}
