//! HTML → plain text for prompting.
//!
//! The page body is converted to Markdown with `htmd` (keeping headings,
//! lists and links readable for the model), then whitespace is normalized.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use prospector_shared::{ProspectorError, Result};

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Convert an HTML document to prompt-ready text.
///
/// The document `<title>` is prepended as a heading when the body has text.
/// A body with no visible text yields an empty string.
pub fn html_to_text(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE_SEL)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let body_html = doc
        .select(&BODY_SEL)
        .next()
        .map(|body| body.inner_html())
        .unwrap_or_else(|| html.to_string());

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["head", "script", "style", "noscript", "svg", "iframe"])
        .build();

    let markdown = converter
        .convert(&body_html)
        .map_err(|e| ProspectorError::Fetch(format!("htmd conversion failed: {e}")))?;

    let body = normalize_whitespace(&markdown);
    if body.is_empty() {
        return Ok(String::new());
    }

    Ok(match title {
        Some(title) => format!("# {title}\n\n{body}"),
        None => body,
    })
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            format!("{}\n\n[... page truncated ...]", &text[..byte_idx])
        }
    }
}

/// Strip trailing spaces and collapse runs of blank lines.
fn normalize_whitespace(md: &str) -> String {
    static TRAILING_WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed = TRAILING_WS_RE.replace_all(md, "");
    MULTI_BLANK_RE
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_string()
}
