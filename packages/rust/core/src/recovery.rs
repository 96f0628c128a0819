//! Ask the model for a replacement URL when the original domain is dead.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use prospector_fetcher::bare_domain;
use prospector_llm::{LanguageModel, ModelRequest, ToolCall, ToolSpec};
use prospector_shared::{ProspectorError, RecoveryDecision, Result, SearchResult};

use crate::prompts;

const NEW_URL_TOOL: &str = "NewUrl";
const NOTHING_TOOL: &str = "Nothing";

#[derive(Debug, Deserialize)]
struct NewUrlArgs {
    url: String,
}

fn new_url_tool() -> ToolSpec {
    ToolSpec::new(
        NEW_URL_TOOL,
        "Try a new URL for the company. Give the bare domain without a scheme.",
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Bare domain, e.g. foo.com"}
            },
            "required": ["url"]
        }),
    )
}

fn nothing_tool() -> ToolSpec {
    ToolSpec::new(
        NOTHING_TOOL,
        "Nothing relevant was found; give up on this company.",
        json!({
            "type": "object",
            "properties": {
                "nothing": {"type": "boolean"}
            },
            "required": ["nothing"]
        }),
    )
}

/// Picks a replacement URL from search results, or gives up.
pub struct UrlRecoveryDecider {
    model: Arc<dyn LanguageModel>,
}

impl UrlRecoveryDecider {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// One tool-choice call. Only a reply with exactly one `NewUrl` call and a
    /// non-empty url yields [`RecoveryDecision::NewUrl`].
    #[instrument(skip_all, fields(domain = %domain, company = %company_name, results = results.len()))]
    pub async fn decide(
        &self,
        domain: &str,
        company_name: &str,
        results: &[SearchResult],
    ) -> Result<RecoveryDecision> {
        let prompt = prompts::recovery_prompt(domain, company_name, results);
        let request = ModelRequest::with_tools(prompt, vec![new_url_tool(), nothing_tool()]);

        let reply = self.model.invoke(request).await?;
        debug!(
            model = self.model.model_id(),
            calls = reply.tool_calls.len(),
            "recovery reply"
        );

        let decision = interpret(&reply.tool_calls)?;
        match &decision {
            RecoveryDecision::NewUrl(url) => info!(%url, "model proposed a new url"),
            RecoveryDecision::GiveUp => info!("model found nothing usable"),
        }
        Ok(decision)
    }
}

/// Map the model's tool calls onto a decision.
fn interpret(calls: &[ToolCall]) -> Result<RecoveryDecision> {
    let [call] = calls else {
        return Ok(RecoveryDecision::GiveUp);
    };
    if call.name != NEW_URL_TOOL {
        return Ok(RecoveryDecision::GiveUp);
    }

    let args: NewUrlArgs = serde_json::from_value(call.input.clone()).map_err(|e| {
        ProspectorError::schema(format!("`{NEW_URL_TOOL}` arguments do not decode: {e}"))
    })?;

    let url = bare_domain(&args.url);
    if url.is_empty() {
        return Ok(RecoveryDecision::GiveUp);
    }
    Ok(RecoveryDecision::NewUrl(url))
}
