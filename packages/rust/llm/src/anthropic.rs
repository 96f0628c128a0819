//! Anthropic Messages API client.
//!
//! Tool-choice mode maps to `tool_choice: {"type": "auto"}`; structured output
//! maps to `tool_choice: {"type": "tool", "name": ...}` with a single tool whose
//! `input_schema` is the record schema. `tool_use` blocks in the response come
//! back as [`ToolCall`]s.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use prospector_shared::{ModelConfig, ProspectorError, Result, resolve_api_key};

use crate::{LanguageModel, ModelReply, ModelRequest, ToolCall, ToolChoice};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude via the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicModel {
    config: ModelConfig,
    api_key: String,
    client: Client,
}

impl AnthropicModel {
    /// Create a client with an explicit API key.
    pub fn new(config: ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProspectorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a client, reading the API key from the env var named in config.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_key_env)?;
        Self::new(config.clone(), api_key)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, request: ModelRequest) -> AnthropicRequest {
        let tool_choice = if request.tools.is_empty() {
            None
        } else {
            Some(match request.tool_choice {
                ToolChoice::Auto => AnthropicToolChoice::Auto,
                ToolChoice::Tool(name) => AnthropicToolChoice::Tool { name },
            })
        };

        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![AnthropicMessage {
                role: "user".into(),
                content: request.prompt,
            }],
            tools: request
                .tools
                .into_iter()
                .map(|t| AnthropicTool {
                    name: t.name,
                    description: t.description,
                    input_schema: t.input_schema,
                })
                .collect(),
            tool_choice,
        }
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    #[instrument(skip_all, fields(model = %self.config.model, tools = request.tools.len()))]
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply> {
        debug!(prompt_len = request.prompt.len(), choice = ?request.tool_choice, "invoking model");

        let body = self.build_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to send request to Anthropic API");
                ProspectorError::Model(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, error = %error_text, "Anthropic API returned error status");
            return Err(ProspectorError::Model(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to parse Anthropic API response");
            ProspectorError::Model(format!("failed to parse response: {e}"))
        })?;

        if let Some(usage) = &parsed.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
                "model replied"
            );
        }

        Ok(parsed.into_reply())
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicToolChoice {
    Auto,
    Tool { name: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

impl AnthropicResponse {
    fn into_reply(self) -> ModelReply {
        let mut reply = ModelReply::default();
        for block in self.content {
            match block {
                ContentBlock::Text { text } => {
                    if !reply.text.is_empty() {
                        reply.text.push('\n');
                    }
                    reply.text.push_str(&text);
                }
                ContentBlock::ToolUse { name, input } => {
                    reply.tool_calls.push(ToolCall { name, input });
                }
                ContentBlock::Other => {}
            }
        }
        reply
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
