//! Language-model client abstraction.
//!
//! The workflow needs two invocation modes:
//! - **tool-choice**: the model may answer with zero or more named tool calls
//!   ([`ToolChoice::Auto`]);
//! - **structured output**: the model must answer with exactly one call to a
//!   given schema ([`ToolChoice::Tool`], decoded by [`structured_output`]).
//!
//! Both are expressed through the single [`LanguageModel::invoke`] primitive so
//! that tests can stub one method.

pub mod anthropic;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use prospector_shared::{ProspectorError, Result};

pub use anthropic::AnthropicModel;

// ---------------------------------------------------------------------------
// Request / reply types
// ---------------------------------------------------------------------------

/// A named structured action the model can take.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool input.
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// How the model may use the offered tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides: text, one call, or several calls.
    Auto,
    /// Model must call the named tool.
    Tool(String),
}

/// A single-turn model invocation.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
}

impl ModelRequest {
    /// Tool-choice mode: offer `tools`, let the model pick any number.
    pub fn with_tools(prompt: impl Into<String>, tools: Vec<ToolSpec>) -> Self {
        Self {
            prompt: prompt.into(),
            tools,
            tool_choice: ToolChoice::Auto,
        }
    }

    /// Structured-output mode: force a single call to `schema`.
    pub fn structured(prompt: impl Into<String>, schema: ToolSpec) -> Self {
        let name = schema.name.clone();
        Self {
            prompt: prompt.into(),
            tools: vec![schema],
            tool_choice: ToolChoice::Tool(name),
        }
    }
}

/// One structured call emitted by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub input: Value,
}

/// What the model answered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Concatenated free-text blocks.
    pub text: String,
    /// Tool calls in the order the model emitted them.
    pub tool_calls: Vec<ToolCall>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A remotely hosted language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one request and return the model's reply.
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply>;

    /// Model identifier, for logs.
    fn model_id(&self) -> &str;
}

/// Invoke `model` in structured-output mode and decode the forced call into `T`.
///
/// A reply without a call to `schema`, or whose input does not decode, is a
/// [`ProspectorError::Schema`] error.
pub async fn structured_output<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    prompt: impl Into<String>,
    schema: ToolSpec,
) -> Result<T> {
    let name = schema.name.clone();
    let reply = model.invoke(ModelRequest::structured(prompt, schema)).await?;

    let call = reply
        .tool_calls
        .into_iter()
        .find(|c| c.name == name)
        .ok_or_else(|| ProspectorError::schema(format!("model returned no `{name}` call")))?;

    debug!(tool = %name, model = model.model_id(), "decoding structured output");

    serde_json::from_value(call.input)
        .map_err(|e| ProspectorError::schema(format!("`{name}` call does not match schema: {e}")))
}
