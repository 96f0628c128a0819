//! Classify a company from its website text.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use prospector_llm::{LanguageModel, ToolSpec, structured_output};
use prospector_shared::{
    CompanyClassification, InterestScore, ProspectCategory, ProspectingConfig, Result,
};

use crate::prompts;

const INFO_TOOL: &str = "Info";

/// JSON schema of [`CompanyClassification`] as the model sees it.
fn info_schema() -> Value {
    let labels: Vec<&str> = ProspectCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "language": {
                "type": "string",
                "description": "ISO 639-2 three-letter code of the website language"
            },
            "prospect": {
                "type": "string",
                "enum": labels
            },
            "horizontal": {"type": "boolean"},
            "interest_reasoning": {"type": "string"},
            "interest_score": {
                "type": "integer",
                "minimum": InterestScore::MIN,
                "maximum": InterestScore::MAX
            }
        },
        "required": ["language", "prospect", "horizontal", "interest_reasoning", "interest_score"]
    })
}

fn info_tool() -> ToolSpec {
    ToolSpec::new(
        INFO_TOOL,
        "Record the information gathered about the company.",
        info_schema(),
    )
}

/// Produces a [`CompanyClassification`] in structured-output mode.
pub struct InfoExtractor {
    model: Arc<dyn LanguageModel>,
    prospecting: ProspectingConfig,
}

impl InfoExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, prospecting: ProspectingConfig) -> Self {
        Self { model, prospecting }
    }

    /// One forced-schema call. Anything that does not decode into a
    /// classification is a schema error; no repair is attempted.
    #[instrument(skip_all, fields(company = %company_name, chars = page_text.len()))]
    pub async fn extract(
        &self,
        company_name: &str,
        page_text: &str,
        hint: &str,
    ) -> Result<CompanyClassification> {
        let prompt = prompts::classification_prompt(&self.prospecting, company_name, page_text, hint);

        let classification: CompanyClassification =
            structured_output(self.model.as_ref(), prompt, info_tool()).await?;

        if !classification.has_iso639_language() {
            warn!(
                language = %classification.language,
                "model returned a language that is not a three-letter code"
            );
        }

        info!(
            prospect = %classification.prospect_category,
            score = classification.interest_score.get(),
            horizontal = classification.is_horizontal,
            "company classified"
        );

        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, info_reply};
    use prospector_llm::{ModelReply, ToolCall, ToolChoice};
    use prospector_shared::ProspectorError;

    #[test]
    fn schema_enumerates_categories() {
        let schema = info_schema();
        let labels = schema["properties"]["prospect"]["enum"].as_array().unwrap();
        assert_eq!(labels.len(), 11);
        assert!(labels.contains(&json!("AI Native Pre-Company")));
        assert_eq!(schema["properties"]["interest_score"]["maximum"], 10);
    }

    #[tokio::test]
    async fn extract_forces_info_tool() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(info_reply(
            "AI Native Early Legit Startup",
            8,
        ))]));
        let extractor = InfoExtractor::new(model.clone(), ProspectingConfig::default());

        let classification = extractor
            .extract("Acme Inc", "# Acme\n\nAgents for freight", "tracing our agents")
            .await
            .unwrap();

        assert_eq!(
            classification.prospect_category,
            ProspectCategory::AiNativeEarlyLegitStartup
        );
        assert_eq!(classification.interest_score.get(), 8);

        let requests = model.requests();
        assert_eq!(requests[0].tool_choice, ToolChoice::Tool("Info".into()));
        assert!(requests[0].prompt.contains("Agents for freight"));
        assert!(requests[0].prompt.contains("tracing our agents"));
    }

    #[tokio::test]
    async fn out_of_range_score_is_schema_error() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(info_reply("Other", 11))]));
        let extractor = InfoExtractor::new(model, ProspectingConfig::default());

        let err = extractor.extract("Acme Inc", "text", "").await.unwrap_err();
        assert!(matches!(err, ProspectorError::Schema { .. }));
    }

    #[tokio::test]
    async fn unknown_category_is_schema_error() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(info_reply("Mid Market", 5))]));
        let extractor = InfoExtractor::new(model, ProspectingConfig::default());

        let err = extractor.extract("Acme Inc", "text", "").await.unwrap_err();
        assert!(matches!(err, ProspectorError::Schema { .. }));
    }

    #[tokio::test]
    async fn free_form_language_is_accepted() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(ModelReply {
            text: String::new(),
            tool_calls: vec![ToolCall {
                name: "Info".into(),
                input: json!({
                    "language": "English",
                    "prospect": "Personal",
                    "horizontal": false,
                    "interest_reasoning": "portfolio site",
                    "interest_score": 1
                }),
            }],
        })]));
        let extractor = InfoExtractor::new(model, ProspectingConfig::default());

        let classification = extractor.extract("Jane Doe", "text", "").await.unwrap();
        assert_eq!(classification.language, "English");
        assert!(!classification.has_iso639_language());
    }
}
