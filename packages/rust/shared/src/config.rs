//! Application configuration for Prospector.
//!
//! User config lives at `~/.prospector/prospector.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProspectorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "prospector.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".prospector";

// ---------------------------------------------------------------------------
// Config structs (matching prospector.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Website fetching.
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Language-model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Who we are prospecting for; fills the classification prompt.
    #[serde(default)]
    pub prospecting: ProspectingConfig,

    /// Failure handling across workflow steps.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// `[fetcher]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Scheme prefixed to bare domains.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Per-request timeout.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Maximum redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Page text beyond this many characters is cut off before prompting.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_scheme() -> String {
    "https".into()
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}
fn default_max_chars() -> usize {
    40_000
}

/// `[search]` section (Tavily).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API base URL.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Number of results to request.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Tavily search depth: "basic" or "advanced".
    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    /// Per-request timeout.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key_env: default_search_api_key_env(),
            max_results: default_max_results(),
            search_depth: default_search_depth(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".into()
}
fn default_search_api_key_env() -> String {
    "TAVILY_API_KEY".into()
}
fn default_max_results() -> u32 {
    5
}
fn default_search_depth() -> String {
    "advanced".into()
}
fn default_search_timeout() -> u64 {
    30
}

/// `[model]` section (Anthropic Messages API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API base URL.
    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_model_api_key_env")]
    pub api_key_env: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion token limit per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Per-request timeout.
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_base_url(),
            api_key_env: default_model_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_model_timeout(),
        }
    }
}

fn default_model_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-3-5-sonnet-20240620".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_model_timeout() -> u64 {
    120
}

/// `[prospecting]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectingConfig {
    /// Company whose waitlist is being triaged.
    #[serde(default = "default_vendor_name")]
    pub vendor_name: String,

    /// One-phrase description of the vendor, used in the prompt.
    #[serde(default = "default_vendor_description")]
    pub vendor_description: String,

    /// Companies near this city score higher.
    #[serde(default = "default_home_city")]
    pub home_city: String,
}

impl Default for ProspectingConfig {
    fn default() -> Self {
        Self {
            vendor_name: default_vendor_name(),
            vendor_description: default_vendor_description(),
            home_city: default_home_city(),
        }
    }
}

fn default_vendor_name() -> String {
    "LangChain".into()
}
fn default_vendor_description() -> String {
    "an LLMOps company".into()
}
fn default_home_city() -> String {
    "San Francisco".into()
}

/// What to do when a workflow step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and continue as if the step returned nothing.
    Swallow,
    /// Fail the whole run.
    Propagate,
}

/// What to do when the recovered URL also yields no content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveredPagePolicy {
    /// Run the extractor against the empty page anyway.
    Extract,
    /// Stop without a classification.
    GiveUp,
}

/// `[policy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Fetch errors are absorbed by default; that is what triggers recovery.
    #[serde(default = "default_fetch_failure")]
    pub fetch_failure: FailurePolicy,

    /// Search errors fail the run by default.
    #[serde(default = "default_search_failure")]
    pub search_failure: FailurePolicy,

    /// Behavior when the recovered page is empty too.
    #[serde(default = "default_recovered_page")]
    pub recovered_page: RecoveredPagePolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            fetch_failure: default_fetch_failure(),
            search_failure: default_search_failure(),
            recovered_page: default_recovered_page(),
        }
    }
}

fn default_fetch_failure() -> FailurePolicy {
    FailurePolicy::Swallow
}
fn default_search_failure() -> FailurePolicy {
    FailurePolicy::Propagate
}
fn default_recovered_page() -> RecoveredPagePolicy {
    RecoveredPagePolicy::Extract
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.prospector/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProspectorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.prospector/prospector.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ProspectorError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ProspectorError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ProspectorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ProspectorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ProspectorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named env var, failing if it is unset or empty.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ProspectorError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("TAVILY_API_KEY"));
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
        assert!(toml_str.contains("fetch_failure = \"swallow\""));
        assert!(!toml_str.contains("temperature"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetcher.scheme, "https");
        assert_eq!(parsed.search.max_results, 5);
        assert_eq!(parsed.model.model, "claude-3-5-sonnet-20240620");
        assert_eq!(parsed.prospecting.home_city, "San Francisco");
    }

    #[test]
    fn default_policies_keep_asymmetry() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.fetch_failure, FailurePolicy::Swallow);
        assert_eq!(policy.search_failure, FailurePolicy::Propagate);
        assert_eq!(policy.recovered_page, RecoveredPagePolicy::Extract);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[model]
model = "claude-3-haiku-20240307"
temperature = 0.0

[policy]
search_failure = "swallow"
recovered_page = "give_up"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.model.model, "claude-3-haiku-20240307");
        assert_eq!(config.model.temperature, Some(0.0));
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.policy.fetch_failure, FailurePolicy::Swallow);
        assert_eq!(config.policy.search_failure, FailurePolicy::Swallow);
        assert_eq!(config.policy.recovered_page, RecoveredPagePolicy::GiveUp);
        assert_eq!(config.fetcher.max_chars, 40_000);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let toml_str = r#"
[policy]
fetch_failure = "retry"
"#;
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("prospector-does-not-exist.toml");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ProspectorError::Io { .. }));
    }

    #[test]
    fn api_key_resolution() {
        // Use a unique env var name to avoid interfering with other tests
        let result = resolve_api_key("PROSPECTOR_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
