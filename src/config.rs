use dotenv::dotenv;
use std::env;
use std::time::Duration;

use crate::api_connection::endpoints::OPENROUTER_MODELS;

pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
pub const MODEL_ENV_VAR: &str = "ASSISTANT_MODEL";
pub const TEMPERATURE_ENV_VAR: &str = "ASSISTANT_TEMPERATURE";
pub const MAX_TOKENS_ENV_VAR: &str = "ASSISTANT_MAX_TOKENS";
pub const TIMEOUT_ENV_VAR: &str = "ASSISTANT_TIMEOUT_SECS";
pub const PROVIDER_ENV_VAR: &str = "ASSISTANT_PROVIDER";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for the remote assistant model.
///
/// The API key is deliberately not stored: `api_key_env_var` names the
/// variable that is read when a request is made.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub api_key_env_var: String,
    pub model: String,
    pub site_url: String,
    pub app_name: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Whole-request timeout, including the streamed body.
    pub timeout: Duration,
    /// Restrict OpenRouter routing to these upstream providers.
    pub provider_only: Vec<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key_env_var: API_KEY_ENV_VAR.to_string(),
            model: OPENROUTER_MODELS[0].model_name.to_string(),
            site_url: "http://localhost:3000".to_string(),
            app_name: "GroceryAssistant".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(2048),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            provider_only: Vec::new(),
        }
    }
}

impl AssistantConfig {
    /// Reads overrides from the process environment (after loading `.env`).
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Unparseable values
    /// are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(model) = lookup(MODEL_ENV_VAR).filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(site_url) = lookup("SITE_URL") {
            config.site_url = site_url;
        }
        if let Some(app_name) = lookup("APP_NAME") {
            config.app_name = app_name;
        }
        if let Some(temperature) = parse_var(&lookup, TEMPERATURE_ENV_VAR) {
            config.temperature = Some(temperature);
        }
        if let Some(max_tokens) = parse_var(&lookup, MAX_TOKENS_ENV_VAR) {
            config.max_tokens = Some(max_tokens);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, TIMEOUT_ENV_VAR) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(providers) = lookup(PROVIDER_ENV_VAR) {
            config.provider_only = providers
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}
