use dotenv::dotenv;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::VecDeque;
use std::env;
use thiserror::Error;

use super::endpoints::{
    ChatCompletionRequest, CompletionMessage, OpenRouterAvailableModel, ProviderPreferences, CHAT_COMPLETIONS_URL,
    OPENROUTER_MODELS,
};
use super::sse::SseDecoder;
use crate::chat_model::{ChatModel, ModelRequest, ModelRole, TextStream};
use crate::config::AssistantConfig;

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("Stream error: {0}")]
    StreamError(String),
}

#[derive(Clone, Debug)]
pub enum Provider {
    OpenRouter {
        /// Name of the environment variable holding the key.
        api_key: String,
        available_models: Vec<OpenRouterAvailableModel>,
        config: AssistantConfig,
        client: Client,
    },
}

impl Provider {
    pub fn openrouter(config: &AssistantConfig) -> Result<Self, ApiConnectionError> {
        dotenv().ok();
        let client = Client::builder().timeout(config.timeout).build()?;
        let provider = Self::OpenRouter {
            api_key: config.api_key_env_var.clone(),
            available_models: OPENROUTER_MODELS.to_vec(),
            config: config.clone(),
            client,
        };
        if !provider.supports_model(&config.model) {
            tracing::warn!(model = %config.model, "Model is not in the known OpenRouter list, requests may be rejected");
        }
        Ok(provider)
    }

    pub fn get_available_models(&self) -> Vec<OpenRouterAvailableModel> {
        match self {
            Provider::OpenRouter { available_models, .. } => available_models.clone(),
        }
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.get_available_models().iter().any(|m| m.model_name == model)
    }

    /// Frames a conversation turn as an OpenAI-style message list.
    pub fn completion_request(&self, request: ModelRequest) -> ChatCompletionRequest {
        match self {
            Provider::OpenRouter { config, .. } => {
                let mut messages = Vec::with_capacity(request.history.len() + 2);
                if !request.system_instruction.trim().is_empty() {
                    messages.push(CompletionMessage::new("system", request.system_instruction));
                }
                for turn in request.history {
                    let role = match turn.role {
                        ModelRole::User => "user",
                        ModelRole::Model => "assistant",
                    };
                    messages.push(CompletionMessage::new(role, turn.text));
                }
                messages.push(CompletionMessage::new("user", request.user_text));

                ChatCompletionRequest {
                    model: config.model.clone(),
                    messages,
                    stream: true,
                    temperature: config.temperature,
                    max_tokens: config.max_tokens,
                    provider: (!config.provider_only.is_empty()).then(|| ProviderPreferences {
                        only: config.provider_only.clone(),
                    }),
                }
            }
        }
    }

    pub async fn stream_chat_completion(&self, request: ChatCompletionRequest) -> Result<TextStream, ApiConnectionError> {
        match self {
            Provider::OpenRouter {
                api_key: api_key_env_var_name,
                config,
                client,
                ..
            } => {
                dotenv().ok();
                let actual_api_key = env::var(api_key_env_var_name)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone()))?;

                tracing::debug!(model = %request.model, messages = request.messages.len(), "Opening completion stream");

                let response = client
                    .post(CHAT_COMPLETIONS_URL)
                    .bearer_auth(actual_api_key)
                    .header("HTTP-Referer", &config.site_url)
                    .header("X-Title", &config.app_name)
                    .json(&request)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    tracing::error!(%status, body = %error_body, "Completion request rejected");
                    return Err(ApiConnectionError::ApiError { status, error_body });
                }

                Ok(decode_event_stream(response))
            }
        }
    }
}

impl ChatModel for Provider {
    async fn stream_chat(&self, request: ModelRequest) -> Result<TextStream, ApiConnectionError> {
        let request = self.completion_request(request);
        self.stream_chat_completion(request).await
    }
}

fn decode_event_stream(response: reqwest::Response) -> TextStream {
    let bytes = Box::pin(response.bytes_stream());
    let pending: VecDeque<Result<String, ApiConnectionError>> = VecDeque::new();

    let deltas = stream::unfold(
        (bytes, SseDecoder::new(), pending),
        |(mut bytes, mut decoder, mut pending)| async move {
            loop {
                if let Some(item) = pending.pop_front() {
                    return Some((item, (bytes, decoder, pending)));
                }
                if decoder.is_done() {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.feed(&chunk)),
                    Some(Err(e)) => {
                        pending.extend(decoder.finish());
                        pending.push_back(Err(ApiConnectionError::NetworkError(e)));
                    }
                    None => pending.extend(decoder.finish()),
                }
            }
        },
    );
    Box::pin(deltas)
}
