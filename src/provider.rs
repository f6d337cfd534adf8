//! Definition providers - OpenAI-compatible (default), Ollama (optional)

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::config::{LookupBackend, LookupConfig};
use crate::error::LookupError;

const DEFINE_SYSTEM: &str = "You are a concise dictionary. Define the word or phrase the reader asks about in one or two plain sentences. No preamble.";

/// Answers lookup queries. Calls run off the event path, so the returned
/// future must own everything it needs.
pub trait DefinitionProvider: Send + Sync {
    fn define(&self, query: &str) -> BoxFuture<'static, Result<String, LookupError>>;
}

// ============================================================================
// OpenAI-compatible backend
// ============================================================================

#[cfg(feature = "openai-compat")]
pub mod openai_compat {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: Vec<ChatMessage<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_tokens: Option<u32>,
    }

    #[derive(Serialize)]
    struct ChatMessage<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Deserialize)]
    struct ChatResponse {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: ResponseMessage,
    }

    #[derive(Deserialize)]
    struct ResponseMessage {
        #[serde(default)]
        content: Option<String>,
    }

    #[derive(Clone)]
    pub struct OpenAiCompatProvider {
        client: reqwest::Client,
        base_url: String,
        model: String,
        api_key: Option<String>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    }

    impl OpenAiCompatProvider {
        pub fn new(config: &LookupConfig) -> Self {
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new());
            Self {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                model: config.model.clone(),
                api_key: config.api_key.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            }
        }

        async fn request(self, query: String) -> Result<String, LookupError> {
            let url = format!("{}/chat/completions", self.base_url);
            let body = ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: DEFINE_SYSTEM,
                    },
                    ChatMessage {
                        role: "user",
                        content: &query,
                    },
                ],
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let mut request = self.client.post(&url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request
                .send()
                .await
                .map_err(|e| LookupError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(LookupError::Status {
                    status: status.as_u16(),
                });
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| LookupError::Malformed(e.to_string()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .map(|c| c.trim().to_string())
                .ok_or(LookupError::EmptyResponse)
        }
    }

    impl DefinitionProvider for OpenAiCompatProvider {
        fn define(&self, query: &str) -> BoxFuture<'static, Result<String, LookupError>> {
            self.clone().request(query.to_string()).boxed()
        }
    }
}

// ============================================================================
// Ollama backend
// ============================================================================

#[cfg(feature = "ollama")]
pub mod ollama {
    use super::*;
    use ollama_rs::Ollama;
    use ollama_rs::generation::chat::ChatMessage;
    use ollama_rs::generation::chat::request::ChatMessageRequest;

    pub struct OllamaProvider {
        client: Ollama,
        model: String,
    }

    impl OllamaProvider {
        pub fn new(model: &str) -> Self {
            Self {
                client: Ollama::default(),
                model: model.to_string(),
            }
        }
    }

    impl DefinitionProvider for OllamaProvider {
        fn define(&self, query: &str) -> BoxFuture<'static, Result<String, LookupError>> {
            let client = self.client.clone();
            let request = ChatMessageRequest::new(
                self.model.clone(),
                vec![
                    ChatMessage::system(DEFINE_SYSTEM.to_string()),
                    ChatMessage::user(query.to_string()),
                ],
            );

            async move {
                let response = client
                    .send_chat_messages(request)
                    .await
                    .map_err(|e| LookupError::Transport(e.to_string()))?;
                let content = response.message.content.trim().to_string();
                if content.is_empty() {
                    return Err(LookupError::EmptyResponse);
                }
                Ok(content)
            }
            .boxed()
        }
    }
}

// ============================================================================
// Wrappers
// ============================================================================

/// Provider that always fails with the error it was built with
pub struct Unavailable(pub LookupError);

impl DefinitionProvider for Unavailable {
    fn define(&self, _query: &str) -> BoxFuture<'static, Result<String, LookupError>> {
        futures_util::future::ready(Err(self.0.clone())).boxed()
    }
}

/// Keeps definitions short enough for the display surface
pub struct Bounded<P> {
    inner: P,
    max_chars: usize,
}

impl<P: DefinitionProvider> Bounded<P> {
    pub fn new(inner: P, max_chars: usize) -> Self {
        Self { inner, max_chars }
    }
}

impl<P: DefinitionProvider> DefinitionProvider for Bounded<P> {
    fn define(&self, query: &str) -> BoxFuture<'static, Result<String, LookupError>> {
        let max_chars = self.max_chars;
        self.inner
            .define(query)
            .map(move |result| result.map(|text| truncate_words(&text, max_chars)))
            .boxed()
    }
}

/// Cut to at most `max_chars` chars, preferring the last word boundary,
/// and mark the cut with an ellipsis
pub fn truncate_words(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    // Leave room for the ellipsis
    let budget = max_chars.saturating_sub(1);
    let head: String = text.chars().take(budget).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => head[..pos].trim_end(),
        _ => head.as_str(),
    };
    format!("{}…", cut)
}

/// Build the configured provider. Backends missing from this build fail
/// each lookup with a readable error instead of aborting startup.
pub fn from_config(config: &LookupConfig) -> Arc<dyn DefinitionProvider> {
    let max_chars = config.max_chars;
    match config.backend {
        #[cfg(feature = "openai-compat")]
        LookupBackend::OpenAiCompat => {
            tracing::info!(base_url = %config.base_url, model = %config.model, "lookup: openai-compat");
            Arc::new(Bounded::new(
                openai_compat::OpenAiCompatProvider::new(config),
                max_chars,
            ))
        }
        #[cfg(not(feature = "openai-compat"))]
        LookupBackend::OpenAiCompat => {
            tracing::warn!("openai-compat backend not enabled, lookups will fail");
            Arc::new(Unavailable(LookupError::BackendDisabled("openai-compat")))
        }
        #[cfg(feature = "ollama")]
        LookupBackend::Ollama => {
            tracing::info!(model = %config.model, "lookup: ollama");
            Arc::new(Bounded::new(
                ollama::OllamaProvider::new(&config.model),
                max_chars,
            ))
        }
        #[cfg(not(feature = "ollama"))]
        LookupBackend::Ollama => {
            tracing::warn!("ollama backend not enabled, lookups will fail");
            Arc::new(Unavailable(LookupError::BackendDisabled("ollama")))
        }
        LookupBackend::Disabled => Arc::new(Unavailable(LookupError::NotConfigured)),
    }
}
