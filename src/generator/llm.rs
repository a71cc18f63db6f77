//! LLM-assisted generation.
//!
//! When a caller asks for LLM generation and a template carries a prompt,
//! the prompt is rendered against the table context (plus `schema_text`),
//! sent to the active chat-completion provider, and the reply is cleaned up
//! into plain source code.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::{ProviderConfig, ProviderStore};

/// System instruction sent with every completion request.
pub const SYSTEM_INSTRUCTION: &str =
    "You are an expert software developer. Output only the code, no markdown code blocks, no explanations.";

/// Key substituted for providers that accept unauthenticated requests.
const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[allow(clippy::unwrap_used)]
static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Errors raised while producing code through a model provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// No provider configuration is marked active
    NoActiveConfig,
    /// The active provider needs an API key and none is configured
    MissingApiKey {
        /// Provider kind, e.g. `openai_compatible`
        provider: String,
    },
    /// The HTTP client could not be built or the request never completed
    Request(String),
    /// The provider answered with a non-success status
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },
    /// The provider's reply could not be decoded or held no content
    InvalidResponse(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::NoActiveConfig => write!(
                f,
                "No active LLM configuration found. Please configure an LLM provider."
            ),
            LlmError::MissingApiKey { provider } => {
                write!(f, "API Key is required for provider {provider}")
            }
            LlmError::Request(msg) => write!(f, "LLM Call Failed: {msg}"),
            LlmError::Status { status, body } => {
                write!(f, "LLM Call Failed: provider returned {status}: {body}")
            }
            LlmError::InvalidResponse(msg) => write!(f, "LLM Call Failed: {msg}"),
        }
    }
}

impl std::error::Error for LlmError {}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// OpenAI Chat Completions request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    /// Deterministic, non-streaming request for a rendered prompt.
    pub fn for_prompt(model: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.0,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Where and how to reach a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL without the `/chat/completions` suffix
    pub base_url: String,
    /// Resolved API key (real or placeholder)
    pub api_key: String,
}

impl Endpoint {
    pub fn completions_url(&self) -> String {
        format!("{}{CHAT_COMPLETIONS_PATH}", self.base_url)
    }
}

/// A chat-completion transport. Returns the raw assistant message text.
pub trait ChatClient: Send + Sync {
    fn complete(&self, endpoint: &Endpoint, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Blocking HTTP client for OpenAI-compatible providers.
///
/// One call per request, no retries. The timeout covers the whole exchange;
/// completions for large templates can take minutes.
pub struct HttpChatClient {
    client: reqwest::blocking::Client,
}

impl HttpChatClient {
    pub fn new(timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ChatClient for HttpChatClient {
    fn complete(&self, endpoint: &Endpoint, request: &ChatRequest) -> Result<String, LlmError> {
        let url = endpoint.completions_url();
        debug!(url = %url, model = %request.model, "sending chat completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .json(request)
            .send()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no message".to_string()))
    }
}

/// Strip whitespace, a trailing `/`, and a trailing `/chat/completions` so the
/// completions path can be appended exactly once.
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix(CHAT_COMPLETIONS_PATH)
        .unwrap_or(trimmed)
        .to_string()
}

/// Use the configured key, or the placeholder for providers that do not
/// authenticate.
pub fn resolve_api_key(config: &ProviderConfig) -> Result<String, LlmError> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ if config.provider.eq_ignore_ascii_case("ollama") => {
            Ok(OLLAMA_PLACEHOLDER_KEY.to_string())
        }
        _ => Err(LlmError::MissingApiKey {
            provider: config.provider.clone(),
        }),
    }
}

/// Turn a raw model reply into source code.
///
/// Removes `<think>...</think>` reasoning spans, then a surrounding markdown
/// fence: the opening line (fence plus language tag) and everything from a
/// trailing closing fence onward.
pub fn sanitize_reply(raw: &str) -> String {
    let without_think = THINK_BLOCK.replace_all(raw, "");
    let mut content = without_think.trim();
    if content.starts_with("```") {
        content = content.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        if content.ends_with("```") {
            if let Some(idx) = content.rfind("```") {
                content = &content[..idx];
            }
        }
    }
    content.trim().to_string()
}

/// Resolves the active provider and produces code for a rendered prompt.
pub struct LlmFallback<'a> {
    providers: &'a dyn ProviderStore,
    client: &'a dyn ChatClient,
}

impl<'a> LlmFallback<'a> {
    pub fn new(providers: &'a dyn ProviderStore, client: &'a dyn ChatClient) -> Self {
        Self { providers, client }
    }

    pub fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let config = self.providers.active().ok_or(LlmError::NoActiveConfig)?;
        let endpoint = Endpoint {
            base_url: normalize_base_url(&config.base_url),
            api_key: resolve_api_key(&config)?,
        };
        info!(
            provider = %config.provider,
            model = %config.model_name,
            base_url = %endpoint.base_url,
            "requesting LLM completion"
        );
        let request = ChatRequest::for_prompt(&config.model_name, prompt);
        let raw = self.client.complete(&endpoint, &request)?;
        Ok(sanitize_reply(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn provider(kind: &str, key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            id: 1,
            name: "test".to_string(),
            provider: kind.to_string(),
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key: key.map(str::to_string),
            model_name: "llama3".to_string(),
            active: true,
        }
    }

    struct StaticProviders(Option<ProviderConfig>);

    impl ProviderStore for StaticProviders {
        fn active(&self) -> Option<ProviderConfig> {
            self.0.clone()
        }
    }

    struct RecordingClient {
        reply: Result<String, LlmError>,
        seen: Mutex<Vec<(Endpoint, ChatRequest)>>,
    }

    impl ChatClient for RecordingClient {
        fn complete(&self, endpoint: &Endpoint, request: &ChatRequest) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((endpoint.clone(), request.clone()));
            self.reply.clone()
        }
    }

    #[test]
    fn test_sanitize_think_and_fence() {
        assert_eq!(sanitize_reply("<think>x</think>```java\ncode\n```"), "code");
    }

    #[test]
    fn test_sanitize_multiline_think() {
        let raw = "<think>\nplan\nmore plan\n</think>\n\nclass A {}\n";
        assert_eq!(sanitize_reply(raw), "class A {}");
    }

    #[test]
    fn test_sanitize_unclosed_fence() {
        assert_eq!(sanitize_reply("```rust\nfn main() {}\n"), "fn main() {}");
    }

    #[test]
    fn test_sanitize_plain_code_untouched() {
        assert_eq!(sanitize_reply("  int x = 1;  "), "int x = 1;");
    }

    #[test]
    fn test_sanitize_fence_only() {
        assert_eq!(sanitize_reply("```"), "");
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url(" https://api.deepseek.com/ "), "https://api.deepseek.com");
        assert_eq!(
            normalize_base_url("http://localhost:11434/v1/chat/completions"),
            "http://localhost:11434/v1"
        );
        assert_eq!(
            normalize_base_url("http://localhost:11434/v1/chat/completions/"),
            "http://localhost:11434/v1"
        );
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(resolve_api_key(&provider("openai_compatible", Some("sk-1"))).unwrap(), "sk-1");
        assert_eq!(resolve_api_key(&provider("ollama", None)).unwrap(), "ollama");
        assert_eq!(resolve_api_key(&provider("ollama", Some(""))).unwrap(), "ollama");
        assert_eq!(
            resolve_api_key(&provider("deepseek", None)),
            Err(LlmError::MissingApiKey {
                provider: "deepseek".to_string()
            })
        );
    }

    #[test]
    fn test_fallback_without_active_config() {
        let client = RecordingClient {
            reply: Ok("x".to_string()),
            seen: Mutex::new(Vec::new()),
        };
        let providers = StaticProviders(None);
        let err = LlmFallback::new(&providers, &client).generate("p").unwrap_err();
        assert_eq!(err, LlmError::NoActiveConfig);
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fallback_builds_request_and_sanitizes() {
        let client = RecordingClient {
            reply: Ok("```java\nclass User {}\n```".to_string()),
            seen: Mutex::new(Vec::new()),
        };
        let providers = StaticProviders(Some(provider("ollama", None)));
        let code = LlmFallback::new(&providers, &client)
            .generate("make an entity")
            .unwrap();
        assert_eq!(code, "class User {}");

        let seen = client.seen.lock().unwrap();
        let (endpoint, request) = &seen[0];
        assert_eq!(endpoint.completions_url(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(endpoint.api_key, "ollama");
        assert_eq!(request.model, "llama3");
        assert_eq!(request.temperature, 0.0);
        assert!(!request.stream);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].content, "make an entity");
    }
}
