//! LLM client abstraction.
//!
//! Provides a unified interface for the reasoning-service providers and the
//! [`LlmReasoner`] that turns any of them into a claim assessor.

mod anthropic;
mod openai;
mod reasoner;
pub mod system_prompt;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use reasoner::LlmReasoner;
pub use system_prompt::{REASONING_SYSTEM_PROMPT, build_system_prompt, build_user_prompt};

use crate::config::{LlmConfig, LlmProviderKind};
use crate::{Error, Result};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Generates a completion with a system prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    ///
    /// Default implementation concatenates system and user prompts.
    /// Providers should override this to use native system prompt support.
    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        let combined = format!("{system}\n\n---\n\nUser message:\n{user}");
        self.complete(&combined)
    }
}

/// HTTP client configuration for collaborator requests.
#[derive(Debug, Clone, Copy)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from config file settings.
    #[must_use]
    pub const fn from_config(config: &LlmConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }

    /// Configuration with a request timeout and the default connect timeout.
    #[must_use]
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            ..Self::default()
        }
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(concat!("claimcheck/", env!("CARGO_PKG_VERSION")));
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Builds the configured LLM provider.
///
/// Returns `None` when no API key is available, in which case the reasoning
/// step is skipped entirely.
#[must_use]
pub fn build_provider(config: &LlmConfig) -> Option<Box<dyn LlmProvider>> {
    let api_key = config.api_key.as_ref()?.expose_secret().to_string();
    let http = LlmHttpConfig::from_config(config);

    let provider: Box<dyn LlmProvider> = match config.provider {
        LlmProviderKind::Anthropic => {
            let mut client = AnthropicClient::new()
                .with_api_key(api_key)
                .with_max_tokens(config.max_tokens)
                .with_http_config(http);
            if let Some(ref model) = config.model {
                client = client.with_model(model);
            }
            if let Some(ref base_url) = config.base_url {
                client = client.with_endpoint(base_url);
            }
            Box::new(client)
        },
        LlmProviderKind::OpenAi => {
            let mut client = OpenAiClient::new()
                .with_api_key(api_key)
                .with_max_tokens(config.max_tokens)
                .with_http_config(http);
            if let Some(ref model) = config.model {
                client = client.with_model(model);
            }
            if let Some(ref base_url) = config.base_url {
                client = client.with_endpoint(base_url);
            }
            Box::new(client)
        },
    };
    Some(provider)
}

/// Maps a transport error to a crate error.
pub(crate) fn request_error(provider: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::warn!(
        provider = provider,
        error = %e,
        error_kind = error_kind,
        "Collaborator request failed"
    );
    Error::OperationFailed {
        operation: format!("{provider}_request"),
        cause: format!("{error_kind} error: {e}"),
    }
}

/// Passes successful responses through and maps failures to crate errors.
///
/// HTTP 429 becomes [`Error::RateLimited`], honouring a numeric `Retry-After`.
pub(crate) fn check_status(
    provider: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        tracing::warn!(provider = provider, ?retry_after_secs, "Collaborator is rate limiting");
        return Err(Error::RateLimited {
            provider: provider.to_string(),
            retry_after_secs,
        });
    }

    let body = response.text().unwrap_or_default();
    tracing::error!(
        provider = provider,
        status = %status,
        body = %body,
        "Collaborator returned error status"
    );
    Err(Error::OperationFailed {
        operation: format!("{provider}_request"),
        cause: format!("API returned status: {status} - {body}"),
    })
}

/// Parses a `Retry-After` header given in seconds.
fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

/// Escapes XML special characters so that untrusted text cannot break out of
/// the tags that delimit it in a prompt.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Extracts JSON from an LLM response, handling markdown code blocks.
pub(crate) fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle ``` ... ``` blocks (without json marker)
    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        let after_marker = &trimmed[content_start..];
        let json_start = after_marker
            .find('{')
            .map_or(content_start, |pos| content_start + pos);
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle raw JSON (find first { to last })
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return &trimmed[start..=end];
            }
        }
    }

    trimmed
}
