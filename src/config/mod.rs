//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by
//! `CLAIMCHECK_*` environment variables. Every section has defaults, so an
//! empty file (or no file at all) yields a working offline pipeline.
//!
//! ```toml
//! [cache]
//! ttl_secs = 86400
//! max_entries = 10000
//!
//! [providers.llm]
//! provider = "anthropic"
//! api_key = "${ANTHROPIC_API_KEY}"
//! ```

mod features;

pub use features::FeatureFlags;

use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration for claimcheck.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClaimcheckConfig {
    /// Claim extraction thresholds.
    pub extraction: ExtractionConfig,
    /// Result cache sizing and expiry.
    pub cache: CacheConfig,
    /// Per-session rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Job dispatch and broker settings.
    pub dispatch: DispatchConfig,
    /// Evidence aggregation thresholds.
    pub aggregator: AggregatorConfig,
    /// External collaborator settings.
    pub providers: ProvidersConfig,
    /// Session server settings.
    pub server: ServerConfig,
    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
    /// Optional stage toggles.
    pub features: FeatureFlags,
}

/// Claim extraction thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum heuristic score (0-100) for a span to become a candidate claim.
    /// The bound is inclusive: a span scoring exactly `min_score` is kept.
    pub min_score: u8,
    /// Maximum candidate claims per transcript.
    pub max_claims: usize,
    /// Final transcripts shorter than this many characters are ignored.
    pub min_transcript_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_score: 30,
            max_claims: 20,
            min_transcript_chars: 10,
        }
    }
}

/// Result cache sizing and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Interval between expiry sweeps in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            max_entries: 10_000,
            cleanup_interval_secs: 60 * 60,
        }
    }
}

impl CacheConfig {
    /// Returns the TTL as a duration.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Per-session sliding-window rate limit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: usize,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Interval between idle-session sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 60,
            sweep_interval_secs: 60,
        }
    }
}

impl RateLimitConfig {
    /// Returns the window as a duration.
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Job dispatch and broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Broker URL (`redis://...`). Jobs run inline when unset.
    pub redis_url: Option<String>,
    /// Prefix of the broker keys holding pending and in-flight jobs.
    pub queue_name: String,
    /// Maximum jobs processed concurrently by the worker pool.
    pub worker_concurrency: usize,
    /// Attempts per job before a terminal error is emitted.
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds. Doubles per attempt.
    pub backoff_base_ms: u64,
    /// Interval between broker reconnect probes while down, in seconds.
    pub reconnect_interval_secs: u64,
    /// Blocking pop timeout in seconds.
    pub pop_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            queue_name: "claimcheck:jobs".to_string(),
            worker_concurrency: 5,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            reconnect_interval_secs: 5,
            pop_timeout_secs: 1,
        }
    }
}

impl DispatchConfig {
    /// Backoff after the given failed attempt: `base * 2^(attempt - 1)`.
    #[must_use]
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1_u64 << exponent))
    }
}

/// Evidence aggregation thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Similarity at or above which evidence entails a claim.
    pub entailment_threshold: f64,
    /// Lower bound of the mean-similarity band that yields `misleading`.
    pub misleading_floor: f64,
    /// Evidence items kept in a result.
    pub max_evidence: usize,
    /// Fact override table replacing the built-in one.
    pub overrides_path: Option<PathBuf>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            entailment_threshold: 0.6,
            misleading_floor: 0.3,
            max_evidence: 5,
            overrides_path: None,
        }
    }
}

/// External collaborator settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Reasoning service.
    pub llm: LlmConfig,
    /// Web search provider.
    pub search: SearchConfig,
    /// Encyclopedic reference provider.
    pub reference: ReferenceConfig,
    /// Failure isolation shared by all collaborators.
    pub resilience: ResilienceConfig,
}

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProviderKind {
    /// Anthropic Claude.
    #[default]
    Anthropic,
    /// `OpenAI` or any compatible endpoint.
    OpenAi,
}

impl LlmProviderKind {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "openai" | "open_ai" | "openai-compatible" => Self::OpenAi,
            _ => Self::Anthropic,
        }
    }
}

impl<'de> Deserialize<'de> for LlmProviderKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Reasoning service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which provider to talk to.
    pub provider: LlmProviderKind,
    /// Model name; provider default when unset.
    pub model: Option<String>,
    /// API key. Supports `${VAR}` references.
    #[serde(with = "optional_secret")]
    pub api_key: Option<SecretString>,
    /// Base URL for self-hosted or proxied endpoints.
    pub base_url: Option<String>,
    /// Per-call budget in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Maximum tokens in a reply.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            model: None,
            api_key: None,
            base_url: None,
            timeout_ms: 15_000,
            connect_timeout_ms: 3_000,
            max_tokens: 512,
        }
    }
}

/// Web search provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search API endpoint.
    pub base_url: String,
    /// Subscription token. Supports `${VAR}` references.
    #[serde(with = "optional_secret")]
    pub api_key: Option<SecretString>,
    /// Results requested per query.
    pub max_results: usize,
    /// Per-call budget in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.search.brave.com/res/v1/web/search".to_string(),
            api_key: None,
            max_results: 5,
            timeout_ms: 5_000,
        }
    }
}

/// Encyclopedic reference provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// `MediaWiki` API endpoint.
    pub base_url: String,
    /// Results requested per query.
    pub max_results: usize,
    /// Per-call budget in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org/w/api.php".to_string(),
            max_results: 3,
            timeout_ms: 5_000,
        }
    }
}

/// Circuit breaker and cooldown settings shared by all collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Consecutive failures before the breaker opens.
    pub breaker_failure_threshold: u32,
    /// How long the breaker stays open before a trial call, in milliseconds.
    pub breaker_reset_ms: u64,
    /// Cooldown after a rate-limit signal without `Retry-After`, in seconds.
    pub cooldown_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            breaker_failure_threshold: 3,
            breaker_reset_ms: 30_000,
            cooldown_secs: 60,
        }
    }
}

/// Session server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Final transcripts remembered per session as prior context.
    pub history_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            history_len: 3,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format string; anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

impl<'de> Deserialize<'de> for LogFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Optional file that receives log output instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,
    /// Port of the Prometheus exporter.
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
            log_file: None,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

impl ClaimcheckConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::parse_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::InvalidInput(format!("config: {e}")))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<platform config dir>/claimcheck/config.toml`. Returns the
    /// default configuration if no file is found or it cannot be parsed.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from_file(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
            Self::default()
        })
    }

    /// Returns the platform-specific default config file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("claimcheck").join("config.toml"))
    }

    /// Loads from an explicit path if given, the default location otherwise,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Applies `CLAIMCHECK_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`, which maps a variable name to
    /// its value.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_MIN_SCORE") {
            self.extraction.min_score = v;
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_MAX_CLAIMS") {
            self.extraction.max_claims = v;
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = v;
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = v;
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = v;
        }
        if let Some(url) = lookup("CLAIMCHECK_REDIS_URL").filter(|s| !s.is_empty()) {
            self.dispatch.redis_url = Some(url);
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_WORKER_CONCURRENCY") {
            self.dispatch.worker_concurrency = v;
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_MAX_ATTEMPTS") {
            self.dispatch.max_attempts = v;
        }
        if let Some(path) = lookup("CLAIMCHECK_OVERRIDES_PATH").filter(|s| !s.is_empty()) {
            self.aggregator.overrides_path = Some(PathBuf::from(path));
        }
        if let Some(provider) = lookup("CLAIMCHECK_LLM_PROVIDER") {
            self.providers.llm.provider = LlmProviderKind::parse(&provider);
        }
        if let Some(model) = lookup("CLAIMCHECK_LLM_MODEL").filter(|s| !s.is_empty()) {
            self.providers.llm.model = Some(model);
        }
        if let Some(v) = env_value(&lookup, "CLAIMCHECK_LLM_TIMEOUT_MS") {
            self.providers.llm.timeout_ms = v;
        }
        if self.providers.llm.api_key.is_none() {
            let key_var = match self.providers.llm.provider {
                LlmProviderKind::Anthropic => "ANTHROPIC_API_KEY",
                LlmProviderKind::OpenAi => "OPENAI_API_KEY",
            };
            self.providers.llm.api_key = lookup("CLAIMCHECK_LLM_API_KEY")
                .or_else(|| lookup(key_var))
                .filter(|s| !s.is_empty())
                .map(SecretString::from);
        }
        if self.providers.search.api_key.is_none() {
            self.providers.search.api_key = lookup("CLAIMCHECK_SEARCH_API_KEY")
                .filter(|s| !s.is_empty())
                .map(SecretString::from);
        }
        if let Some(bind) = lookup("CLAIMCHECK_BIND").filter(|s| !s.is_empty()) {
            self.server.bind = bind;
        }
        if let Some(format) = lookup("CLAIMCHECK_LOG_FORMAT") {
            self.observability.log_format = LogFormat::parse(&format);
        }
        if let Some(level) = lookup("CLAIMCHECK_LOG_LEVEL").filter(|s| !s.is_empty()) {
            self.observability.log_level = level;
        }
        if let Some(v) = lookup("CLAIMCHECK_METRICS_ENABLED") {
            self.observability.metrics_enabled = parse_bool(&v);
        }

        self
    }
}

fn parse_value<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

/// Looks up `name` and parses it, ignoring values that do not parse.
fn env_value<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| parse_value(&v))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Expands a `${VAR}` reference; other strings are returned unchanged.
///
/// An unset variable expands to `None`.
fn expand_env_reference(value: &str) -> Option<String> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
        None => Some(trimmed.to_string()).filter(|v| !v.is_empty()),
    }
}

/// Serde module for optional secrets with `${VAR}` expansion.
mod optional_secret {
    use secrecy::SecretString;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .as_deref()
            .and_then(super::expand_env_reference)
            .map(SecretString::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ClaimcheckConfig::default();
        assert_eq!(config.extraction.min_score, 30);
        assert_eq!(config.extraction.max_claims, 20);
        assert_eq!(config.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.dispatch.worker_concurrency, 5);
        assert_eq!(config.dispatch.max_attempts, 3);
        assert!((config.aggregator.entailment_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.providers.llm.timeout_ms, 15_000);
        assert_eq!(config.providers.search.timeout_ms, 5_000);
    }

    #[test]
    fn test_backoff_doubles() {
        let dispatch = DispatchConfig::default();
        assert_eq!(dispatch.backoff_for(1), Duration::from_secs(1));
        assert_eq!(dispatch.backoff_for(2), Duration::from_secs(2));
        assert_eq!(dispatch.backoff_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = ClaimcheckConfig::parse_toml(
            r#"
            [cache]
            max_entries = 50

            [providers.llm]
            provider = "openai"
            api_key = "sk-test"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.providers.llm.provider, LlmProviderKind::OpenAi);
        assert_eq!(
            config
                .providers
                .llm
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().to_string()),
            Some("sk-test".to_string())
        );
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let result = ClaimcheckConfig::parse_toml("[cache]\nmax_entries = \"many\"");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\nmax_requests = 7").unwrap();

        let config = ClaimcheckConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.rate_limit.max_requests, 7);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ClaimcheckConfig::load_from_file(Path::new("/nonexistent/claimcheck.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CLAIMCHECK_MAX_CLAIMS", "7"),
            ("CLAIMCHECK_CACHE_TTL_SECS", "not-a-number"),
            ("CLAIMCHECK_REDIS_URL", "redis://localhost:6379"),
            ("CLAIMCHECK_LOG_FORMAT", "JSON"),
            ("ANTHROPIC_API_KEY", "key-from-env"),
            ("CLAIMCHECK_METRICS_ENABLED", "yes"),
        ]
        .into_iter()
        .collect();

        let config = ClaimcheckConfig::default()
            .with_overrides_from(|name| vars.get(name).map(ToString::to_string));

        assert_eq!(config.extraction.max_claims, 7);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(
            config.dispatch.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(config.observability.metrics_enabled);
        assert!(config.providers.llm.api_key.is_some());
    }

    #[test]
    fn test_numeric_overrides_of_every_width() {
        let vars: HashMap<&str, &str> = [
            ("CLAIMCHECK_MIN_SCORE", "40"),
            ("CLAIMCHECK_MAX_CLAIMS", "12"),
            ("CLAIMCHECK_CACHE_TTL_SECS", "600"),
            ("CLAIMCHECK_CACHE_MAX_ENTRIES", "250"),
            ("CLAIMCHECK_RATE_LIMIT_MAX_REQUESTS", "9"),
            ("CLAIMCHECK_RATE_LIMIT_WINDOW_SECS", "30"),
            ("CLAIMCHECK_WORKER_CONCURRENCY", "2"),
            ("CLAIMCHECK_MAX_ATTEMPTS", "4"),
            ("CLAIMCHECK_LLM_TIMEOUT_MS", " 2500 "),
        ]
        .into_iter()
        .collect();

        let config = ClaimcheckConfig::default()
            .with_overrides_from(|name| vars.get(name).map(ToString::to_string));

        assert_eq!(config.extraction.min_score, 40);
        assert_eq!(config.extraction.max_claims, 12);
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.cache.max_entries, 250);
        assert_eq!(config.rate_limit.max_requests, 9);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.dispatch.worker_concurrency, 2);
        assert_eq!(config.dispatch.max_attempts, 4);
        assert_eq!(config.providers.llm.timeout_ms, 2500);
    }

    #[test]
    fn test_out_of_range_override_is_ignored() {
        let config = ClaimcheckConfig::default().with_overrides_from(|name| {
            (name == "CLAIMCHECK_MIN_SCORE").then(|| "300".to_string())
        });
        assert_eq!(config.extraction.min_score, 30);
    }

    #[test]
    fn test_expand_env_reference_plain_value() {
        assert_eq!(expand_env_reference(" abc "), Some("abc".to_string()));
        assert_eq!(expand_env_reference(""), None);
        assert_eq!(
            expand_env_reference("${CLAIMCHECK_TEST_SURELY_UNSET_VARIABLE}"),
            None
        );
    }
}
