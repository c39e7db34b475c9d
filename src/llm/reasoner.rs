//! Reasoning service backed by an LLM provider.

use super::{LlmProvider, build_system_prompt, build_user_prompt, extract_json_from_response};
use crate::models::Verdict;
use crate::providers::{Assessment, ReasoningRequest, ReasoningService};
use crate::{Error, Result};
use serde::Deserialize;

/// Turns any [`LlmProvider`] into a [`ReasoningService`].
pub struct LlmReasoner {
    provider: Box<dyn LlmProvider>,
    system_prompt: String,
}

impl LlmReasoner {
    /// Creates a reasoner with the default system prompt.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self {
            provider,
            system_prompt: build_system_prompt(None),
        }
    }

    /// Appends operator context to the system prompt.
    #[must_use]
    pub fn with_context(mut self, context: &str) -> Self {
        self.system_prompt = build_system_prompt(Some(context));
        self
    }
}

impl ReasoningService for LlmReasoner {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    #[tracing::instrument(skip_all, fields(provider = self.provider.name()))]
    fn assess(&self, request: &ReasoningRequest) -> Result<Assessment> {
        let user = build_user_prompt(request);
        let response = self.provider.complete_with_system(&self.system_prompt, &user)?;
        let assessment = parse_assessment(&response)?;
        tracing::debug!(verdict = %assessment.verdict, confidence = assessment.confidence, "Reasoning completed");
        Ok(assessment)
    }
}

#[derive(Debug, Deserialize)]
struct AssessmentResponse {
    verdict: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    explanation: String,
}

/// Parses the model's reply into an [`Assessment`].
///
/// Confidence given as a fraction (`0.0..=1.0`) is scaled to 0-100.
fn parse_assessment(response: &str) -> Result<Assessment> {
    let json = extract_json_from_response(response);
    let parsed: AssessmentResponse =
        serde_json::from_str(json).map_err(|e| Error::OperationFailed {
            operation: "parse_assessment".to_string(),
            cause: format!("Invalid JSON: {e}. Response: {response}"),
        })?;

    let verdict = Verdict::parse(&parsed.verdict).ok_or_else(|| Error::OperationFailed {
        operation: "parse_assessment".to_string(),
        cause: format!("unknown verdict '{}'", parsed.verdict),
    })?;

    Ok(Assessment {
        verdict,
        confidence: normalize_confidence(parsed.confidence),
        explanation: parsed.explanation.trim().to_string(),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalize_confidence(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    let scaled = if raw > 0.0 && raw <= 1.0 { raw * 100.0 } else { raw };
    scaled.round().clamp(0.0, 100.0) as u8
}
