//! Verify CLI command (one-shot claim check).

use crate::Result;
use crate::config::ClaimcheckConfig;
use crate::models::VerificationResult;
use crate::services::VerificationPipeline;

/// Verify command handler.
#[derive(Debug, Clone)]
pub struct VerifyCommand {
    claim: String,
    context: Vec<String>,
}

impl VerifyCommand {
    /// Creates a verify command for one claim.
    #[must_use]
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            context: Vec::new(),
        }
    }

    /// Adds prior transcript context passed to the reasoning service.
    #[must_use]
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Verifies the claim with the pipeline described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim is blank or the pipeline cannot be built.
    pub fn run(
        &self,
        config: &ClaimcheckConfig,
        runtime: &tokio::runtime::Runtime,
    ) -> Result<VerificationResult> {
        let claim = self.claim.trim();
        if claim.is_empty() {
            return Err(crate::Error::InvalidInput("claim must not be empty".to_string()));
        }
        let pipeline = VerificationPipeline::from_config(config)?;
        let result = runtime.block_on(pipeline.verify_claim(claim, &self.context));
        tracing::info!(
            verdict = %result.verdict,
            confidence = result.confidence,
            "Claim verified"
        );
        Ok(result)
    }
}
