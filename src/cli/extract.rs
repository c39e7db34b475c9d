//! Extract CLI command (inspect claim extraction).

use crate::config::ExtractionConfig;
use crate::extraction::{Canonicalizer, ClaimExtractor};
use crate::models::{CanonicalForm, ClaimTag};
use serde::Serialize;

/// One extracted claim with its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedClaim {
    /// The claim text.
    pub text: String,
    /// Extraction score (0-100).
    pub score: u8,
    /// Strongest heuristic that fired.
    pub tag: ClaimTag,
    /// Detected entities.
    pub entities: Vec<String>,
    /// Canonical decomposition.
    pub canonical: CanonicalForm,
    /// Whether the claim is personal or subjective and would be skipped.
    pub personal: bool,
}

/// Extract command handler.
#[derive(Debug, Clone, Default)]
pub struct ExtractCommand {
    extractor: ClaimExtractor,
}

impl ExtractCommand {
    /// Creates an extract command with the given extraction settings.
    #[must_use]
    pub const fn new(config: ExtractionConfig) -> Self {
        Self {
            extractor: ClaimExtractor::new(config),
        }
    }

    /// Extracts and canonicalizes the claims of `transcript`.
    #[must_use]
    pub fn run(&self, transcript: &str) -> Vec<ExtractedClaim> {
        self.extractor
            .extract(transcript)
            .into_iter()
            .map(|claim| ExtractedClaim {
                canonical: Canonicalizer::canonicalize(&claim.text),
                personal: Canonicalizer::is_personal(&claim.text),
                text: claim.text,
                score: claim.score,
                tag: claim.tag,
                entities: claim.entities,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_conjoined_claims() {
        let claims = ExtractCommand::default()
            .run("Paris is the capital of France and Berlin is the capital of Germany");
        assert_eq!(claims.len(), 2);
        assert!(claims.iter().all(|c| !c.personal));
        assert!(claims.iter().all(|c| !c.canonical.subject.is_empty()));
    }

    #[test]
    fn test_greeting_has_no_claims() {
        assert!(ExtractCommand::default().run("Hello there, how are you?").is_empty());
    }
}
