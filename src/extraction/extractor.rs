//! Claim extraction from raw transcripts.
//!
//! Splits a transcript into independent clauses, discards greetings, questions
//! and opinions, and scores the rest with fixed-point heuristics. Pure: no I/O,
//! no shared state, never fails.

use super::key::ClaimKey;
use super::patterns::{
    CAPITALIZED_RUN, CLAIM_SIGNALS, CLAUSE_BOUNDARY, ENTITY_STOP_WORDS, GREETING_FILLER,
    LEADING_FILLER, NAMED_ENTITY_POINTS, NUMBER, NUMBER_POINTS, OPINION, QUANTITY_WORD,
    QUESTION, SENTENCE_BOUNDARY, YEAR_ONLY,
};
use crate::config::ExtractionConfig;
use crate::models::{CandidateClaim, ClaimPreview, ClaimTag, Verdict};
use std::collections::HashSet;
use tracing::instrument;

/// Clauses shorter than this are merged into a neighbour rather than split off.
const MIN_CLAUSE_WORDS: usize = 3;

/// Tag precedence when several heuristics fire.
const TAG_PRIORITY: [ClaimTag; 5] = [
    ClaimTag::Ownership,
    ClaimTag::Geopolitical,
    ClaimTag::Definitional,
    ClaimTag::Statistical,
    ClaimTag::Factual,
];

/// A clause of a transcript before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text: String,
    in_question: bool,
}

/// Extracts candidate claims from transcripts.
///
/// # Example
///
/// ```rust
/// use claimcheck::ClaimExtractor;
///
/// let extractor = ClaimExtractor::default();
/// assert!(extractor.extract("Hi everyone, I think pizza is great").is_empty());
///
/// let claims = extractor.extract("The Eiffel Tower is in Paris.");
/// assert_eq!(claims.len(), 1);
/// assert!(claims[0].entities.contains(&"Eiffel Tower".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClaimExtractor {
    config: ExtractionConfig,
}

impl ClaimExtractor {
    /// Creates an extractor with the given configuration.
    #[must_use]
    pub const fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Returns the extractor configuration.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extracts candidate claims, highest score first.
    ///
    /// Spans scoring at least `min_score` are kept, deduplicated by normalized
    /// text, and capped at `max_claims`.
    #[instrument(skip(self, transcript), fields(transcript_length = transcript.len()))]
    pub fn extract(&self, transcript: &str) -> Vec<CandidateClaim> {
        let mut candidates: Vec<CandidateClaim> = split_spans(transcript)
            .into_iter()
            .filter(|span| !is_discarded(span))
            .filter_map(|span| {
                let entities = extract_entities(&span.text);
                let (score, tag) = score_span(&span.text, &entities);
                (score >= self.config.min_score).then(|| CandidateClaim {
                    text: span.text,
                    score,
                    entities,
                    tag,
                })
            })
            .collect();

        // Stable sort keeps transcript order among equal scores.
        candidates.sort_by(|a, b| b.score.cmp(&a.score));

        let mut seen = HashSet::new();
        candidates.retain(|claim| seen.insert(ClaimKey::normalize(&claim.text)));
        candidates.truncate(self.config.max_claims);

        tracing::debug!(claims = candidates.len(), "Extracted candidate claims");
        metrics::counter!("claims_extracted_total").increment(candidates.len() as u64);

        candidates
    }

    /// Extracts claims and renders them as low-latency previews.
    #[must_use]
    pub fn preview(&self, transcript: &str) -> Vec<ClaimPreview> {
        self.extract(transcript)
            .into_iter()
            .map(|claim| ClaimPreview {
                claim: claim.text,
                verdict: Verdict::Unverified,
                confidence: claim.score,
                entities: claim.entities,
            })
            .collect()
    }
}

/// Splits a transcript into sentences, then into clauses.
fn split_spans(transcript: &str) -> Vec<Span> {
    let text = transcript.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut spans = Vec::new();

    for sentence in split_sentences(&text) {
        let in_question = sentence.ends_with('?');
        let body = sentence.trim_end_matches(['.', '!', '?']).trim();
        if body.is_empty() {
            continue;
        }
        spans.extend(split_clauses(body).into_iter().map(|text| Span { text, in_question }));
    }

    spans
}

/// Splits on terminal punctuation, keeping the punctuation with its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        let punctuation_len = boundary.as_str().trim_end().len();
        sentences.push(&text[start..boundary.start() + punctuation_len]);
        start = boundary.end();
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Splits a sentence body on commas and coordinating conjunctions.
///
/// Greeting and filler fragments are dropped first; fragments shorter than
/// three words are then merged into the previous clause (or the next one when
/// they lead the sentence) so that "salt and pepper are spices" stays whole.
fn split_clauses(body: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for boundary in CLAUSE_BOUNDARY.find_iter(body) {
        pieces.push((start, boundary.start()));
        start = boundary.end();
    }
    pieces.push((start, body.len()));

    let mut merged: Vec<(usize, usize)> = Vec::new();
    let mut pending_start: Option<usize> = None;
    for (piece_start, piece_end) in pieces {
        let piece = body[piece_start..piece_end].trim();
        if piece.is_empty() || GREETING_FILLER.is_match(piece) {
            continue;
        }
        if piece.split_whitespace().count() < MIN_CLAUSE_WORDS {
            if let Some(last) = merged.last_mut() {
                last.1 = piece_end;
            } else {
                pending_start.get_or_insert(piece_start);
            }
            continue;
        }
        merged.push((pending_start.take().unwrap_or(piece_start), piece_end));
    }
    if let Some(orphan_start) = pending_start {
        merged.push((orphan_start, body.len()));
    }

    merged
        .into_iter()
        .map(|(s, e)| LEADING_FILLER.replace(body[s..e].trim(), "").trim().to_string())
        .filter(|clause| !clause.is_empty())
        .collect()
}

/// Returns true for spans that are never claims.
fn is_discarded(span: &Span) -> bool {
    span.text.split_whitespace().count() < MIN_CLAUSE_WORDS
        || GREETING_FILLER.is_match(&span.text)
        || span.in_question
        || QUESTION.is_match(&span.text)
        || OPINION.is_match(&span.text)
}

/// Scores a span and picks its tag.
fn score_span(text: &str, entities: &[String]) -> (u8, ClaimTag) {
    let mut score: u32 = 0;
    let mut fired: Vec<ClaimTag> = Vec::new();

    for signal in CLAIM_SIGNALS.iter() {
        if signal.pattern.is_match(text) {
            tracing::trace!(
                signal = signal.description,
                points = signal.points,
                "Claim signal matched"
            );
            score += u32::from(signal.points);
            fired.push(signal.tag);
        }
    }
    if has_quantity(text) {
        score += u32::from(NUMBER_POINTS);
        fired.push(ClaimTag::Statistical);
    }
    if !entities.is_empty() {
        score += u32::from(NAMED_ENTITY_POINTS);
    }

    let tag = TAG_PRIORITY
        .into_iter()
        .find(|tag| fired.contains(tag))
        .unwrap_or(ClaimTag::Factual);

    (u8::try_from(score.min(100)).unwrap_or(100), tag)
}

/// Whether the text contains a quantity other than a bare year.
fn has_quantity(text: &str) -> bool {
    QUANTITY_WORD.is_match(text)
        || NUMBER
            .find_iter(text)
            .any(|m| !YEAR_ONLY.is_match(m.as_str().trim_end_matches(['.', ','])))
}

/// Extracts capitalized entity strings in order of appearance.
pub(crate) fn extract_entities(text: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    for run in CAPITALIZED_RUN.find_iter(text) {
        let words: Vec<&str> = run
            .as_str()
            .split_whitespace()
            .skip_while(|word| ENTITY_STOP_WORDS.contains(word))
            .collect();
        let entity = words.join(" ");
        if entity.chars().count() < 2 || entities.contains(&entity) {
            continue;
        }
        entities.push(entity);
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn extractor() -> ClaimExtractor {
        ClaimExtractor::default()
    }

    #[test]
    fn test_greeting_and_opinion_yield_nothing() {
        assert!(extractor().extract("Hi everyone, I think pizza is great").is_empty());
    }

    #[test]
    fn test_min_score_is_inclusive() {
        let text = "The Eiffel Tower is in Paris";
        let score = extractor().extract(text)[0].score;
        let at = |min_score: u8| {
            ClaimExtractor::new(ExtractionConfig {
                min_score,
                ..ExtractionConfig::default()
            })
            .extract(text)
        };
        assert_eq!(at(score).len(), 1);
        assert!(at(score.saturating_add(1)).is_empty());
    }

    #[test]
    fn test_simple_location_claim() {
        let claims = extractor().extract("The Eiffel Tower is in Paris.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "The Eiffel Tower is in Paris");
        assert_eq!(claims[0].entities, vec!["Eiffel Tower", "Paris"]);
        assert_eq!(claims[0].tag, ClaimTag::Geopolitical);
        assert!(claims[0].score >= 30);
    }

    #[test]
    fn test_conjunction_splits_independent_claims() {
        let claims = extractor()
            .extract("Paris is the capital of France and Berlin is the capital of Germany");
        let texts: Vec<&str> = claims.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Paris is the capital of France", "Berlin is the capital of Germany"]
        );
    }

    #[test]
    fn test_short_fragment_is_not_split_off() {
        let spans = split_clauses("Salt and pepper are the most common spices");
        assert_eq!(spans, vec!["Salt and pepper are the most common spices"]);
    }

    #[test]
    fn test_leading_filler_is_stripped() {
        let claims = extractor().extract("um so the Eiffel Tower is in Paris");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "the Eiffel Tower is in Paris");
    }

    #[test_case("What is the capital of France?" ; "wh question")]
    #[test_case("Is it true that Paris is the capital of France?" ; "yes no question")]
    #[test_case("Paris is the capital of France, right?" ; "tag question")]
    fn test_questions_are_discarded(input: &str) {
        assert!(extractor().extract(input).is_empty());
    }

    #[test_case("I believe the Eiffel Tower is in Paris" ; "belief")]
    #[test_case("In my opinion Paris is the capital of France" ; "opinion")]
    fn test_opinions_are_discarded(input: &str) {
        assert!(extractor().extract(input).is_empty());
    }

    #[test]
    fn test_duplicates_are_removed() {
        let claims = extractor()
            .extract("The Eiffel Tower is in Paris. the eiffel tower is in Paris!");
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_claims_ordered_by_score_and_capped() {
        let config = ExtractionConfig {
            max_claims: 1,
            ..ExtractionConfig::default()
        };
        let claims = ClaimExtractor::new(config).extract(
            "The Eiffel Tower is in Paris. Tesla was founded in 2003 by Martin Eberhard.",
        );
        assert_eq!(claims.len(), 1);
        assert!(claims[0].text.starts_with("Tesla"));
        assert_eq!(claims[0].tag, ClaimTag::Ownership);
    }

    #[test_case("" ; "empty")]
    #[test_case("   \n\t " ; "whitespace")]
    #[test_case("?!?!.,,;" ; "punctuation")]
    #[test_case("pizza" ; "single word")]
    fn test_malformed_input_yields_empty(input: &str) {
        assert!(extractor().extract(input).is_empty());
    }

    #[test]
    fn test_low_score_span_is_dropped() {
        assert!(extractor().extract("the weather feels nice").is_empty());
    }

    #[test]
    fn test_quantity_detection() {
        assert!(has_quantity("The population is 67 million"));
        assert!(has_quantity("About 40 percent agree"));
        assert!(!has_quantity("It opened in 1889"));
    }

    #[test]
    fn test_entity_extraction_skips_stop_words() {
        let entities = extract_entities("The Bank of America is in the United States");
        assert_eq!(entities, vec!["Bank of America", "United States"]);
    }

    #[test]
    fn test_preview_is_unverified() {
        let previews = extractor().preview("The Eiffel Tower is in Paris");
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].verdict, Verdict::Unverified);
    }
}
