//! TF-IDF cosine similarity and entailment classification.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Words ignored when building term vectors.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "by", "for", "from", "has", "have", "he",
    "her", "his", "in", "is", "it", "its", "of", "on", "or", "she", "that", "the", "their",
    "there", "these", "they", "this", "those", "to", "was", "were", "which", "who", "will",
    "with",
];

/// Negation keywords. Their presence in exactly one side of an overlapping
/// pair marks a contradiction.
const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "false", "incorrect", "untrue", "myth", "debunked", "misconception",
    "neither", "nor", "cannot", "contrary", "isn't", "wasn't", "aren't", "weren't", "doesn't",
    "didn't", "don't", "won't", "hasn't", "haven't",
];

/// Logical relationship of an evidence item to a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The evidence supports the claim.
    Entailment,
    /// The evidence explicitly negates the claim.
    Contradiction,
    /// Neither.
    Neutral,
}

impl Relation {
    /// Returns the relation as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entailment => "entailment",
            Self::Contradiction => "contradiction",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Splits text into lowercase content tokens.
///
/// Apostrophes inside words are kept so that contractions such as `isn't`
/// survive as negation markers.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Whether the tokens contain a negation keyword.
#[must_use]
pub fn has_negation(tokens: &[String]) -> bool {
    tokens
        .iter()
        .any(|token| NEGATION_WORDS.contains(&token.as_str()) || token.ends_with("n't"))
}

/// TF-IDF model fitted on one claim and its evidence documents.
///
/// Term maps are ordered so that scores are bit-for-bit reproducible.
#[derive(Debug, Clone)]
pub struct TfIdf {
    idf: BTreeMap<String, f64>,
}

impl TfIdf {
    /// Fits IDF weights over the given token lists.
    ///
    /// Uses smoothed IDF: `ln((n + 1) / (df + 1)) + 1`.
    #[must_use]
    pub fn fit(documents: &[Vec<String>]) -> Self {
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for document in documents {
            let unique: BTreeSet<&str> = document.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let n = documents.len() as f64;
        let idf = document_frequency
            .into_iter()
            .map(|(term, df)| {
                #[allow(clippy::cast_precision_loss)]
                let weight = ((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0;
                (term.to_string(), weight)
            })
            .collect();
        Self { idf }
    }

    fn vector(&self, tokens: &[String]) -> BTreeMap<String, f64> {
        let mut vector: BTreeMap<String, f64> = BTreeMap::new();
        for token in tokens {
            *vector.entry(token.clone()).or_insert(0.0) += 1.0;
        }
        for (term, weight) in &mut vector {
            *weight *= self.idf.get(term).copied().unwrap_or(1.0);
        }
        vector
    }

    /// Cosine similarity of two token lists in `[0, 1]`.
    ///
    /// Returns 0.0 when either side has no content tokens.
    #[must_use]
    pub fn cosine(&self, a: &[String], b: &[String]) -> f64 {
        let va = self.vector(a);
        let vb = self.vector(b);

        let dot: f64 = va
            .iter()
            .filter_map(|(term, wa)| vb.get(term).map(|wb| wa * wb))
            .sum();
        let norm_a = va.values().map(|w| w * w).sum::<f64>().sqrt();
        let norm_b = vb.values().map(|w| w * w).sum::<f64>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

/// Similarity of a claim to each document, in document order.
#[must_use]
pub fn similarities(claim: &str, documents: &[String]) -> Vec<f64> {
    let claim_tokens = tokenize(claim);
    let document_tokens: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();

    let mut corpus = Vec::with_capacity(document_tokens.len() + 1);
    corpus.push(claim_tokens.clone());
    corpus.extend(document_tokens.iter().cloned());
    let model = TfIdf::fit(&corpus);

    document_tokens
        .iter()
        .map(|tokens| model.cosine(&claim_tokens, tokens))
        .collect()
}

/// Classifies an evidence document against a claim.
///
/// The pair is a contradiction when the two overlap at all and exactly one
/// side carries a negation keyword, however similar they are otherwise.
/// Failing that, evidence at or above `entailment_threshold` entails the
/// claim. Anything else is neutral.
#[must_use]
pub fn classify(claim: &str, evidence: &str, similarity: f64, entailment_threshold: f64) -> Relation {
    let claim_tokens = tokenize(claim);
    let evidence_tokens = tokenize(evidence);
    let overlaps = claim_tokens.iter().any(|t| evidence_tokens.contains(t));
    if overlaps && has_negation(&claim_tokens) != has_negation(&evidence_tokens) {
        Relation::Contradiction
    } else if similarity >= entailment_threshold {
        Relation::Entailment
    } else {
        Relation::Neutral
    }
}
