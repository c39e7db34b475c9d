//! Canonical forms and personal-claim classification.

use super::key::ClaimKey;
use super::patterns::{
    CANONICAL_PATTERNS, FIRST_PERSON, FUTURE_MARKER, LEADING_ARTICLE, OPINION,
    OWNERSHIP_RED_FLAG, PAST_MARKER, PERSONAL_RELATIONSHIP, PRESENT_MARKER, SUBJECTIVE,
};
use crate::models::{CanonicalForm, TimeContext};

/// Reduces claims to `(subject, relation, object, time)` tuples.
///
/// The canonical form feeds evidence retrieval only. Cache keys are derived
/// from the claim text by [`ClaimKey`], never from the tuple.
///
/// # Example
///
/// ```rust
/// use claimcheck::{Canonicalizer, TimeContext};
///
/// let form = Canonicalizer::canonicalize("Paris is the capital of France.");
/// assert_eq!(form.subject, "paris");
/// assert_eq!(form.relation, "capital of");
/// assert_eq!(form.object, "france");
/// assert_eq!(form.time_context, TimeContext::Present);
/// ```
pub struct Canonicalizer;

impl Canonicalizer {
    /// Decomposes a claim. The first matching surface pattern wins; otherwise
    /// the first token is the subject, the last the object, and everything in
    /// between the relation.
    #[must_use]
    pub fn canonicalize(text: &str) -> CanonicalForm {
        let cleaned = ClaimKey::normalize(text);
        let time_context = Self::time_context(text);

        for candidate in CANONICAL_PATTERNS.iter() {
            let Some(caps) = candidate.pattern.captures(&cleaned) else {
                continue;
            };
            let subject = strip_article(caps.name("subject").map_or("", |m| m.as_str()));
            let object = strip_article(caps.name("object").map_or("", |m| m.as_str()));
            if subject.is_empty() || object.is_empty() {
                continue;
            }
            let relation = candidate.fixed_relation.map_or_else(
                || {
                    let captured = caps.name("relation").map_or("", |m| m.as_str());
                    format!(
                        "{}{}{}",
                        candidate.relation_prefix,
                        collapse(captured),
                        candidate.relation_suffix
                    )
                },
                str::to_string,
            );
            tracing::trace!(pattern = candidate.name, "Canonical pattern matched");
            return CanonicalForm {
                subject,
                relation,
                object,
                time_context,
            };
        }

        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        let (subject, relation, object) = match tokens.as_slice() {
            [] => (String::new(), String::new(), String::new()),
            [only] => ((*only).to_string(), String::new(), String::new()),
            [first, middle @ .., last] => {
                ((*first).to_string(), middle.join(" "), (*last).to_string())
            },
        };
        CanonicalForm {
            subject,
            relation,
            object,
            time_context,
        }
    }

    /// Infers the temporal frame. Future markers beat past markers, which beat
    /// present markers; no marker means timeless.
    #[must_use]
    pub fn time_context(text: &str) -> TimeContext {
        if FUTURE_MARKER.is_match(text) {
            TimeContext::Future
        } else if PAST_MARKER.is_match(text) {
            TimeContext::Past
        } else if PRESENT_MARKER.is_match(text) {
            TimeContext::Present
        } else {
            TimeContext::Timeless
        }
    }

    /// Whether a claim is personal or subjective and must not be verified:
    /// first-person statements, opinion markers, evaluative vocabulary, or
    /// mentions of personal relationships.
    ///
    /// First-person ownership or authority assertions ("I am the CEO of
    /// Google") are not personal. They go through verification so the
    /// decision table can mark them false.
    #[must_use]
    pub fn is_personal(text: &str) -> bool {
        if OWNERSHIP_RED_FLAG.is_match(text) {
            return false;
        }
        FIRST_PERSON.is_match(text)
            || OPINION.is_match(text)
            || SUBJECTIVE.is_match(text)
            || PERSONAL_RELATIONSHIP.is_match(text)
    }
}

fn strip_article(part: &str) -> String {
    collapse(&LEADING_ARTICLE.replace(part.trim(), ""))
}

fn collapse(part: &str) -> String {
    part.split_whitespace().collect::<Vec<_>>().join(" ")
}
