//! Claim detection patterns.
//!
//! Static pattern data for filtering and scoring transcript spans, and for
//! decomposing claims into canonical forms.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use crate::models::ClaimTag;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// A scoring heuristic: a pattern worth a fixed number of points.
#[derive(Debug)]
pub struct ClaimSignal {
    /// The regex pattern to match against the span.
    pub pattern: Regex,
    /// Points contributed when the pattern matches.
    pub points: u8,
    /// The tag this signal suggests.
    pub tag: ClaimTag,
    /// Human-readable description of the signal.
    pub description: &'static str,
}

/// Points for a detected named entity.
pub const NAMED_ENTITY_POINTS: u8 = 20;

/// Points for a quantity that is not a year.
pub const NUMBER_POINTS: u8 = 15;

/// Independent scoring heuristics. Each contributes its points at most once.
pub static CLAIM_SIGNALS: LazyLock<Vec<ClaimSignal>> = LazyLock::new(|| {
    vec![
        ClaimSignal {
            pattern: Regex::new(r"\b(1[0-9]{3}|20[0-9]{2})\b").expect("static regex: year"),
            points: 25,
            tag: ClaimTag::Statistical,
            description: "4-digit year",
        },
        ClaimSignal {
            pattern: Regex::new(
                r"(?i)\b(owns?|owned|founded|co-?founded|created|invented|acquired|bought|belongs\s+to|(ceo|founder|owner|chairman|president)\s+of)\b",
            )
            .expect("static regex: ownership"),
            points: 25,
            tag: ClaimTag::Ownership,
            description: "ownership assertion",
        },
        ClaimSignal {
            pattern: Regex::new(
                r"(?i)\b(president|prime\s+minister|capital|country|nation|city|continent|ocean|river|mountain|population|government|senator|congress|parliament|elected|election|border|king|queen|minister)\b",
            )
            .expect("static regex: geopolitical"),
            points: 20,
            tag: ClaimTag::Geopolitical,
            description: "political/geographic vocabulary",
        },
        ClaimSignal {
            pattern: Regex::new(
                r"\b(is|are|was|were)\s+((located|situated|based|found)\s+)?(in|on|near)\s+(the\s+)?[A-Z]",
            )
            .expect("static regex: location"),
            points: 20,
            tag: ClaimTag::Geopolitical,
            description: "location preposition with a proper noun",
        },
        ClaimSignal {
            pattern: Regex::new(
                r"(?i)\b((is|are)\s+(a|an)\s+(type|kind|form|species|member|part)\s+of|is\s+defined\s+as|means|refers\s+to|stands\s+for|is\s+known\s+as|consists\s+of|is\s+made\s+of)\b",
            )
            .expect("static regex: definitional"),
            points: 15,
            tag: ClaimTag::Definitional,
            description: "definitional phrasing",
        },
        ClaimSignal {
            pattern: Regex::new(r"(?i)\b(is|are|was|were)\s+(the|a|an)\s+\w+")
                .expect("static regex: copula"),
            points: 20,
            tag: ClaimTag::Factual,
            description: "X is/are/was the Y",
        },
        ClaimSignal {
            pattern: Regex::new(
                r"(?i)\b(orbits?|revolves?\s+around|boils?|freezes?|speed\s+of\s+light|gravity|planet|degrees)\b",
            )
            .expect("static regex: scientific"),
            points: 15,
            tag: ClaimTag::Factual,
            description: "scientific vocabulary",
        },
    ]
});

/// Digit sequences (years are filtered out by the caller).
pub static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d[\d,.]*\b").expect("static regex: number"));

/// Quantity words that count as a number.
pub static QUANTITY_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(percent|hundred|thousand|million|billion|trillion|dozen)\b")
        .expect("static regex: quantity word")
});

/// Exactly a 4-digit year.
pub static YEAR_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(1[0-9]{3}|20[0-9]{2})$").expect("static regex: year only"));

/// Capitalized word runs, including acronyms.
pub static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][\w'\-]*(?:\s+(?:of\s+|de\s+|von\s+|van\s+)?[A-Z][\w'\-]*)*")
        .expect("static regex: capitalized run")
});

/// Capitalized words that never start an entity on their own.
pub static ENTITY_STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "The", "A", "An", "It", "Its", "This", "That", "These", "Those", "I", "I'm", "I've",
        "We", "He", "She", "They", "You", "And", "But", "Or", "So", "In", "On", "At", "If",
        "When", "Then", "There", "Here", "My", "Our", "Your", "His", "Her", "Their", "Yes",
        "No", "Well", "Also", "Actually", "Today", "Now", "Every", "Some", "Many", "Most",
    ]
    .into_iter()
    .collect()
});

/// Sentence-level splitter: terminal punctuation followed by whitespace.
pub static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("static regex: sentence boundary"));

/// Clause-level splitter: commas, semicolons, and coordinating conjunctions.
pub static CLAUSE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[,;]\s+|\s+(?:and|but|or|so|yet)\s+")
        .expect("static regex: clause boundary")
});

/// Whole-fragment greetings and fillers.
pub static GREETING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:hi|hello|hey|howdy|greetings|good\s+(?:morning|afternoon|evening|night)|welcome|thanks|thank\s+you|bye|goodbye|see\s+you)(?:\s+[\w']+){0,2}|(?:um+|uh+|hmm+|er+|ah+|oh|okay|ok|alright|right|yeah|yes|no|well|so|like|you\s+know|i\s+mean|anyway)(?:\s+(?:um+|uh+|so|like|well|yeah|okay|ok))*)[.!?]*$",
    )
    .expect("static regex: greeting/filler")
});

/// Leading fillers stripped from an otherwise useful fragment.
pub static LEADING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:um+|uh+|so|well|like|okay|ok|yeah|you\s+know|i\s+mean|anyway|actually),?\s+)+")
        .expect("static regex: leading filler")
});

/// Question shapes (terminal `?` is checked separately).
pub static QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:who|what|when|where|why|how|which|whose|whom)\b|^(?:is|are|was|were|do|does|did|can|could|would|should|will|shall|has|have|had)\s+(?:you|we|they|i|he|she|it|there|this|that)\b",
    )
    .expect("static regex: question")
});

/// First-person opinion markers.
pub static OPINION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:i|we)\s+(?:really\s+)?(?:think|believe|feel|guess|suppose|reckon|hope|wish|love|like|hate|prefer|bet|doubt|assume)\b|\bin\s+my\s+(?:opinion|view|experience)\b|\b(?:personally|imo|imho)\b|\bi'm\s+(?:pretty\s+)?(?:sure|not\s+sure|convinced)\b|\bit\s+seems\s+(?:to\s+me|like)\b",
    )
    .expect("static regex: opinion")
});

/// First-person pronouns.
pub static FIRST_PERSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:i|i'm|i've|i'd|me|my|mine|myself|we|we're|our|ours)\b")
        .expect("static regex: first person")
});

/// Evaluative use of subjective vocabulary: a copula or sense verb followed
/// by a lowercase evaluative adjective ("pizza is the best"), or words that
/// are evaluative anywhere. Capitalized words such as "the Great Wall" and
/// "Alexander the Great" never match.
pub static SUBJECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:\b(?:is|are|was|were|looks?|seems?|tastes?|sounds?|feels?)\s+(?:(?:the|a|an|so|really|very|truly|just|pretty|absolutely)\s+)*)(?:best|worst|awesome|amazing|terrible|horrible|beautiful|ugly|delicious|disgusting|boring|great|wonderful|lovely|nice|cool)(?:$|[^\w-])|\b(?:favou?rite|overrated|underrated)\b",
    )
    .expect("static regex: subjective")
});

/// Mentions of personal relationships.
pub static PERSONAL_RELATIONSHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:my|our)\s+(?:wife|husband|partner|mom|mother|dad|father|brother|sister|son|daughter|friend|boss|girlfriend|boyfriend|family|kids?|neighbou?r|cousin|uncle|aunt|grandma|grandpa)\b",
    )
    .expect("static regex: personal relationship")
});

/// First-person ownership or authority assertions that cannot be verified
/// externally and are treated as red flags.
pub static OWNERSHIP_RED_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:i|we)\s+(?:own|owned|founded|created|invented|built|bought|run)\b|\bi(?:'m|\s+am)\s+the\s+(?:ceo|owner|founder|president|inventor|creator)\b|\b(?:my|our)\s+company\s+(?:owns|bought|acquired)\b",
    )
    .expect("static regex: ownership red flag")
});

/// Canonicalization surface pattern with named captures.
#[derive(Debug)]
pub struct CanonicalPattern {
    /// The pattern; captures `subject`, optional `relation`, and `object`.
    pub pattern: Regex,
    /// Relation used when the pattern has no `relation` capture.
    pub fixed_relation: Option<&'static str>,
    /// Prefix prepended to a captured relation.
    pub relation_prefix: &'static str,
    /// Suffix appended to a captured relation.
    pub relation_suffix: &'static str,
    /// Human-readable name.
    pub name: &'static str,
}

/// Ordered canonicalization patterns; the first match wins.
pub static CANONICAL_PATTERNS: LazyLock<Vec<CanonicalPattern>> = LazyLock::new(|| {
    vec![
        CanonicalPattern {
            pattern: Regex::new(
                r"(?i)^(?P<subject>.+?)\s+(?:is|are|was|were|will\s+be)\s+(?:the\s+|a\s+|an\s+)?(?P<relation>[\w\-]+(?:\s+[\w\-]+)?)\s+of\s+(?P<object>.+)$",
            )
            .expect("static regex: copula with of"),
            fixed_relation: None,
            relation_prefix: "",
            relation_suffix: " of",
            name: "copula-with-of",
        },
        CanonicalPattern {
            pattern: Regex::new(
                r"(?i)^(?P<subject>.+?)\s+(?P<relation>is|are|was|were|will\s+be)\s+(?:the|a|an)\s+(?P<object>.+)$",
            )
            .expect("static regex: copula without of"),
            fixed_relation: None,
            relation_prefix: "",
            relation_suffix: "",
            name: "copula-without-of",
        },
        CanonicalPattern {
            pattern: Regex::new(
                r"(?i)^(?P<subject>.+?)\s+(?:(?:is|are|was|were|will\s+be)\s+)?(?:(?:located|situated|based|found)\s+)?(?P<relation>in|at|on|near)\s+(?P<object>.+)$",
            )
            .expect("static regex: location"),
            fixed_relation: None,
            relation_prefix: "located ",
            relation_suffix: "",
            name: "location-preposition",
        },
        CanonicalPattern {
            pattern: Regex::new(
                r"(?i)^(?P<subject>.+?)\s+(?:orbits?|orbited|revolves?\s+around|revolved\s+around|rotates?\s+around|circles)\s+(?P<object>.+)$",
            )
            .expect("static regex: orbit"),
            fixed_relation: Some("orbits"),
            relation_prefix: "",
            relation_suffix: "",
            name: "orbit",
        },
        CanonicalPattern {
            pattern: Regex::new(r"^(?P<subject>\S+)\s+(?P<relation>\S+)\s+(?P<object>\S+)$")
                .expect("static regex: three tokens"),
            fixed_relation: None,
            relation_prefix: "",
            relation_suffix: "",
            name: "three-token",
        },
    ]
});

/// Future tense markers.
pub static FUTURE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:will|shall|won't|going\s+to|gonna|tomorrow|next\s+(?:year|month|week|decade))\b")
        .expect("static regex: future")
});

/// Past tense markers.
pub static PAST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:was|were|had|did|became|founded|invented|discovered|created|built|died|born|won|lost|elected|signed|ago|formerly|used\s+to|yesterday|last\s+(?:year|month|week|decade))\b",
    )
    .expect("static regex: past")
});

/// Present tense markers.
pub static PRESENT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:is|are|am|has|have|does|do|currently|now|today|nowadays)\b")
        .expect("static regex: present")
});

/// Articles stripped from the edges of canonical parts.
pub static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:the|a|an)\s+").expect("static regex: article"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_signals_have_points() {
        assert!(CLAIM_SIGNALS.iter().all(|s| s.points > 0));
    }

    #[test]
    fn test_greeting_matches_short_greetings_only() {
        assert!(GREETING_FILLER.is_match("Hi everyone"));
        assert!(GREETING_FILLER.is_match("um so"));
        assert!(!GREETING_FILLER.is_match("Hi everyone the Eiffel Tower is in Paris"));
    }

    #[test]
    fn test_opinion_detection() {
        assert!(OPINION.is_match("I think pizza is great"));
        assert!(OPINION.is_match("in my opinion it is fine"));
        assert!(!OPINION.is_match("Paris is the capital of France"));
    }

    #[test]
    fn test_question_detection() {
        assert!(QUESTION.is_match("What is the capital of France"));
        assert!(QUESTION.is_match("Do you know the answer"));
        assert!(!QUESTION.is_match("Paris is the capital of France"));
    }

    #[test]
    fn test_subjective_needs_evaluative_use() {
        assert!(SUBJECTIVE.is_match("Pizza is the best food"));
        assert!(SUBJECTIVE.is_match("The view was absolutely beautiful"));
        assert!(SUBJECTIVE.is_match("That movie is overrated"));
        assert!(!SUBJECTIVE.is_match("The Great Wall of China is in China"));
        assert!(!SUBJECTIVE.is_match("Alexander the Great founded Alexandria in 331 BC"));
        assert!(!SUBJECTIVE.is_match("The law says drivers should stop at red lights"));
        assert!(!SUBJECTIVE.is_match("The iPhone was the best-selling phone in 2015"));
    }

    #[test]
    fn test_red_flag_detection() {
        assert!(OWNERSHIP_RED_FLAG.is_match("I own Tesla"));
        assert!(OWNERSHIP_RED_FLAG.is_match("I am the CEO of Google"));
        assert!(!OWNERSHIP_RED_FLAG.is_match("Elon Musk owns Tesla"));
    }
}
