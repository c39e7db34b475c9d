//! Data-driven fact override table.
//!
//! Hand-authored rules for known, high-frequency claims. Each rule pairs a
//! claim pattern with a fixed verdict and supporting sources. The built-in
//! table is compiled into the binary; operators may replace it with their own
//! TOML file.

use crate::models::{EvidenceItem, Verdict};
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Provider name attached to override sources.
pub const FACT_TABLE_PROVIDER: &str = "fact_table";

const BUILTIN_TABLE: &str = include_str!("../../data/fact_overrides.toml");

/// One override rule.
#[derive(Debug, Clone)]
pub struct FactRule {
    /// Stable rule identifier.
    pub id: String,
    /// Claim pattern.
    pub pattern: Regex,
    /// Verdict returned on match.
    pub verdict: Verdict,
    /// Confidence returned on match (0-100).
    pub confidence: u8,
    /// Explanation returned on match.
    pub explanation: String,
    /// Sources backing the rule.
    pub sources: Vec<EvidenceItem>,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default, rename = "rule")]
    rules: Vec<RuleFile>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    id: String,
    pattern: String,
    verdict: String,
    confidence: u8,
    explanation: String,
    #[serde(default)]
    sources: Vec<SourceFile>,
}

#[derive(Debug, Deserialize)]
struct SourceFile {
    title: String,
    url: String,
    snippet: String,
}

/// Ordered collection of override rules. The first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct FactOverrideTable {
    rules: Vec<FactRule>,
}

impl FactOverrideTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Parses the built-in table.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded table is malformed.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TABLE)
    }

    /// Loads a table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, names
    /// an unknown verdict, or contains an invalid pattern.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_fact_overrides".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads the table at `path` if given, the built-in table otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected table cannot be loaded.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        let table = match path {
            Some(path) => Self::load(path)?,
            None => Self::builtin()?,
        };
        tracing::info!(rules = table.len(), custom = path.is_some(), "Loaded fact overrides");
        Ok(table)
    }

    /// Parses a table from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML, unknown verdicts, or invalid patterns.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: TableFile = toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("fact overrides: {e}")))?;

        let rules = file
            .rules
            .into_iter()
            .map(FactRule::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Appends a rule.
    pub fn push(&mut self, rule: FactRule) {
        self.rules.push(rule);
    }

    /// Returns the first rule matching the claim text.
    #[must_use]
    pub fn lookup(&self, claim: &str) -> Option<&FactRule> {
        self.rules.iter().find(|rule| rule.pattern.is_match(claim))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TryFrom<RuleFile> for FactRule {
    type Error = Error;

    fn try_from(rule: RuleFile) -> Result<Self> {
        let pattern = Regex::new(&rule.pattern).map_err(|e| {
            Error::InvalidInput(format!("fact override '{}': invalid pattern: {e}", rule.id))
        })?;
        let verdict = Verdict::parse(&rule.verdict).ok_or_else(|| {
            Error::InvalidInput(format!(
                "fact override '{}': unknown verdict '{}'",
                rule.id, rule.verdict
            ))
        })?;
        let sources = rule
            .sources
            .into_iter()
            .zip(1_u32..)
            .map(|(source, rank)| {
                EvidenceItem::new(FACT_TABLE_PROVIDER, source.title, source.url, source.snippet)
                    .with_rank(rank)
            })
            .collect();

        Ok(Self {
            id: rule.id,
            pattern,
            verdict,
            confidence: rule.confidence.min(100),
            explanation: rule.explanation,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    #[test]
    fn test_builtin_table_parses() {
        let table = FactOverrideTable::builtin().unwrap();
        assert!(table.len() >= 10);
    }

    #[test_case("The Eiffel Tower is in Paris", Some(Verdict::True))]
    #[test_case("The Eiffel Tower is in Berlin", Some(Verdict::False))]
    #[test_case("the earth orbits the sun", Some(Verdict::True))]
    #[test_case("The Sun revolves around the Earth", Some(Verdict::False))]
    #[test_case("The earth is flat", Some(Verdict::False))]
    #[test_case("We only use 10 percent of our brains", Some(Verdict::False))]
    #[test_case("The Great Wall of China is visible from space", Some(Verdict::False))]
    #[test_case("Sydney is the capital of Australia", Some(Verdict::False))]
    #[test_case("Elon Musk founded Tesla", Some(Verdict::Misleading))]
    #[test_case("Berlin is the capital of Germany", None)]
    fn test_builtin_lookup(claim: &str, expected: Option<Verdict>) {
        let table = FactOverrideTable::builtin().unwrap();
        assert_eq!(table.lookup(claim).map(|rule| rule.verdict), expected);
    }

    #[test]
    fn test_rule_sources_are_ranked() {
        let table = FactOverrideTable::builtin().unwrap();
        let rule = table.lookup("The Eiffel Tower is in Paris").unwrap();
        assert_eq!(rule.id, "eiffel-tower-paris");
        assert_eq!(rule.sources[0].origin.provider, FACT_TABLE_PROVIDER);
        assert_eq!(rule.sources[0].rank, Some(1));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = FactOverrideTable::from_toml_str(
            r#"
            [[rule]]
            id = "broken"
            pattern = "(unclosed"
            verdict = "true"
            confidence = 90
            explanation = "x"
            "#,
        );
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("broken")));
    }

    #[test]
    fn test_unknown_verdict_is_rejected() {
        let result = FactOverrideTable::from_toml_str(
            r#"
            [[rule]]
            id = "odd"
            pattern = "x"
            verdict = "probably"
            confidence = 90
            explanation = "x"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_custom_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[rule]]
id = "custom"
pattern = '(?i)\bpluto\s+is\s+a\s+planet\b'
verdict = "misleading"
confidence = 150
explanation = "Reclassified as a dwarf planet in 2006."
"#
        )
        .unwrap();

        let table = FactOverrideTable::load_or_builtin(Some(file.path())).unwrap();
        assert_eq!(table.len(), 1);
        let rule = table.lookup("Pluto is a planet").unwrap();
        assert_eq!(rule.verdict, Verdict::Misleading);
        assert_eq!(rule.confidence, 100);
        assert!(rule.sources.is_empty());
    }

    #[test]
    fn test_empty_table_never_matches() {
        assert!(FactOverrideTable::empty().lookup("anything").is_none());
    }
}
