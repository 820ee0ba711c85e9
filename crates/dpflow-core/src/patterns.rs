//! Pattern catalog: per-dialect regex fragments marking artifact reads and writes
//!
//! Each dialect entry carries ordered `input_pattern` and `output_pattern`
//! fragments plus one `suffix` that captures the artifact literal. A fragment
//! is matched as `fragment + suffix`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConfigError;

/// Catalog key for `.py` / `.ipynb` sources
pub const PYTHON_DIALECT: &str = "python";

/// Catalog key for `.sql` sources
pub const SQL_DIALECT: &str = "sql";

/// Raw catalog entry as written in the config file
///
/// All keys are optional at deserialization time so that a missing key is
/// reported by [`PatternCatalog::compile`] with the dialect name attached.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Fragments marking an artifact read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_pattern: Option<Vec<String>>,

    /// Fragments marking an artifact write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_pattern: Option<Vec<String>>,

    /// Fragment appended to every pattern to capture the artifact name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl PatternEntry {
    /// Create a complete entry
    pub fn new(
        input_pattern: impl IntoIterator<Item = impl Into<String>>,
        output_pattern: impl IntoIterator<Item = impl Into<String>>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            input_pattern: Some(input_pattern.into_iter().map(Into::into).collect()),
            output_pattern: Some(output_pattern.into_iter().map(Into::into).collect()),
            suffix: Some(suffix.into()),
        }
    }
}

/// Mapping from dialect key to its pattern entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternCatalog {
    entries: BTreeMap<String, PatternEntry>,
}

impl PatternCatalog {
    /// Create an empty catalog
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or replace the entry for a dialect
    pub fn insert(&mut self, dialect: impl Into<String>, entry: PatternEntry) {
        self.entries.insert(dialect.into(), entry);
    }

    /// Builder-style [`PatternCatalog::insert`]
    pub fn with_entry(mut self, dialect: impl Into<String>, entry: PatternEntry) -> Self {
        self.insert(dialect, entry);
        self
    }

    /// Raw entry for a dialect
    pub fn get(&self, dialect: &str) -> Option<&PatternEntry> {
        self.entries.get(dialect)
    }

    /// Dialect keys present in the catalog
    pub fn dialects(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Validate and compile the entry for one dialect
    pub fn compile(&self, dialect: &str) -> Result<CompiledPatterns, ConfigError> {
        let entry = self.entries.get(dialect).ok_or_else(|| ConfigError::MissingDialect {
            dialect: dialect.to_string(),
        })?;

        let missing = |key: &str| ConfigError::MissingKey {
            dialect: dialect.to_string(),
            key: key.to_string(),
        };

        let suffix = entry.suffix.as_deref().ok_or_else(|| missing("suffix"))?;
        let inputs = entry.input_pattern.as_ref().ok_or_else(|| missing("input_pattern"))?;
        let outputs = entry.output_pattern.as_ref().ok_or_else(|| missing("output_pattern"))?;

        Ok(CompiledPatterns {
            dialect: dialect.to_string(),
            inputs: compile_all(dialect, inputs, suffix)?,
            outputs: compile_all(dialect, outputs, suffix)?,
        })
    }
}

impl Default for PatternCatalog {
    /// Built-in catalog covering common pandas/numpy idioms and SQL writes
    fn default() -> Self {
        let python = PatternEntry::new(
            [
                r"read_csv\(",
                r"read_table\(",
                r"read_excel\(",
                r"read_parquet\(",
                r"read_json\(",
                r"read_pickle\(",
                r"read_feather\(",
                r"np\.load\(",
                r"np\.loadtxt\(",
                r"pickle\.load\(open\(",
            ],
            [
                r"\.to_csv\(",
                r"\.to_excel\(",
                r"\.to_parquet\(",
                r"\.to_json\(",
                r"\.to_pickle\(",
                r"\.to_feather\(",
                r"np\.save\(",
                r"np\.savetxt\(",
                r"\.savefig\(",
            ],
            r#"["']([^"']+)["']"#,
        );

        let sql = PatternEntry::new(
            Vec::<String>::new(),
            [
                r"(?i)\bcreate\s+(?:or\s+replace\s+)?(?:temp(?:orary)?\s+)?table\s+(?:if\s+not\s+exists\s+)?",
                r"(?i)\bcreate\s+(?:or\s+replace\s+)?(?:materialized\s+)?view\s+(?:if\s+not\s+exists\s+)?",
                r"(?i)\binsert\s+(?:into|overwrite)\s+(?:table\s+)?",
                r"(?i)\bmerge\s+into\s+",
                r"(?im)(?:^|;)\s*update\s+",
            ],
            r#"((?:[`"\[]?\w+[`"\]]?)(?:\.[`"\[]?\w+[`"\]]?)*)"#,
        );

        Self::empty()
            .with_entry(PYTHON_DIALECT, python)
            .with_entry(SQL_DIALECT, sql)
    }
}

fn compile_all(dialect: &str, fragments: &[String], suffix: &str) -> Result<Vec<Regex>, ConfigError> {
    fragments
        .iter()
        .map(|fragment| {
            let pattern = format!("{}{}", fragment, suffix);
            Regex::new(&pattern).map_err(|e| ConfigError::InvalidPattern {
                dialect: dialect.to_string(),
                pattern,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Validated, compiled patterns for one dialect
///
/// Compiled once per run and shared read-only across extraction workers.
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    dialect: String,
    inputs: Vec<Regex>,
    outputs: Vec<Regex>,
}

impl CompiledPatterns {
    /// Dialect key these patterns were compiled from
    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// All input captures, catalog order across fragments, match order within
    pub fn find_inputs(&self, text: &str) -> Vec<String> {
        capture_all(&self.inputs, text)
    }

    /// All output captures, catalog order across fragments, match order within
    pub fn find_outputs(&self, text: &str) -> Vec<String> {
        capture_all(&self.outputs, text)
    }
}

/// Collect the captured value of every non-overlapping match
///
/// The value is the first participating capture group, or the whole match
/// when the pattern has no groups.
fn capture_all(patterns: &[Regex], text: &str) -> Vec<String> {
    let mut values = Vec::new();

    for pattern in patterns {
        for caps in pattern.captures_iter(text) {
            let value = caps.iter().skip(1).flatten().next().or_else(|| caps.get(0));
            if let Some(m) = value {
                values.push(m.as_str().to_string());
            }
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_compiles() {
        let catalog = PatternCatalog::default();
        assert!(catalog.compile(PYTHON_DIALECT).is_ok());
        assert!(catalog.compile(SQL_DIALECT).is_ok());
    }

    #[test]
    fn missing_dialect_is_named() {
        let catalog = PatternCatalog::empty();
        let err = catalog.compile("sql").unwrap_err();
        assert!(matches!(err, ConfigError::MissingDialect { ref dialect } if dialect == "sql"));
        assert!(err.to_string().contains("sql"));
    }

    #[test]
    fn missing_key_is_named() {
        let entry = PatternEntry {
            input_pattern: Some(vec![r"read_csv\(".to_string()]),
            output_pattern: None,
            suffix: Some(r#""([^"]+)""#.to_string()),
        };
        let catalog = PatternCatalog::empty().with_entry("python", entry);

        let err = catalog.compile("python").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey { ref dialect, ref key } if dialect == "python" && key == "output_pattern"
        ));
    }

    #[test]
    fn invalid_fragment_is_config_error() {
        let entry = PatternEntry::new([r"read_csv("], Vec::<String>::new(), r#""([^"]+)""#);
        let catalog = PatternCatalog::empty().with_entry("python", entry);

        let err = catalog.compile("python").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn captures_follow_catalog_then_match_order() {
        let entry = PatternEntry::new(
            [r"read_csv\(", r"read_json\("],
            Vec::<String>::new(),
            r#""([^"]+)""#,
        );
        let patterns = PatternCatalog::empty()
            .with_entry("python", entry)
            .compile("python")
            .unwrap();

        let text = r#"a=read_json("z.json")b=read_csv("x.csv")c=read_csv("y.csv")"#;
        assert_eq!(patterns.find_inputs(text), vec!["x.csv", "y.csv", "z.json"]);
        assert!(patterns.find_outputs(text).is_empty());
    }

    #[test]
    fn groupless_pattern_captures_whole_match() {
        let entry = PatternEntry::new([r"load:"], Vec::<String>::new(), r"\w+\.bin");
        let patterns = PatternCatalog::empty()
            .with_entry("python", entry)
            .compile("python")
            .unwrap();

        assert_eq!(patterns.find_inputs("load:model.bin"), vec!["load:model.bin"]);
    }

    #[test]
    fn sql_suffix_spans_quoted_qualified_names() {
        let patterns = PatternCatalog::default().compile(SQL_DIALECT).unwrap();

        assert_eq!(
            patterns.find_outputs(r#"INSERT INTO "mart"."daily" SELECT 1"#),
            vec![r#""mart"."daily""#]
        );
        assert_eq!(
            patterns.find_outputs("CREATE TABLE `proj.mart.daily` AS SELECT 1"),
            vec!["`proj.mart.daily`"]
        );
        assert_eq!(
            patterns.find_outputs("INSERT INTO [dbo].[daily] SELECT 1"),
            vec!["[dbo].[daily]"]
        );
    }

    #[test]
    fn sql_update_only_at_statement_start() {
        let patterns = PatternCatalog::default().compile(SQL_DIALECT).unwrap();

        assert_eq!(patterns.find_outputs("UPDATE counts SET n = 0"), vec!["counts"]);
        assert_eq!(
            patterns.find_outputs("SELECT 1;\n  update stats set n = 1"),
            vec!["stats"]
        );
        assert_eq!(
            patterns.find_outputs("INSERT INTO counts VALUES (1) ON CONFLICT (id) DO UPDATE SET n = 2"),
            vec!["counts"]
        );
    }
}
