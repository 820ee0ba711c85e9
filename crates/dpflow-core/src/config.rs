//! Configuration schema (dpflow.toml)

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use crate::patterns::PatternCatalog;

/// SQL dialect used by the table-reference resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// BigQuery SQL dialect
    BigQuery,

    /// Snowflake SQL dialect
    Snowflake,

    /// PostgreSQL SQL dialect
    Postgres,

    /// MySQL SQL dialect
    MySql,

    /// Generic ANSI SQL
    #[default]
    Ansi,
}

/// Severity overrides for specific diagnostic codes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of diagnostic code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a diagnostic code, or default
    pub fn get_severity(&self, code: DiagnosticCode, default: Severity) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: DiagnosticCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }

    /// Apply the override for the diagnostic's code, if any
    pub fn apply(&self, mut diagnostic: Diagnostic) -> Diagnostic {
        diagnostic.severity = self.get_severity(diagnostic.code, diagnostic.severity);
        diagnostic
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect for the table resolver
    #[serde(default)]
    pub sql_dialect: SqlDialect,

    /// Keep directories in node names.
    ///
    /// When false, file and artifact names are reduced to their last path
    /// component. This is lossy: two files named `x.py` in
    /// different directories become one node.
    #[serde(default = "default_show_directory")]
    pub show_directory: bool,

    /// Repository-relative paths to skip: globs, or plain directory prefixes
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Severity thresholds
    #[serde(default)]
    pub severity: SeverityThreshold,

    /// Pattern catalog. A config that declares `[patterns]` replaces the
    /// built-in catalog as a whole.
    #[serde(default)]
    pub patterns: PatternCatalog,
}

fn default_show_directory() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sql_dialect: SqlDialect::default(),
            show_directory: default_show_directory(),
            exclude: Vec::new(),
            severity: SeverityThreshold::default(),
            patterns: PatternCatalog::default(),
        }
    }
}

impl Config {
    /// Load config from a file
    ///
    /// `.json` files are read as a bare pattern catalog keyed by dialect
    /// (the `data_io_format.json` layout); everything else is TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_catalog_json(&contents)
        } else {
            Self::from_toml(&contents)
        }
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Build a default config around a JSON pattern catalog
    pub fn from_catalog_json(json: &str) -> Result<Self, ConfigError> {
        let patterns: PatternCatalog = serde_json::from_str(json)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(Self {
            patterns,
            ..Self::default()
        })
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Compile the `exclude` list
    ///
    /// Entries with glob metacharacters are globs where `*` also crosses `/`;
    /// anything else excludes that path and everything below it.
    pub fn exclude_rules(&self) -> Result<ExcludeRules, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        let mut prefixes = Vec::new();

        for pattern in &self.exclude {
            if pattern.contains(|c| matches!(c, '*' | '?' | '[' | '{')) {
                let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidExclude {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                builder.add(glob);
            } else {
                prefixes.push(pattern.trim_end_matches('/').to_string());
            }
        }

        let globs = builder.build().map_err(|e| ConfigError::InvalidExclude {
            pattern: self.exclude.join(", "),
            message: e.to_string(),
        })?;

        Ok(ExcludeRules { globs, prefixes })
    }
}

/// Compiled `exclude` rules
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    globs: GlobSet,
    prefixes: Vec<String>,
}

impl ExcludeRules {
    /// Rules that exclude nothing
    pub fn none() -> Self {
        Self {
            globs: GlobSet::empty(),
            prefixes: Vec::new(),
        }
    }

    /// Check if a repository-relative, `/`-separated path is excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.globs.is_match(path)
            || self.prefixes.iter().any(|prefix| {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .map(|rest| rest.starts_with('/'))
                        .unwrap_or(false)
            })
    }
}

/// Config error types
///
/// Any of these aborts the run before extraction starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Pattern catalog has no entry for dialect '{dialect}'")]
    MissingDialect { dialect: String },

    #[error("Pattern catalog entry '{dialect}' is missing key '{key}'")]
    MissingKey { dialect: String, key: String },

    #[error("Pattern catalog entry '{dialect}' has invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        dialect: String,
        pattern: String,
        message: String,
    },

    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidExclude { pattern: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PYTHON_DIALECT, SQL_DIALECT};

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.sql_dialect, SqlDialect::Ansi);
        assert!(config.show_directory);
        assert!(config.patterns.get(PYTHON_DIALECT).is_some());
        assert!(config.patterns.get(SQL_DIALECT).is_some());
    }

    #[test]
    fn severity_override() {
        let mut threshold = SeverityThreshold::default();
        threshold.set_override(DiagnosticCode::FlowCycle, Severity::Error);

        assert_eq!(
            threshold.get_severity(DiagnosticCode::FlowCycle, Severity::Warn),
            Severity::Error
        );
        assert_eq!(
            threshold.get_severity(DiagnosticCode::WriteConflict, Severity::Warn),
            Severity::Warn
        );
    }

    #[test]
    fn toml_with_patterns() {
        let toml = r#"
            sql_dialect = "postgres"
            show_directory = false
            exclude = ["venv/*"]

            [severity.overrides]
            WRITE_CONFLICT = "error"

            [patterns.python]
            input_pattern = ['read_csv\(']
            output_pattern = ['\.to_csv\(']
            suffix = '"([^"]+)"'
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.sql_dialect, SqlDialect::Postgres);
        assert!(!config.show_directory);
        assert_eq!(
            config.severity.get_severity(DiagnosticCode::WriteConflict, Severity::Warn),
            Severity::Error
        );

        // Declared catalog replaces the built-in one
        assert!(config.patterns.compile(PYTHON_DIALECT).is_ok());
        assert!(matches!(
            config.patterns.compile(SQL_DIALECT),
            Err(ConfigError::MissingDialect { .. })
        ));
    }

    #[test]
    fn catalog_json_layout() {
        let json = r#"{
            "python": {
                "input_pattern": ["read_csv\\("],
                "output_pattern": ["to_csv\\("],
                "suffix": "\"([^\"]+)\""
            },
            "sql": {
                "input_pattern": [],
                "output_pattern": ["INSERT INTO "],
                "suffix": "(\\w+)"
            }
        }"#;

        let config = Config::from_catalog_json(json).unwrap();
        assert!(config.show_directory);
        assert!(config.patterns.compile(PYTHON_DIALECT).is_ok());
        assert!(config.patterns.compile(SQL_DIALECT).is_ok());
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn exclusion_rules() {
        let config = Config {
            exclude: vec![
                "venv/*".to_string(),
                "build".to_string(),
                "*.tmp.py".to_string(),
                "*/build/*".to_string(),
            ],
            ..Config::default()
        };
        let rules = config.exclude_rules().unwrap();

        assert!(rules.is_excluded("venv/lib/site.py"));
        assert!(rules.is_excluded("build/gen.py"));
        assert!(rules.is_excluded("scripts/x.tmp.py"));
        assert!(rules.is_excluded("pkg/build/gen.py"));
        assert!(rules.is_excluded("a/b/build/c/gen.sql"));
        assert!(!rules.is_excluded("scripts/process1.py"));
        assert!(!rules.is_excluded("buildings/a.py"));
        assert!(!rules.is_excluded("pkg/builder/gen.py"));
    }

    #[test]
    fn invalid_exclude_glob_is_config_error() {
        let config = Config {
            exclude: vec!["data/[abc".to_string()],
            ..Config::default()
        };

        let err = config.exclude_rules().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExclude { ref pattern, .. } if pattern == "data/[abc"));
    }

    #[test]
    fn no_rules_exclude_nothing() {
        assert!(!ExcludeRules::none().is_excluded("anything.py"));
        assert!(!Config::default().exclude_rules().unwrap().is_excluded("venv/x.py"));
    }
}
