//! Dialect dispatch
//!
//! One extractor per [`Dialect`], all behind the [`Extractor`] trait.
//! [`Extractors`] compiles the catalog once and is shared read-only by every
//! extraction worker.

use dpflow_core::{
    CompiledPatterns, Config, ConfigError, Diagnostic, DiagnosticCode, Dialect, Location, Severity,
    SourceFile, PYTHON_DIALECT, SQL_DIALECT,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::parser::SqlParser;
use crate::script::ScriptExtractor;
use crate::sql::SqlExtractor;

/// Artifact references found in one file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// Artifacts read, in discovery order (may contain duplicates)
    pub inputs: Vec<String>,

    /// Artifacts written, in discovery order (may contain duplicates)
    pub outputs: Vec<String>,
}

impl Extraction {
    /// True when no reference was found
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Per-file extraction failure. Recoverable: the file is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl ExtractError {
    /// Path of the offending file
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } => path,
        }
    }

    /// Convert to a warning diagnostic located at `display_path`
    pub fn to_diagnostic(&self, display_path: &str) -> Diagnostic {
        let (code, message) = match self {
            Self::Io { source, .. } => (
                DiagnosticCode::FileReadError,
                format!("Skipped {}: cannot read file: {}", display_path, source),
            ),
            Self::Parse { message, .. } => (
                DiagnosticCode::SqlParseError,
                format!("Skipped {}: {}", display_path, message),
            ),
        };

        Diagnostic::new(code, Severity::Warn, message).with_location(Location::new(display_path))
    }
}

/// Common extraction capability of every dialect
pub trait Extractor: Send + Sync {
    /// Extract input and output artifacts from one source file
    fn extract(&self, source: &SourceFile) -> Result<Extraction, ExtractError>;
}

impl Extractor for ScriptExtractor {
    fn extract(&self, source: &SourceFile) -> Result<Extraction, ExtractError> {
        Ok(self.extract_text(&source.content))
    }
}

impl Extractor for SqlExtractor {
    fn extract(&self, source: &SourceFile) -> Result<Extraction, ExtractError> {
        self.extract_text(&source.content)
            .map_err(|e| ExtractError::Parse {
                path: source.path.clone(),
                message: e.to_string(),
            })
    }
}

/// The extractor set for one run
#[derive(Debug)]
pub struct Extractors {
    script: ScriptExtractor,
    notebook: ScriptExtractor,
    sql: SqlExtractor,
}

impl Extractors {
    /// Compile the catalog entries every dialect needs
    ///
    /// Fails before any file is touched if an entry is missing or malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let python: Arc<CompiledPatterns> = Arc::new(config.patterns.compile(PYTHON_DIALECT)?);
        let sql = Arc::new(config.patterns.compile(SQL_DIALECT)?);

        Ok(Self {
            script: ScriptExtractor::script(Arc::clone(&python)),
            notebook: ScriptExtractor::notebook(python),
            sql: SqlExtractor::new(SqlParser::from_dialect(config.sql_dialect), sql),
        })
    }

    /// Extractor responsible for a dialect
    pub fn for_dialect(&self, dialect: Dialect) -> &dyn Extractor {
        match dialect {
            Dialect::Script => &self.script,
            Dialect::Notebook => &self.notebook,
            Dialect::Sql => &self.sql,
        }
    }

    /// Extract one source file with the extractor for its dialect
    pub fn extract(&self, source: &SourceFile) -> Result<Extraction, ExtractError> {
        self.for_dialect(source.dialect).extract(source)
    }

    /// Read a file and extract it
    ///
    /// Returns `Ok(None)` when the path is not a source file.
    pub fn extract_path(&self, path: &Path) -> Result<Option<Extraction>, ExtractError> {
        let source = SourceFile::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match source {
            Some(source) => self.extract(&source).map(Some),
            None => Ok(None),
        }
    }
}
