//! Source files and dialect classification

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::patterns::{PYTHON_DIALECT, SQL_DIALECT};

/// Source text grammar, derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Plain `.py` script
    Script,

    /// Jupyter `.ipynb` notebook
    Notebook,

    /// `.sql` file
    Sql,
}

impl Dialect {
    /// Classify a path by extension. Returns `None` for non-source files.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" => Some(Self::Script),
            "ipynb" => Some(Self::Notebook),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    /// Graph this dialect contributes to
    pub fn group(&self) -> DialectGroup {
        match self {
            Self::Script | Self::Notebook => DialectGroup::Python,
            Self::Sql => DialectGroup::Sql,
        }
    }
}

/// One flow graph is built per group; groups are never merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectGroup {
    /// Scripts and notebooks
    Python,

    /// SQL files
    Sql,
}

impl DialectGroup {
    /// Every group, in reporting order
    pub const ALL: [DialectGroup; 2] = [DialectGroup::Python, DialectGroup::Sql];

    /// Pattern catalog key for this group
    pub fn catalog_key(&self) -> &'static str {
        match self {
            Self::Python => PYTHON_DIALECT,
            Self::Sql => SQL_DIALECT,
        }
    }

    /// Short name used in reports and output file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::Sql => "sql",
        }
    }
}

impl std::fmt::Display for DialectGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.catalog_key())
    }
}

/// A source file read from the repository. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as enumerated
    pub path: PathBuf,

    /// Dialect classification
    pub dialect: Dialect,

    /// Raw text content
    pub content: String,
}

impl SourceFile {
    /// Create a source file from already-loaded text
    pub fn new(path: impl Into<PathBuf>, dialect: Dialect, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dialect,
            content: content.into(),
        }
    }

    /// Read a file from disk. The dialect comes from its extension.
    ///
    /// Returns `Ok(None)` for files that are not sources.
    pub fn read(path: &Path) -> std::io::Result<Option<Self>> {
        let Some(dialect) = Dialect::from_path(path) else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(path)?;
        Ok(Some(Self::new(path, dialect, content)))
    }
}
