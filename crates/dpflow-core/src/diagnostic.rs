//! Diagnostic codes and findings
//!
//! IMPORTANT: Diagnostic codes are stable strings.
//! NEVER rename or remove codes - report consumers match on them.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Per-file extraction failures
    /// A source file could not be opened or read
    FileReadError,

    /// A SQL file could not be parsed, so its table references are unknown
    SqlParseError,

    // Flow graph findings
    /// A simple cycle exists in the flow graph (circular data dependency)
    FlowCycle,

    /// An artifact is written by more than one file
    WriteConflict,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileReadError => "FILE_READ_ERROR",
            Self::SqlParseError => "SQL_PARSE_ERROR",
            Self::FlowCycle => "FLOW_CYCLE",
            Self::WriteConflict => "WRITE_CONFLICT",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that should fail CI
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in the scanned repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path as it appears in the flow graph
    pub file: String,
}

impl Location {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }
}

/// A finding with structured metadata
///
/// Findings are values, not errors: callers decide whether to print them,
/// log them or fail the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Offending file, when the finding is about a single file
    pub location: Option<Location>,

    /// Graph this finding belongs to (`python` or `sql`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,

    /// Node names involved (cycle members, conflicting writers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            graph: None,
            related: Vec::new(),
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Tag the diagnostic with the graph it came from
    pub fn with_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    /// Set the related node names
    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }
}
