//! dpflow core
//!
//! Shared domain model: configuration and pattern catalog, source file
//! classification, diagnostics and the versioned report.
//! Never rename diagnostic codes - they are part of the public API.

pub mod config;
pub mod diagnostic;
pub mod patterns;
pub mod report;
pub mod source;

pub use config::{Config, ConfigError, ExcludeRules, SeverityThreshold, SqlDialect};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use patterns::{CompiledPatterns, PatternCatalog, PatternEntry, PYTHON_DIALECT, SQL_DIALECT};
pub use report::{GraphStats, Report, ReportSummary, ReportVersion};
pub use source::{Dialect, DialectGroup, SourceFile};
