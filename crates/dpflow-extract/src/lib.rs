//! Artifact extraction from source text
//!
//! This crate handles:
//! - Script and notebook extraction with the pattern catalog
//! - SQL parsing using sqlparser-rs
//! - Table reference resolution (joins, subqueries, CTEs, batches)
//! - Dispatch from file dialect to extractor

pub mod extractor;
pub mod parser;
pub mod script;
pub mod sql;
pub mod tables;

pub use extractor::{ExtractError, Extraction, Extractor, Extractors};
pub use parser::{ParseError, ParsedSql, SqlParser};
pub use script::ScriptExtractor;
pub use sql::SqlExtractor;
pub use tables::{canonical_name, TableResolver};
