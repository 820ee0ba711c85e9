//! SQL parsing using sqlparser-rs
//!
//! Parses SQL into an AST with the configured dialect.

use dpflow_core::SqlDialect;
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect, Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SnowflakeDialect,
};
use sqlparser::parser::{Parser, ParserError};

/// SQL parser with configurable dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect + Send + Sync>,
}

impl SqlParser {
    /// Create a new SQL parser with the default (generic) dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: SqlDialect) -> Self {
        let dialect: Box<dyn Dialect + Send + Sync> = match dialect {
            SqlDialect::BigQuery => Box::new(BigQueryDialect {}),
            SqlDialect::Snowflake => Box::new(SnowflakeDialect {}),
            SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySql => Box::new(MySqlDialect {}),
            SqlDialect::Ansi => Box::new(GenericDialect {}),
        };

        Self { dialect }
    }

    /// Parse SQL string into AST
    pub fn parse(&self, sql: &str) -> Result<ParsedSql, ParseError> {
        Parser::parse_sql(&*self.dialect, sql)
            .map(|statements| ParsedSql { statements })
            .map_err(|error| ParseError { error })
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SqlParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlParser").finish_non_exhaustive()
    }
}

/// Successfully parsed SQL
#[derive(Debug, Clone)]
pub struct ParsedSql {
    /// Parsed statements, in batch order
    pub statements: Vec<Statement>,
}

impl ParsedSql {
    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// SQL parsing error
#[derive(Debug)]
pub struct ParseError {
    /// Parser error from sqlparser
    pub error: ParserError,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SQL parse error: {}", self.error)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_select() {
        let parser = SqlParser::new();
        let parsed = parser.parse("SELECT id, name FROM users WHERE active = true").unwrap();
        assert_eq!(parsed.statement_count(), 1);
    }

    #[test]
    fn parse_batch() {
        let parser = SqlParser::new();
        let sql = "CREATE TABLE a AS SELECT * FROM b; INSERT INTO c SELECT * FROM a;";
        let parsed = parser.parse(sql).unwrap();
        assert_eq!(parsed.statement_count(), 2);
    }

    #[test]
    fn parse_invalid_sql() {
        let parser = SqlParser::new();
        let err = parser.parse("SELEC * FRM broken").unwrap_err();
        assert!(err.to_string().starts_with("SQL parse error"));
    }

    #[test]
    fn different_dialects() {
        let sql = "SELECT id FROM users";

        for dialect in [
            SqlDialect::Ansi,
            SqlDialect::BigQuery,
            SqlDialect::Postgres,
            SqlDialect::Snowflake,
            SqlDialect::MySql,
        ] {
            assert!(SqlParser::from_dialect(dialect).parse(sql).is_ok());
        }
    }
}
