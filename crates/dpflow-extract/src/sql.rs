//! SQL extraction
//!
//! The resolver finds every table the statements touch; the catalog's output
//! patterns decide which of them are written. Everything else is read.
//! Output patterns never see comments, and their captures are brought into
//! the resolver's naming before the partition.

use dpflow_core::CompiledPatterns;
use std::sync::Arc;

use crate::extractor::Extraction;
use crate::parser::{ParseError, SqlParser};
use crate::tables::{canonical_name, TableResolver};

/// Extractor for `.sql` files
#[derive(Debug)]
pub struct SqlExtractor {
    parser: SqlParser,
    patterns: Arc<CompiledPatterns>,
}

impl SqlExtractor {
    /// Create an extractor from a parser and the `sql` catalog entry
    pub fn new(parser: SqlParser, patterns: Arc<CompiledPatterns>) -> Self {
        Self { parser, patterns }
    }

    /// Partition the tables of a SQL text into inputs and outputs
    ///
    /// Inputs keep the resolver's order with outputs removed; outputs keep
    /// pattern-match order. Unparsable text is an error, never an empty result.
    pub fn extract_text(&self, sql: &str) -> Result<Extraction, ParseError> {
        let parsed = self.parser.parse(sql)?;
        let tables = TableResolver::resolve_all(&parsed.statements);
        let outputs: Vec<String> = self
            .patterns
            .find_outputs(&blank_comments(sql))
            .iter()
            .map(|raw| canonical_name(raw))
            .collect();

        let inputs = tables
            .into_iter()
            .filter(|table| !outputs.contains(table))
            .collect();

        Ok(Extraction { inputs, outputs })
    }
}

/// Replace `--` and `/* */` comments with whitespace
///
/// Quoted text is left alone and line breaks are kept, so `^`-anchored
/// patterns still see statement starts.
fn blank_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                while chars.next_if(|&next| next != '\n').is_some() {}
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}
