//! Table reference resolution
//!
//! Walks parsed statements and collects every table relation, wherever it
//! appears: FROM and JOIN clauses, subqueries, CTE bodies and the targets of
//! INSERT / CREATE / UPDATE / DELETE. CTE names are not tables and are
//! dropped from the result. A CTE only shadows tables inside the statement
//! that defines it.

use sqlparser::ast::{ObjectName, Query, Statement, Visit, Visitor};
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Collects table names from SQL statements
#[derive(Debug, Default)]
pub struct TableResolver {
    /// CTE names defined anywhere in the visited statements
    ctes: HashSet<String>,

    /// Relation names in first-seen order
    relations: Vec<String>,

    seen: HashSet<String>,
}

impl TableResolver {
    /// Create a new table resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect relations from one statement
    pub fn resolve(&mut self, statement: &Statement) {
        let _ = statement.visit(self);
    }

    /// Resolve a whole batch and return its tables
    ///
    /// Each statement gets its own CTE scope; the per-statement tables are
    /// merged in first-seen order.
    pub fn resolve_all(statements: &[Statement]) -> Vec<String> {
        let mut tables = Vec::new();
        let mut seen = HashSet::new();

        for statement in statements {
            let mut resolver = Self::new();
            resolver.resolve(statement);

            for table in resolver.tables() {
                if seen.insert(table.clone()) {
                    tables.push(table);
                }
            }
        }

        tables
    }

    /// Tables referenced so far, unique, in first-seen order, CTEs excluded
    pub fn tables(&self) -> Vec<String> {
        self.relations
            .iter()
            .filter(|name| !self.ctes.contains(*name))
            .cloned()
            .collect()
    }

    /// Check if a name is a CTE
    pub fn is_cte(&self, name: &str) -> bool {
        self.ctes.contains(name)
    }
}

impl Visitor for TableResolver {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.ctes.insert(cte.alias.name.value.clone());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let name = table_name(relation);
        if self.seen.insert(name.clone()) {
            self.relations.push(name);
        }
        ControlFlow::Continue(())
    }
}

/// Render a relation name from identifier values, without quote characters
fn table_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// Bring a raw table reference into the resolver's naming
///
/// `"mart"."daily"`, `` `mart.daily` `` and `[mart].[daily]` all become
/// `mart.daily`.
pub fn canonical_name(raw: &str) -> String {
    raw.split('.')
        .map(|part| part.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']')))
        .collect::<Vec<_>>()
        .join(".")
}
