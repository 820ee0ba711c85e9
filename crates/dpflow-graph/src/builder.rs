//! Flow graph construction
//!
//! Extraction runs on the rayon pool, one task per file. The results are then
//! merged into the graph by a single writer, in enumeration order.

use dpflow_core::{Diagnostic, Dialect, DialectGroup, SourceFile};
use dpflow_extract::{ExtractError, Extraction, Extractors};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::graph::FlowGraph;

/// Naming policy for graph nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Keep directories in file and artifact names.
    ///
    /// When false every name is reduced to its last path component. This is
    /// lossy: `a/dir1/x.py` and `a/dir2/x.py` become one node
    /// `x.py`, which lets artifacts be aggregated across directories.
    pub show_directory: bool,

    /// File node names are made relative to this root when set
    pub root: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            show_directory: true,
            root: None,
        }
    }
}

/// A built graph plus what went wrong while building it
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: FlowGraph,

    /// One warning per skipped file
    pub diagnostics: Vec<Diagnostic>,

    /// Files of this group that were attempted
    pub files_scanned: usize,
}

/// Builds the flow graph of one dialect group
pub struct FlowGraphBuilder<'a> {
    extractors: &'a Extractors,
    group: DialectGroup,
    options: BuildOptions,
}

impl<'a> FlowGraphBuilder<'a> {
    pub fn new(extractors: &'a Extractors, group: DialectGroup) -> Self {
        Self {
            extractors,
            group,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn show_directory(mut self, show_directory: bool) -> Self {
        self.options.show_directory = show_directory;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.root = Some(root.into());
        self
    }

    /// Read, extract and merge every path of this builder's group
    ///
    /// Paths of other groups and non-source paths are ignored. Unreadable or
    /// unparsable files are skipped with a warning diagnostic.
    pub fn build(&self, paths: &[PathBuf]) -> BuildOutput {
        let selected: Vec<&PathBuf> = paths
            .iter()
            .filter(|path| self.accepts(Dialect::from_path(path)))
            .collect();

        let results: Vec<(String, Result<Extraction, ExtractError>)> = selected
            .par_iter()
            .map(|path| {
                let label = self.file_label(path);
                let result = self
                    .extractors
                    .extract_path(path)
                    .map(Option::unwrap_or_default);
                (label, result)
            })
            .collect();

        self.merge(results)
    }

    /// Extract and merge already-loaded sources of this builder's group
    pub fn build_sources(&self, sources: &[SourceFile]) -> BuildOutput {
        let results: Vec<(String, Result<Extraction, ExtractError>)> = sources
            .par_iter()
            .filter(|source| self.accepts(Some(source.dialect)))
            .map(|source| (self.file_label(&source.path), self.extractors.extract(source)))
            .collect();

        self.merge(results)
    }

    fn accepts(&self, dialect: Option<Dialect>) -> bool {
        dialect.map(|d| d.group() == self.group).unwrap_or(false)
    }

    /// Single-writer merge of extraction results
    fn merge(&self, results: Vec<(String, Result<Extraction, ExtractError>)>) -> BuildOutput {
        let mut graph = FlowGraph::new(self.group);
        let mut diagnostics = Vec::new();
        let files_scanned = results.len();

        for (label, result) in results {
            let extraction = match result {
                Ok(extraction) => extraction,
                Err(e) => {
                    warn!(file = %label, error = %e, "skipping file");
                    diagnostics.push(e.to_diagnostic(&label).with_graph(self.group.to_string()));
                    continue;
                }
            };

            debug!(
                file = %label,
                inputs = extraction.inputs.len(),
                outputs = extraction.outputs.len(),
                "extracted"
            );

            graph.add_file(label.as_str());

            for input in &extraction.inputs {
                graph.add_read(&label, &self.artifact_name(input));
            }

            for output in &extraction.outputs {
                graph.add_write(&label, &self.artifact_name(output));
            }
        }

        info!(
            graph = %self.group,
            files = files_scanned,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "flow graph built"
        );

        BuildOutput {
            graph,
            diagnostics,
            files_scanned,
        }
    }

    /// Node name for a source file
    pub fn file_label(&self, path: &Path) -> String {
        let relative = self
            .options
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);

        normalize_name(&relative.to_string_lossy(), self.options.show_directory)
    }

    /// Node name for an artifact reference
    pub fn artifact_name(&self, artifact: &str) -> String {
        normalize_name(artifact, self.options.show_directory)
    }
}

/// Canonicalize separators to `/`; keep only the last component unless
/// `show_directory` is set.
pub fn normalize_name(name: &str, show_directory: bool) -> String {
    let canonical = name.replace('\\', "/");

    if show_directory {
        return canonical;
    }

    let trimmed = canonical.trim_end_matches('/');
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use dpflow_core::{Config, DiagnosticCode};
    use pretty_assertions::assert_eq;

    fn extractors() -> Extractors {
        Extractors::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn normalize_separators() {
        assert_eq!(normalize_name(r"data\raw\a.csv", true), "data/raw/a.csv");
        assert_eq!(normalize_name(r"data\raw\a.csv", false), "a.csv");
        assert_eq!(normalize_name("a/dir1/x.py", false), "x.py");
        assert_eq!(normalize_name("plain.csv", false), "plain.csv");
        assert_eq!(normalize_name("out/dir/", false), "dir");
        assert_eq!(normalize_name("mart.daily", false), "mart.daily");
    }

    #[test]
    fn builds_edges_for_group_only() {
        let extractors = extractors();
        let sources = vec![
            SourceFile::new("p.py", Dialect::Script, "pd.read_csv('a.csv').to_csv('b.csv')"),
            SourceFile::new("q.sql", Dialect::Sql, "INSERT INTO t2 SELECT * FROM t1"),
        ];

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Python).build_sources(&sources);
        assert_eq!(output.files_scanned, 1);
        assert_eq!(output.graph.file_count(), 1);
        assert_eq!(output.graph.artifact_count(), 2);
        assert!(output.graph.find(NodeKind::File, "q.sql").is_none());

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Sql).build_sources(&sources);
        assert_eq!(output.graph.file_count(), 1);
        assert!(output.graph.find(NodeKind::Artifact, "t1").is_some());
    }

    #[test]
    fn repeated_reads_collapse_to_one_edge() {
        let extractors = extractors();
        let code = "a = pd.read_csv('x.csv')\nb = pd.read_csv('x.csv')\nc = pd.read_csv('x.csv')\n";
        let sources = vec![SourceFile::new("job.py", Dialect::Script, code)];

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Python).build_sources(&sources);
        assert_eq!(output.graph.edge_count(), 1);
    }

    #[test]
    fn file_without_references_is_still_a_node() {
        let extractors = extractors();
        let sources = vec![SourceFile::new("util.py", Dialect::Script, "def f():\n    return 1\n")];

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Python).build_sources(&sources);
        assert_eq!(output.graph.node_count(), 1);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn same_basename_collapses_without_directories() {
        let extractors = extractors();
        let sources = vec![
            SourceFile::new("a/dir1/x.py", Dialect::Script, "df.to_csv('out.csv')"),
            SourceFile::new("a/dir2/x.py", Dialect::Script, "df.to_csv('out.csv')"),
        ];

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Python)
            .show_directory(false)
            .build_sources(&sources);

        assert_eq!(output.graph.file_count(), 1);
        assert!(output.graph.find(NodeKind::File, "x.py").is_some());
        assert_eq!(output.graph.edge_count(), 1);

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Python).build_sources(&sources);
        assert_eq!(output.graph.file_count(), 2);
        assert_eq!(output.graph.edge_count(), 2);
    }

    #[test]
    fn artifact_directories_are_stripped_when_hidden() {
        let extractors = extractors();
        let sources = vec![
            SourceFile::new("a.py", Dialect::Script, "df.to_csv('data/out.csv')"),
            SourceFile::new("b.py", Dialect::Script, r"x = pd.read_csv('other\out.csv')"),
        ];

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Python)
            .show_directory(false)
            .build_sources(&sources);

        assert_eq!(output.graph.artifact_count(), 1);
        assert!(output.graph.find(NodeKind::Artifact, "out.csv").is_some());
    }

    #[test]
    fn file_labels_are_root_relative() {
        let extractors = extractors();
        let builder = FlowGraphBuilder::new(&extractors, DialectGroup::Python).root("/repo");

        assert_eq!(builder.file_label(Path::new("/repo/jobs/a.py")), "jobs/a.py");
        assert_eq!(builder.file_label(Path::new("/elsewhere/b.py")), "/elsewhere/b.py");
    }

    #[test]
    fn broken_sql_is_skipped_with_warning() {
        let extractors = extractors();
        let sources = vec![
            SourceFile::new("bad.sql", Dialect::Sql, "SELEC * FRM"),
            SourceFile::new("good.sql", Dialect::Sql, "INSERT INTO b SELECT * FROM a"),
        ];

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Sql).build_sources(&sources);

        assert_eq!(output.files_scanned, 2);
        assert_eq!(output.graph.file_count(), 1);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::SqlParseError);
        assert_eq!(output.diagnostics[0].location.as_ref().unwrap().file, "bad.sql");
        assert_eq!(output.diagnostics[0].graph.as_deref(), Some("sql"));
    }

    #[test]
    fn unreadable_path_is_skipped_with_warning() {
        let extractors = extractors();
        let paths = vec![PathBuf::from("definitely/missing/job.py")];

        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Python).build(&paths);

        assert!(output.graph.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::FileReadError);
    }

    #[test]
    fn empty_input_builds_empty_graph() {
        let extractors = extractors();
        let output = FlowGraphBuilder::new(&extractors, DialectGroup::Sql).build(&[]);

        assert!(output.graph.is_empty());
        assert!(output.diagnostics.is_empty());
        assert_eq!(output.files_scanned, 0);
    }
}
