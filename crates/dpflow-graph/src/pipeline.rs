//! End-to-end run over one repository snapshot
//!
//! discover -> extract (parallel) -> build one graph per group -> analyze.
//! Only configuration problems are fatal; everything else is a diagnostic.

use dpflow_core::{Config, ConfigError, Diagnostic, DialectGroup, ExcludeRules, Report};
use dpflow_extract::Extractors;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::{analyze, Analysis};
use crate::builder::{BuildOptions, FlowGraphBuilder};
use crate::discover::discover_sources;
use crate::graph::FlowGraph;

/// Result for one dialect group
#[derive(Debug, Clone)]
pub struct GraphRun {
    pub graph: FlowGraph,
    pub analysis: Analysis,

    /// Skipped-file warnings followed by analysis findings
    pub diagnostics: Vec<Diagnostic>,

    pub files_scanned: usize,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// One entry per dialect group, python first
    pub graphs: Vec<GraphRun>,

    /// Report over every graph, severity overrides applied
    pub report: Report,
}

impl RunOutput {
    /// The run for one group
    pub fn graph(&self, group: DialectGroup) -> Option<&GraphRun> {
        self.graphs.iter().find(|run| run.graph.group() == group)
    }
}

/// Runs the whole analysis with one config
pub struct Pipeline<'a> {
    config: &'a Config,
    extractors: Extractors,
    exclude: ExcludeRules,
}

impl<'a> Pipeline<'a> {
    /// Validate the config and compile the catalog and exclude rules
    pub fn new(config: &'a Config) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            extractors: Extractors::from_config(config)?,
            exclude: config.exclude_rules()?,
        })
    }

    /// Source files under `root`, exclude rules applied
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        discover_sources(root, &self.exclude)
    }

    /// Options for a run rooted at `root`, optionally overriding the
    /// config's directory policy
    pub fn build_options(&self, root: &Path, show_directory: Option<bool>) -> BuildOptions {
        BuildOptions {
            show_directory: show_directory.unwrap_or(self.config.show_directory),
            root: Some(root.to_path_buf()),
        }
    }

    /// Discover sources under `root` and analyze them
    pub fn run(&self, root: &Path) -> RunOutput {
        let paths = self.discover(root);
        info!(root = %root.display(), files = paths.len(), "discovered sources");

        self.run_paths(&paths, self.build_options(root, None))
    }

    /// Analyze an already enumerated file list
    pub fn run_paths(&self, paths: &[PathBuf], options: BuildOptions) -> RunOutput {
        let mut report = Report::new();
        let mut graphs = Vec::new();

        for group in DialectGroup::ALL {
            let output = FlowGraphBuilder::new(&self.extractors, group)
                .with_options(options.clone())
                .build(paths);

            let analysis = analyze(&output.graph);
            let graph_name = group.to_string();

            let diagnostics: Vec<Diagnostic> = output
                .diagnostics
                .into_iter()
                .chain(analysis.diagnostics(&graph_name))
                .map(|d| self.config.severity.apply(d))
                .collect();

            report.add_graph_stats(output.graph.stats());
            for diagnostic in &diagnostics {
                report.add_diagnostic(diagnostic.clone());
            }

            graphs.push(GraphRun {
                graph: output.graph,
                analysis,
                diagnostics,
                files_scanned: output.files_scanned,
            });
        }

        RunOutput { graphs, report }
    }
}
