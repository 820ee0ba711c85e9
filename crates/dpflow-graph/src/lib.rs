//! Flow graph construction and analysis
//!
//! This crate handles:
//! - Discovering source files in a repository
//! - Building one flow graph per dialect group (files and artifacts)
//! - Cycle detection and write-conflict detection
//! - Running the whole pipeline and producing a report

pub mod analysis;
pub mod builder;
pub mod discover;
pub mod graph;
pub mod pipeline;

pub use analysis::{analyze, find_cycles, find_write_conflicts, Analysis, Cycle, WriteConflict};
pub use builder::{normalize_name, BuildOptions, BuildOutput, FlowGraphBuilder};
pub use discover::discover_sources;
pub use graph::{FlowGraph, FlowNode, NodeIndex, NodeKind};
pub use pipeline::{GraphRun, Pipeline, RunOutput};
