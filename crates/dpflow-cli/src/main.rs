use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dpflow_core::{Config, DialectGroup, Report, Severity};
use dpflow_graph::{Pipeline, RunOutput};

mod render;

/// dpflow - Data processing flow verification for script and SQL repositories
#[derive(Parser)]
#[command(name = "dpflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dpflow.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use bare file names for nodes (same-named files collapse)
    #[arg(long, global = true)]
    no_directory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build both flow graphs and report cycles and write conflicts
    Check {
        /// Repository root to scan
        repo: PathBuf,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },

    /// Write both flow graphs as Graphviz DOT files
    Graph {
        /// Repository root to scan
        repo: PathBuf,

        /// Directory for the .dot files (default: the repository root)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    if cli.verbose {
        eprintln!("{} sql dialect: {:?}", "Using".cyan(), config.sql_dialect);
    }

    match cli.command {
        Commands::Check { repo, output, markdown } => {
            check_command(&config, &repo, &output, markdown.as_deref(), cli.no_directory, cli.verbose)
        }
        Commands::Graph { repo, out_dir } => {
            graph_command(&config, &repo, out_dir.as_deref(), cli.no_directory, cli.verbose)
        }
    }
}

/// `--config`, else `dpflow.toml` in the working directory, else defaults
fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let local = Path::new("dpflow.toml");
    if local.exists() {
        tracing::debug!("loading dpflow.toml from the working directory");
        return Config::from_file(local).context("Failed to load dpflow.toml");
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Discover, extract, build and analyze one repository
fn run(config: &Config, repo: &Path, no_directory: bool) -> Result<RunOutput> {
    if !repo.is_dir() {
        anyhow::bail!("Repository root {} is not a directory", repo.display());
    }

    let pipeline = Pipeline::new(config).context("Invalid pattern catalog")?;

    if no_directory {
        let paths = pipeline.discover(repo);
        Ok(pipeline.run_paths(&paths, pipeline.build_options(repo, Some(false))))
    } else {
        Ok(pipeline.run(repo))
    }
}

/// Check command - report cycles and write conflicts
fn check_command(
    config: &Config,
    repo: &Path,
    output: &Path,
    markdown: Option<&Path>,
    no_directory: bool,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("{} {}", "Scanning repository:".cyan(), repo.display());
    }

    let result = run(config, repo, no_directory)?;

    if verbose {
        eprintln!();
        for run in &result.graphs {
            eprintln!(
                "{} graph: {} files scanned, {} artifacts, {} edges",
                run.graph.group(),
                run.files_scanned,
                run.graph.artifact_count(),
                run.graph.edge_count()
            );
        }
    }

    let report = result.report;

    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Graph command - write `<repo>_py.dot` and `<repo>_sql.dot`
fn graph_command(
    config: &Config,
    repo: &Path,
    out_dir: Option<&Path>,
    no_directory: bool,
    verbose: bool,
) -> Result<()> {
    let result = run(config, repo, no_directory)?;

    let out_dir = out_dir.unwrap_or(repo);
    let name = repo_name(repo);

    for run in &result.graphs {
        let path = dot_path(out_dir, &name, run.graph.group());
        std::fs::write(&path, render::to_dot(&run.graph))
            .with_context(|| format!("Failed to write {}", path.display()))?;

        println!(
            "{} {} ({} nodes, {} edges)",
            "Wrote".green(),
            path.display(),
            run.graph.node_count(),
            run.graph.edge_count()
        );

        if verbose {
            for diagnostic in &run.diagnostics {
                eprintln!("  {} {}", "⚠".yellow(), diagnostic.message);
            }
        }
    }

    Ok(())
}

/// Last component of the repository path, resolving `.` and `..`
fn repo_name(repo: &Path) -> String {
    let resolved = repo.canonicalize().unwrap_or_else(|_| repo.to_path_buf());
    match resolved.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => {
            tracing::warn!(
                repo = %repo.display(),
                "repository path has no final component, naming graph files 'repo'"
            );
            "repo".to_string()
        }
    }
}

fn dot_path(out_dir: &Path, repo_name: &str, group: DialectGroup) -> PathBuf {
    out_dir.join(format!("{}_{}.dot", repo_name, group.as_str()))
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Data Flow Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Graphs:".bold());
    for stats in &report.summary.graphs {
        println!(
            "  {:<8} {} files, {} artifacts, {} edges",
            stats.graph, stats.files, stats.artifacts, stats.edges
        );
    }
    println!();

    println!("{}", "Summary:".bold());
    println!("  Total diagnostics: {}", report.summary.total);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                println!("    at {}", loc.file);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Data Flow Check Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Total diagnostics: {}\n", report.summary.total));
    md.push_str(&format!("- Errors: {}\n", report.summary.errors));
    md.push_str(&format!("- Warnings: {}\n", report.summary.warnings));
    md.push_str(&format!("- Info: {}\n", report.summary.info));
    md.push('\n');

    if !report.summary.graphs.is_empty() {
        md.push_str("| Graph | Files | Artifacts | Edges |\n");
        md.push_str("|-------|-------|-----------|-------|\n");
        for stats in &report.summary.graphs {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                stats.graph, stats.files, stats.artifacts, stats.edges
            ));
        }
        md.push('\n');
    }

    if report.diagnostics.is_empty() {
        md.push_str("✅ **No issues found!**\n");
    } else {
        md.push_str("## Diagnostics\n\n");

        for diag in &report.diagnostics {
            let severity_emoji = match diag.severity {
                Severity::Error => "❌",
                Severity::Warn => "⚠️",
                Severity::Info => "ℹ️",
            };

            md.push_str(&format!("### {} {} - {}\n\n", severity_emoji, diag.severity, diag.code));
            md.push_str(&format!("{}\n\n", diag.message));

            if let Some(loc) = &diag.location {
                md.push_str(&format!("**Location:** {}\n\n", loc.file));
            }

            if !diag.related.is_empty() {
                md.push_str("**Involved:**\n\n");
                for name in &diag.related {
                    md.push_str(&format!("- `{}`\n", name));
                }
                md.push('\n');
            }
        }
    }

    md
}
