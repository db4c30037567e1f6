use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fuzz_stats::load::{load_matrix_file, load_session_files, ParserCatalog};
use fuzz_stats::{export, matrix, pipeline, StatsConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Output format for reports
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text (default)
    Text,
    /// JSON for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "fuzz-stats")]
#[command(version)]
#[command(about = "Reduce differential fuzzing sessions into comparable statistics", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file (grid, metrics, universe policy, intensity scale)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate session stats files into curves and consistency figures
    Sessions {
        /// Session stats files
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Metric to aggregate (repeatable; replaces the configured list)
        #[arg(short, long = "metric", value_name = "NAME")]
        metrics: Vec<String>,

        /// Write the aggregate curves to this Parquet file
        #[arg(long, value_name = "FILE")]
        parquet: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Reduce a pairwise inconsistency-type matrix
    Matrix {
        /// Matrix JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of parsers per side (inferred when omitted)
        #[arg(long, value_name = "N")]
        parser_count: Option<usize>,

        /// text = LaTeX table on stdout, totals on stderr
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Initialize tracing subscriber; reports go to stdout, logs to stderr
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StatsConfig> {
    match path {
        Some(path) => StatsConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(StatsConfig::default()),
    }
}

fn run_sessions(
    mut config: StatsConfig,
    files: &[PathBuf],
    metrics: Vec<String>,
    parquet: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    if !metrics.is_empty() {
        config.metrics = metrics;
    }

    let mut catalog = ParserCatalog::new();
    let loaded = load_session_files(files, &mut catalog);
    if loaded.sessions.is_empty() {
        eprintln!("No valid stats files provided.");
        std::process::exit(1);
    }

    let mut report =
        pipeline::run(&loaded.sessions, &config).context("failed to reduce sessions")?;
    let mut rejected = loaded.rejected;
    rejected.append(&mut report.rejected);
    report.rejected = rejected;

    if let Some(path) = parquet {
        export::write_curves_parquet(path, &report.curves)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn run_matrix(
    config: &StatsConfig,
    file: &Path,
    parser_count: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let pairwise = load_matrix_file(file, parser_count)
        .with_context(|| format!("failed to load matrix {}", file.display()))?;
    let summary = matrix::reduce(&pairwise, &config.intensity);

    match format {
        OutputFormat::Text => {
            println!(
                "{}",
                export::render_matrix_table(&summary, &config.matrix_column_width)
            );
            eprintln!("total_types = {}", summary.total_types());
            eprintln!("total_pairs = {}", summary.total_pairs());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Sessions {
            files,
            metrics,
            parquet,
            format,
        } => run_sessions(config, &files, metrics, parquet.as_deref(), format),
        Command::Matrix {
            file,
            parser_count,
            format,
        } => {
            if parser_count == Some(0) {
                bail!("--parser-count must be greater than 0");
            }
            run_matrix(&config, &file, parser_count, format)
        }
    }
}
