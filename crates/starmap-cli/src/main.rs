//! starmap: build, fuse, and query knowledge graphs from the command line.
//!
//! Results are printed as pretty JSON on stdout (or written to `--output`);
//! logs go to stderr or `LOG_FILE`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use starmap_cli::commands::{self, Overrides};
use starmap_cli::StarmapConfig;
use starmap_core::logging;
use starmap_fusion::{FusionStrategy, NodeFilter, RelationFilter};

#[derive(Parser)]
#[command(name = "starmap")]
#[command(author, version, about = "Knowledge graph analysis and fusion")]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ~/.config/starmap/config.toml)
    #[arg(long, global = true, env = "STARMAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a knowledge map from tagged documents
    Analyze {
        /// JSON file with documents (array, or object with `documents`/`notes`)
        #[arg(short, long)]
        input: PathBuf,

        /// Minimum co-occurrence ratio for a relation
        #[arg(long)]
        min_relation: Option<f64>,

        /// Number of hierarchy levels
        #[arg(long)]
        max_level: Option<u32>,

        /// Contributor credited with the created nodes
        #[arg(long)]
        contributor: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fuse two node sets
    Fuse {
        /// JSON fusion request
        #[arg(short, long)]
        request: PathBuf,

        /// Strategy override: smart, merge, or add
        #[arg(short, long)]
        strategy: Option<FusionStrategy>,

        /// Minimum synthesized relation strength
        #[arg(long)]
        min_relation: Option<f64>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List nodes of a graph file, most important first
    Nodes {
        /// JSON graph with `nodes` and `relations`
        #[arg(short, long)]
        graph: PathBuf,

        /// Category to keep ("all" keeps every category)
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        level: Option<u32>,

        /// Substring of the name or description
        #[arg(short, long)]
        keyword: Option<String>,

        #[arg(long)]
        min_importance: Option<u8>,

        #[arg(long)]
        max_importance: Option<u8>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List relations of a graph file, strongest first
    Relations {
        /// JSON graph with `nodes` and `relations`
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = starmap_core::defaults::LIST_MIN_STRENGTH)]
        min_strength: f64,

        #[arg(long = "type")]
        relation_type: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract the nodes of one category and the relations among them
    Subgraph {
        /// JSON graph with `nodes` and `relations`
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(short, long)]
        category: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{:#}", e);
            error!({ logging::ERROR_MSG } = message.as_str(), "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "starmap_cli=info,starmap_fusion=info")
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "starmap_cli=info,starmap_fusion=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("starmap.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // stdout carries command output, so console logs go to stderr
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<StarmapConfig> {
    Ok(match path {
        Some(path) => StarmapConfig::from_file(path)?,
        None => StarmapConfig::load()?,
    })
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            min_relation,
            max_level,
            contributor,
            output,
        } => {
            let overrides = Overrides {
                min_relation,
                max_level,
                contributor,
            };
            let config = overrides.apply(&config)?;
            let map = commands::analyze(&input, &config)?;
            commands::write_output(&map, output.as_deref())?;
        }
        Commands::Fuse {
            request,
            strategy,
            min_relation,
            output,
        } => {
            let outcome = commands::fuse(&request, strategy, min_relation, &config)?;
            commands::write_output(&outcome, output.as_deref())?;
        }
        Commands::Nodes {
            graph,
            category,
            level,
            keyword,
            min_importance,
            max_importance,
            output,
        } => {
            let graph = commands::read_graph(&graph)?;
            let filter = NodeFilter {
                category,
                level,
                keyword,
                min_importance,
                max_importance,
            };
            let nodes = commands::list_nodes(&graph, &filter);
            commands::write_output(&nodes, output.as_deref())?;
        }
        Commands::Relations {
            graph,
            min_strength,
            relation_type,
            output,
        } => {
            let graph = commands::read_graph(&graph)?;
            let filter = RelationFilter {
                min_strength,
                relation_type,
            };
            let relations = commands::list_relations(&graph, &filter);
            commands::write_output(&relations, output.as_deref())?;
        }
        Commands::Subgraph {
            graph,
            category,
            output,
        } => {
            let graph = commands::read_graph(&graph)?;
            let sub = commands::subgraph(&graph, &category)?;
            commands::write_output(&sub, output.as_deref())?;
        }
    }

    Ok(())
}
