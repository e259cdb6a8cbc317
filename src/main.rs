// ABOUTME: CLI entry point for fam-db-migrator
// ABOUTME: Parses commands, routes to handlers, and prints tracked error details on failure

use clap::{Parser, Subcommand};
use fam_db_migrator::commands::{self, ExportArgs, ImportArgs};
use fam_db_migrator::errors::TrackedError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fam-db-migrator")]
#[command(about = "Export and import file-processing database configuration tables as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export configuration tables into a directory of JSON files
    Export {
        /// Source database (sqlite://path, path.sqlite, or postgresql:// URL)
        #[arg(long)]
        source: String,
        /// Directory to write table files and manifest.json into
        #[arg(long)]
        output: PathBuf,
        /// Rows per batch for batched tables
        #[arg(long)]
        batch_size: Option<u64>,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Export only these tables (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "exclude_tables")]
        include_tables: Option<Vec<String>>,
        /// Skip these tables (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_tables: Option<Vec<String>>,
        /// Export only these table groups (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "exclude_groups")]
        include_groups: Option<Vec<String>>,
        /// Skip these table groups (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_groups: Option<Vec<String>>,
        /// Interactive mode for selecting tables
        #[arg(long)]
        interactive: bool,
    },
    /// Import an export directory into a database
    Import {
        /// Target database (sqlite://path, path.sqlite, or postgresql:// URL)
        #[arg(long)]
        target: String,
        /// Directory produced by `export`
        #[arg(long)]
        input: PathBuf,
        /// Delete existing rows of imported tables first
        #[arg(long)]
        clear_existing: bool,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
        /// Rows per insert round trip
        #[arg(long)]
        batch_size: Option<u64>,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Import only these tables (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "exclude_tables")]
        include_tables: Option<Vec<String>>,
        /// Skip these tables (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_tables: Option<Vec<String>>,
    },
    /// List every table the exporter knows about
    List {
        /// TOML configuration file with custom tables
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Export {
            source,
            output,
            batch_size,
            config,
            include_tables,
            exclude_tables,
            include_groups,
            exclude_groups,
            interactive,
        } => {
            commands::export(ExportArgs {
                source,
                output,
                batch_size,
                config,
                include_tables,
                exclude_tables,
                include_groups,
                exclude_groups,
                interactive,
            })
            .await
        }
        Commands::Import {
            target,
            input,
            clear_existing,
            yes,
            batch_size,
            config,
            include_tables,
            exclude_tables,
        } => {
            commands::import(ImportArgs {
                target,
                input,
                clear_existing,
                yes,
                batch_size,
                config,
                include_tables,
                exclude_tables,
            })
            .await
        }
        Commands::List { config } => commands::list(config.as_deref()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(tracked) = TrackedError::find(&err) {
                eprintln!("Tracking code: {}", tracked.code());
                for (key, value) in tracked.debug_data() {
                    eprintln!("  {}: {}", key, value);
                }
            }
            ExitCode::FAILURE
        }
    }
}
