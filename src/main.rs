use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use logsight::config::{AppConfig, ConfigLoader};
use logsight::http_server::HttpServer;
use logsight::ingest::Ingestor;
use logsight::logging::{init_logging, LogConfig};
use logsight::query::QueryService;
use logsight::store::LogStore;

/// Access-log ingestion and statistics API
#[derive(Debug, Parser)]
#[command(name = "logsight", version, about)]
struct Cli {
    /// Configuration file (defaults to logsight.toml or config/logsight.toml if present)
    #[arg(short, long, global = true, env = "LOGSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Listen address, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Load log files into the database
    Ingest(IngestArgs),
    /// Print table columns, indexes, row count and a sample row
    Verify,
    /// Write a sample configuration file
    InitConfig {
        #[arg(short, long, default_value = "logsight.toml.example")]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
struct IngestArgs {
    /// Directory holding the log files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// File extension to pick up (without the dot)
    #[arg(long)]
    extension: Option<String>,

    /// Stop after this many accepted records
    #[arg(long, conflicts_with = "no_limit")]
    limit: Option<u64>,

    /// Ingest everything
    #[arg(long)]
    no_limit: bool,

    /// Records per bulk insert
    #[arg(long)]
    batch_size: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = cli.config.as_ref().and_then(|p| p.to_str());
    let mut config = ConfigLoader::new()
        .load_from_file(path)
        .load_from_env()
        .build()?;

    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig { output } = &cli.command {
        AppConfig::write_sample(output)?;
        println!("Sample configuration written to {}", output.display());
        return Ok(());
    }

    let mut config = load_config(&cli)?;
    let _guard = init_logging(&LogConfig::from_config(&config.logging))?;
    let store = LogStore::new(config.database.path.clone());

    match cli.command {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.server.bind_addr.clone());
            HttpServer::new(QueryService::new(store))
                .serve(&addr)
                .await
                .with_context(|| format!("HTTP server on {} failed", addr))?;
        }
        Command::Ingest(args) => {
            if let Some(dir) = args.data_dir {
                config.ingest.data_dir = dir;
            }
            if let Some(extension) = args.extension {
                config.ingest.extension = extension;
            }
            if args.no_limit {
                config.ingest.limit = None;
            } else if let Some(limit) = args.limit {
                config.ingest.limit = Some(limit);
            }
            if let Some(batch_size) = args.batch_size {
                anyhow::ensure!(batch_size > 0, "--batch-size must be greater than zero");
                config.ingest.batch_size = batch_size;
            }

            let report = Ingestor::new(store, config.ingest).run().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Ingestion complete: {} logs accepted, {} rejected, {} of {} files processed",
                    report.accepted,
                    report.rejected(),
                    report.files_processed,
                    report.files_found
                );
            }
        }
        Command::Verify => {
            let report = store.verify().await?;
            println!("COLUMNS: {:?}", report.columns);
            println!("INDEXES: {:?}", report.indexes);
            println!("TOTAL LOGS: {}", report.total_logs);
            match report.sample {
                Some(row) => println!(
                    "SAMPLE ROW: ip={}, timestamp={}, method={}, endpoint={}, status={}, size={}",
                    row.ip, row.timestamp, row.method, row.endpoint, row.status, row.size
                ),
                None => println!("SAMPLE ROW: <none>"),
            }
        }
        Command::InitConfig { .. } => {}
    }

    info!("done");
    Ok(())
}
