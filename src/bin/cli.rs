//! Operator entry points (spec §6): `ingest`, `vacuum`, `stats`. Talks to the
//! store directly rather than over HTTP — these are maintenance jobs meant to
//! run alongside the server, not through it.

use clap::{Parser, Subcommand};
use tutor_core::config::Config;
use tutor_core::error::CoreError;
use tutor_core::ingest::sources::SourceFile;
use tutor_core::ingest::IngestPipeline;
use tutor_core::logging::{init_tracing, LogConfig};
use tutor_core::store::Store;

#[derive(Parser)]
#[command(name = "tutor-cli")]
#[command(about = "Operator tool for the bilingual tutor's content and storage maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl configured sources (or the builtin fallback lists) and load new items.
    Ingest {
        /// Path to the source descriptor JSON file; defaults to INGEST_SOURCES_PATH.
        #[arg(long)]
        sources: Option<String>,
        /// Re-ingest known items instead of skipping them.
        #[arg(long)]
        full: bool,
    },
    /// Reclaim free pages and refresh the query planner's statistics.
    Vacuum,
    /// Print a snapshot of query counters and due/mastery distribution.
    Stats {
        /// Report per-user figures for this user instead of store-wide counters.
        #[arg(long)]
        user_id: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    init_tracing(&LogConfig {
        log_level: config.log_level.clone(),
        enable_file_logs: false,
        log_dir: config.log_dir.clone(),
    });

    let cli = Cli::parse();
    let exit_code = run(cli, &config).await;
    std::process::exit(exit_code);
}

async fn run(cli: Cli, config: &Config) -> i32 {
    let store = match Store::open(&config.database_path, &config.store).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to open store: {e}");
            return 3;
        }
    };
    if let Err(e) = store.run_migrations().await {
        eprintln!("failed to run migrations: {e}");
        return 3;
    }

    match cli.command {
        Commands::Ingest { sources, full } => run_ingest(&store, config, sources, full).await,
        Commands::Vacuum => match store.vacuum().await {
            Ok(()) => {
                println!("vacuum complete");
                0
            }
            Err(e) => {
                eprintln!("vacuum failed: {e}");
                3
            }
        },
        Commands::Stats { user_id } => run_stats(&store, user_id).await,
    }
}

async fn run_ingest(store: &Store, config: &Config, sources: Option<String>, full: bool) -> i32 {
    let path = sources.unwrap_or_else(|| config.ingest.sources_path.clone());
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("failed to read sources file {path}: {e}");
            return 1;
        }
    };
    let source_file = match SourceFile::from_json(&raw) {
        Ok(sf) => sf,
        Err(e) => {
            eprintln!("invalid source file {path}: {e}");
            return 1;
        }
    };

    let pipeline = IngestPipeline::new(store, config.ingest.clone());
    match pipeline.run(&source_file, !full).await {
        Ok(stats) => {
            println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
            if stats.failures > 0 && stats.successes == 0 {
                2
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("ingest run failed: {e}");
            let core: CoreError = e.into();
            if core.is_retryable() {
                2
            } else {
                3
            }
        }
    }
}

async fn run_stats(store: &Store, user_id: Option<String>) -> i32 {
    let snapshot = store.stats();
    println!("{}", serde_json::to_string_pretty(&snapshot).unwrap_or_default());

    if let Some(user_id) = user_id {
        let now = chrono::Utc::now();
        match store.due_count(&user_id, now).await {
            Ok(due_count) => println!("due_count={due_count}"),
            Err(e) => {
                eprintln!("failed to read due count for {user_id}: {e}");
                return 3;
            }
        }
        match store.mastery_distribution(&user_id).await {
            Ok(dist) => println!("mastery_distribution={dist:?}"),
            Err(e) => {
                eprintln!("failed to read mastery distribution for {user_id}: {e}");
                return 3;
            }
        }
    }
    0
}
