use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pdk")]
#[command(about = "Paper Desk: LLM strategies on a simulated equity account", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled strategy over historical daily bars
    Run {
        /// Layered config paths in merge order (base -> overrides)
        #[arg(long = "config", required = true)]
        config_paths: Vec<PathBuf>,

        /// Daily OHLCV CSV (overrides data.bars_csv)
        #[arg(long)]
        bars: Option<PathBuf>,

        /// News JSON Lines (overrides data.news_jsonl)
        #[arg(long)]
        news: Option<PathBuf>,

        /// Fundamentals JSON (overrides data.fundamentals_json)
        #[arg(long)]
        fundamentals: Option<PathBuf>,

        /// First trading date, YYYY-MM-DD (overrides run.start)
        #[arg(long)]
        start: Option<String>,

        /// Last trading date, YYYY-MM-DD (overrides run.end)
        #[arg(long)]
        end: Option<String>,

        /// Write the full report (every decision + performance) as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Provider backend utilities
    Providers {
        #[command(subcommand)]
        cmd: ProvidersCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum ProvidersCmd {
    /// Probe every enabled strategy's backend
    Check {
        #[arg(long = "config", required = true)]
        config_paths: Vec<PathBuf>,
    },

    /// List the models each backend offers
    Models {
        #[arg(long = "config", required = true)]
        config_paths: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of a JSONL audit log
    Verify {
        #[arg(long)]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing file is fine: production injects keys via the environment.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run {
            config_paths,
            bars,
            news,
            fundamentals,
            start,
            end,
            out,
        } => {
            commands::run::run(commands::run::RunArgs {
                config_paths,
                bars,
                news,
                fundamentals,
                start,
                end,
                out,
            })
            .await?;
        }

        Commands::Providers { cmd } => match cmd {
            ProvidersCmd::Check { config_paths } => {
                commands::providers::check(&config_paths).await?;
            }
            ProvidersCmd::Models { config_paths } => {
                commands::providers::models(&config_paths).await?;
            }
        },

        Commands::ConfigHash { paths } => {
            let loaded = pdk_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => commands::audit::verify(&path)?,
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
