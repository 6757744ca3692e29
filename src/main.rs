use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use episode_catalog::{AppConfig, AppResult};

#[derive(Parser)]
#[command(name = "episode-catalog")]
#[command(about = "Browse a paginated, filterable episode catalog", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/episode-catalog/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API
    Serve,

    /// Import episodes and characters from the public API
    Import,

    /// Browse a running server from the terminal
    Browse {
        /// Server base URL (defaults to the configured local port)
        #[arg(short, long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => episode_catalog::serve(&config).await,
        Commands::Import => {
            let summary = episode_catalog::import(&config).await?;
            println!(
                "Imported {} episodes, {} characters, {} links ({} episodes skipped)",
                summary.episodes, summary.characters, summary.links, summary.skipped_episodes
            );
            Ok(())
        }
        Commands::Browse { server } => {
            let server = server.unwrap_or_else(|| format!("http://127.0.0.1:{}", config.port));
            episode_catalog::browse(&config, &server).await
        }
    }
}
