mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// mimalloc keeps memory from ballooning under high channel churn.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use trawl_core::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    if let Ok(v) = std::env::var("TRAWL_WORKERS") {
        match v.parse::<usize>() {
            Ok(n) if n > 0 => config.crawler.workers = n,
            _ => warn!(value = %v, "ignoring invalid TRAWL_WORKERS"),
        }
    }

    match cli.command {
        Commands::Crawl {
            url,
            workers,
            output,
            exclude,
            revisit_delay_secs,
            max_redirects,
            database_url,
        } => {
            commands::crawl::run(
                config,
                url,
                workers,
                output,
                exclude,
                revisit_delay_secs,
                max_redirects,
                database_url,
            )
            .await
        }
        Commands::Serve { host, port } => commands::serve::run(config, host, port).await,
    }
}
