use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trawl", about = "Concurrent web crawler", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start crawling from one or more seed URLs
    Crawl {
        /// Seed URL (repeatable)
        #[arg(short, long, required = true)]
        url: Vec<String>,

        /// Number of concurrent workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output directory for crawled data
        #[arg(short, long)]
        output: Option<String>,

        /// URL substrings to exclude (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Seconds before a URL may be revisited
        #[arg(long)]
        revisit_delay_secs: Option<u64>,

        /// Maximum redirects to follow per fetch
        #[arg(long)]
        max_redirects: Option<usize>,

        /// Postgres connection string for the database sink
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Start the crawler API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}
