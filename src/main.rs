use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser};
use strmlnk::{RunOptions, run};
use tracing_subscriber::EnvFilter;

/// Harvest episode stream links from streaming platform listing pages
#[derive(Debug, Parser)]
#[command(name = "strmlnk", version, about)]
struct Cli {
    /// Directory to place stream links under
    #[arg(long, default_value = "Imports", value_name = "DIR")]
    dir: PathBuf,

    /// Show the browser window and keep it alive after a direct run
    #[arg(long)]
    debug: bool,

    /// File with URLs to watch and refresh in a loop
    #[arg(long, value_name = "FILE")]
    watch: Option<PathBuf>,

    /// Episode listing pages to scrape
    #[arg(value_name = "URL")]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Nothing to scrape and nothing to watch
    if cli.urls.is_empty() && cli.watch.is_none() {
        let _ = Cli::command().print_help();
        process::exit(1);
    }

    let options = RunOptions {
        output_dir: cli.dir,
        debug: cli.debug,
        watch: cli.watch,
        urls: cli.urls,
    };

    if let Err(error) = run(options).await {
        eprintln!("Error: {error}");
        process::exit(1);
    }
}
