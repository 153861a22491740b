//! wisemark: sync student submissions with the Wise platform.
//!
//! `download` pulls recent submissions into a dated folder as PDFs,
//! `upload` sends human-marked PDFs back as feedback, `status` shows
//! marking progress. Credentials come from WISE_* environment variables
//! (a local `.env` file is honored).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use wisemark_api_client::ApiClient;
use wisemark_cli::{download, init_tracing, status, upload};
use wisemark_core::WiseConfig;

#[derive(Parser)]
#[command(name = "wisemark", about = "Wise grading sync CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download recent submissions as PDFs into a dated folder
    Download {
        /// Recency window in days; older submissions are skipped
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// Root directory holding the dated download folders
        #[arg(long, default_value = "downloads")]
        root: PathBuf,
    },
    /// Upload marked PDFs back to Wise
    Upload {
        /// Folder containing "* Marked.pdf" files; defaults to the newest
        /// download folder under --root
        folder: Option<PathBuf>,
        /// Root directory holding the dated download folders
        #[arg(long, default_value = "downloads")]
        root: PathBuf,
    },
    /// Show download folders and marking progress
    Status {
        /// Root directory holding the dated download folders
        #[arg(long, default_value = "downloads")]
        root: PathBuf,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download { days, root } => {
            let config = WiseConfig::from_env()
                .context("Configuration incomplete; check your .env file")?;
            let client = ApiClient::new(&config)?;
            let report = download::run(&client, &config, days, &root).await?;
            print_json(&report)?;
        }
        Commands::Upload { folder, root } => {
            let config = WiseConfig::from_env()
                .context("Configuration incomplete; check your .env file")?;
            let client = ApiClient::new(&config)?;
            let folder = match folder {
                Some(f) => f,
                None => wisemark_core::paths::latest_download_folder(&root)
                    .context("No download folders found; run `wisemark download` first")?,
            };
            let report = upload::run(&client, &folder).await?;
            print_json(&report)?;
        }
        Commands::Status { root } => status::run(&root)?,
    }

    Ok(())
}
