//! mediatag: command-line client for the mediatag API.
//!
//! Set MEDIATAG_API_URL or pass `--api-url` (default http://localhost:3000).

use anyhow::Context;
use clap::{Parser, Subcommand};
use mediatag_cli::{init_tracing, ApiClient};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediatag", about = "Upload, tag and search media")]
struct Cli {
    /// Base URL of the mediatag API
    #[arg(
        long,
        env = "MEDIATAG_API_URL",
        default_value = "http://localhost:3000",
        global = true
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its tags
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// MIME type to store the file with
        #[arg(long = "type")]
        content_type: Option<String>,
    },
    /// List every stored file
    List,
    /// Show a single file by key
    Get {
        key: String,
    },
    /// Search by keyword, or in natural language with --natural
    Search {
        query: String,
        #[arg(long)]
        natural: bool,
    },
    /// Show the transcript of an audio, video, text or PDF file
    Transcript {
        key: String,
    },
    /// Delete a file and its metadata
    Delete {
        key: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.api_url)?;
    tracing::debug!(api_url = %client.base_url(), "Using API");

    match cli.command {
        Commands::Upload { file, content_type } => {
            let response = client.upload(&file, content_type.as_deref()).await?;
            print_json(&response)?;
        }
        Commands::List => {
            let response = client.list().await?;
            print_json(&response)?;
        }
        Commands::Get { key } => {
            let response = client.get(&key).await?;
            print_json(&response)?;
        }
        Commands::Search { query, natural } => {
            let response = client.search(&query, natural).await?;
            print_json(&response)?;
        }
        Commands::Transcript { key } => {
            let response = client.transcript(&key).await?;
            print_json(&response)?;
        }
        Commands::Delete { key } => {
            client.delete(&key).await?;
            print_json(&serde_json::json!({ "success": true, "message": format!("File {} deleted", key) }))?;
        }
    }

    Ok(())
}
