//! Corretora CLI - maintenance scripts for the document store.
//!
//! # Usage
//!
//! ```bash
//! # Ingest a news item (same upsert as the HTTP endpoint)
//! corretora-cli news ingest --title "..." --url https://... --source ECO --region PT
//!
//! # Tag untagged news, first ten only, without writing
//! corretora-cli tags backfill --dry-run --limit 10
//!
//! # Recompute a user's admin claim
//! corretora-cli claims sync --uid abc123
//!
//! # Render the sitemap
//! corretora-cli sitemap --out public/sitemap.xml
//! ```
//!
//! Every command talks to the real project and needs a service account
//! (`FIREBASE_SERVICE_ACCOUNT` or `GOOGLE_SERVICE_ACCOUNT_JSON`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "corretora-cli")]
#[command(author, version, about = "Corretora maintenance tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage news documents
    News {
        #[command(subcommand)]
        action: NewsAction,
    },
    /// Manage news tags
    Tags {
        #[command(subcommand)]
        action: TagsAction,
    },
    /// Manage admin custom claims
    Claims {
        #[command(subcommand)]
        action: ClaimsAction,
    },
    /// Render sitemap.xml
    Sitemap {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum NewsAction {
    /// Summarize and upsert a news item
    Ingest {
        #[arg(long)]
        title: String,

        #[arg(long)]
        url: String,

        /// Publisher name
        #[arg(long)]
        source: String,

        #[arg(long)]
        region: Option<String>,
    },
}

#[derive(Subcommand)]
enum TagsAction {
    /// Classify news documents that have no tags yet
    Backfill {
        /// Log the tags instead of writing them
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many documents
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ClaimsAction {
    /// Grant or revoke the admin claim from the stored documents
    Sync {
        #[arg(long)]
        uid: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corretora_cli=info,corretora_functions=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::News { action } => match action {
            NewsAction::Ingest {
                title,
                url,
                source,
                region,
            } => commands::news::ingest(title, url, source, region).await?,
        },
        Commands::Tags { action } => match action {
            TagsAction::Backfill { dry_run, limit } => {
                commands::tags::backfill(dry_run, limit).await?;
            }
        },
        Commands::Claims { action } => match action {
            ClaimsAction::Sync { uid } => commands::claims::sync(&uid).await?,
        },
        Commands::Sitemap { out } => commands::sitemap::render(out.as_deref()).await?,
    }
    Ok(())
}
