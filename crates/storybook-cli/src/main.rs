use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use storybook_application::CachedBookRepository;
use storybook_core::book::BookStatus;
use storybook_infrastructure::{FileBookStore, StorybookConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "storybook")]
#[command(about = "Storybook CLI - inspect and edit the book repository", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data root; overrides the config file and STORYBOOK_DATA_ROOT
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Show cached book count and ids
    Stats,
    /// Reload every book from disk
    Refresh,
    /// List books as a table
    List,
    /// Print one book as JSON
    Show { id: String },
    /// Create an empty book
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        cover: String,
        #[arg(long, default_value_t = BookStatus::Process)]
        status: BookStatus,
    },
    /// Change the status of a book
    SetStatus { id: String, status: BookStatus },
    /// Delete a book document
    Delete { id: String },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = StorybookConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(data_root) = cli.data_root {
        config.data_root = data_root;
    }
    init_tracing(&config.log_level);

    let store = FileBookStore::new(config.paths())
        .await
        .with_context(|| format!("Failed to open data root {}", config.data_root.display()))?;
    let repository = CachedBookRepository::new(Arc::new(store));
    let warmed = repository.initialize().await?;
    tracing::debug!(
        "Using data root {} ({} books)",
        config.data_root.display(),
        warmed.cached_count
    );

    tracing::debug!("Running {:?}", cli.command);
    match cli.command {
        Commands::Stats => commands::cache::stats(&repository).await?,
        Commands::Refresh => commands::cache::refresh(&repository).await?,
        Commands::List => commands::books::list(&repository).await?,
        Commands::Show { id } => commands::books::show(&repository, &id).await?,
        Commands::Create {
            title,
            cover,
            status,
        } => commands::books::create(&repository, title, cover, status).await?,
        Commands::SetStatus { id, status } => {
            commands::books::set_status(&repository, &id, status).await?
        }
        Commands::Delete { id } => commands::books::delete(&repository, &id).await?,
    }

    repository.shutdown().await;
    Ok(())
}
