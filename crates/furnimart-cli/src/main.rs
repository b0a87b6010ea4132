//! Furnimart - a command-line client for the furniture marketplace.
//!
//! Browse published listings, manage your own listings and images, and buy
//! items. Protected commands check the session first and silently renew an
//! expired access token when a refresh token is available.

mod commands;
mod navigator;
mod view;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use furnimart_core::models::{Category, Condition, ListingStatus};
use furnimart_core::Config;

use navigator::TerminalNavigator;

/// Log file name in the cache directory
const LOG_FILE: &str = "furnimart.log";

#[derive(Parser)]
#[command(name = "furnimart")]
#[command(about = "Buy and sell second-hand furniture from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print raw JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session tokens
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Create a new account
    Register {
        username: String,
    },

    /// Sign out and forget the stored tokens
    Logout,

    /// Show whether you are signed in
    Status,

    /// Browse published listings
    Browse {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show one published listing
    Show {
        id: i64,
    },

    /// List your own listings
    Mine {
        #[arg(short, long, default_value = "published")]
        status: ListingStatus,
    },

    /// List items you bought
    Purchases,

    /// Buy a listing
    Buy {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Create a listing (saved as a draft unless --publish)
    Sell {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Price as a decimal, e.g. 120.00
        #[arg(long)]
        price: String,

        #[arg(long, default_value = "OTHER")]
        category: Category,

        #[arg(long, default_value = "good")]
        condition: Condition,

        /// Image files to upload, in gallery order
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        #[arg(long)]
        publish: bool,
    },

    /// Change a listing's details or images
    Edit {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        price: Option<String>,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long)]
        condition: Option<Condition>,

        /// Image files to add
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// Image ids to remove
        #[arg(long = "delete-image")]
        delete_images: Vec<i64>,

        /// Image ids in their new order
        #[arg(long = "order", value_delimiter = ',')]
        order: Vec<i64>,
    },

    /// Publish a draft listing
    Publish {
        id: i64,
    },

    /// Move a published listing back to drafts
    Unpublish {
        id: i64,
    },

    /// Delete a listing
    Delete {
        id: i64,
    },
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.cache_dir() {
        Ok(dir) if std::fs::create_dir_all(&dir).is_ok() => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config, using defaults: {}", e);
            Config::default()
        }
    };

    let _log_guard = init_tracing(&config);
    info!("Furnimart starting");

    let navigator = Arc::new(TerminalNavigator::default());
    let client = furnimart_core::build_client(&config, navigator.clone())?;
    let ctx = commands::Context {
        client,
        json: cli.json,
    };

    let result = commands::run(&ctx, &mut config, cli.command).await;

    navigator.report();
    result
}
