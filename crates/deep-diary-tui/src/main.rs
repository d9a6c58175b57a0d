use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deep_diary_core::config::{validate_api_url, API_URL_ENV};
use deep_diary_core::{Config, DiaryClient};
use tracing::info;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::{expand_path, App};
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "deep-diary")]
#[command(about = "Write today's diary from a photo, with emotion feedback and a song to close the day")]
struct Cli {
    /// Diary backend base URL (overrides DEEP_DIARY_API_URL and the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Where to write logs
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Upload this photo as soon as the diary opens
    #[arg(long)]
    photo: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save default settings to the config file
    Config {
        /// Backend base URL to use when no flag or env var is given
        #[arg(long)]
        api_url: Option<String>,
        /// Request timeout in seconds (0 disables the timeout)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading config")?;

    if let Some(Commands::Config { api_url, timeout }) = cli.command {
        return save_config(config, api_url, timeout);
    }

    let log_path = logging::init(cli.log_file.as_deref())?;

    let env_url = std::env::var(API_URL_ENV).ok();
    let api_url = config.resolve_api_url(cli.api_url.as_deref(), env_url.as_deref())?;
    let client = DiaryClient::with_timeout(&api_url, config.request_timeout())?;
    info!(%api_url, log = %log_path.display(), "diary session started");

    let mut app = App::new(client);
    if let Some(photo) = cli.photo {
        app.upload_photo(expand_path(&photo));
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    info!(messages = app.session.log().len(), "diary session ended");
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event);
        }
        app.poll_pending().await;
    }

    Ok(())
}

fn save_config(mut config: Config, api_url: Option<String>, timeout: Option<u64>) -> Result<()> {
    if let Some(url) = api_url {
        config.api_url = Some(validate_api_url(&url)?);
    }
    if let Some(secs) = timeout {
        config.request_timeout_secs = Some(secs);
    }

    let path = config.save()?;
    let effective_url = config.resolve_api_url(None, None)?;
    let timeout = config
        .request_timeout()
        .map(|d| format!("{}s", d.as_secs()))
        .unwrap_or_else(|| "none".to_string());

    println!("Saved {}", path.display());
    println!("  api_url: {}", effective_url);
    println!("  timeout: {}", timeout);
    Ok(())
}
