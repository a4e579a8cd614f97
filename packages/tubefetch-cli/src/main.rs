mod console;

use clap::{Parser, Subcommand};
use console::ConsoleTransport;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tubefetch_bot::{render, Coordinator, CoordinatorHandle, UserId};
use tubefetch_config::{AppConfig, ConfigError};
use tubefetch_downloader::MetadataFetcher;
use tubefetch_source::{classify, YtDlpSource};

#[derive(Parser)]
#[command(name = "tubefetch")]
#[command(about = "Fetch YouTube videos and audio through a chat-style console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Artifact directory, overrides the configuration
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Log filter, takes precedence over RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the bot on stdin (default)
    Console {
        /// Directory receiving delivered files
        #[arg(long, default_value = "./outbox")]
        outbox: PathBuf,

        /// User id attached to console messages
        #[arg(long, default_value_t = 1)]
        user: UserId,
    },
    /// Print the metadata card of a link and exit
    Probe {
        /// Video link
        url: String,
    },
    /// Print the effective configuration as JSON
    ShowConfig,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then the file, then `TUBEFETCH_*` variables, then flags
fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    if let Some(dir) = &cli.download_dir {
        config.download_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::ShowConfig) => {
            println!("{}", config.to_json()?);
        }

        Some(Commands::Probe { url }) => {
            let link = classify(&url).ok_or(render::NOT_A_LINK)?;
            let source = Arc::new(YtDlpSource::new(config.extractor.clone()));
            let fetcher = MetadataFetcher::from_config(source, &config);
            let metadata = fetcher.fetch(&link.canonical).await?;
            println!("{}", render::metadata_card(&metadata));
        }

        Some(Commands::Console { outbox, user }) => run_console(config, outbox, user).await?,
        None => run_console(config, PathBuf::from("./outbox"), 1).await?,
    }

    Ok(())
}

async fn run_console(
    config: AppConfig,
    outbox: PathBuf,
    user: UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = Arc::new(ConsoleTransport::new(outbox));
    let source = Arc::new(YtDlpSource::new(config.extractor.clone()));
    let (coordinator, handle) = Coordinator::new(&config, source, transport.clone());
    let task = coordinator.spawn();

    info!(
        download_dir = %config.download_dir.display(),
        outbox = %transport.outbox().display(),
        "console ready, send a link or `press <data>`"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => submit_line(&handle, &transport, user, &line),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    task.await?;
    Ok(())
}

fn submit_line(handle: &CoordinatorHandle, transport: &ConsoleTransport, user: UserId, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match line.strip_prefix("press ") {
        Some(data) => match transport.last_keyboard(user) {
            Some(message) => {
                handle.press(user, message, data.trim());
            }
            None => println!("Nothing to press."),
        },
        None => {
            handle.text(user, line);
        }
    }
}
