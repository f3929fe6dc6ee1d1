use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod config;
mod handler;
mod message;
mod pipeline;
mod store;
mod tui;
mod ui;
mod webhook;

#[cfg(test)]
mod testing;

use app::App;
use config::{Config, Settings};
use pipeline::{SendOutcome, SendPipeline, SendTask};
use store::ConversationStore;
use tui::{AppEvent, EventHandler, Tui};
use webhook::WebhookClient;

#[derive(Parser)]
#[command(name = "weather-chat")]
#[command(about = "Chat with a weather assistant served by a webhook", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Webhook that answers the questions
    #[arg(long, env = "WEATHER_CHAT_WEBHOOK_URL", global = true)]
    webhook_url: Option<String>,

    /// Give up on a request after this many seconds (default: wait indefinitely)
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Where to write logs
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        question: String,
    },
    /// Remember a webhook URL in the config file
    SetWebhook {
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {e}");
        Config::default()
    });
    let command = match cli.command {
        Some(Commands::SetWebhook { url }) => return set_webhook(config, url),
        other => other,
    };

    let settings = config.resolve(cli.webhook_url, cli.timeout, cli.log_file);
    match &settings.log_file {
        Some(path) => {
            if let Err(e) = init_logging(path) {
                eprintln!("Logging disabled, cannot write {}: {e}", path.display());
            }
        }
        None => eprintln!("Logging disabled: no data directory and no --log-file"),
    }

    tracing::info!(
        webhook = %settings.webhook_url,
        timeout_secs = settings.request_timeout.map(|t| t.as_secs()),
        "starting"
    );

    match command {
        Some(Commands::Ask { question }) => ask(&settings, &question).await,
        _ => run_interactive(&settings).await,
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = open_log_file(path)?;

    // The terminal belongs to the UI, so logs only ever go to the file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()?;

    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

fn set_webhook(mut config: Config, url: String) -> Result<()> {
    reqwest::Url::parse(&url).map_err(|e| anyhow!("Invalid webhook URL {url}: {e}"))?;
    config.webhook_url = Some(url.clone());
    config.save()?;
    println!("Webhook set to {url}");
    Ok(())
}

async fn ask(settings: &Settings, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question must not be empty");
    }

    let client = WebhookClient::new(&settings.webhook_url, settings.request_timeout)?;
    let (tx, mut notifications) = mpsc::unbounded_channel();
    let pipeline = SendPipeline::new(Arc::new(client), tx);
    let mut store = ConversationStore::new();

    let outcome = pipeline.send_message(&mut store, question).await;
    if let Some(reply) = store.last() {
        println!("{}", reply.text);
    }

    match outcome {
        SendOutcome::Delivered(_) => Ok(()),
        SendOutcome::Failed(err) => {
            let detail = notifications
                .try_recv()
                .map(|n| format!("{}: {}", n.title, n.description))
                .unwrap_or_default();
            Err(anyhow!("{detail} ({err})"))
        }
    }
}

async fn run_interactive(settings: &Settings) -> Result<()> {
    let client = WebhookClient::new(&settings.webhook_url, settings.request_timeout)?;
    let mut app = App::new(Arc::new(client), &settings.webhook_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run_loop(&mut terminal, &mut app).await;
    tui::restore()?;

    if app.is_loading() {
        tracing::info!("quit with a request still in flight");
    }
    result
}

enum Step {
    Event(Option<AppEvent>),
    Settled(Result<String, webhook::SendError>),
}

async fn run_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        app.sync();
        terminal.draw(|frame| ui::render(app, frame))?;

        let step = match app.pending_mut() {
            Some(task) => next_step(&mut events, task).await,
            None => Step::Event(events.next().await),
        };

        match step {
            Step::Event(Some(event)) => handler::handle_event(app, event),
            Step::Event(None) => break,
            Step::Settled(result) => {
                let outcome = app.settle(result);
                tracing::info!(delivered = matches!(outcome, SendOutcome::Delivered(_)), "send settled");
            }
        }
    }

    Ok(())
}

/// Wait for whichever comes first: terminal input or the in-flight reply.
async fn next_step(events: &mut EventHandler, task: &mut SendTask) -> Step {
    tokio::select! {
        event = events.next() => Step::Event(event),
        result = task.wait() => Step::Settled(result),
    }
}
