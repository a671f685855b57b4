use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use notioncal::ports::gcal::GcalClient;
use notioncal::ports::notion::NotionClient;
use notioncal::sync::ActionKind;
use notioncal::task::Task;
use notioncal::{config, event, sync, task};

#[derive(Parser)]
#[command(name = "notioncal")]
#[command(about = "Sync open tasks from a Notion database to Google Calendar events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass: create, update and delete calendar events
    Sync,
    /// Show the pending create/update/delete classification without applying it
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync => cmd_sync().await,
        Commands::Status => cmd_status().await,
    }
}

/// Read and parse both sides: the open tasks and the managed events.
async fn load_inputs() -> Result<(
    HashMap<String, Task>,
    HashMap<String, notioncal::event::Event>,
    GcalClient,
)> {
    let cfg = config::load_config()?;
    let tokens = config::load_tokens()?;

    let notion = NotionClient::new(cfg.notion.api_key, cfg.notion.database_id);
    let gcal = GcalClient::new(tokens.access_token, cfg.google.calendar_id);

    let records = notion.query_database().await?;
    let (tasks, task_failures) = task::parse_tasks(&records);
    for failure in &task_failures {
        tracing::warn!(source = %failure.source, error = %failure.error, "skipping unparseable task record");
    }

    let raw_events = gcal.list_events(&cfg.google.read_since).await?;
    let (events, event_failures) = event::parse_events(&raw_events);
    for failure in &event_failures {
        tracing::warn!(source = %failure.source, error = %failure.error, "dropping undecodable calendar event");
    }

    tracing::info!(
        tasks = tasks.len(),
        events = events.len(),
        "loaded both sides"
    );

    Ok((tasks, events, gcal))
}

async fn cmd_sync() -> Result<()> {
    let (tasks, events, gcal) = load_inputs().await?;

    let report = sync::synchronize(&tasks, &events, &gcal).await;

    println!(
        "Created: {}  Updated: {}  Deleted: {}  Failed: {}",
        report.applied(ActionKind::Create),
        report.applied(ActionKind::Update),
        report.applied(ActionKind::Delete),
        report.failed(),
    );
    println!(
        "Synchronization has been completed at {}!",
        Utc::now().to_rfc3339()
    );

    Ok(())
}

async fn cmd_status() -> Result<()> {
    let (tasks, events, _gcal) = load_inputs().await?;

    let diff = sync::classify(&tasks, &events);
    let stale = sync::stale_keys(&diff, &tasks, &events);

    if diff.to_create.is_empty() && diff.to_delete.is_empty() && stale.is_empty() {
        println!("Everything up to date.");
        return Ok(());
    }

    for task_id in &diff.to_create {
        println!("  + create: {}", tasks[task_id].name);
    }
    for task_id in &stale {
        println!("  ~ update: {}", tasks[*task_id].name);
    }
    for task_id in &diff.to_delete {
        println!("  - delete: {}", events[task_id].subject);
    }

    Ok(())
}
