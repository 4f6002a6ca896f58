//! Audit log commands
//!
//! Record events on behalf of scripts and integrations, and review the log.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use armory_audit::{
    ActionType, ActorType, AuditFilter, AuditLogEntry, AuditRecorder, AuditStatus, EntityType,
    RawAuditEvent, StoreBackend,
};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tokio_stream::StreamExt;
use tracing::debug;

use crate::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommands,

    /// Override the configured store backend (memory, jsonl, sqlite)
    #[arg(long, global = true)]
    pub backend: Option<StoreBackend>,

    /// Override the configured store path
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Record one event given as JSON and print the stored entry
    Record {
        /// Event JSON
        #[arg(long, conflicts_with = "file")]
        json: Option<String>,

        /// Read the event JSON from a file ("-" for stdin)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List entries matching the given criteria, oldest first
    Query(QueryArgs),
    /// List the actor, action and entity types the log accepts
    Taxonomy,
}

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Entity type (e.g. Firearm, DailyAmmunitionUsage)
    #[arg(long)]
    pub entity_type: Option<String>,

    #[arg(long)]
    pub entity_id: Option<String>,

    /// Actor id
    #[arg(long)]
    pub actor: Option<String>,

    /// Action type (e.g. CREATE, LOG_USAGE)
    #[arg(long)]
    pub action: Option<String>,

    /// SUCCESS or FAILURE
    #[arg(long)]
    pub status: Option<String>,

    /// Only entries at or after this RFC 3339 time
    #[arg(long)]
    pub since: Option<String>,

    /// Only entries at or before this RFC 3339 time
    #[arg(long)]
    pub until: Option<String>,

    /// Maximum number of entries
    #[arg(long)]
    pub limit: Option<usize>,

    /// Print one JSON object per line instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: AuditArgs) -> Result<()> {
    match args.command {
        AuditCommands::Taxonomy => {
            print_taxonomy();
            Ok(())
        }
        AuditCommands::Record { json, file } => {
            let recorder = open_recorder(args.backend, args.store)?;
            record(&recorder, json, file).await
        }
        AuditCommands::Query(query) => {
            let recorder = open_recorder(args.backend, args.store)?;
            run_query(&recorder, query).await
        }
    }
}

fn open_recorder(backend: Option<StoreBackend>, store: Option<PathBuf>) -> Result<AuditRecorder> {
    let mut config = ConfigLoader::load()?.audit;
    if let Some(backend) = backend {
        config.backend = backend;
    }
    if let Some(path) = store {
        config.path = Some(path);
    }
    if config.backend == StoreBackend::Memory {
        tracing::warn!("memory backend selected; entries are discarded on exit");
    }

    debug!(backend = config.backend.as_str(), path = ?config.store_path(), "opening audit store");
    Ok(AuditRecorder::from_config(&config)?)
}

async fn record(recorder: &AuditRecorder, json: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let input = match (json, file) {
        (Some(json), _) => json,
        (None, Some(path)) if path.as_os_str() == "-" => read_stdin()?,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => read_stdin()?,
    };

    let raw = parse_event(&input)?;
    let entry = recorder.record_raw(raw).await?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read event from stdin")?;
    Ok(input)
}

fn parse_event(input: &str) -> Result<RawAuditEvent> {
    if input.trim().is_empty() {
        bail!("no event given: pass --json, --file or pipe JSON on stdin");
    }
    serde_json::from_str(input).context("event is not valid JSON")
}

fn build_filter(args: &QueryArgs) -> Result<AuditFilter> {
    Ok(AuditFilter {
        entity_type: args
            .entity_type
            .as_deref()
            .map(str::parse::<EntityType>)
            .transpose()?,
        entity_id: args.entity_id.clone(),
        actor_id: args.actor.clone(),
        action_type: args
            .action
            .as_deref()
            .map(str::parse::<ActionType>)
            .transpose()?,
        status: args
            .status
            .as_deref()
            .map(str::parse::<AuditStatus>)
            .transpose()?,
        from: args.since.as_deref().map(parse_time).transpose()?,
        to: args.until.as_deref().map(parse_time).transpose()?,
        limit: args.limit,
    })
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("'{}' is not an RFC 3339 timestamp", value))?;
    Ok(parsed.with_timezone(&Utc))
}

async fn run_query(recorder: &AuditRecorder, args: QueryArgs) -> Result<()> {
    let filter = build_filter(&args)?;
    let mut stream = recorder.query(&filter).await?;

    if args.json {
        while let Some(entry) = stream.next().await {
            println!("{}", serde_json::to_string(&entry?)?);
        }
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Time", "Actor", "Action", "Entity", "Entity ID", "Status", "Error",
        ]);

    let mut rows = 0;
    while let Some(entry) = stream.next().await {
        table.add_row(entry_row(&entry?));
        rows += 1;
    }

    if rows == 0 {
        println!("No audit entries match.");
    } else {
        println!("{table}");
        println!("{} entr{}", rows, if rows == 1 { "y" } else { "ies" });
    }
    Ok(())
}

fn entry_row(entry: &AuditLogEntry) -> Vec<Cell> {
    let event = entry.event();
    let status = match event.status {
        AuditStatus::Success => Cell::new(event.status).fg(Color::Green),
        AuditStatus::Failure => Cell::new(event.status).fg(Color::Red),
    };
    let actor = match event.actor.actor_type {
        ActorType::User => format!("{} ({})", event.actor.name, event.actor.id),
        ActorType::System => format!("{} [system]", event.actor.name),
    };

    vec![
        Cell::new(entry.timestamp().format("%Y-%m-%d %H:%M:%S")),
        Cell::new(actor),
        Cell::new(event.action_type),
        Cell::new(event.entity_type),
        Cell::new(event.entity_id.as_deref().unwrap_or("-")),
        status,
        Cell::new(event.error_message.as_deref().unwrap_or("")),
    ]
}

fn print_taxonomy() {
    println!("Actor types:");
    for actor in ActorType::ALL {
        println!("  {}", actor);
    }
    println!();

    println!("Action types:");
    for action in ActionType::ALL {
        println!("  {}", action);
    }
    println!();

    println!("Entity types:");
    for entity in EntityType::ALL {
        match entity.replacement() {
            Some(replacement) => println!("  {:24} deprecated, use {}", entity.as_str(), replacement),
            None => println!("  {}", entity),
        }
    }
    println!();

    println!("Statuses:");
    for status in AuditStatus::ALL {
        println!("  {}", status);
    }
}
