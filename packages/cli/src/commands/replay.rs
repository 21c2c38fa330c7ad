use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_stream::StreamExt;
use tracing::info;
use worksheet_editor::{Event, EventChannel, WorksheetDocument, WorksheetSession, WorksheetSnapshot};
use worksheet_host::{HostChannels, HostOptions, WorksheetHost};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Worksheet to open
    pub worksheet: PathBuf,

    /// JSON-lines file of inbound events (reads stdin when omitted)
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Answer every evaluation request with its own code as the value
    #[arg(long)]
    pub echo: bool,

    /// Save the worksheet once all events are handled
    #[arg(long)]
    pub save: bool,
}

/// Everything a replay produced
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub notifications: Vec<Event>,
    pub unanswered_requests: Vec<Event>,
    pub snapshot: WorksheetSnapshot,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = match &args.events {
        Some(path) => fs::read_to_string(PathBuf::from(cwd).join(path))?,
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            input
        }
    };
    let events = parse_events(&input)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let path = PathBuf::from(cwd).join(&args.worksheet);
    let report = runtime.block_on(replay_events(&path, events, args.echo, args.save, config.host))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Parse one event per non-blank line
pub(crate) fn parse_events(input: &str) -> Result<Vec<Event>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            Event::from_json(line).with_context(|| format!("line {}: invalid event", i + 1))
        })
        .collect()
}

/// Feed `events` through a hosted session on the worksheet at `path`
pub(crate) async fn replay_events(
    path: &Path,
    events: Vec<Event>,
    echo: bool,
    save: bool,
    options: HostOptions,
) -> Result<ReplayReport> {
    if let Some(outbound) = events.iter().find(|e| e.is_outbound()) {
        return Err(anyhow!("{} is not an inbound event", outbound.name()));
    }

    let document = WorksheetDocument::load(path, EventChannel::new())?;
    let (host, handle, channels) = WorksheetHost::spawn(WorksheetSession::open(document), options);
    let HostChannels {
        mut requests,
        notifications,
    } = channels;

    info!(events = events.len(), "replaying events");
    for event in events {
        handle.dispatch(event).await?;
        if !echo {
            continue;
        }
        // Once the snapshot comes back every request for this event is queued
        handle.snapshot().await?;
        while let Ok(request) = requests.try_recv() {
            if let Event::EvaluationRequest { code, segment_id } = request {
                handle
                    .dispatch(Event::EvaluationValue {
                        segment_id,
                        value: code,
                    })
                    .await?;
                handle.dispatch(Event::EvaluationDone { segment_id }).await?;
            }
        }
    }

    if save {
        handle.save().await?;
    }
    let snapshot = handle.snapshot().await?;
    handle.shutdown().await?;
    host.join().await?;

    let mut unanswered_requests = Vec::new();
    while let Ok(request) = requests.try_recv() {
        unanswered_requests.push(request);
    }

    Ok(ReplayReport {
        notifications: notifications.collect().await,
        unanswered_requests,
        snapshot,
    })
}
