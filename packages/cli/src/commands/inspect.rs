use super::{target_path, worksheet_files};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use worksheet_editor::{EventChannel, Segment, WorksheetDocument, WorksheetSnapshot};

const PREVIEW_WIDTH: usize = 60;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Worksheet file or directory (defaults to the configured source directory)
    pub path: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Serialize, Debug)]
struct FileReport {
    path: String,
    #[serde(flatten)]
    snapshot: WorksheetSnapshot,
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let json = match args.format.as_str() {
        "text" => false,
        "json" => true,
        other => return Err(anyhow!("Invalid format: {}. Use: text or json", other)),
    };

    let config = Config::load(cwd)?;
    let target = target_path(args.path.as_deref(), &config, cwd);
    let files = worksheet_files(&target, &config)?;

    let mut reports = Vec::new();
    let mut failures = 0;
    for file in &files {
        let document = match WorksheetDocument::load(file, EventChannel::new()) {
            Ok(document) => document,
            Err(err) => {
                eprintln!("{} Failed to read {}: {}", "✗".red(), file.display(), err);
                failures += 1;
                continue;
            }
        };

        if json {
            reports.push(FileReport {
                path: file.display().to_string(),
                snapshot: document.worksheet().snapshot(),
            });
        } else {
            println!("{}", file.display().to_string().bold());
            for (index, segment) in document.worksheet().segments().iter().enumerate() {
                println!("{}", describe_segment(index, segment));
            }
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} worksheets could not be read", failures, files.len()));
    }
    Ok(())
}

/// One listing line: index, identity, type and a preview of the first line
fn describe_segment(index: usize, segment: &Segment) -> String {
    format!(
        "  {:>3}  {:<8} {:<4}  {}",
        index,
        segment.id().to_string(),
        segment.kind().as_str(),
        preview(segment.content())
    )
}

fn preview(content: &str) -> String {
    let first = content.lines().next().unwrap_or("");
    let mut preview: String = first.chars().take(PREVIEW_WIDTH).collect();
    if first.chars().count() > PREVIEW_WIDTH || content.lines().nth(1).is_some() {
        preview.push_str(" …");
    }
    preview
}
