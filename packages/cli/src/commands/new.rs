use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use worksheet_editor::{EventChannel, Segment, Worksheet, WorksheetDocument};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Path of the worksheet to create
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

pub fn create(args: NewArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = PathBuf::from(cwd).join(&args.path);

    if path.exists() && !args.force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let worksheet = Worksheet::from_segments(
        vec![Segment::new(config.default_segment, "")],
        EventChannel::new(),
    );
    let mut document = WorksheetDocument::from_worksheet(&path, worksheet);
    document.save_as(&path)?;

    println!(
        "  {} Created {} ({} segment)",
        "✓".green(),
        args.path.display(),
        config.default_segment
    );
    Ok(())
}
