use super::{target_path, worksheet_files};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use worksheet_editor::{EventChannel, WorksheetDocument};

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Worksheet file or directory (defaults to the configured source directory)
    pub path: Option<PathBuf>,

    /// Report files that are not in canonical form without rewriting them
    #[arg(long)]
    pub check: bool,
}

pub fn normalize(args: NormalizeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let target = target_path(args.path.as_deref(), &config, cwd);
    let files = worksheet_files(&target, &config)?;

    let mut changed = 0;
    for file in &files {
        let relative_path = file.strip_prefix(cwd).unwrap_or(file);
        if !normalize_file(file, args.check)? {
            continue;
        }
        changed += 1;
        if args.check {
            println!("  {} {} is not normalized", "✗".red(), relative_path.display());
        } else {
            println!("  {} {}", "✓".green(), relative_path.display());
        }
    }

    println!(
        "{} {} checked, {} {}",
        "Done".green().bold(),
        files.len(),
        changed,
        if args.check { "would change" } else { "rewritten" }
    );

    if args.check && changed > 0 {
        return Err(anyhow!("{} worksheet(s) are not normalized", changed));
    }
    Ok(())
}

/// Bring one file into canonical form. Returns whether it differed.
pub(crate) fn normalize_file(path: &Path, check: bool) -> Result<bool> {
    let source = fs::read_to_string(path)?;
    let document = WorksheetDocument::from_source(path, &source, EventChannel::new())
        .map_err(|err| anyhow!("{}: {}", path.display(), err))?;

    let canonical = document.source();
    if canonical == source {
        return Ok(false);
    }
    if !check {
        fs::write(path, canonical)?;
    }
    Ok(true)
}
