// Settings inspection: show, path, reset

use anyhow::{Context, Result};
use colored::Colorize;

use crate::core::Settings;
use crate::ui::read_confirmation;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => path(),
        Some(("reset", sub)) => reset(sub.get_flag("yes")),
        _ => show(),
    }
}

fn show() -> Result<()> {
    let settings = Settings::load();
    let json = serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?;
    println!("{}", json);
    Ok(())
}

fn path() -> Result<()> {
    let path = Settings::config_path()?;
    let exists = if path.exists() { "" } else { " (not created yet)" };
    println!("{}{}", path.display(), exists.dimmed());

    let data_dir = Settings::load().data_dir()?;
    println!("{} {}", "Data directory:".dimmed(), data_dir.display());
    Ok(())
}

fn reset(assume_yes: bool) -> Result<()> {
    if !assume_yes && !read_confirmation("Restore default settings? (y/n): ", 3)? {
        println!("{}", "Operation cancelled by user.".yellow());
        return Ok(());
    }

    Settings::default()
        .save()
        .context("Failed to write default settings")?;
    println!("{}", "Settings restored to defaults.".green());
    Ok(())
}
