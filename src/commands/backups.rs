// Backup record commands: list, purge

use anyhow::Result;
use colored::Colorize;

use crate::core::{ApplicationStatus, Panel};
use crate::ui::{format_timestamp, read_confirmation};

pub fn execute(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("purge", sub)) => {
            let id = sub
                .get_one::<String>("id")
                .ok_or_else(|| anyhow::anyhow!("A tweak id is required"))?;
            purge(panel, id, sub.get_flag("yes"))
        }
        _ => list(panel),
    }
}

fn list(panel: &Panel) -> Result<()> {
    let records = panel.backups();
    if records.is_empty() {
        println!("{}", "No backups recorded.".dimmed());
        return Ok(());
    }

    for record in &records {
        let status = match record.status {
            ApplicationStatus::Applied => "applied".green(),
            ApplicationStatus::RolledBack => "rolled back".dimmed(),
            ApplicationStatus::Failed => "failed".red(),
        };
        println!(
            "  {:<32} {:<12} {}",
            record.tweak_id.cyan(),
            status,
            format_timestamp(&record.applied_at).dimmed()
        );
        println!("  {:<32} {} {}", "", "target:".dimmed(), record.target);
        println!("  {:<32} {} {}", "", "previous:".dimmed(), record.previous);
    }
    println!();
    println!("{} {} record(s)", "Total:".white().bold(), records.len());
    Ok(())
}

fn purge(panel: &Panel, id: &str, assume_yes: bool) -> Result<()> {
    println!(
        "{}",
        format!("Purging '{}' discards the value needed to revert it.", id).yellow()
    );
    if !assume_yes && !read_confirmation("Continue? (y/n): ", 3)? {
        println!("{}", "Operation cancelled by user.".yellow());
        return Ok(());
    }

    if panel.purge_backup(id)? {
        println!("{} {}", "Purged".green().bold(), id);
    } else {
        println!("{}", format!("No backup recorded for '{}'.", id).dimmed());
    }
    Ok(())
}
