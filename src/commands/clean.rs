// Cleanup commands
//
// - plan: show what each category would remove, deleting nothing
// - run: plan, confirm, then delete with a progress bar

use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use crate::core::cleaner::CleanupPreview;
use crate::core::turbo::parse_categories;
use crate::core::{CleanupCategory, CleanupReport, CleanupTarget, Panel};
use crate::platform::is_elevated;
use crate::ui::{format_size, read_confirmation, CleanupProgress};

pub async fn execute(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("run", sub)) => run(panel, sub).await,
        Some(("plan", sub)) => plan(panel, sub).await,
        _ => plan(panel, matches).await,
    }
}

/// Categories named on the command line, or every enabled one
fn selected_categories(panel: &Panel, matches: &clap::ArgMatches) -> Result<Vec<CleanupCategory>> {
    let names: Vec<String> = matches
        .try_get_many::<String>("categories")
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if names.is_empty() {
        Ok(panel.settings().cleanup.enabled_categories.clone())
    } else {
        Ok(parse_categories(&names)?)
    }
}

fn targets(panel: &Panel, matches: &clap::ArgMatches) -> Result<Vec<CleanupTarget>> {
    let min_age = matches
        .try_get_one::<u64>("min-age")
        .ok()
        .flatten()
        .map(|hours| Duration::from_secs(hours * 3600));

    Ok(selected_categories(panel, matches)?
        .into_iter()
        .map(|category| {
            let target = panel.cleanup_target(category);
            match min_age {
                Some(age) => target.with_min_age(age),
                None => target,
            }
        })
        .collect())
}

async fn plan(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    println!("{}", "Scanning cleanup locations...".dimmed());
    let preview = panel.preview(targets(panel, matches)?).await?;
    print_preview(&preview);
    Ok(())
}

fn print_preview(preview: &CleanupPreview) {
    println!();
    for item in &preview.items {
        println!(
            "  {:<16} {:>8} file(s) {:>10}",
            item.category.label().white().bold(),
            item.file_count,
            format_size(item.total_bytes).yellow()
        );
        for root in &item.roots {
            println!("      {}", root.display().to_string().dimmed());
        }
        for failure in &item.enumeration_failures {
            println!(
                "      {} {}: {}",
                "!".yellow(),
                failure.path.display(),
                failure.reason.dimmed()
            );
        }
    }
    println!();
    println!(
        "{} {} file(s), {}",
        "Total:".white().bold(),
        preview.total_files().to_string().yellow().bold(),
        format_size(preview.total_bytes()).yellow().bold()
    );
}

async fn run(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    let assume_yes = matches.get_flag("yes");
    let targets = targets(panel, matches)?;
    let cancel = super::cancel_on_ctrlc("cleanup")?;

    if !is_elevated() {
        println!(
            "{}",
            "Note: system locations need administrator privileges; files there may be skipped.".yellow()
        );
    }
    println!("{}", "Press Ctrl+C at any time to cancel safely".dimmed());
    println!();

    let mut total_deleted = 0usize;
    let mut total_reclaimed = 0u64;

    for target in targets {
        if cancel.is_cancelled() {
            break;
        }
        let category = target.category;
        let plan = panel.plan_cleanup(target).await?;
        if plan.is_empty() {
            println!("{} {}", category.label().white().bold(), "nothing to clean".dimmed());
            continue;
        }

        println!(
            "{} {} file(s), {}",
            category.label().white().bold(),
            plan.len(),
            format_size(plan.estimated_reclaim_bytes()).yellow()
        );
        if !assume_yes && !read_confirmation("Delete these files? (y/n): ", 3)? {
            println!("{}", "Skipped.".dimmed());
            continue;
        }

        let progress = Arc::new(CleanupProgress::new("Progress:"));
        let bar = Arc::clone(&progress);
        let report = panel
            .clean(plan, cancel.clone(), move |processed, total| bar.update(processed, total))
            .await?;
        progress.finish();
        print_report(&report);

        total_deleted += report.deleted_count;
        total_reclaimed += report.reclaimed_bytes;
    }

    println!();
    println!(
        "{} {} file(s) removed, {} reclaimed",
        "Done:".green().bold(),
        total_deleted,
        format_size(total_reclaimed)
    );
    Ok(())
}

fn print_report(report: &CleanupReport) {
    println!(
        "  {} {} file(s), {}",
        "Deleted".green(),
        report.deleted_count,
        format_size(report.reclaimed_bytes)
    );
    if !report.skipped.is_empty() {
        println!("  {} {} file(s)", "Skipped".yellow(), report.skipped.len());
        for skipped in report.skipped.iter().take(10) {
            println!(
                "      {} ({})",
                skipped.path.display().to_string().dimmed(),
                skipped.reason
            );
        }
        if report.skipped.len() > 10 {
            println!("      {}", format!("... and {} more", report.skipped.len() - 10).dimmed());
        }
    }
    if report.cancelled {
        println!(
            "  {} {} file(s) not attempted",
            "Cancelled:".yellow().bold(),
            report.not_attempted
        );
    }
}
