// Turbo mode: the curated tweak set plus the default cleanups in one batch

use anyhow::Result;
use colored::Colorize;

use crate::core::turbo::parse_categories;
use crate::core::{ItemOutcome, Panel, TurboSession};
use crate::platform::is_elevated;
use crate::ui::{format_size, read_confirmation};

pub async fn execute(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("deactivate", _)) => deactivate(panel).await,
        _ => activate(panel, matches).await,
    }
}

async fn activate(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    let mut selection = panel.turbo_selection();

    if matches.get_flag("no-cleanup") {
        selection.cleanup_targets.clear();
    } else if let Some(names) = matches.get_many::<String>("categories") {
        let names: Vec<String> = names.cloned().collect();
        selection.cleanup_targets = parse_categories(&names)?
            .into_iter()
            .map(|c| panel.cleanup_target(c))
            .collect();
    }
    if let Some(ids) = matches.get_many::<String>("confirm") {
        for id in ids {
            selection = selection.confirm(id.clone());
        }
    }

    println!("{}", "Turbo mode".cyan().bold());
    println!(
        "  {} tweak(s), {} cleanup categor{}",
        selection.tweak_ids.len(),
        selection.cleanup_targets.len(),
        if selection.cleanup_targets.len() == 1 { "y" } else { "ies" }
    );
    if !panel.is_simulated() && !is_elevated() {
        println!(
            "{}",
            "Note: without administrator privileges most tweaks will fail.".yellow()
        );
    }
    println!();

    if !matches.get_flag("yes") && !read_confirmation("Activate Turbo? (y/n): ", 3)? {
        println!("{}", "Operation cancelled by user.".yellow());
        return Ok(());
    }

    let cancel = super::cancel_on_ctrlc("Turbo")?;
    let session = panel.turbo(selection, cancel).await?;
    print_session(&session);
    Ok(())
}

fn print_session(session: &TurboSession) {
    println!();
    for result in &session.results {
        let (label, detail) = match &result.outcome {
            ItemOutcome::Applied => ("applied".green(), String::new()),
            ItemOutcome::AlreadyApplied => ("already applied".dimmed(), String::new()),
            ItemOutcome::Cleaned(report) => (
                if report.is_partial() { "partial".yellow() } else { "cleaned".green() },
                format!(
                    "{} file(s), {}, {} skipped",
                    report.deleted_count,
                    format_size(report.reclaimed_bytes),
                    report.skipped.len()
                ),
            ),
            ItemOutcome::Failed(reason) => ("failed".red(), reason.clone()),
            ItemOutcome::ConfirmationRequired(risk) => (
                "needs confirmation".yellow(),
                format!("{} risk, rerun with --confirm", risk),
            ),
            ItemOutcome::Cancelled => ("cancelled".yellow(), String::new()),
        };
        println!("  {:<40} {:<20} {}", result.item.to_string(), label, detail.dimmed());
    }

    println!();
    println!(
        "{} {} applied, {} failed, {} reclaimed",
        "Session:".white().bold(),
        session.applied_tweaks().len(),
        session.failure_count(),
        format_size(session.reclaimed_bytes())
    );
    if session.cancelled {
        println!("{}", "Session was cancelled before all items ran.".yellow());
    }
    if !session.applied_tweaks().is_empty() {
        println!("{}", "Run 'fpspack turbo deactivate' to restore the previous settings.".dimmed());
    }
}

async fn deactivate(panel: &Panel) -> Result<()> {
    let Some(record) = panel.last_session()? else {
        println!("{}", "No Turbo session to deactivate.".dimmed());
        return Ok(());
    };

    println!(
        "{} {} ({} tweak(s))",
        "Deactivating".cyan().bold(),
        record.id,
        record.applied_tweaks.len()
    );

    let results = panel.deactivate_turbo().await?;
    let mut failed = 0;
    for result in &results {
        match &result.outcome {
            Ok(outcome) => println!("  {:<40} {}", result.tweak_id, format!("{:?}", outcome).green()),
            Err(e) => {
                failed += 1;
                println!("  {:<40} {}", result.tweak_id, e.to_string().red());
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} tweak(s) could not be reverted; the session record was kept", failed);
    }
    println!("{}", "Turbo deactivated.".green());
    Ok(())
}
