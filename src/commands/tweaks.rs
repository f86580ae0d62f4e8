// Tweak catalog commands: list, apply, revert, status

use anyhow::{Context, Result};
use colored::Colorize;

use crate::core::{ApplyOutcome, Panel, RevertOutcome, RiskClass, TweakCategory, TweakState};
use crate::platform::is_elevated;

pub async fn execute(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("list", sub)) => list(panel, sub),
        Some(("apply", sub)) => apply(panel, ids(sub)).await,
        Some(("revert", sub)) => revert(panel, ids(sub)).await,
        Some(("status", sub)) => status(panel, sub.get_one::<String>("id")).await,
        _ => list(panel, matches),
    }
}

fn ids(matches: &clap::ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("ids")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn risk_label(risk: RiskClass) -> colored::ColoredString {
    match risk {
        RiskClass::Low => risk.as_str().green(),
        RiskClass::Medium => risk.as_str().yellow(),
        RiskClass::High => risk.as_str().red().bold(),
    }
}

fn list(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    let category = match matches.try_get_one::<String>("category").ok().flatten() {
        Some(name) => Some(
            TweakCategory::parse(name).with_context(|| format!("Unknown tweak category '{}'", name))?,
        ),
        None => None,
    };

    let tweaks = panel.tweaks(category);
    if tweaks.is_empty() {
        println!("{}", "No tweaks in the enabled categories.".yellow());
        return Ok(());
    }

    let mut current = None;
    for tweak in &tweaks {
        if current != Some(tweak.category) {
            println!();
            println!("{}", tweak.category.as_str().to_uppercase().white().bold());
            current = Some(tweak.category);
        }
        println!(
            "  {:<32} {:<8} {}",
            tweak.id.cyan(),
            risk_label(tweak.risk),
            tweak.name
        );
        if !tweak.description.is_empty() {
            println!("  {:<32} {:<8} {}", "", "", tweak.description.dimmed());
        }
    }
    println!();
    println!("{} {} tweak(s)", "Total:".white().bold(), tweaks.len());
    Ok(())
}

fn warn_if_unelevated(panel: &Panel) {
    if !panel.is_simulated() && !is_elevated() {
        println!(
            "{}",
            "Note: most tweaks need administrator privileges.".yellow()
        );
    }
}

async fn apply(panel: &Panel, ids: Vec<String>) -> Result<()> {
    warn_if_unelevated(panel);
    let mut failed = 0;
    for id in &ids {
        match panel.apply(id).await {
            Ok(ApplyOutcome::Applied) => println!("{} {}", "Applied".green().bold(), id),
            Ok(ApplyOutcome::AlreadyApplied) => println!("{} {}", "Already applied".dimmed(), id),
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", "Failed".red().bold(), id, e);
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} tweak(s) failed", failed, ids.len());
    }
    Ok(())
}

async fn revert(panel: &Panel, ids: Vec<String>) -> Result<()> {
    warn_if_unelevated(panel);
    let mut failed = 0;
    for id in &ids {
        match panel.revert(id).await {
            Ok(RevertOutcome::RolledBack) => println!("{} {}", "Reverted".green().bold(), id),
            Ok(RevertOutcome::AlreadyReverted) => println!("{} {}", "Already reverted".dimmed(), id),
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", "Failed".red().bold(), id, e);
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} revert(s) failed", failed, ids.len());
    }
    Ok(())
}

async fn status(panel: &Panel, id: Option<&String>) -> Result<()> {
    let statuses = match id {
        Some(id) => vec![panel.status(id).await?],
        None => panel.status_all().await?,
    };

    for status in statuses {
        let state = match status.state {
            TweakState::Active => status.state.to_string().green(),
            TweakState::Inactive => status.state.to_string().normal(),
            TweakState::Drifted | TweakState::Failed => status.state.to_string().yellow(),
            TweakState::Unreadable => status.state.to_string().red(),
        };
        let current = status
            .current
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<not set>".to_string());
        println!(
            "  {:<32} {:<10} {} {}",
            status.tweak.id.cyan(),
            state,
            "current:".dimmed(),
            current
        );
        if let Some(reason) = &status.read_error {
            println!("  {:<32} {}", "", reason.dimmed());
        }
        if let Some(record) = &status.record {
            println!(
                "  {:<32} {} {}",
                "",
                "backup:".dimmed(),
                record.previous
            );
        }
    }
    Ok(())
}
