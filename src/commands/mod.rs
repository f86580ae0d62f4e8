// Command handlers module
pub mod backups;
pub mod clean;
pub mod config;
pub mod monitor;
pub mod turbo;
pub mod tweaks;
pub mod version;

use anyhow::Result;
use colored::Colorize;

use crate::core::CancelFlag;

/// Cancel flag raised by Ctrl+C. Work in progress finishes its current item.
pub fn cancel_on_ctrlc(activity: &'static str) -> Result<CancelFlag> {
    let flag = CancelFlag::new();
    let handler_flag = flag.clone();

    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Cancellation requested...".yellow().bold());
        println!("{}", format!("Stopping {} after the current item...", activity).dimmed());
        handler_flag.cancel();
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    Ok(flag)
}
