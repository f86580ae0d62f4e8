use anyhow::Result;
use colored::Colorize;

use crate::platform::privilege_label;

pub fn execute() -> Result<()> {
    println!("fpspack version {}", env!("CARGO_PKG_VERSION"));
    println!("{} {}", "Running as:".dimmed(), privilege_label());
    Ok(())
}
