// Console prompts and status lines

use colored::Colorize;
use std::io::{self, Write};

/// Ask a yes/no question. IO errors are retried up to `max_attempts` times.
pub fn read_confirmation(prompt: &str, max_attempts: u32) -> anyhow::Result<bool> {
    for attempt in 1..=max_attempts {
        print!("{}", prompt.white().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(_) => return Ok(is_yes(&input)),
            Err(e) if attempt < max_attempts => {
                println!(
                    "{}",
                    format!("Error reading input (attempt {}/{}): {}", attempt, max_attempts, e).yellow()
                );
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read confirmation after {} attempts: {}",
                    max_attempts,
                    e
                ));
            }
        }
    }
    Ok(false)
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn warn(message: &str) {
    println!("{} {}", "!".yellow().bold(), message.yellow());
}

pub fn error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

pub fn info(message: &str) {
    println!("{}", message.cyan());
}
