// In-place progress line for cleanup runs

use colored::Colorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

const BAR_WIDTH: usize = 30;
const NOTHING_DRAWN: usize = usize::MAX;

/// Progress line fed by the cleanup engine's `(processed, total)` callback.
///
/// Deletions are much faster than terminal writes, so the line is only
/// redrawn when the whole-percent value changes.
pub struct CleanupProgress {
    label: String,
    last_percent: AtomicUsize,
}

impl CleanupProgress {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            last_percent: AtomicUsize::new(NOTHING_DRAWN),
        }
    }

    pub fn update(&self, processed: usize, total: usize) {
        if let Some(percent) = self.advance(processed, total) {
            let filled = percent * BAR_WIDTH / 100;
            print!(
                "\r{} [{}{}] {:>3}% ({}/{}) ",
                self.label.white(),
                "#".repeat(filled).green(),
                "-".repeat(BAR_WIDTH - filled).dimmed(),
                percent,
                processed,
                total
            );
            io::stdout().flush().ok();
        }
    }

    /// Erase the line so the report starts on a clean row
    pub fn finish(&self) {
        if self.last_percent.load(Ordering::Relaxed) != NOTHING_DRAWN {
            let width = self.label.len() + BAR_WIDTH + 32;
            print!("\r{}\r", " ".repeat(width));
            io::stdout().flush().ok();
        }
    }

    /// New percentage when it differs from the last one drawn
    fn advance(&self, processed: usize, total: usize) -> Option<usize> {
        let percent = percent_done(processed, total);
        let previous = self.last_percent.swap(percent, Ordering::Relaxed);
        (previous != percent).then_some(percent)
    }
}

fn percent_done(processed: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    (processed.min(total) * 100) / total
}
