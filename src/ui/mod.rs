// UI and formatting module

pub mod formatters;
pub mod progress;
pub mod prompts;

pub use formatters::{format_percent, format_size, format_timestamp, usage_bar};
pub use progress::CleanupProgress;
pub use prompts::{error, info, read_confirmation, success, warn};
