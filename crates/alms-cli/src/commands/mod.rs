//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, status) and shared utilities (open_db)
//! - `import` - CSV import command
//! - `donors` - Donor management commands (list, merge, discard)
//! - `donations` - Donation listing commands
//! - `serve` - Web server command

pub mod core;
pub mod donations;
pub mod donors;
pub mod import;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use donations::*;
pub use donors::*;
pub use import::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..."
/// if truncated. Cuts on character boundaries, so non-ASCII donor
/// names from an import never split mid-codepoint.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
