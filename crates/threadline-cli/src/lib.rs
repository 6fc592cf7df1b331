//! Command-line front end for the threadline flattening engine.
//!
//! Reads a conversation snapshot (file or stdin), flattens it, and prints the
//! display items as an outline or as JSON. `--check` reports what the engine
//! silently worked around.
//!
//! ## Module Structure
//!
//! - `config`: RON config file and output settings
//! - `outline`: display items as an ASCII outline

pub mod config;
pub mod outline;

use std::path::Path;

use threadline_types::{ConversationSnapshot, DisplayItem, SnapshotError};

use config::{CliConfig, OutputFormat};

/// Read a snapshot from a JSON file, or from stdin when `path` is `-`.
pub fn read_snapshot(path: &Path) -> Result<ConversationSnapshot, SnapshotError> {
    if path.as_os_str() == "-" {
        ConversationSnapshot::from_reader(std::io::stdin().lock())
    } else {
        ConversationSnapshot::from_reader(std::fs::File::open(path)?)
    }
}

/// Flatten a snapshot with the configured preprocessing.
pub fn flatten_snapshot(mut snapshot: ConversationSnapshot, config: &CliConfig) -> Vec<DisplayItem> {
    if config.sort && !snapshot.is_sorted_by_creation() {
        tracing::debug!("sorting messages by createdAt");
        snapshot.sort_by_creation();
    }
    threadline_flatten::flatten(&snapshot)
}

/// Render display items in the configured format.
pub fn render(items: &[DisplayItem], config: &CliConfig) -> Result<String, serde_json::Error> {
    match config.format {
        OutputFormat::Outline => Ok(outline::format_outline(items, config.summary_width).join("\n")),
        OutputFormat::Json => serde_json::to_string_pretty(items),
    }
}
