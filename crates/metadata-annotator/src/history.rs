//! The global history attribute.

use chrono::{DateTime, SecondsFormat, Utc};
use netcdf_tree::{AttributeStore, AttributeValue, Tree};

/// Program name written into history lines.
pub const PROGRAM: &str = "Harmony Metadata Annotator";

/// Version written into history lines.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name and current value of the history attribute.
///
/// `History` is used when present, then `history`; a granule with neither
/// reports `history` with no value.
pub fn read_history(tree: &Tree) -> (&'static str, Option<String>) {
    let root = tree.root();
    for name in ["History", "history"] {
        if let Some(value) = root.attribute(name) {
            let text = match value {
                AttributeValue::Text(text) => text.clone(),
                AttributeValue::Texts(lines) => lines.join("\n"),
                other => other.to_string(),
            };
            return (name, Some(text));
        }
    }
    ("history", None)
}

/// The line recording this annotation run.
pub fn history_line(timestamp: DateTime<Utc>) -> String {
    format!(
        "{} {} {}",
        timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        PROGRAM,
        VERSION
    )
}

/// Append a history line, keeping the attribute name already in use.
pub fn update_history(tree: &mut Tree, timestamp: DateTime<Utc>) {
    let (name, existing) = read_history(tree);
    let line = history_line(timestamp);

    let value = match existing.filter(|text| !text.is_empty()) {
        Some(existing) => format!("{}\n{}", existing, line),
        None => line,
    };
    tree.root_mut().set_attribute(name, AttributeValue::Text(value));
}
