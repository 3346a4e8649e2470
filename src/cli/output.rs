use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::core::errors::Result;
use crate::core::models::key_ring_entry::EntrySummary;
use crate::core::traits::progress::ProgressSink;

/// Print a success message.
pub fn success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a header line.
pub fn header(msg: &str) {
    println!("\n{}", msg.bold());
}

/// Print a value as pretty JSON on stdout.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{text}");
    Ok(())
}

/// One row of `scan` or `list` JSON output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub secret: bool,
    #[serde(flatten)]
    pub summary: &'a EntrySummary,
}

/// Print a key ring as a formatted row.
pub fn entry_row(row: &EntryRow<'_>) {
    let summary = row.summary;
    let kind = if row.secret {
        "sec".yellow().to_string()
    } else {
        "pub".green().to_string()
    };
    let index = row
        .index
        .map(|i| format!("{i:>3}. "))
        .unwrap_or_default();
    let key_id = summary
        .key_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "????????????????".to_string());
    let algorithm = summary.algorithm.as_deref().unwrap_or("?");
    let name = summary
        .name
        .as_deref()
        .map(|n| n.bold().to_string())
        .unwrap_or_else(|| "<no name>".dimmed().to_string());
    let rest = summary.user_id_rest.as_deref().unwrap_or("");

    println!(
        "  {index}{kind} {} {:<8} {} {}",
        key_id.cyan(),
        algorithm,
        name,
        rest.dimmed()
    );

    let mut details = Vec::new();
    if let Some(created) = summary.created {
        details.push(format!("created {}", created.format("%Y-%m-%d")));
    }
    if let Some(expires) = summary.expires {
        details.push(format!("expires {}", expires.format("%Y-%m-%d")));
    }
    if let Some(subkeys) = summary.subkeys {
        details.push(format!("{subkeys} subkey(s)"));
    }
    let mut line = details.join(", ").dimmed().to_string();
    if summary.revoked {
        line.push_str(&format!(" {}", "[revoked]".red()));
    }
    if summary.key_id.is_none() {
        line.push_str(&format!(" {}", "[unreadable]".red()));
    }
    println!("  {:indent$}{line}", "", indent = index.len() + 4);
}

/// Start a spinner for a blocking step.
pub fn spinner(msg: &str) -> ProgressBar {
    let sp = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner} {msg}") {
        sp.set_style(style);
    }
    sp.set_message(msg.to_string());
    sp.enable_steady_tick(std::time::Duration::from_millis(100));
    sp
}

/// Stop a spinner and clear its line.
pub fn finish_spinner(sp: ProgressBar) {
    sp.finish_and_clear();
}

/// Progress bar on stderr, driven through `ProgressSink`.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            let style = ProgressStyle::with_template("  {msg:>10} [{bar:30}] {pos:>3}%")
                .map(|s| s.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            ProgressBar::new(100).with_style(style)
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ProgressReporter {
    fn set_progress(&self, message: Option<&str>, current: usize, total: usize) {
        if let Some(message) = message {
            self.bar.set_message(message.to_string());
        }
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }
}
