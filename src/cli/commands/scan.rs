use crate::cli::commands::import::load_entries;
use crate::cli::context::CommandContext;
use crate::cli::output::{self, EntryRow};
use crate::core::errors::Result;

/// Execute the `keyport scan` command.
///
/// Lists every key ring found in the input with its entry number, so a
/// later `import --only` can pick a subset.
pub fn execute(ctx: &CommandContext, file: &str) -> Result<()> {
    let entries = load_entries(ctx, file)?;

    let rows: Vec<EntryRow<'_>> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| EntryRow {
            index: Some(i + 1),
            secret: entry.is_secret(),
            summary: entry.summary(),
        })
        .collect();

    if ctx.json {
        return output::json(&rows);
    }
    if ctx.quiet {
        return Ok(());
    }

    output::header(&format!("keyport scan ({} entries)", rows.len()));
    if rows.is_empty() {
        output::warning("No key rings found");
        return Ok(());
    }
    println!();
    for row in &rows {
        output::entry_row(row);
    }
    Ok(())
}
