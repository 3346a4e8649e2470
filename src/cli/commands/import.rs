use tracing::warn;

use crate::cli::context::{self, CommandContext};
use crate::cli::output;
use crate::core::errors::{KeyportError, Result};
use crate::core::models::key_ring_entry::KeyRingEntry;
use crate::core::services::import_export::ImportExportService;
use crate::core::services::key_material_decoder::KeyMaterialDecoder;

/// Decode every entry in `file`.
///
/// A framing error after at least one entry is reported as a warning and
/// the entries before it are kept; with no entries it is the command's error.
pub fn load_entries(ctx: &CommandContext, file: &str) -> Result<Vec<KeyRingEntry>> {
    let input = context::open_input(file)?;
    let mut decoder = KeyMaterialDecoder::new(input);
    let mut entries = Vec::new();
    let mut unreadable = 0;
    let mut failure = None;

    for item in decoder.entries() {
        match item {
            Ok(entry) => entries.push(entry),
            Err(e @ (KeyportError::Parse { .. } | KeyportError::Io(_))) => failure = Some(e),
            Err(e) => {
                warn!("skipping key ring: {e}");
                unreadable += 1;
            }
        }
    }

    if let Some(e) = failure {
        if entries.is_empty() {
            return Err(e);
        }
        warn!(offset = decoder.offset(), "{e}");
        if ctx.human() {
            output::warning(&format!(
                "Input ends with unreadable data; kept the {} entries before it",
                entries.len()
            ));
        }
    }

    let unrecognized = decoder.unrecognized_objects();
    if ctx.human() && unreadable + unrecognized > 0 {
        output::warning(&format!(
            "Skipped {} object(s) that are not readable key rings",
            unreadable + unrecognized
        ));
    }

    Ok(entries)
}

/// Execute the `keyport import` command.
pub fn execute(ctx: &CommandContext, file: &str, only: &[usize]) -> Result<()> {
    let entries = load_entries(ctx, file)?;
    let count = entries.len();

    let selected: Vec<KeyRingEntry> = if only.is_empty() {
        entries
    } else {
        if let Some(&index) = only.iter().find(|&&i| i == 0 || i > count) {
            return Err(KeyportError::InvalidSelection { index, count });
        }
        entries
            .into_iter()
            .enumerate()
            .filter(|(i, _)| only.contains(&(i + 1)))
            .map(|(_, entry)| entry)
            .collect()
    };

    let progress = ctx.progress();
    let service = ImportExportService::new(&ctx.store, &progress, ctx.config.armor_version());
    let summary = service.import_all(&selected);
    progress.finish();

    if ctx.json {
        return output::json(&summary);
    }
    if ctx.quiet {
        return Ok(());
    }

    output::header("keyport import");
    output::success(&format!(
        "{} new, {} updated, {} invalid",
        summary.added, summary.updated, summary.bad
    ));
    if summary.bad > 0 {
        output::warning(&format!(
            "{} secret key ring(s) have subkeys without secret material and were not imported",
            summary.bad
        ));
    }
    let failed = selected.len() - (summary.added + summary.updated + summary.bad);
    if failed > 0 {
        output::warning(&format!(
            "{failed} key ring(s) could not be stored; run with --verbose for details"
        ));
    }
    println!("  Store: {}", ctx.store.root().display());
    Ok(())
}
