use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::cli::context::CommandContext;
use crate::cli::output::{self, ProgressReporter};
use crate::core::errors::Result;
use crate::core::models::cancellation::CancellationToken;
use crate::core::models::outcome::KeyKind;
use crate::core::services::import_export::ImportExportService;
use crate::core::traits::key_store::KeyRingStore;

/// Execute the `keyport export` command.
///
/// Writes one armored block per key ring to `output` (or stdout for `-`).
pub fn execute(
    ctx: &CommandContext,
    ids: &[String],
    all: bool,
    secret: bool,
    output_path: &str,
) -> Result<()> {
    let kind = if secret { KeyKind::Secret } else { KeyKind::Public };

    let key_ids = if all {
        ctx.store.master_key_ids(kind)?
    } else {
        ids.iter()
            .map(|id| ctx.resolve(id))
            .collect::<Result<Vec<_>>>()?
    };

    let to_stdout = output_path == "-";
    // stdout carries the armor, so no bar there
    let progress = if to_stdout {
        ProgressReporter::new(false)
    } else {
        ctx.progress()
    };
    let service = ImportExportService::new(&ctx.store, &progress, ctx.config.armor_version())
        .with_comment(ctx.config.armor.comment.clone());
    let token = CancellationToken::new();

    let result = if to_stdout {
        let stdout = std::io::stdout();
        let mut sink = stdout.lock();
        let result = service.export_selected(&key_ids, kind, &mut sink, &token)?;
        sink.flush()?;
        result
    } else {
        service.export_to_path(&key_ids, kind, Path::new(output_path), &token)?
    };
    progress.finish();

    let Some(summary) = result else {
        output::warning("Export cancelled; no file was written");
        return Ok(());
    };

    if to_stdout {
        info!(
            exported = summary.exported_count,
            skipped = summary.skipped_count,
            kind = %kind,
            "export finished"
        );
        return Ok(());
    }
    if ctx.json {
        return output::json(&summary);
    }
    if ctx.quiet {
        return Ok(());
    }

    output::header("keyport export");
    output::success(&format!(
        "Exported {} {kind} key ring(s) to {output_path}",
        summary.exported_count - summary.skipped_count
    ));
    if summary.skipped_count > 0 {
        output::warning(&format!(
            "{} key(s) have no stored {kind} key ring and were skipped",
            summary.skipped_count
        ));
    }
    Ok(())
}
