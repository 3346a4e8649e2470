use crate::cli::context::CommandContext;
use crate::cli::output::{self, EntryRow};
use crate::core::errors::Result;
use crate::core::models::key_ring::KeyRing;
use crate::core::models::key_ring_entry::KeyRingEntry;
use crate::core::models::outcome::KeyKind;
use crate::core::traits::key_store::KeyRingStore;

/// Execute the `keyport list` command.
pub fn execute(ctx: &CommandContext, secret: bool) -> Result<()> {
    let kind = if secret { KeyKind::Secret } else { KeyKind::Public };

    let mut entries = Vec::new();
    for id in ctx.store.master_key_ids(kind)? {
        let ring = match kind {
            KeyKind::Public => ctx.store.public_key_ring(id).map(|r| r.map(KeyRing::Public)),
            KeyKind::Secret => ctx.store.secret_key_ring(id).map(|r| r.map(KeyRing::Secret)),
        };
        match ring.and_then(|ring| ring.as_ref().map(KeyRingEntry::new).transpose()) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key_id = %id, "unreadable store entry: {e}");
                if ctx.human() {
                    output::warning(&format!("Stored key ring {id} is unreadable"));
                }
            }
        }
    }

    let rows: Vec<EntryRow<'_>> = entries
        .iter()
        .map(|entry| EntryRow {
            index: None,
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

    output::header(&format!("{kind} key rings ({})", rows.len()));
    if rows.is_empty() {
        output::warning("No key rings stored");
        println!("  Import some with: keyport import <FILE>");
        return Ok(());
    }
    println!();
    for row in &rows {
        output::entry_row(row);
    }
    Ok(())
}
