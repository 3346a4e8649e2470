use crate::cli::context::CommandContext;
use crate::cli::output;
use crate::core::errors::{KeyportError, Result};
use crate::core::models::outcome::KeyKind;
use crate::core::traits::key_store::KeyRingStore;

/// Execute the `keyport delete` command.
pub fn execute(ctx: &CommandContext, keyid: &str, secret: bool) -> Result<()> {
    let kind = if secret { KeyKind::Secret } else { KeyKind::Public };
    let id = ctx.resolve(keyid)?;

    if !ctx.store.delete_key_ring(kind, id)? {
        return Err(KeyportError::KeyRingNotFound {
            identity: format!("{keyid} ({kind})"),
        });
    }

    if ctx.json {
        return output::json(&serde_json::json!({ "deleted": id, "kind": kind }));
    }
    if !ctx.quiet {
        output::success(&format!("Deleted {kind} key ring {id}"));
    }
    Ok(())
}
