use std::time::Duration;

use crate::adapters::key_servers::hkp_key_server::HkpKeyServer;
use crate::cli::context::CommandContext;
use crate::cli::output;
use crate::core::errors::{KeyportError, Result};
use crate::core::services::key_server_uploader::upload_key_ring;
use crate::core::traits::key_store::KeyRingStore;

/// Execute the `keyport upload` command.
pub fn execute(ctx: &CommandContext, keyid: &str, server: Option<&str>) -> Result<()> {
    let id = ctx.resolve(keyid)?;
    let ring = ctx
        .store
        .public_key_ring(id)?
        .ok_or_else(|| KeyportError::KeyRingNotFound {
            identity: format!("{keyid} (public)"),
        })?;

    let url = server.unwrap_or(&ctx.config.keyserver.url);
    let timeout = Duration::from_secs(ctx.config.keyserver.timeout_secs);
    let key_server = HkpKeyServer::new(url, timeout)?;

    let sp = ctx
        .human()
        .then(|| output::spinner(&format!("Uploading {id} to {url}...")));
    let uploaded = upload_key_ring(&key_server, &ring, &ctx.config.armor_version());
    if let Some(sp) = sp {
        output::finish_spinner(sp);
    }

    if !uploaded {
        return Err(KeyportError::Transport {
            reason: format!("upload of {id} to {url} failed; run with --verbose for details"),
        });
    }

    if ctx.json {
        return output::json(&serde_json::json!({ "uploaded": id, "server": url }));
    }
    if !ctx.quiet {
        output::success(&format!("Uploaded public key ring {id} to {url}"));
    }
    Ok(())
}
