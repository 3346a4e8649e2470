use tracing::{info, warn};

use crate::core::models::key_ring::{KeyRing, PublicKeyRing};
use crate::core::traits::key_server::KeyServer;

/// Armor a public key ring and hand it to a key server.
///
/// Returns `false` on any failure; the reason is logged. No retries.
pub fn upload_key_ring<K: KeyServer + ?Sized>(
    server: &K,
    ring: &PublicKeyRing,
    version: &str,
) -> bool {
    let key_id = ring.master_key_id();

    let armored = match KeyRing::Public(ring.clone()).to_armored(&[("Version", version)]) {
        Ok(text) => text,
        Err(e) => {
            warn!(key_id = %key_id, "could not armor key ring: {e}");
            return false;
        }
    };

    match server.add(&armored) {
        Ok(()) => {
            info!(key_id = %key_id, server = server.endpoint(), "key ring uploaded");
            true
        }
        Err(e) => {
            warn!(key_id = %key_id, server = server.endpoint(), "upload failed: {e}");
            false
        }
    }
}
