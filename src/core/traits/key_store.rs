use crate::core::errors::{KeyportError, Result};
use crate::core::models::key_id::{KeyId, KeyQuery};
use crate::core::models::key_ring::{KeyRing, PublicKeyRing, SecretKeyRing};
use crate::core::models::outcome::KeyKind;

/// Port for the local key ring store.
///
/// Rings are keyed by master key id, one table per `KeyKind`. Saving a
/// ring whose master key id is already present replaces the record.
pub trait KeyRingStore: Send + Sync {
    /// Persist a ring into the table matching its kind.
    fn save_key_ring(&self, ring: &KeyRing) -> Result<()>;

    fn public_key_ring(&self, id: KeyId) -> Result<Option<PublicKeyRing>>;

    fn secret_key_ring(&self, id: KeyId) -> Result<Option<SecretKeyRing>>;

    /// Master key ids of every stored ring of the given kind, sorted.
    fn master_key_ids(&self, kind: KeyKind) -> Result<Vec<KeyId>>;

    /// Remove a ring. Returns `false` when nothing was stored under `id`.
    fn delete_key_ring(&self, kind: KeyKind, id: KeyId) -> Result<bool>;

    /// Find the master key id of the ring containing a key that matches
    /// `query` (master or subkey). The public table is searched first.
    fn resolve_master_key_id(&self, query: &KeyQuery) -> Result<Option<KeyId>> {
        for kind in [KeyKind::Public, KeyKind::Secret] {
            let mut found = Vec::new();

            for id in self.master_key_ids(kind)? {
                let handles = match kind {
                    KeyKind::Public => self.public_key_ring(id)?.map(|ring| ring.key_handles()),
                    KeyKind::Secret => self.secret_key_ring(id)?.map(|ring| ring.key_handles()),
                };
                let Some(handles) = handles else {
                    continue;
                };
                if handles
                    .iter()
                    .any(|(key_id, fingerprint)| query.matches(*key_id, fingerprint))
                {
                    found.push(id);
                }
            }

            match found.as_slice() {
                [] => continue,
                [id] => return Ok(Some(*id)),
                _ => {
                    return Err(KeyportError::AmbiguousKeyId {
                        keyid: query.to_string(),
                    });
                }
            }
        }
        Ok(None)
    }
}
