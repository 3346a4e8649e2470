use tracing::{debug, error, warn};

use crate::core::errors::KeyportError;
use crate::core::models::key_ring::{KeyRing, PublicKeyRing, SecretKeyRing};
use crate::core::models::outcome::MergeOutcome;
use crate::core::traits::key_store::KeyRingStore;

/// Validates decoded key rings and writes them into a `KeyRingStore`.
pub struct KeyRingMerger<'a, S: KeyRingStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyRingStore + ?Sized> KeyRingMerger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Merge one ring. Never fails; problems are reported through the outcome.
    pub fn merge(&self, ring: &KeyRing) -> MergeOutcome {
        match ring {
            KeyRing::Secret(secret) => self.merge_secret(ring, secret),
            KeyRing::Public(_) => self.save(ring),
        }
    }

    fn merge_secret(&self, ring: &KeyRing, secret: &SecretKeyRing) -> MergeOutcome {
        let key_id = secret.master_key_id();

        // 1. Reject rings whose subkeys were exported without their secrets
        if let Err(e) = secret.check_secret_material() {
            match e {
                KeyportError::InvalidSecretMaterial { .. } => {
                    warn!(key_id = %key_id, "{e}");
                    return MergeOutcome::Bad;
                }
                other => {
                    error!(key_id = %key_id, "secret ring check failed: {other}");
                    return MergeOutcome::Error;
                }
            }
        }

        // 2. Store the secret ring as decoded
        let outcome = self.save(ring);
        if outcome != MergeOutcome::Added {
            return outcome;
        }

        // 3. Fold the derived public ring into the stored one; a failure here
        //    leaves the secret ring in place
        let public = self.with_stored_public(secret.to_public_key_ring());
        if let Err(e) = self.store.save_key_ring(&KeyRing::Public(public)) {
            warn!(key_id = %key_id, "derived public ring not stored: {e}");
        }

        outcome
    }

    /// Merge `derived` with the public ring already stored under its id, so
    /// certifications on the stored copy survive.
    fn with_stored_public(&self, derived: PublicKeyRing) -> PublicKeyRing {
        let key_id = derived.master_key_id();
        let stored = match self.store.public_key_ring(key_id) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(key_id = %key_id, "stored public ring unreadable, replacing it: {e}");
                None
            }
        };
        let Some(stored) = stored else {
            return derived;
        };
        match stored.merge(derived.clone()) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(key_id = %key_id, "could not merge with stored public ring: {e}");
                derived
            }
        }
    }

    fn save(&self, ring: &KeyRing) -> MergeOutcome {
        let key_id = ring.master_key_id();
        match self.store.save_key_ring(ring) {
            Ok(()) => {
                debug!(key_id = %key_id, kind = %ring.kind(), "key ring stored");
                MergeOutcome::Added
            }
            Err(e) => {
                error!(key_id = %key_id, kind = %ring.kind(), "key ring not stored: {e}");
                MergeOutcome::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::outcome::KeyKind;
    use crate::test_support::{FailingStore, MemoryStore, fixture, signature_count};

    #[test]
    fn public_ring_is_added() {
        let store = MemoryStore::default();
        let ring = fixture::ring(fixture::BOB_PUBLIC_GPG);

        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Added);
        assert_eq!(store.count(KeyKind::Public), 1);
        assert_eq!(store.count(KeyKind::Secret), 0);
    }

    #[test]
    fn secret_ring_stores_both_tables() {
        let store = MemoryStore::default();
        let ring = fixture::ring(fixture::ALICE_SECRET_ASC);

        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Added);
        let id = ring.master_key_id();
        assert!(store.secret_key_ring(id).unwrap().is_some());

        let public = store.public_key_ring(id).unwrap().unwrap();
        assert_eq!(public.key_handles().len(), 2);
        assert_eq!(signature_count(public.cert()), 2);
    }

    #[test]
    fn secret_after_public_keeps_stored_signatures() {
        let store = MemoryStore::default();
        let merger = KeyRingMerger::new(&store);
        let public = fixture::ring(fixture::ALICE_PUBLIC_ASC);
        let id = public.master_key_id();

        assert_eq!(merger.merge(&public), MergeOutcome::Added);
        let before = signature_count(store.public_key_ring(id).unwrap().unwrap().cert());
        assert_eq!(before, 2);

        let secret = fixture::ring(fixture::ALICE_SECRET_ASC);
        assert_eq!(merger.merge(&secret), MergeOutcome::Added);
        let after = store.public_key_ring(id).unwrap().unwrap();
        assert_eq!(signature_count(after.cert()), before);
        assert_eq!(after.user_ids(), vec!["Alice Example (work) <alice@example.org>"]);
    }

    #[test]
    fn card_subkey_ring_is_accepted() {
        let store = MemoryStore::default();
        let ring = fixture::ring(fixture::ALICE_CARD_SUBKEY_ASC);

        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Added);
        assert_eq!(store.count(KeyKind::Secret), 1);
        assert_eq!(store.count(KeyKind::Public), 1);
    }

    #[test]
    fn stripped_subkey_is_bad_and_writes_nothing() {
        let store = MemoryStore::default();
        let ring = fixture::ring(fixture::ALICE_STRIPPED_SUBKEY_ASC);

        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Bad);
        assert_eq!(store.count(KeyKind::Public), 0);
        assert_eq!(store.count(KeyKind::Secret), 0);
    }

    #[test]
    fn master_stub_ring_is_accepted() {
        let store = MemoryStore::default();
        let ring = fixture::ring(fixture::ALICE_MASTER_STUB_ASC);
        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Added);
    }

    #[test]
    fn merging_twice_keeps_one_record() {
        let store = MemoryStore::default();
        let merger = KeyRingMerger::new(&store);
        let ring = fixture::ring(fixture::BOB_SECRET_ASC);

        assert_eq!(merger.merge(&ring), MergeOutcome::Added);
        assert_eq!(merger.merge(&ring), MergeOutcome::Added);
        assert_eq!(store.count(KeyKind::Secret), 1);
        assert_eq!(store.count(KeyKind::Public), 1);
    }

    #[test]
    fn secret_save_failure_is_error() {
        let store = FailingStore::failing(KeyKind::Secret);
        let ring = fixture::ring(fixture::BOB_SECRET_ASC);

        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Error);
        assert_eq!(store.inner.count(KeyKind::Public), 0);
    }

    #[test]
    fn derived_public_failure_keeps_secret_ring() {
        let store = FailingStore::failing(KeyKind::Public);
        let ring = fixture::ring(fixture::BOB_SECRET_ASC);

        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Added);
        assert_eq!(store.inner.count(KeyKind::Secret), 1);
        assert_eq!(store.inner.count(KeyKind::Public), 0);
    }

    #[test]
    fn public_save_failure_is_error() {
        let store = FailingStore::failing(KeyKind::Public);
        let ring = fixture::ring(fixture::BOB_PUBLIC_GPG);
        assert_eq!(KeyRingMerger::new(&store).merge(&ring), MergeOutcome::Error);
    }
}
