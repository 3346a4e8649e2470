//! Shared helpers for unit tests: fixtures, signature counting and in-memory stores.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use sequoia_openpgp as openpgp;

use openpgp::parse::Parse;
use openpgp::serialize::SerializeInto;

use crate::core::errors::{KeyportError, Result};
use crate::core::models::key_id::KeyId;
use crate::core::models::key_ring::{KeyRing, PublicKeyRing, SecretKeyRing};
use crate::core::models::outcome::KeyKind;
use crate::core::traits::key_store::KeyRingStore;

pub mod fixture {
    use std::io::Read;

    use sequoia_openpgp::armor::{Reader, ReaderMode};

    use crate::core::models::key_ring::KeyRing;
    use crate::core::services::key_material_decoder::KeyMaterialDecoder;

    pub const ALICE_PUBLIC_ASC: &[u8] = include_bytes!("../tests/fixtures/alice_public.asc");
    pub const ALICE_SECRET_ASC: &[u8] = include_bytes!("../tests/fixtures/alice_secret.asc");
    pub const ALICE_MASTER_STUB_ASC: &[u8] =
        include_bytes!("../tests/fixtures/alice_master_stub.asc");
    pub const ALICE_STRIPPED_SUBKEY_ASC: &[u8] =
        include_bytes!("../tests/fixtures/alice_stripped_subkey.asc");
    pub const ALICE_CARD_SUBKEY_ASC: &[u8] =
        include_bytes!("../tests/fixtures/alice_card_subkey.asc");
    pub const BOB_PUBLIC_GPG: &[u8] = include_bytes!("../tests/fixtures/bob_public.gpg");
    pub const BOB_SECRET_ASC: &[u8] = include_bytes!("../tests/fixtures/bob_secret.asc");
    pub const MIXED_BUNDLE_ASC: &[u8] = include_bytes!("../tests/fixtures/mixed_bundle.asc");

    /// Binary payload of the first armor block in `text`.
    pub fn dearmor(text: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        Reader::from_bytes(text, ReaderMode::Tolerant(None))
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    /// First ring of an armored or binary fixture.
    pub fn ring(input: &[u8]) -> KeyRing {
        KeyMaterialDecoder::new(input)
            .next()
            .expect("fixture holds a key ring")
            .unwrap()
    }
}

/// Number of signature packets in the serialized certificate.
pub fn signature_count(cert: &openpgp::Cert) -> usize {
    let pile = openpgp::PacketPile::from_bytes(&cert.to_vec().unwrap()).unwrap();
    pile.descendants()
        .filter(|p| matches!(p, openpgp::Packet::Signature(_)))
        .count()
}

/// Key ring store backed by two maps of encoded rings.
#[derive(Default)]
pub struct MemoryStore {
    public: Mutex<BTreeMap<KeyId, Vec<u8>>>,
    secret: Mutex<BTreeMap<KeyId, Vec<u8>>>,
}

impl MemoryStore {
    fn table(&self, kind: KeyKind) -> &Mutex<BTreeMap<KeyId, Vec<u8>>> {
        match kind {
            KeyKind::Public => &self.public,
            KeyKind::Secret => &self.secret,
        }
    }

    pub fn count(&self, kind: KeyKind) -> usize {
        self.table(kind).lock().unwrap().len()
    }

    fn load(&self, kind: KeyKind, id: KeyId) -> Option<Vec<u8>> {
        self.table(kind).lock().unwrap().get(&id).cloned()
    }
}

impl KeyRingStore for MemoryStore {
    fn save_key_ring(&self, ring: &KeyRing) -> Result<()> {
        let encoded = ring.encode()?;
        self.table(ring.kind())
            .lock()
            .unwrap()
            .insert(ring.master_key_id(), encoded);
        Ok(())
    }

    fn public_key_ring(&self, id: KeyId) -> Result<Option<PublicKeyRing>> {
        self.load(KeyKind::Public, id)
            .map(|bytes| PublicKeyRing::from_binary(&bytes))
            .transpose()
    }

    fn secret_key_ring(&self, id: KeyId) -> Result<Option<SecretKeyRing>> {
        self.load(KeyKind::Secret, id)
            .map(|bytes| SecretKeyRing::from_binary(&bytes))
            .transpose()
    }

    fn master_key_ids(&self, kind: KeyKind) -> Result<Vec<KeyId>> {
        Ok(self.table(kind).lock().unwrap().keys().copied().collect())
    }

    fn delete_key_ring(&self, kind: KeyKind, id: KeyId) -> Result<bool> {
        Ok(self.table(kind).lock().unwrap().remove(&id).is_some())
    }
}

/// Wraps a `MemoryStore` and rejects writes to one table, or every read.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_saves: Option<KeyKind>,
    fail_reads: bool,
}

impl FailingStore {
    pub fn failing(kind: KeyKind) -> Self {
        Self {
            fail_saves: Some(kind),
            ..Self::default()
        }
    }

    pub fn failing_reads(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_saves: None,
            fail_reads: true,
        }
    }

    fn injected(&self) -> KeyportError {
        KeyportError::StorageFailed {
            path: PathBuf::from("memory"),
            reason: "injected failure".to_string(),
        }
    }
}

impl KeyRingStore for FailingStore {
    fn save_key_ring(&self, ring: &KeyRing) -> Result<()> {
        if self.fail_saves == Some(ring.kind()) {
            return Err(self.injected());
        }
        self.inner.save_key_ring(ring)
    }

    fn public_key_ring(&self, id: KeyId) -> Result<Option<PublicKeyRing>> {
        if self.fail_reads {
            return Err(self.injected());
        }
        self.inner.public_key_ring(id)
    }

    fn secret_key_ring(&self, id: KeyId) -> Result<Option<SecretKeyRing>> {
        if self.fail_reads {
            return Err(self.injected());
        }
        self.inner.secret_key_ring(id)
    }

    fn master_key_ids(&self, kind: KeyKind) -> Result<Vec<KeyId>> {
        self.inner.master_key_ids(kind)
    }

    fn delete_key_ring(&self, kind: KeyKind, id: KeyId) -> Result<bool> {
        self.inner.delete_key_ring(kind, id)
    }
}
