use std::fmt::Display;
use std::io::Write;
use std::ops::Deref;

use sequoia_openpgp as openpgp;

use openpgp::Cert;
use openpgp::crypto::S2K;
use openpgp::packet::Key;
use openpgp::packet::key::{Encrypted, KeyParts, KeyRole, SecretKeyMaterial};
use openpgp::parse::Parse;
use openpgp::serialize::{Serialize, SerializeInto};

use crate::core::errors::{KeyportError, Result};
use crate::core::models::key_id::{Fingerprint, KeyId};
use crate::core::models::outcome::KeyKind;

/// GnuPG's private S2K specifier for keys without usable secret material.
const GNU_S2K: u8 = 101;
const GNU_DIVERT_TO_CARD: u8 = 2;

/// Where the secret half of a key packet lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMaterial {
    /// Cleartext or passphrase-protected material.
    Present,
    /// GnuPG divert-to-card stub. The secret is held by a smartcard.
    OnCard,
    /// A public key packet or a GnuPG dummy stub.
    Missing,
}

impl SecretMaterial {
    pub fn of<P: KeyParts, R: KeyRole>(key: &Key<P, R>) -> Self {
        match key.optional_secret() {
            None => Self::Missing,
            Some(SecretKeyMaterial::Encrypted(encrypted)) => match gnu_stub_mode(encrypted) {
                None => Self::Present,
                Some(GNU_DIVERT_TO_CARD) => Self::OnCard,
                Some(_) => Self::Missing,
            },
            Some(_) => Self::Present,
        }
    }
}

/// Mode octet of a GnuPG stub (1 = dummy, 2 = divert-to-card).
fn gnu_stub_mode(encrypted: &Encrypted) -> Option<u8> {
    let S2K::Private {
        tag: GNU_S2K,
        parameters,
        ..
    } = encrypted.s2k()
    else {
        return None;
    };
    // Unparsed S2K parameters stay at the front of the raw ciphertext.
    let bytes = parameters
        .as_deref()
        .unwrap_or_else(|| encrypted.raw_ciphertext());
    let at = bytes.windows(3).position(|w| w == b"GNU")?;
    bytes.get(at + 3).copied()
}

fn malformed(e: impl Display) -> KeyportError {
    KeyportError::MalformedRing {
        detail: e.to_string(),
    }
}

/// Certificate of one transferable key ring.
#[derive(Debug, Clone, PartialEq)]
pub struct RingCert {
    cert: Cert,
    master_key_id: KeyId,
}

impl RingCert {
    fn new(cert: Cert) -> Result<Self> {
        let master_key_id = KeyId::from_openpgp(&cert.keyid()).ok_or_else(|| {
            malformed(format!("unsupported primary key id {}", cert.keyid()))
        })?;
        Ok(Self {
            cert,
            master_key_id,
        })
    }

    pub fn cert(&self) -> &Cert {
        &self.cert
    }

    pub fn master_key_id(&self) -> KeyId {
        self.master_key_id
    }

    /// Key id and fingerprint of every key, master first.
    pub fn key_handles(&self) -> Vec<(KeyId, Fingerprint)> {
        self.cert
            .keys()
            .filter_map(|ka| {
                let key = ka.key();
                Some((
                    KeyId::from_openpgp(&key.keyid())?,
                    Fingerprint::from_openpgp(&key.fingerprint())?,
                ))
            })
            .collect()
    }

    /// User ids in certificate order. Invalid UTF-8 is replaced, not rejected.
    pub fn user_ids(&self) -> Vec<String> {
        self.cert
            .userids()
            .map(|ua| String::from_utf8_lossy(ua.userid().value()).into_owned())
            .collect()
    }

    fn serialize_error(&self, e: impl Display) -> KeyportError {
        KeyportError::Serialize {
            key_id: self.master_key_id,
            detail: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublicKeyRing(RingCert);

#[derive(Debug, Clone, PartialEq)]
pub struct SecretKeyRing(RingCert);

impl Deref for PublicKeyRing {
    type Target = RingCert;

    fn deref(&self) -> &RingCert {
        &self.0
    }
}

impl Deref for SecretKeyRing {
    type Target = RingCert;

    fn deref(&self) -> &RingCert {
        &self.0
    }
}

impl PublicKeyRing {
    pub fn from_binary(bytes: &[u8]) -> Result<Self> {
        match KeyRing::from_binary(bytes)? {
            KeyRing::Public(ring) => Ok(ring),
            KeyRing::Secret(_) => Err(malformed(
                "expected a public key ring, found a secret one",
            )),
        }
    }

    /// Union of both rings: user ids, subkeys and every signature.
    pub fn merge(self, other: PublicKeyRing) -> Result<Self> {
        let master_key_id = self.0.master_key_id;
        let cert = self.0.cert.merge_public(other.0.cert).map_err(malformed)?;
        Ok(Self(RingCert {
            cert,
            master_key_id,
        }))
    }
}

impl SecretKeyRing {
    pub fn from_binary(bytes: &[u8]) -> Result<Self> {
        match KeyRing::from_binary(bytes)? {
            KeyRing::Secret(ring) => Ok(ring),
            KeyRing::Public(_) => Err(malformed(
                "expected a secret key ring, found a public one",
            )),
        }
    }

    /// Every subkey must carry secret material or point to a smartcard.
    ///
    /// The master key is exempt: a GnuPG dummy stub there is accepted.
    pub fn check_secret_material(&self) -> Result<()> {
        for ka in self.cert.keys().subkeys() {
            if SecretMaterial::of(ka.key()) == SecretMaterial::Missing {
                return Err(KeyportError::InvalidSecretMaterial {
                    key_id: KeyId::from_openpgp(&ka.key().keyid())
                        .unwrap_or(self.master_key_id),
                });
            }
        }
        Ok(())
    }

    /// Derive the public ring: the same certificate without secret material.
    ///
    /// User ids, subkeys and all of their signatures are kept.
    pub fn to_public_key_ring(&self) -> PublicKeyRing {
        PublicKeyRing(RingCert {
            cert: self.cert.clone().strip_secret_key_material(),
            master_key_id: self.master_key_id,
        })
    }
}

/// A decoded key ring, either public or secret.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRing {
    Public(PublicKeyRing),
    Secret(SecretKeyRing),
}

impl KeyRing {
    /// Classify a certificate: any secret material makes it a secret ring.
    pub fn from_cert(cert: Cert) -> Result<Self> {
        let secret = cert.is_tsk();
        let ring = RingCert::new(cert)?;
        Ok(if secret {
            Self::Secret(SecretKeyRing(ring))
        } else {
            Self::Public(PublicKeyRing(ring))
        })
    }

    /// Decode exactly one ring from its binary encoding.
    pub fn from_binary(bytes: &[u8]) -> Result<Self> {
        Cert::from_bytes(bytes)
            .map_err(malformed)
            .and_then(Self::from_cert)
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            Self::Public(_) => KeyKind::Public,
            Self::Secret(_) => KeyKind::Secret,
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    pub fn ring(&self) -> &RingCert {
        match self {
            Self::Public(ring) => ring,
            Self::Secret(ring) => ring,
        }
    }

    pub fn master_key_id(&self) -> KeyId {
        self.ring().master_key_id()
    }

    /// Binary encoding. Secret rings keep their secret key packets.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let encoded = match self {
            Self::Public(ring) => ring.cert.to_vec(),
            Self::Secret(ring) => ring.cert.as_tsk().to_vec(),
        };
        encoded.map_err(|e| self.ring().serialize_error(e))
    }

    /// Append the binary encoding to `sink`, e.g. an armor writer.
    pub fn write_to(&self, sink: &mut dyn Write) -> Result<()> {
        let written = match self {
            Self::Public(ring) => ring.cert.serialize(sink),
            Self::Secret(ring) => ring.cert.as_tsk().serialize(sink),
        };
        written.map_err(|e| self.ring().serialize_error(e))
    }

    /// One armor block holding this ring, with the given armor headers.
    pub fn to_armored(&self, headers: &[(&str, &str)]) -> Result<String> {
        let fail = |e: &dyn Display| self.ring().serialize_error(e);
        let mut writer = openpgp::armor::Writer::with_headers(
            Vec::new(),
            self.kind().armor_kind(),
            headers.iter().copied(),
        )
        .map_err(|e| fail(&e))?;
        self.write_to(&mut writer)?;
        let bytes = writer.finalize().map_err(|e| fail(&e))?;
        String::from_utf8(bytes).map_err(|e| fail(&e))
    }
}

impl From<PublicKeyRing> for KeyRing {
    fn from(ring: PublicKeyRing) -> Self {
        Self::Public(ring)
    }
}

impl From<SecretKeyRing> for KeyRing {
    fn from(ring: SecretKeyRing) -> Self {
        Self::Secret(ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, signature_count};

    fn ring(binary: &[u8]) -> KeyRing {
        KeyRing::from_binary(binary).unwrap()
    }

    fn secret(binary: &[u8]) -> SecretKeyRing {
        SecretKeyRing::from_binary(binary).unwrap()
    }

    #[test]
    fn classifies_public_and_secret() {
        let public = ring(&fixture::dearmor(fixture::ALICE_PUBLIC_ASC));
        let secret = ring(&fixture::dearmor(fixture::ALICE_SECRET_ASC));
        assert_eq!(public.kind(), KeyKind::Public);
        assert!(secret.is_secret());
        assert_eq!(public.master_key_id(), secret.master_key_id());
        assert_eq!(public.master_key_id().to_string(), "823E72B863557225");
    }

    #[test]
    fn key_handles_list_master_first() {
        let ring = ring(&fixture::dearmor(fixture::ALICE_PUBLIC_ASC));
        let handles = ring.ring().key_handles();
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].0, ring.master_key_id());
        assert_eq!(
            handles[0].1.to_string(),
            "B83EDC1295868FEEB1615893823E72B863557225"
        );
        assert_eq!(handles[1].0.to_string(), "F99F13B8F555ED32");
        assert_eq!(
            ring.ring().user_ids(),
            vec!["Alice Example (work) <alice@example.org>".to_string()]
        );
    }

    #[test]
    fn encode_reproduces_ring() {
        let original = ring(fixture::BOB_PUBLIC_GPG);
        let reparsed = ring(&original.encode().unwrap());
        assert_eq!(original, reparsed);

        let secret = ring(&fixture::dearmor(fixture::BOB_SECRET_ASC));
        assert!(ring(&secret.encode().unwrap()).is_secret());
    }

    #[test]
    fn two_rings_in_one_binary_are_rejected() {
        let mut bytes = fixture::dearmor(fixture::ALICE_PUBLIC_ASC);
        bytes.extend_from_slice(fixture::BOB_PUBLIC_GPG);
        assert!(KeyRing::from_binary(&bytes).is_err());
    }

    #[test]
    fn ring_without_primary_key_is_malformed() {
        let err = KeyRing::from_binary(&[]).unwrap_err();
        assert!(matches!(err, KeyportError::MalformedRing { .. }));
    }

    #[test]
    fn complete_secret_ring_passes_material_check() {
        let ring = secret(&fixture::dearmor(fixture::ALICE_SECRET_ASC));
        ring.check_secret_material().unwrap();
    }

    #[test]
    fn master_stub_passes_material_check() {
        let ring = secret(&fixture::dearmor(fixture::ALICE_MASTER_STUB_ASC));
        let master = ring.cert().primary_key();
        assert_eq!(SecretMaterial::of(master.key()), SecretMaterial::Missing);
        ring.check_secret_material().unwrap();
    }

    #[test]
    fn stripped_subkey_fails_material_check() {
        let ring = secret(&fixture::dearmor(fixture::ALICE_STRIPPED_SUBKEY_ASC));
        let err = ring.check_secret_material().unwrap_err();
        match err {
            KeyportError::InvalidSecretMaterial { key_id } => {
                assert_eq!(key_id.to_string(), "F99F13B8F555ED32")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn card_subkey_passes_material_check() {
        let ring = secret(&fixture::dearmor(fixture::ALICE_CARD_SUBKEY_ASC));
        let subkey = ring.cert().keys().subkeys().next().unwrap();
        assert_eq!(SecretMaterial::of(subkey.key()), SecretMaterial::OnCard);
        ring.check_secret_material().unwrap();
    }

    #[test]
    fn projection_keeps_keys_user_ids_and_signatures() {
        let secret = secret(&fixture::dearmor(fixture::ALICE_SECRET_ASC));
        let public = secret.to_public_key_ring();

        assert_eq!(public.key_handles(), secret.key_handles());
        assert_eq!(public.user_ids(), secret.user_ids());
        assert!(!public.cert().is_tsk());
        assert_eq!(signature_count(public.cert()), signature_count(secret.cert()));
        assert_eq!(signature_count(public.cert()), 2);
    }

    #[test]
    fn projection_matches_public_export() {
        let secret = secret(&fixture::dearmor(fixture::BOB_SECRET_ASC));
        let derived = secret.to_public_key_ring();
        let exported = PublicKeyRing::from_binary(fixture::BOB_PUBLIC_GPG).unwrap();
        assert_eq!(derived.cert().fingerprint(), exported.cert().fingerprint());
        assert_eq!(derived.key_handles(), exported.key_handles());
    }

    #[test]
    fn merge_keeps_signatures_of_stored_ring() {
        let stored = PublicKeyRing::from_binary(&fixture::dearmor(fixture::ALICE_PUBLIC_ASC))
            .unwrap();
        let before = signature_count(stored.cert());
        let derived = secret(&fixture::dearmor(fixture::ALICE_SECRET_ASC)).to_public_key_ring();

        let merged = stored.merge(derived).unwrap();
        assert_eq!(signature_count(merged.cert()), before);
        assert_eq!(merged.master_key_id().to_string(), "823E72B863557225");
    }

    #[test]
    fn merge_of_different_keys_fails() {
        let alice = PublicKeyRing::from_binary(&fixture::dearmor(fixture::ALICE_PUBLIC_ASC))
            .unwrap();
        let bob = PublicKeyRing::from_binary(fixture::BOB_PUBLIC_GPG).unwrap();
        assert!(alice.merge(bob).is_err());
    }

    #[test]
    fn typed_from_binary_checks_kind() {
        assert!(SecretKeyRing::from_binary(fixture::BOB_PUBLIC_GPG).is_err());
        assert!(PublicKeyRing::from_binary(&fixture::dearmor(fixture::BOB_SECRET_ASC)).is_err());
    }

    #[test]
    fn armored_output_carries_headers() {
        let ring = ring(fixture::BOB_PUBLIC_GPG);
        let text = ring.to_armored(&[("Version", "keyport test")]).unwrap();
        assert!(
            text.starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----\nVersion: keyport test\n")
        );
        assert!(text.trim_end().ends_with("-----END PGP PUBLIC KEY BLOCK-----"));
        assert_eq!(fixture::ring(text.as_bytes()), ring);
    }
}
