use std::sync::{LazyLock, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use sequoia_openpgp as openpgp;
use serde::Serialize;

use openpgp::cert::prelude::*;
use openpgp::crypto::mpi;
use openpgp::packet::Key;
use openpgp::packet::key::{KeyParts, KeyRole};
use openpgp::policy::StandardPolicy;
use openpgp::types::{Curve, PublicKeyAlgorithm, RevocationStatus};

use crate::core::errors::Result;
use crate::core::models::key_id::{Fingerprint, KeyId};
use crate::core::models::key_ring::KeyRing;

static USER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>[^(<]*?)\s*(?P<rest>[(<].*?)?\s*$").expect("valid user id pattern")
});

/// Display metadata of an entry. Every field degrades to `None` when it
/// cannot be extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub key_id: Option<KeyId>,
    pub fingerprint: Option<Fingerprint>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub user_id_rest: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub algorithm: Option<String>,
    pub subkeys: Option<usize>,
    pub revoked: bool,
}

/// One decoded key ring, ready to be listed and merged.
#[derive(Debug)]
pub struct KeyRingEntry {
    secret: bool,
    encoded: Vec<u8>,
    summary: OnceLock<EntrySummary>,
}

impl KeyRingEntry {
    pub fn new(ring: &KeyRing) -> Result<Self> {
        Ok(Self::from_encoded(ring.is_secret(), ring.encode()?))
    }

    /// Wrap an already encoded ring. Nothing is validated until `decode`.
    pub fn from_encoded(secret: bool, encoded: Vec<u8>) -> Self {
        Self {
            secret,
            encoded,
            summary: OnceLock::new(),
        }
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn summary(&self) -> &EntrySummary {
        self.summary.get_or_init(|| match self.decode() {
            Ok(ring) => summarize(&ring),
            Err(e) => {
                tracing::debug!(error = %e, "entry metadata unavailable");
                EntrySummary::default()
            }
        })
    }

    /// Re-decode the stored bytes into a key ring.
    pub fn decode(&self) -> Result<KeyRing> {
        KeyRing::from_binary(&self.encoded)
    }
}

/// Split `Name (comment) <mail>` into the name and the remainder.
pub fn split_user_id(user_id: &str) -> (Option<String>, Option<String>) {
    let Some(caps) = USER_ID_PATTERN.captures(user_id) else {
        return (None, None);
    };
    let part = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };
    (part("name"), part("rest"))
}

fn summarize(ring: &KeyRing) -> EntrySummary {
    let ring = ring.ring();
    let cert = ring.cert();
    let primary = cert.primary_key();
    let master = primary.key();
    let policy = StandardPolicy::new();
    let valid = cert.with_policy(&policy, None).ok();

    let user_id = valid
        .as_ref()
        .and_then(|vc| vc.primary_userid().ok())
        .map(|ua| String::from_utf8_lossy(ua.userid().value()).into_owned())
        .or_else(|| ring.user_ids().into_iter().next());
    let (name, user_id_rest) = match &user_id {
        Some(uid) => split_user_id(uid),
        None => (None, None),
    };

    EntrySummary {
        key_id: Some(ring.master_key_id()),
        fingerprint: Fingerprint::from_openpgp(&cert.fingerprint()),
        user_id,
        name,
        user_id_rest,
        created: Some(master.creation_time().into()),
        expires: valid
            .as_ref()
            .and_then(|vc| vc.primary_key().key_expiration_time())
            .map(DateTime::<Utc>::from),
        algorithm: Some(algorithm_label(master)),
        subkeys: Some(cert.keys().subkeys().count()),
        revoked: matches!(
            cert.revocation_status(&policy, None),
            RevocationStatus::Revoked(_)
        ),
    }
}

/// Short algorithm name as GnuPG prints it: `rsa2048`, `ed25519`, `nistp256`.
fn algorithm_label<P: KeyParts, R: KeyRole>(key: &Key<P, R>) -> String {
    match key.mpis() {
        mpi::PublicKey::EdDSA { curve, .. }
        | mpi::PublicKey::ECDSA { curve, .. }
        | mpi::PublicKey::ECDH { curve, .. } => match curve {
            Curve::Ed25519 => "ed25519".to_string(),
            Curve::Cv25519 => "cv25519".to_string(),
            Curve::NistP256 => "nistp256".to_string(),
            Curve::NistP384 => "nistp384".to_string(),
            Curve::NistP521 => "nistp521".to_string(),
            other => other.to_string().to_lowercase(),
        },
        mpis => {
            let prefix = match key.pk_algo() {
                PublicKeyAlgorithm::RSAEncryptSign => "rsa".to_string(),
                PublicKeyAlgorithm::DSA => "dsa".to_string(),
                PublicKeyAlgorithm::ElGamalEncrypt => "elg".to_string(),
                other => format!("algo{}", u8::from(other)),
            };
            match mpis.bits() {
                Some(bits) => format!("{prefix}{bits}"),
                None => prefix,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::test_support::fixture;

    fn entry(binary: &[u8]) -> KeyRingEntry {
        KeyRingEntry::new(&KeyRing::from_binary(binary).unwrap()).unwrap()
    }

    #[test]
    fn split_name_comment_and_mail() {
        assert_eq!(
            split_user_id("Alice Example (work) <alice@example.org>"),
            (
                Some("Alice Example".to_string()),
                Some("(work) <alice@example.org>".to_string())
            )
        );
    }

    #[test]
    fn split_name_only_and_mail_only() {
        assert_eq!(split_user_id("Bob"), (Some("Bob".to_string()), None));
        assert_eq!(
            split_user_id("<bob@example.org>"),
            (None, Some("<bob@example.org>".to_string()))
        );
        assert_eq!(split_user_id(""), (None, None));
    }

    #[test]
    fn summary_of_alice() {
        let entry = entry(&fixture::dearmor(fixture::ALICE_PUBLIC_ASC));
        let summary = entry.summary();

        assert!(!entry.is_secret());
        assert_eq!(summary.key_id.unwrap().to_string(), "823E72B863557225");
        assert_eq!(summary.name.as_deref(), Some("Alice Example"));
        assert_eq!(summary.algorithm.as_deref(), Some("ed25519"));
        assert_eq!(
            summary.fingerprint.unwrap().to_string(),
            "B83EDC1295868FEEB1615893823E72B863557225"
        );
        assert_eq!(summary.subkeys, Some(1));
        assert!(!summary.revoked);

        let created = summary.created.unwrap();
        let expires = summary.expires.unwrap();
        assert_eq!(expires - created, Duration::days(730));
    }

    #[test]
    fn summary_of_secret_rsa_ring() {
        let entry = entry(&fixture::dearmor(fixture::BOB_SECRET_ASC));
        let summary = entry.summary();
        assert!(entry.is_secret());
        assert_eq!(summary.algorithm.as_deref(), Some("rsa2048"));
        assert_eq!(summary.subkeys, Some(0));
        assert_eq!(summary.expires, None);
    }

    #[test]
    fn card_stub_ring_still_summarizes() {
        let entry = entry(&fixture::dearmor(fixture::ALICE_CARD_SUBKEY_ASC));
        assert!(entry.is_secret());
        assert_eq!(entry.summary().subkeys, Some(1));
        assert_eq!(entry.summary().algorithm.as_deref(), Some("ed25519"));
    }

    #[test]
    fn broken_entry_degrades_to_placeholders() {
        let entry = KeyRingEntry::from_encoded(false, vec![0xC6, 0x02, 0x03, 0x00]);
        assert_eq!(entry.summary(), &EntrySummary::default());
        assert!(entry.decode().is_err());
    }

    #[test]
    fn decode_returns_the_same_ring() {
        let ring = KeyRing::from_binary(fixture::BOB_PUBLIC_GPG).unwrap();
        let entry = KeyRingEntry::new(&ring).unwrap();
        assert_eq!(entry.decode().unwrap(), ring);
    }
}
