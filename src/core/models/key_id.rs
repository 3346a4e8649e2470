use std::fmt;

use sequoia_openpgp as openpgp;
use serde::{Serialize, Serializer};

use crate::core::errors::{KeyportError, Result};

/// 64-bit OpenPGP key ID (the low 8 bytes of a v4 fingerprint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Parse the canonical 16 hex digit form used for store file names.
    pub fn from_hex(text: &str) -> Option<Self> {
        if text.len() != 16 || !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(text, 16).ok().map(Self)
    }

    /// Convert an OpenPGP key ID. Only 8-byte (v4) IDs are representable.
    pub fn from_openpgp(id: &openpgp::KeyID) -> Option<Self> {
        let bytes: [u8; 8] = id.as_bytes().try_into().ok()?;
        Some(Self(u64::from_be_bytes(bytes)))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl Serialize for KeyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 20-byte v4 key fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_openpgp(fpr: &openpgp::Fingerprint) -> Option<Self> {
        fpr.as_bytes().try_into().ok().map(Self)
    }

    /// The key ID is the low-order 64 bits of the fingerprint.
    pub fn key_id(&self) -> KeyId {
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[12..]);
        KeyId(u64::from_be_bytes(tail))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A user-supplied reference to a key: short ID, long ID or fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyQuery {
    /// 8 hex characters. Discouraged due to collisions.
    Short(u32),
    /// 16 hex characters.
    Long(KeyId),
    /// 40 hex characters.
    Fingerprint(Fingerprint),
}

impl KeyQuery {
    /// Validates a key ID before looking it up.
    ///
    /// Accepted formats:
    /// - 8 hex characters (short key ID)
    /// - 16 hex characters (long key ID)
    /// - 40 hex characters (full fingerprint)
    /// - Any of the above with "0x" prefix
    pub fn parse(keyid: &str) -> Result<Self> {
        let trimmed = keyid.trim();
        if trimmed.is_empty() {
            return Err(KeyportError::InvalidKeyId {
                keyid: keyid.to_string(),
                reason: "key ID cannot be empty".to_string(),
            });
        }

        let normalized: String = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
            .chars()
            .filter(|c| *c != ' ')
            .collect();

        if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KeyportError::InvalidKeyId {
                keyid: keyid.to_string(),
                reason: "key ID must contain only hexadecimal characters".to_string(),
            });
        }

        let invalid = |reason: String| KeyportError::InvalidKeyId {
            keyid: keyid.to_string(),
            reason,
        };

        match normalized.len() {
            8 => u32::from_str_radix(&normalized, 16)
                .map(Self::Short)
                .map_err(|e| invalid(e.to_string())),
            16 => u64::from_str_radix(&normalized, 16)
                .map(|raw| Self::Long(KeyId(raw)))
                .map_err(|e| invalid(e.to_string())),
            40 => {
                let mut bytes = [0u8; 20];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = u8::from_str_radix(&normalized[i * 2..i * 2 + 2], 16)
                        .map_err(|e| invalid(e.to_string()))?;
                }
                Ok(Self::Fingerprint(Fingerprint(bytes)))
            }
            len => Err(invalid(format!(
                "key ID must be 8, 16, or 40 hex characters (got {len})"
            ))),
        }
    }

    /// Whether a key with the given ID and fingerprint satisfies this query.
    pub fn matches(&self, key_id: KeyId, fingerprint: &Fingerprint) -> bool {
        match self {
            Self::Short(short) => key_id.0 as u32 == *short,
            Self::Long(long) => key_id == *long,
            Self::Fingerprint(fpr) => fingerprint == fpr,
        }
    }
}

impl fmt::Display for KeyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short(short) => write!(f, "{short:08X}"),
            Self::Long(long) => write!(f, "{long}"),
            Self::Fingerprint(fpr) => write!(f, "{fpr}"),
        }
    }
}
