use std::path::PathBuf;

use crate::core::models::key_id::KeyId;

/// All domain errors for keyport.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum KeyportError {
    #[error(
        "Could not parse key material: {detail}\n\n  \
         The input is neither a valid ASCII-armored block nor a binary\n  \
         OpenPGP packet stream. Entries read before this point are kept."
    )]
    Parse { detail: String },

    #[error("Armored '{label}' block is not a key ring")]
    UnrecognizedObject { label: String },

    #[error("Malformed key ring: {detail}")]
    MalformedRing { detail: String },

    #[error("Could not serialize key ring {key_id}: {detail}")]
    Serialize { key_id: KeyId, detail: String },

    #[error(
        "Secret key ring {key_id} has a subkey without secret material\n\n  \
         The ring was exported with stripped subkeys and cannot be stored\n  \
         as a secret key ring. Re-export it with all secret subkeys."
    )]
    InvalidSecretMaterial { key_id: KeyId },

    #[error("Key store write failed at {path}: {reason}")]
    StorageFailed { path: PathBuf, reason: String },

    #[error(
        "Export destination is not ready: {path}\n\n  \
         The target directory does not exist or is not a directory.\n  \
         Create it first or choose another output path."
    )]
    StorageNotReady { path: PathBuf },

    #[error(
        "Key ring '{identity}' not found in the store\n\n  \
         Run 'keyport list' (or 'keyport list --secret') to see stored key rings."
    )]
    KeyRingNotFound { identity: String },

    #[error("invalid key ID '{keyid}': {reason}")]
    InvalidKeyId { keyid: String, reason: String },

    #[error(
        "Key ID '{keyid}' matches more than one key ring\n\n  \
         Use the 16-digit key ID or the full fingerprint instead."
    )]
    AmbiguousKeyId { keyid: String },

    #[error(
        "Entry {index} does not exist: the input holds {count} entries\n\n  \
         Run 'keyport scan <FILE>' to see the entry numbers."
    )]
    InvalidSelection { index: usize, count: usize },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error("Key server transport failed: {reason}")]
    Transport { reason: String },

    #[error("File not found: {path}\n\n  Check that the path is correct and the file exists.")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeyportError>;
