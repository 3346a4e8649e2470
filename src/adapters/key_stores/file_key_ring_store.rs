use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::errors::{KeyportError, Result};
use crate::core::models::key_id::KeyId;
use crate::core::models::key_ring::{KeyRing, PublicKeyRing, SecretKeyRing};
use crate::core::models::outcome::KeyKind;
use crate::core::traits::key_store::KeyRingStore;

const RING_EXTENSION: &str = "pgp";

/// Directory-based key ring store.
///
/// Each ring is kept in its binary encoding, one file per master key id:
///
/// ```text
/// <root>/public/823E72B863557225.pgp
/// <root>/secret/823E72B863557225.pgp
/// ```
///
/// Writes go through a temporary file in the same directory and an atomic
/// rename, so a reader never sees a half-written ring.
#[derive(Clone)]
pub struct FileKeyRingStore {
    root: PathBuf,
}

impl FileKeyRingStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the directory this store lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_dir(&self, kind: KeyKind) -> PathBuf {
        self.root.join(kind.to_string())
    }

    fn ring_path(&self, kind: KeyKind, id: KeyId) -> PathBuf {
        self.table_dir(kind).join(format!("{id}.{RING_EXTENSION}"))
    }

    fn read_ring(&self, kind: KeyKind, id: KeyId) -> Result<Option<Vec<u8>>> {
        let path = self.ring_path(kind, id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KeyportError::StorageFailed {
                path,
                reason: e.to_string(),
            }),
        }
    }

    fn storage_failed(path: &Path, e: impl std::fmt::Display) -> KeyportError {
        KeyportError::StorageFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }
}

impl KeyRingStore for FileKeyRingStore {
    fn save_key_ring(&self, ring: &KeyRing) -> Result<()> {
        let dir = self.table_dir(ring.kind());
        let path = self.ring_path(ring.kind(), ring.master_key_id());

        std::fs::create_dir_all(&dir).map_err(|e| Self::storage_failed(&dir, e))?;

        let encoded = ring.encode()?;
        let mut temp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| Self::storage_failed(&dir, e))?;
        temp.write_all(&encoded)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| Self::storage_failed(temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| Self::storage_failed(&path, e.error))?;

        debug!(path = %path.display(), "key ring written");
        Ok(())
    }

    fn public_key_ring(&self, id: KeyId) -> Result<Option<PublicKeyRing>> {
        self.read_ring(KeyKind::Public, id)?
            .map(|bytes| PublicKeyRing::from_binary(&bytes))
            .transpose()
    }

    fn secret_key_ring(&self, id: KeyId) -> Result<Option<SecretKeyRing>> {
        self.read_ring(KeyKind::Secret, id)?
            .map(|bytes| SecretKeyRing::from_binary(&bytes))
            .transpose()
    }

    fn master_key_ids(&self, kind: KeyKind) -> Result<Vec<KeyId>> {
        let dir = self.table_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<KeyId> = std::fs::read_dir(&dir)
            .map_err(|e| Self::storage_failed(&dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == RING_EXTENSION))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(KeyId::from_hex)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn delete_key_ring(&self, kind: KeyKind, id: KeyId) -> Result<bool> {
        let path = self.ring_path(kind, id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::storage_failed(&path, e)),
        }
    }
}
