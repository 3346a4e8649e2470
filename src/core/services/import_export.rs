use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sequoia_openpgp::armor;
use tracing::{debug, info, warn};

use crate::core::errors::{KeyportError, Result};
use crate::core::models::cancellation::CancellationToken;
use crate::core::models::key_id::KeyId;
use crate::core::models::key_ring::KeyRing;
use crate::core::models::key_ring_entry::KeyRingEntry;
use crate::core::models::outcome::{ExportSummary, ImportSummary, KeyKind, MergeOutcome};
use crate::core::services::key_ring_merger::KeyRingMerger;
use crate::core::traits::key_store::KeyRingStore;
use crate::core::traits::progress::ProgressSink;

/// Runs import and export batches against a key ring store.
///
/// The store, the progress sink and the armor `Version` header are fixed
/// at construction; cancellation is passed per export.
pub struct ImportExportService<'a, S: KeyRingStore + ?Sized, P: ProgressSink + ?Sized> {
    store: &'a S,
    progress: &'a P,
    version: String,
    comment: Option<String>,
}

impl<'a, S: KeyRingStore + ?Sized, P: ProgressSink + ?Sized> ImportExportService<'a, S, P> {
    pub fn new(store: &'a S, progress: &'a P, version: impl Into<String>) -> Self {
        Self {
            store,
            progress,
            version: version.into(),
            comment: None,
        }
    }

    /// Add a `Comment` armor header to exported blocks.
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Merge every entry in order and count the outcomes.
    ///
    /// An entry that cannot be decoded is logged and skipped without
    /// touching any counter. The batch never aborts.
    pub fn import_all(&self, entries: &[KeyRingEntry]) -> ImportSummary {
        let merger = KeyRingMerger::new(self.store);
        let total = entries.len();
        self.progress.set_progress(Some("importing"), 0, 100);

        let summary = entries
            .iter()
            .enumerate()
            .fold(ImportSummary::default(), |summary, (i, entry)| {
                let summary = match entry.decode() {
                    Ok(ring) => {
                        let outcome = merger.merge(&ring);
                        if outcome == MergeOutcome::Error {
                            warn!(key_id = %ring.master_key_id(), "import failed, continuing");
                        }
                        summary.record(outcome)
                    }
                    Err(e) => {
                        warn!(entry = i + 1, "skipping undecodable entry: {e}");
                        summary
                    }
                };
                self.progress.set_progress(None, (i + 1) * 100 / total, 100);
                summary
            });

        info!(
            added = summary.added,
            updated = summary.updated,
            bad = summary.bad,
            "import finished"
        );
        summary
    }

    /// Write one armored block per stored ring in `ids` to `sink`.
    ///
    /// Ids without a stored ring of the requested kind are skipped and
    /// reported in `skipped_count`; `exported_count` is the number of
    /// requested ids. The token is polled after each id; once cancelled the
    /// export stops with `Ok(None)` and the sink holds only complete blocks.
    pub fn export_selected<W: Write>(
        &self,
        ids: &[KeyId],
        kind: KeyKind,
        sink: &mut W,
        token: &CancellationToken,
    ) -> Result<Option<ExportSummary>> {
        let total = ids.len();
        let mut headers = vec![("Version", self.version.as_str())];
        if let Some(comment) = &self.comment {
            headers.push(("Comment", comment.as_str()));
        }

        let mut skipped_count = 0;
        for (i, id) in ids.iter().enumerate() {
            let percent = match kind {
                KeyKind::Public => i * 100 / total,
                KeyKind::Secret => i * 100 / total / 2,
            };
            self.progress.set_progress(Some("exporting"), percent, 100);

            let ring: Option<KeyRing> = match kind {
                KeyKind::Public => self.store.public_key_ring(*id)?.map(Into::into),
                KeyKind::Secret => self.store.secret_key_ring(*id)?.map(Into::into),
            };

            match ring {
                Some(ring) => {
                    write_block(&mut *sink, &ring, &headers)?;
                    debug!(key_id = %id, kind = %kind, "key ring exported");
                }
                None => {
                    warn!(key_id = %id, kind = %kind, "no stored key ring, skipping");
                    skipped_count += 1;
                }
            }

            if token.is_cancelled() {
                info!(processed = i + 1, "export cancelled");
                return Ok(None);
            }
        }

        self.progress.set_progress(Some("done"), 100, 100);
        Ok(Some(ExportSummary {
            exported_count: total,
            skipped_count,
        }))
    }

    /// Export into a file. The file only appears once the export completes.
    pub fn export_to_path(
        &self,
        ids: &[KeyId],
        kind: KeyKind,
        path: &Path,
        token: &CancellationToken,
    ) -> Result<Option<ExportSummary>> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(KeyportError::StorageNotReady { path: parent });
        }

        let mut temp =
            tempfile::NamedTempFile::new_in(&parent).map_err(|e| KeyportError::StorageFailed {
                path: parent.clone(),
                reason: e.to_string(),
            })?;

        let summary = {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let summary = self.export_selected(ids, kind, &mut writer, token)?;
            writer.flush()?;
            summary
        };

        if summary.is_some() {
            temp.persist(path).map_err(|e| KeyportError::StorageFailed {
                path: path.to_path_buf(),
                reason: e.error.to_string(),
            })?;
        }
        Ok(summary)
    }
}

/// One complete armor block holding `ring`.
fn write_block<W: Write>(sink: W, ring: &KeyRing, headers: &[(&str, &str)]) -> Result<()> {
    let mut writer =
        armor::Writer::with_headers(sink, ring.kind().armor_kind(), headers.iter().copied())
            .map_err(|e| KeyportError::Serialize {
                key_id: ring.master_key_id(),
                detail: e.to_string(),
            })?;
    ring.write_to(&mut writer)?;
    writer.finalize()?;
    Ok(())
}
