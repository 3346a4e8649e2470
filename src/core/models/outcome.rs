use std::fmt;

use serde::Serialize;

use sequoia_openpgp::armor;

/// Result of merging one key ring into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The ring was persisted.
    Added,
    /// The ring replaced an existing record. Not produced yet.
    #[allow(dead_code)]
    Updated,
    /// The ring failed validation and nothing was written.
    Bad,
    /// The store rejected the write.
    Error,
}

/// Aggregate counts of an import batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    pub bad: usize,
}

impl ImportSummary {
    /// Fold one merge outcome into the counts.
    pub fn record(self, outcome: MergeOutcome) -> Self {
        match outcome {
            MergeOutcome::Added => Self {
                added: self.added + 1,
                ..self
            },
            MergeOutcome::Updated => Self {
                updated: self.updated + 1,
                ..self
            },
            MergeOutcome::Bad => Self {
                bad: self.bad + 1,
                ..self
            },
            MergeOutcome::Error => self,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    /// Number of requested key ids.
    pub exported_count: usize,
    /// Requested ids that had no ring in the store.
    pub skipped_count: usize,
}

/// Which table of the store a ring lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Public,
    Secret,
}

impl KeyKind {
    pub fn armor_kind(self) -> armor::Kind {
        match self {
            Self::Public => armor::Kind::PublicKey,
            Self::Secret => armor::Kind::SecretKey,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Secret => write!(f, "secret"),
        }
    }
}
