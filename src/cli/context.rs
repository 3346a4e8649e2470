use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::adapters::key_stores::file_key_ring_store::FileKeyRingStore;
use crate::cli::Cli;
use crate::cli::output::ProgressReporter;
use crate::config::app_config::AppConfig;
use crate::core::errors::{KeyportError, Result};
use crate::core::models::key_id::{KeyId, KeyQuery};
use crate::core::traits::key_store::KeyRingStore;

/// Everything a command needs, built once from the command line.
pub struct CommandContext {
    pub config: AppConfig,
    pub store: FileKeyRingStore,
    pub quiet: bool,
    pub json: bool,
}

impl CommandContext {
    /// Load the configuration and open the store.
    /// `--store` wins over `[store].path`.
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = AppConfig::load(cli.config.as_deref())?;
        let root = match &cli.store {
            Some(path) => path.clone(),
            None => config.store_path()?,
        };

        Ok(Self {
            config,
            store: FileKeyRingStore::new(root),
            quiet: cli.quiet,
            json: cli.json,
        })
    }

    /// Human-readable output is suppressed in quiet and JSON modes.
    pub fn human(&self) -> bool {
        !self.quiet && !self.json
    }

    pub fn progress(&self) -> ProgressReporter {
        ProgressReporter::new(self.human())
    }

    /// Resolve a user-supplied key ID or fingerprint to a stored master key id.
    pub fn resolve(&self, keyid: &str) -> Result<KeyId> {
        let query = KeyQuery::parse(keyid)?;
        self.store
            .resolve_master_key_id(&query)?
            .ok_or_else(|| KeyportError::KeyRingNotFound {
                identity: keyid.to_string(),
            })
    }
}

/// Open a key file, or stdin for `-`.
pub fn open_input(file: &str) -> Result<Box<dyn Read>> {
    if file == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let path = PathBuf::from(file);
    match File::open(&path) {
        Ok(f) => Ok(Box::new(f)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(KeyportError::FileNotFound { path }),
        Err(e) => Err(e.into()),
    }
}
