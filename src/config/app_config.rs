use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::errors::{KeyportError, Result};

pub const DEFAULT_KEY_SERVER: &str = "hkps://keys.openpgp.org";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level keyport configuration read from `config.toml`.
///
/// Every section is optional; a missing file means all defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub store: StoreSection,
    pub keyserver: KeyServerSection,
    pub armor: ArmorSection,
}

impl AppConfig {
    /// Load the configuration.
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// location (`<config dir>/keyport/config.toml`) is used if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(KeyportError::FileNotFound {
                        path: path.to_path_buf(),
                    });
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&config_path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| KeyportError::InvalidConfig {
            detail: format!("Failed to parse config.toml: {e}"),
        })?;

        if config.keyserver.timeout_secs == 0 {
            return Err(KeyportError::InvalidConfig {
                detail: "keyserver.timeout_secs must be greater than zero".into(),
            });
        }

        // Armor header values must stay on one line
        for (name, value) in [
            ("armor.version", config.armor.version.as_deref()),
            ("armor.comment", config.armor.comment.as_deref()),
        ] {
            if let Some(value) = value
                && (value.trim().is_empty() || value.contains(['\n', '\r']))
            {
                return Err(KeyportError::InvalidConfig {
                    detail: format!("{name} must be a single non-empty line"),
                });
            }
        }

        Ok(config)
    }

    /// Directory of the key ring store: `[store].path` or the platform data dir.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("keyport"))
            .ok_or_else(|| KeyportError::InvalidConfig {
                detail: "Could not determine a data directory; set [store].path or use --store"
                    .into(),
            })
    }

    /// Value of the `Version` armor header.
    pub fn armor_version(&self) -> String {
        self.armor
            .version
            .clone()
            .unwrap_or_else(|| format!("keyport {}", env!("CARGO_PKG_VERSION")))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("keyport").join("config.toml"))
}

/// The `[store]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
}

/// The `[keyserver]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyServerSection {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for KeyServerSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_KEY_SERVER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// The `[armor]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArmorSection {
    pub version: Option<String>,
    pub comment: Option<String>,
}
