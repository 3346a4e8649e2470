use std::time::Duration;

use crate::core::errors::{KeyportError, Result};
use crate::core::traits::key_server::KeyServer;

/// HKP key server client (`POST /pks/add`).
pub struct HkpKeyServer {
    base_url: String,
    timeout: Duration,
}

impl HkpKeyServer {
    /// Accepts `hkp://`, `hkps://`, `http://` and `https://` URLs.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        let base_url = if let Some(rest) = trimmed.strip_prefix("hkps://") {
            format!("https://{rest}")
        } else if let Some(rest) = trimmed.strip_prefix("hkp://") {
            format!("http://{rest}")
        } else if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            trimmed.to_string()
        } else {
            return Err(KeyportError::InvalidConfig {
                detail: format!(
                    "key server URL '{url}' must start with hkp://, hkps://, http:// or https://"
                ),
            });
        };

        Ok(Self { base_url, timeout })
    }

    fn add_url(&self) -> String {
        format!("{}/pks/add", self.base_url)
    }

    /// Build a reqwest client with the configured timeout.
    fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(format!("keyport/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KeyportError::Transport {
                reason: format!("Failed to create HTTP client: {e}"),
            })
    }
}

impl KeyServer for HkpKeyServer {
    fn add(&self, armored: &str) -> Result<()> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| KeyportError::Transport {
                reason: format!("Failed to create async runtime: {e}"),
            })?;

        rt.block_on(async {
            let client = self.build_client()?;
            let resp = client
                .post(self.add_url())
                .form(&[("keytext", armored)])
                .send()
                .await
                .map_err(|e| KeyportError::Transport {
                    reason: format!("request to {} failed: {e}", self.add_url()),
                })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(KeyportError::Transport {
                    reason: format!("server rejected key: HTTP {status} {}", body.trim()),
                });
            }
            Ok(())
        })
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
