use crate::core::errors::Result;

/// Port for a remote key server.
///
/// Implementations live in `adapters::key_servers`.
pub trait KeyServer: Send + Sync {
    /// Submit an ASCII-armored public key ring.
    fn add(&self, armored: &str) -> Result<()>;

    /// Where uploads go, for logs and messages.
    fn endpoint(&self) -> &str;
}
