//! Machine-bound key derivation.
//!
//! The key is `SHA-256("<hostname>-<os>-<arch>")`. It reproduces on every
//! run on the same machine and is never written anywhere.
//!
//! # Limitations
//! The inputs are not secret. Anyone who can read the store directory as the
//! owning user can also compute the key. This keeps secrets out of casual
//! view (backups, screen shares, accidental commits); it does not protect
//! against code running as the same user.

use sha2::{Digest, Sha256};

/// Inputs to the derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIdentity {
    pub hostname: String,
    pub os: String,
    pub arch: String,
}

impl MachineIdentity {
    pub fn new(
        hostname: impl Into<String>,
        os: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Identity of the running machine.
    pub fn current() -> std::io::Result<Self> {
        let hostname = nix::unistd::gethostname().map_err(std::io::Error::from)?;
        Ok(Self {
            hostname: hostname.to_string_lossy().into_owned(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        })
    }

    fn fingerprint(&self) -> String {
        format!("{}-{}-{}", self.hostname, self.os, self.arch)
    }
}

/// Derive the 256-bit store key for an identity.
pub fn derive_key(identity: &MachineIdentity) -> [u8; 32] {
    Sha256::digest(identity.fingerprint().as_bytes()).into()
}
