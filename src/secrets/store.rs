//! Encrypted secret files.
//!
//! Each secret lives in `<dir>/<name><suffix>` as hex text of
//! `nonce(24) || ciphertext`, sealed with XSalsa20-Poly1305 under the
//! machine-bound key from [`key`](crate::secrets::key).

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crypto_secretbox::aead::generic_array::GenericArray;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;
use tempfile::NamedTempFile;

use crate::config::StorageConfig;
use crate::rpc::Endpoint;
use crate::secrets::error::{SecretError, SecretResult};
use crate::secrets::key::{derive_key, MachineIdentity};

/// Nonce length of the secretbox construction.
pub const NONCE_LEN: usize = 24;

/// Directory name under the home directory.
pub const DEFAULT_DIR_NAME: &str = ".shadowprism";

pub const DEFAULT_SOCKET_NAME: &str = "engine.sock";

pub const DEFAULT_SECRET_SUFFIX: &str = ".enc";

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// `~/.shadowprism`, if a home directory is known.
pub fn default_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(DEFAULT_DIR_NAME))
}

/// Machine-bound store of named secrets.
pub struct SecretStore {
    dir: PathBuf,
    key: [u8; 32],
    socket_name: String,
    suffix: String,
}

impl SecretStore {
    /// Open the default store at `~/.shadowprism`.
    pub fn init() -> SecretResult<Self> {
        let dir = default_dir().ok_or_else(|| SecretError::StorageUnavailable {
            path: PathBuf::from("~").join(DEFAULT_DIR_NAME),
            reason: "home directory is not known".to_string(),
        })?;
        Self::open(dir)
    }

    /// Open the store described by the `[storage]` config section.
    pub fn from_config(storage: &StorageConfig) -> SecretResult<Self> {
        let store = match &storage.dir {
            Some(dir) => Self::open(dir.clone())?,
            None => Self::init()?,
        };
        Ok(store.with_naming(storage.socket_name.clone(), storage.secret_suffix.clone()))
    }

    /// Open (creating if absent) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> SecretResult<Self> {
        let dir = dir.into();
        let identity = MachineIdentity::current().map_err(|e| SecretError::StorageUnavailable {
            path: dir.clone(),
            reason: format!("cannot determine machine identity: {}", e),
        })?;
        Self::with_identity(dir, &identity)
    }

    /// Open a store keyed to an explicit machine identity.
    pub fn with_identity(
        dir: impl Into<PathBuf>,
        identity: &MachineIdentity,
    ) -> SecretResult<Self> {
        let dir = dir.into();
        ensure_private_dir(&dir)?;

        tracing::debug!(dir = %dir.display(), "Secret store opened");

        Ok(Self {
            dir,
            key: derive_key(identity),
            socket_name: DEFAULT_SOCKET_NAME.to_string(),
            suffix: DEFAULT_SECRET_SUFFIX.to_string(),
        })
    }

    /// Override the socket file name and the secret file suffix.
    pub fn with_naming(
        mut self,
        socket_name: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        self.socket_name = socket_name.into();
        self.suffix = suffix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where an embedded engine binary is materialized.
    pub fn bin_dir(&self) -> PathBuf {
        self.dir.join("bin")
    }

    /// Socket path of this installation's engine. No I/O.
    pub fn socket_path(&self) -> PathBuf {
        self.dir.join(&self.socket_name)
    }

    /// [`socket_path`](Self::socket_path) as an endpoint.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::Unix(self.socket_path())
    }

    /// Encrypt and atomically persist `value` under `name`.
    ///
    /// Concurrent saves of the same name must be serialized by the caller;
    /// the last rename wins and no reader ever sees a partial file.
    pub fn save(&self, name: &str, value: impl AsRef<[u8]>) -> SecretResult<()> {
        let path = self.secret_path(name)?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(GenericArray::from_slice(&nonce), value.as_ref())
            .map_err(|_| SecretError::WriteFailed {
                name: name.to_string(),
                source: std::io::Error::other("encryption failed"),
            })?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        write_atomic(&self.dir, &path, hex::encode(blob).as_bytes()).map_err(|source| {
            SecretError::WriteFailed {
                name: name.to_string(),
                source,
            }
        })?;

        tracing::info!(name = name, "Secret saved");
        Ok(())
    }

    /// Decrypt the secret stored under `name`.
    pub fn load(&self, name: &str) -> SecretResult<Vec<u8>> {
        let path = self.secret_path(name)?;

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SecretError::NotFound(name.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(SecretError::Corrupt {
                    name: name.to_string(),
                    reason: "file is not text".to_string(),
                })
            }
            Err(e) => {
                return Err(SecretError::StorageUnavailable {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        let blob = hex::decode(text.trim()).map_err(|e| SecretError::Corrupt {
            name: name.to_string(),
            reason: format!("not hex encoded: {}", e),
        })?;

        if blob.len() < NONCE_LEN {
            return Err(SecretError::Corrupt {
                name: name.to_string(),
                reason: format!("{} bytes is shorter than the nonce", blob.len()),
            });
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::AuthenticationFailed(name.to_string()))
    }

    /// [`load`](Self::load) for secrets that are text.
    pub fn load_string(&self, name: &str) -> SecretResult<String> {
        let bytes = self.load(name)?;
        String::from_utf8(bytes).map_err(|_| SecretError::Corrupt {
            name: name.to_string(),
            reason: "plaintext is not UTF-8".to_string(),
        })
    }

    pub fn exists(&self, name: &str) -> SecretResult<bool> {
        Ok(self.secret_path(name)?.is_file())
    }

    pub fn delete(&self, name: &str) -> SecretResult<()> {
        let path = self.secret_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(name = name, "Secret deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SecretError::NotFound(name.to_string()))
            }
            Err(source) => Err(SecretError::WriteFailed {
                name: name.to_string(),
                source,
            }),
        }
    }

    fn secret_path(&self, name: &str) -> SecretResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}{}", name, self.suffix)))
    }

    fn cipher(&self) -> XSalsa20Poly1305 {
        XSalsa20Poly1305::new(GenericArray::from_slice(&self.key))
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("dir", &self.dir)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Names map directly to file names and must not escape the directory.
fn validate_name(name: &str) -> SecretResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SecretError::InvalidName(name.to_string()))
    }
}

fn ensure_private_dir(dir: &Path) -> SecretResult<()> {
    let unavailable = |e: std::io::Error| SecretError::StorageUnavailable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    };

    fs::create_dir_all(dir).map_err(unavailable)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE)).map_err(unavailable)?;
    Ok(())
}

/// Write to a temp file in `dir`, then rename over `path`.
pub(crate) fn write_atomic(dir: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    write_atomic_with_mode(dir, path, contents, FILE_MODE)
}

pub(crate) fn write_atomic_with_mode(
    dir: &Path,
    path: &Path,
    contents: &[u8],
    mode: u32,
) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
