//! Engine executable resolution.
//!
//! # Responsibilities
//! - Use an explicit path, or the first existing candidate of a search list
//! - Materialize an embedded engine into the private `bin/` directory

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::secrets::store::write_atomic_with_mode;
use crate::supervisor::error::{SupervisorError, SupervisorResult};

/// Default engine executable name.
pub const DEFAULT_BINARY_NAME: &str = "shadowprism-core";

const EXEC_MODE: u32 = 0o700;

/// Where the engine executable comes from.
#[derive(Debug, Clone)]
pub enum EngineBinary {
    /// Exactly this file.
    Path(PathBuf),
    /// First candidate that exists, in order.
    Search(Vec<PathBuf>),
    /// Bytes shipped inside the front-end, written out before every start.
    Embedded {
        name: String,
        bytes: Cow<'static, [u8]>,
    },
}

impl EngineBinary {
    /// Search the default candidate list for `name`.
    pub fn search_default(name: &str) -> Self {
        EngineBinary::Search(default_candidates(name))
    }

    pub fn embedded(name: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        EngineBinary::Embedded {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Resolve to an executable path. `bin_dir` receives embedded binaries.
    pub fn resolve(&self, bin_dir: &Path) -> SupervisorResult<PathBuf> {
        match self {
            EngineBinary::Path(path) => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(SupervisorError::BinaryNotFound {
                        searched: vec![path.clone()],
                    })
                }
            }
            EngineBinary::Search(candidates) => candidates
                .iter()
                .find(|p| p.is_file())
                .cloned()
                .ok_or_else(|| SupervisorError::BinaryNotFound {
                    searched: candidates.clone(),
                }),
            EngineBinary::Embedded { name, bytes } => materialize(bin_dir, name, bytes),
        }
    }
}

/// Candidates relative to the working directory, then the container path.
pub fn default_candidates(name: &str) -> Vec<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    vec![
        cwd.join("..").join("core").join("target").join("debug").join(name),
        cwd.join("core").join("target").join("debug").join(name),
        cwd.join(name),
        PathBuf::from("/app").join(name),
    ]
}

/// Write the embedded engine to `<bin_dir>/<name>` with mode 0700.
///
/// Overwritten every time so the engine matches the front-end build.
fn materialize(bin_dir: &Path, name: &str, bytes: &[u8]) -> SupervisorResult<PathBuf> {
    let path = bin_dir.join(name);
    let spawn_failed = |source| SupervisorError::SpawnFailed {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(bin_dir).map_err(spawn_failed)?;
    write_atomic_with_mode(bin_dir, &path, bytes, EXEC_MODE).map_err(spawn_failed)?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Embedded engine materialized");
    Ok(path)
}
