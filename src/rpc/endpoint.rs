//! Engine addressing.
//!
//! An engine instance listens on exactly one endpoint: a Unix socket path or
//! a loopback host:port pair. The same value is handed to the supervisor (to
//! export through the child environment) and to the client (to dial).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming the socket path the engine binds.
pub const SOCKET_PATH_ENV_VAR: &str = "SHADOWPRISM_SOCKET_PATH";

/// Environment variable naming the TCP port the engine binds.
pub const PORT_ENV_VAR: &str = "PORT";

/// Environment variable naming the TCP host the engine binds.
pub const HOST_ENV_VAR: &str = "SHADOWPRISM_HOST";

/// Default loopback port used by the engine in TCP mode.
pub const DEFAULT_PORT: u16 = 42069;

/// Address the engine listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Local stream socket at a filesystem path.
    Unix(PathBuf),
    /// Host and port, normally loopback.
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Endpoint::Unix(path.into())
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
        }
    }

    /// `127.0.0.1:<port>`.
    pub fn loopback(port: u16) -> Self {
        Self::tcp("127.0.0.1", port)
    }

    /// Socket path, if this is a Unix endpoint.
    pub fn socket_path(&self) -> Option<&Path> {
        match self {
            Endpoint::Unix(path) => Some(path),
            Endpoint::Tcp { .. } => None,
        }
    }

    /// Value for the HTTP `Host` header.
    ///
    /// The hostname is ignored by a Unix socket listener, so `localhost` is sent.
    pub fn authority(&self) -> String {
        match self {
            Endpoint::Unix(_) => "localhost".to_string(),
            Endpoint::Tcp { host, port } => format!("{}:{}", host, port),
        }
    }

    /// Environment variables telling the engine where to listen.
    pub fn to_env(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::Unix(path) => vec![(SOCKET_PATH_ENV_VAR, path.display().to_string())],
            Endpoint::Tcp { host, port } => vec![
                (HOST_ENV_VAR, host.clone()),
                (PORT_ENV_VAR, port.to_string()),
            ],
        }
    }

    /// Reconstruct the endpoint from the engine-side environment.
    ///
    /// A socket path wins over a port. Returns `None` if neither is set or the
    /// port does not parse.
    pub fn from_env() -> Option<Self> {
        if let Ok(path) = std::env::var(SOCKET_PATH_ENV_VAR) {
            if !path.is_empty() {
                return Some(Endpoint::Unix(PathBuf::from(path)));
            }
        }

        let port = std::env::var(PORT_ENV_VAR).ok()?.parse::<u16>().ok()?;
        let host = std::env::var(HOST_ENV_VAR).unwrap_or_else(|_| "127.0.0.1".to_string());
        Some(Endpoint::Tcp { host, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// Error parsing an endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid endpoint '{input}': {reason}")]
pub struct EndpointParseError {
    pub input: String,
    pub reason: &'static str,
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    /// Accepts `unix:/path`, a bare absolute path, or `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| EndpointParseError {
            input: s.to_string(),
            reason,
        };

        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(err("empty socket path"));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if s.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(s)));
        }

        let (host, port) = s.rsplit_once(':').ok_or_else(|| err("expected host:port"))?;
        if host.is_empty() {
            return Err(err("empty host"));
        }
        let port = port.parse::<u16>().map_err(|_| err("invalid port"))?;
        if port == 0 {
            return Err(err("port must be non-zero"));
        }
        Ok(Endpoint::tcp(host, port))
    }
}
