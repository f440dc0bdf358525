//! Session credentials shared between the supervisor and the RPC client.
//!
//! # Security
//! - Tokens and passphrases are never logged or serialized
//! - Both reach the engine only through its process environment
//! - A token lives for one engine process; it is not persisted

use rand::rngs::OsRng;
use rand::RngCore;

/// Environment variable carrying the bearer token to the engine.
pub const AUTH_TOKEN_ENV_VAR: &str = "SHADOWPRISM_AUTH_TOKEN";

/// Environment variable carrying the keystore passphrase to the engine.
pub const PASSPHRASE_ENV_VAR: &str = "PRISM_PASSPHRASE";

const TOKEN_BYTES: usize = 32;

/// Bearer credential authenticating RPC calls for one engine session.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap an existing token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random token from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The raw token value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The `Authorization` header value for this token.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Constant-time comparison against a presented `Authorization` header.
    pub fn matches_header(&self, header: &str) -> bool {
        let expected = self.header_value();
        let (a, b) = (expected.as_bytes(), header.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Passphrase unlocking the engine's internal keystore.
///
/// Passed through the child environment only; never sent over RPC.
#[derive(Clone)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Read the passphrase from `PRISM_PASSPHRASE`, ignoring empty values.
    pub fn from_env() -> Option<Self> {
        std::env::var(PASSPHRASE_ENV_VAR)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Self)
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}
