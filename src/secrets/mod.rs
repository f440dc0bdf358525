//! Machine-bound secret storage.
//!
//! # Responsibilities
//! - Own the private `~/.shadowprism` directory (0700)
//! - Seal named secrets with a key derived from the machine identity
//! - Fail closed on tampering or a foreign machine; never return bad plaintext
//! - Name the well-known engine socket path
//!
//! # Security Constraints
//! - The derived key is per store instance and never persisted
//! - Secret files are 0600 and replaced atomically
//! - This is obfuscation at rest, not a boundary against the same user

pub mod error;
pub mod key;
pub mod store;

pub use error::{SecretError, SecretResult};
pub use key::MachineIdentity;
pub use store::{default_dir, SecretStore};
