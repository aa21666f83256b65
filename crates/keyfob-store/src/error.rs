//! Store error types for `keyfob-store`.

use keyfob_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cryptographic operation failed (delegated from crypto-core):
    /// Base32 encoding, wrong passphrase, or file corruption.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Malformed record field (empty client id, out-of-range password
    /// length or period).
    #[error("validation error: {0}")]
    Validation(String),

    /// No record with the given client id.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// A record with the given client id already exists in the store.
    #[error("record already exists: {0}")]
    DuplicateClientId(String),

    /// The decrypted payload is not the expected JSON document.
    #[error("store format error: {0}")]
    Format(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
