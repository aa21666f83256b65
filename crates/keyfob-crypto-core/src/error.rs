//! Cryptographic error types for `keyfob-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid Base32 secret text (bad alphabet, misplaced padding, bad length).
    #[error("invalid Base32 encoding: {0}")]
    Encoding(String),

    /// HOTP/TOTP input validation failure (empty secret, bad digit count, zero period).
    #[error("OTP error: {0}")]
    Otp(String),

    /// Header magic mismatch after decrypt — passphrase incorrect, or stretch
    /// count incorrect, or both.
    #[error("decryption failed: wrong passphrase or stretch count")]
    Decryption,

    /// Decrypted header disagrees with the stored cleartext header despite a
    /// correct magic, or the ciphertext is structurally unreadable.
    #[error("store file corrupted: {0}")]
    FileCorruption(String),
}
