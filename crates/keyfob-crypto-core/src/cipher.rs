//! AES-256-CBC encryption for the store file payload.
//!
//! This module provides:
//! - [`encrypt`] — AES-256-CBC with PKCS#7 padding, always appended
//! - [`decrypt`] — the inverse transform, with optional padding strip
//!
//! CBC with a key-derived IV carries no authentication tag; tampering and
//! wrong passphrases are instead detected by the header checks in
//! [`crate::format`]. Padding is always added on encrypt — a plaintext
//! that is already block-aligned gains a full 16-byte pad block — so the
//! pad length byte is always present and in [1, 16].

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::CryptoError;
use crate::kdf::{IV_LEN, KEY_LEN};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

/// Encrypt a plaintext buffer with AES-256-CBC.
///
/// PKCS#7 padding is applied unconditionally, so the ciphertext is always
/// a non-empty multiple of [`BLOCK_LEN`] and strictly longer than the
/// plaintext.
#[must_use]
pub fn encrypt(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt an AES-256-CBC ciphertext.
///
/// With `strip_padding`, the trailing N bytes are removed where N is the
/// value of the last decrypted byte. Decrypting under the wrong key
/// produces a garbage pad byte more often than not; a pad value outside
/// [1, len] is therefore reported as [`CryptoError::Decryption`], not
/// corruption.
///
/// # Errors
///
/// Returns [`CryptoError::FileCorruption`] if the ciphertext length is not
/// a positive multiple of the block size, and [`CryptoError::Decryption`]
/// if padding stripping is requested but the pad byte is implausible.
pub fn decrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
    strip_padding: bool,
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::FileCorruption(format!(
            "ciphertext length {} is not a positive multiple of {BLOCK_LEN}",
            ciphertext.len()
        )));
    }

    let mut plaintext = Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| {
            CryptoError::FileCorruption("ciphertext does not form whole blocks".to_owned())
        })?;

    if strip_padding {
        let pad = usize::from(*plaintext.last().ok_or(CryptoError::Decryption)?);
        if pad == 0 || pad > BLOCK_LEN || pad > plaintext.len() {
            return Err(CryptoError::Decryption);
        }
        // pad <= plaintext.len() is checked above.
        #[allow(clippy::arithmetic_side_effects)]
        plaintext.truncate(plaintext.len() - pad);
    }

    Ok(plaintext)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
