#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for the encrypted store wire format.
//!
//! Composes the full open path — key stretching, IV derivation, CBC
//! decryption, header validation — the way `keyfob-store` drives it,
//! without touching the filesystem.

use keyfob_crypto_core::{cipher, format, kdf, CryptoError};

/// Small stretch count for fast tests.
const TEST_STRETCH: u32 = 64;

/// Seal a payload the way `save` does: `[cleartext header][ciphertext of
/// header ‖ payload]`.
fn seal(passphrase: &str, payload: &[u8]) -> Vec<u8> {
    let key = kdf::derive_key(passphrase, TEST_STRETCH);
    let iv = kdf::derive_iv(&key);
    let header = format::build_header(TEST_STRETCH);

    let mut plaintext = Vec::with_capacity(format::HEADER_LEN + payload.len());
    plaintext.extend_from_slice(&header);
    plaintext.extend_from_slice(payload);

    let mut out = Vec::new();
    out.extend_from_slice(&header);
    out.extend_from_slice(&cipher::encrypt(&key, &iv, &plaintext));
    out
}

/// Open a sealed blob the way `load` does.
fn open(passphrase: &str, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = kdf::derive_key(passphrase, TEST_STRETCH);
    let iv = kdf::derive_iv(&key);

    let cleartext: [u8; format::HEADER_LEN] = blob[..format::HEADER_LEN]
        .try_into()
        .expect("blob carries a header");
    let plaintext = cipher::decrypt(&key, &iv, &blob[format::HEADER_LEN..], true)?;
    let decrypted: [u8; format::HEADER_LEN] = plaintext[..format::HEADER_LEN]
        .try_into()
        .expect("plaintext carries a header copy");
    format::validate_header(&cleartext, &decrypted)?;
    Ok(plaintext[format::HEADER_LEN..].to_vec())
}

#[test]
fn seal_open_roundtrip() {
    let payload = br#"[{"clientId": "aws@ops"}]"#;
    let blob = seal("correct horse", payload);
    let recovered = open("correct horse", &blob).expect("open should succeed");
    assert_eq!(recovered, payload);
}

#[test]
fn roundtrip_empty_payload() {
    let blob = seal("passphrase", &[]);
    let recovered = open("passphrase", &blob).expect("open should succeed");
    assert!(recovered.is_empty());
}

#[test]
fn wrong_passphrase_is_a_decryption_error() {
    let blob = seal("correct horse", b"payload");
    let result = open("battery staple", &blob);
    assert!(
        matches!(result, Err(CryptoError::Decryption)),
        "wrong passphrase should yield CryptoError::Decryption, got {result:?}"
    );
}

#[test]
fn wrong_stretch_count_is_a_decryption_error() {
    // Same passphrase, different cost factor: a different key entirely.
    let blob = seal("correct horse", b"payload");
    let key = kdf::derive_key("correct horse", TEST_STRETCH + 1);
    let iv = kdf::derive_iv(&key);
    let result = cipher::decrypt(&key, &iv, &blob[format::HEADER_LEN..], true).and_then(|plain| {
        let cleartext: [u8; format::HEADER_LEN] =
            blob[..format::HEADER_LEN].try_into().expect("header");
        let decrypted: [u8; format::HEADER_LEN] =
            plain[..format::HEADER_LEN].try_into().expect("header copy");
        format::validate_header(&cleartext, &decrypted)
    });
    assert!(matches!(result, Err(CryptoError::Decryption)));
}

#[test]
fn tampered_cleartext_header_is_corruption() {
    // Flip a stretch-count bit in the cleartext copy only: decryption
    // still works (the key is unaffected), the magic still matches, but
    // the two header copies now disagree.
    let mut blob = seal("correct horse", b"payload");
    blob[8] ^= 0x01;
    let result = open("correct horse", &blob);
    assert!(
        matches!(result, Err(CryptoError::FileCorruption(_))),
        "tampered cleartext header should yield FileCorruption, got {result:?}"
    );
}

#[test]
fn truncated_ciphertext_is_corruption() {
    let blob = seal("correct horse", b"payload that spans multiple blocks!!");
    let truncated = &blob[..blob.len() - 7];
    let result = open("correct horse", truncated);
    assert!(matches!(result, Err(CryptoError::FileCorruption(_))));
}

#[test]
fn identical_inputs_seal_identically() {
    // Deterministic IV: same passphrase + payload → same bytes. This is
    // the documented wire-compatibility trade-off, pinned here so any
    // change to it is a conscious format break.
    let a = seal("correct horse", b"payload");
    let b = seal("correct horse", b"payload");
    assert_eq!(a, b);
}

#[test]
fn probe_first_block_without_full_decrypt() {
    // The open_and_verify path: decrypt one block, no padding strip.
    let blob = seal("correct horse", b"a payload long enough to span blocks");
    let key = kdf::derive_key("correct horse", TEST_STRETCH);
    let iv = kdf::derive_iv(&key);

    let cleartext: [u8; format::HEADER_LEN] =
        blob[..format::HEADER_LEN].try_into().expect("header");
    let first_block = cipher::decrypt(
        &key,
        &iv,
        &blob[format::HEADER_LEN..format::HEADER_LEN + cipher::BLOCK_LEN],
        false,
    )
    .expect("single-block decrypt");
    let decrypted: [u8; format::HEADER_LEN] =
        first_block.as_slice().try_into().expect("one header block");
    format::validate_header(&cleartext, &decrypted).expect("probe should validate");
}
