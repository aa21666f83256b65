//! Passphrase key stretching and IV derivation.
//!
//! This module provides:
//! - [`derive_key`] — stretch a passphrase into a 256-bit AES key by
//!   iterated SHA-256 hashing
//! - [`derive_iv`] — carve the 16-byte CBC initialization vector out of
//!   the derived key
//!
//! # Key Stretching
//!
//! The stretch loop is the only brute-force protection the store file
//! has, so it must run to completion on every key derivation: no caching
//! across passphrases, no parallel shortcut, no early exit. The stretch
//! count is recorded in the store file header so readers can reproduce
//! the derivation.
//!
//! # Deterministic IV
//!
//! The IV is a window into the key rather than a random value, which
//! makes identical plaintext under the same passphrase encrypt to
//! identical ciphertext across saves. This is a known weakness preserved
//! for wire compatibility with existing store files (see DESIGN.md).

use ring::digest;
use zeroize::Zeroizing;

/// Output length of the KDF in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Initialization vector length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// Default number of stretch iterations (256 × 1024).
///
/// Deliberately slow: at this cost the stretch loop dominates store-open
/// latency on commodity hardware.
pub const DEFAULT_STRETCH_COUNT: u32 = 262_144;

/// Stretch a passphrase into a 256-bit key.
///
/// h₀ = SHA-256(passphrase); hᵢ₊₁ = SHA-256(hᵢ ‖ passphrase), iterated
/// `stretch_count` times. The returned buffer is zeroized on drop.
#[must_use]
pub fn derive_key(passphrase: &str, stretch_count: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let pp = passphrase.as_bytes();

    let mut state = Zeroizing::new([0u8; KEY_LEN]);
    state.copy_from_slice(digest::digest(&digest::SHA256, pp).as_ref());

    for _ in 0..stretch_count {
        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(state.as_ref());
        ctx.update(pp);
        state.copy_from_slice(ctx.finish().as_ref());
    }

    state
}

/// Derive the 16-byte CBC IV from a derived key.
///
/// The window offset is the low nibble of the last key byte, so the IV is
/// `key[b .. b + 16]` for `b` in [0, 15] — always within the 32-byte key.
#[must_use]
pub fn derive_iv(key: &[u8; KEY_LEN]) -> [u8; IV_LEN] {
    let offset = usize::from(key[KEY_LEN.wrapping_sub(1)] & 0x0F);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&key[offset..offset.wrapping_add(IV_LEN)]);
    iv
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
