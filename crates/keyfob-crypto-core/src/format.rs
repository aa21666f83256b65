//! Store file header — magic number, version, stretch count.
//!
//! # File Layout
//!
//! ```text
//! magic (u32 BE) | version (u32 BE) | stretch_count (u32 BE) | magic (u32 BE)
//! ```
//!
//! The 16-byte header appears twice in a store file: once in cleartext at
//! offset 0, and once as the first 16 bytes of the encrypted payload. The
//! duplicated magic inside the decrypted copy is the passphrase check: if
//! either magic field decrypts wrong, the key (and therefore the
//! passphrase or stretch count) was wrong. Only after the magic check
//! passes is the decrypted copy compared against the cleartext copy — a
//! mismatch there means the file was tampered with or corrupted in
//! transit, not that the passphrase was wrong. The order of the two
//! checks is part of the format contract.

use crate::error::CryptoError;

/// Magic number identifying an encrypted record store file.
pub const MAGIC: u32 = 0x7A6A_5A4A;

/// Current store file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Header length in bytes (four big-endian u32 fields).
pub const HEADER_LEN: usize = 16;

/// Build the 16-byte header for a given stretch count.
#[must_use]
pub fn build_header(stretch_count: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&MAGIC.to_be_bytes());
    header[4..8].copy_from_slice(&FORMAT_VERSION.to_be_bytes());
    header[8..12].copy_from_slice(&stretch_count.to_be_bytes());
    header[12..16].copy_from_slice(&MAGIC.to_be_bytes());
    header
}

/// Read the stretch count field back out of a header.
///
/// Useful for opening a file written with a non-default cost factor: the
/// cleartext header copy tells the reader how many stretch iterations to
/// run before attempting decryption.
#[must_use]
pub fn parse_stretch_count(header: &[u8; HEADER_LEN]) -> u32 {
    let mut field = [0u8; 4];
    field.copy_from_slice(&header[8..12]);
    u32::from_be_bytes(field)
}

/// Validate a decrypted header against the stored cleartext copy.
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] if either magic field of the
/// decrypted header is wrong (wrong passphrase or stretch count), then
/// [`CryptoError::FileCorruption`] if the magic is right but the two
/// header copies disagree (tampering or I/O corruption).
pub fn validate_header(
    cleartext_header: &[u8; HEADER_LEN],
    decrypted_header: &[u8; HEADER_LEN],
) -> Result<(), CryptoError> {
    let mut field = [0u8; 4];

    field.copy_from_slice(&decrypted_header[0..4]);
    let magic_leading = u32::from_be_bytes(field);
    field.copy_from_slice(&decrypted_header[12..16]);
    let magic_trailing = u32::from_be_bytes(field);

    if magic_leading != MAGIC || magic_trailing != MAGIC {
        return Err(CryptoError::Decryption);
    }

    if cleartext_header != decrypted_header {
        return Err(CryptoError::FileCorruption(
            "cleartext header disagrees with decrypted header".to_owned(),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
