//! RFC 4226 HOTP and RFC 6238 TOTP generation engine.
//!
//! Standards-compliant one-time password generation using `ring::hmac`
//! HMAC-SHA1. The pipeline is exposed stage by stage — counter encoding,
//! HMAC, dynamic truncation, decimal rendering — plus the two composed
//! entry points [`generate_from_counter`] and [`generate_from_time`].
//!
//! Every function here is pure: time-based generation takes the current
//! Unix time as an argument rather than reading a clock, so callers can
//! test against fixed instants.

use rand::rngs::OsRng;
use rand::RngCore;
use ring::hmac;

use crate::base32;
use crate::error::CryptoError;

// ── Constants ───────────────────────────────────────────────────────

/// HMAC-SHA1 digest length in bytes.
pub const HMAC_LEN: usize = 20;

/// Counter length in bytes (64-bit big-endian per RFC 4226 §5.2).
pub const COUNTER_LEN: usize = 8;

/// Default TOTP period in seconds (RFC 6238 §4).
pub const DEFAULT_PERIOD: u32 = 30;

/// Default number of digits in a generated code.
pub const DEFAULT_CODE_LENGTH: u8 = 6;

/// Smallest permitted digit count.
pub const MIN_CODE_LENGTH: u8 = 1;

/// Largest permitted digit count (10^10 exceeds u32, so longer codes
/// cannot be produced by 31-bit truncation).
pub const MAX_CODE_LENGTH: u8 = 10;

/// Length in bytes of a freshly generated shared secret.
pub const GENERATED_SECRET_LEN: usize = 10;

// ── Pipeline stages ─────────────────────────────────────────────────

/// Encode a counter as 8 bytes, most significant byte first (RFC 4226 §5.2).
///
/// `u64` covers the full RFC counter domain [0, 2^64 − 1], so no range
/// check is needed here.
#[must_use]
pub const fn counter_to_bytes(counter: u64) -> [u8; COUNTER_LEN] {
    counter.to_be_bytes()
}

/// Compute HMAC-SHA1 over an 8-byte counter.
///
/// # Errors
///
/// Returns [`CryptoError::Otp`] if the secret is empty.
pub fn hmac_sha1(secret: &[u8], counter: &[u8; COUNTER_LEN]) -> Result<[u8; HMAC_LEN], CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::Otp("secret must not be empty".to_owned()));
    }

    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret);
    let tag = hmac::sign(&key, counter);

    let mut digest = [0u8; HMAC_LEN];
    digest.copy_from_slice(tag.as_ref());
    Ok(digest)
}

/// Dynamic Truncation (RFC 4226 §5.3).
///
/// offset = low-order 4 bits of the last digest byte; the result is the
/// 4 bytes starting at that offset with the high bit of the first byte
/// cleared.
///
/// # Errors
///
/// Returns [`CryptoError::Otp`] if the digest is not exactly 20 bytes.
pub fn truncate(hmac: &[u8]) -> Result<[u8; 4], CryptoError> {
    if hmac.len() != HMAC_LEN {
        return Err(CryptoError::Otp(format!(
            "HMAC digest must be {HMAC_LEN} bytes, got {}",
            hmac.len()
        )));
    }

    // offset is at most 15, so offset + 3 stays within the 20-byte digest.
    let offset = usize::from(hmac[HMAC_LEN.wrapping_sub(1)] & 0x0F);
    Ok([
        hmac[offset] & 0x7F,
        hmac[offset.wrapping_add(1)],
        hmac[offset.wrapping_add(2)],
        hmac[offset.wrapping_add(3)],
    ])
}

/// Render a truncated hash as a zero-padded decimal code.
///
/// The 4 bytes are read as an unsigned 32-bit big-endian integer and
/// reduced modulo 10^digits; the result is left-padded with zeros to
/// exactly `digits` characters.
///
/// # Errors
///
/// Returns [`CryptoError::Otp`] if `digits` is outside [1, 10].
pub fn code_from_truncated(truncated: [u8; 4], digits: u8) -> Result<String, CryptoError> {
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&digits) {
        return Err(CryptoError::Otp(format!(
            "digits must be in [{MIN_CODE_LENGTH}, {MAX_CODE_LENGTH}], got {digits}"
        )));
    }

    let value = u64::from(u32::from_be_bytes(truncated));
    // digits <= 10 and 10^10 < 2^64, so the power and modulus are safe.
    #[allow(clippy::arithmetic_side_effects)]
    let code = value % 10u64.pow(u32::from(digits));
    let width = usize::from(digits);
    Ok(format!("{code:0>width$}"))
}

/// Derive the time-step counter and the seconds left in the current step.
///
/// interval = floor(`now_unix` / `period`); the second element of the
/// returned pair is the number of seconds until the interval rolls over,
/// in (0, `period`].
///
/// # Errors
///
/// Returns [`CryptoError::Otp`] if `period` is 0.
pub fn counter_for_time(period: u32, now_unix: u64) -> Result<([u8; COUNTER_LEN], u64), CryptoError> {
    if period == 0 {
        return Err(CryptoError::Otp("period must be > 0".to_owned()));
    }

    // period is validated non-zero above; elapsed is the division
    // remainder, so it is strictly less than period.
    let period_u64 = u64::from(period);
    #[allow(clippy::arithmetic_side_effects)]
    let interval = now_unix / period_u64;
    #[allow(clippy::arithmetic_side_effects)]
    let elapsed = now_unix - interval * period_u64;
    #[allow(clippy::arithmetic_side_effects)]
    let remaining = period_u64 - elapsed;

    Ok((counter_to_bytes(interval), remaining))
}

// ── Composed entry points ───────────────────────────────────────────

/// Generate a counter-based (HOTP) code per RFC 4226.
///
/// # Arguments
/// - `secret`: raw shared secret bytes (decode Base32 text with
///   [`base32::decode`] first)
/// - `counter`: the event counter tracked by client and server
/// - `digits`: code length in [1, 10]
///
/// # Errors
///
/// Returns [`CryptoError::Otp`] if the secret is empty or `digits` is out
/// of range.
#[must_use = "OTP code should be used or stored"]
pub fn generate_from_counter(
    secret: &[u8],
    counter: u64,
    digits: u8,
) -> Result<String, CryptoError> {
    let digest = hmac_sha1(secret, &counter_to_bytes(counter))?;
    let truncated = truncate(&digest)?;
    code_from_truncated(truncated, digits)
}

/// Generate a time-based (TOTP) code per RFC 6238.
///
/// Returns the code together with the number of seconds it remains valid.
///
/// # Errors
///
/// Returns [`CryptoError::Otp`] if the secret is empty, `digits` is out of
/// range, or `period` is 0.
#[must_use = "OTP code should be used or stored"]
pub fn generate_from_time(
    secret: &[u8],
    digits: u8,
    period: u32,
    now_unix: u64,
) -> Result<(String, u64), CryptoError> {
    let (counter, remaining) = counter_for_time(period, now_unix)?;
    let digest = hmac_sha1(secret, &counter)?;
    let truncated = truncate(&digest)?;
    let code = code_from_truncated(truncated, digits)?;
    Ok((code, remaining))
}

/// Generate a fresh random shared secret from the OS CSPRNG.
///
/// 10 bytes encode to exactly 16 Base32 characters with no padding,
/// which is what most enrollment flows expect to display.
#[must_use]
pub fn generate_secret() -> [u8; GENERATED_SECRET_LEN] {
    let mut secret = [0u8; GENERATED_SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    secret
}

/// Convenience: decode a Base32 secret and generate a counter-based code.
///
/// # Errors
///
/// Returns [`CryptoError::Encoding`] for bad Base32 text, otherwise as
/// [`generate_from_counter`].
pub fn generate_from_counter_base32(
    secret_base32: &str,
    counter: u64,
    digits: u8,
) -> Result<String, CryptoError> {
    let secret = base32::decode(secret_base32)?;
    generate_from_counter(&secret, counter, digits)
}

/// Convenience: decode a Base32 secret and generate a time-based code.
///
/// # Errors
///
/// Returns [`CryptoError::Encoding`] for bad Base32 text, otherwise as
/// [`generate_from_time`].
pub fn generate_from_time_base32(
    secret_base32: &str,
    digits: u8,
    period: u32,
    now_unix: u64,
) -> Result<(String, u64), CryptoError> {
    let secret = base32::decode(secret_base32)?;
    generate_from_time(&secret, digits, period, now_unix)
}

// ── Tests ───────────────────────────────────────────────────────────
