//! `keyfob-crypto-core` — Pure cryptographic primitives for keyfob.
//!
//! This crate is the audit target: zero filesystem access, zero clocks,
//! zero async. Time-based operations take the current instant as an
//! argument; persistence lives in `keyfob-store`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod base32;

pub mod otp;

pub mod kdf;
pub mod cipher;

pub mod format;

pub use cipher::{decrypt, encrypt, BLOCK_LEN};
pub use error::CryptoError;
pub use format::{build_header, parse_stretch_count, validate_header, FORMAT_VERSION, HEADER_LEN, MAGIC};
pub use kdf::{derive_iv, derive_key, DEFAULT_STRETCH_COUNT, IV_LEN, KEY_LEN};
pub use otp::{
    code_from_truncated, counter_for_time, counter_to_bytes, generate_from_counter,
    generate_from_counter_base32, generate_from_time, generate_from_time_base32, generate_secret,
    hmac_sha1, truncate, DEFAULT_CODE_LENGTH, DEFAULT_PERIOD, GENERATED_SECRET_LEN, MAX_CODE_LENGTH,
    MIN_CODE_LENGTH,
};
